//! Log line to rendered summary: classify, decode, format.

use tracing::{debug, trace};

use crate::classifier::{self, ClassifiedLine, LineCategory};
use crate::formatter::format_packet;
use crate::geo::GeoFix;
use crate::packet::{self, DecodeError};
use crate::summary::{Direction, RenderedSummary};

/// Label shown for packets the internet gateway queued for transmission
pub const GATE_TO_TX_LABEL: &str = "[ig>tx]";

/// Direction marker for a payload-bearing category
pub fn direction_for(category: LineCategory) -> Option<Direction> {
    match category {
        LineCategory::Timed | LineCategory::InterGateIn => Some(Direction::Rx),
        LineCategory::DigipeatTx => Some(Direction::Tx),
        LineCategory::GateToTx => Some(Direction::Relay(GATE_TO_TX_LABEL.to_string())),
        LineCategory::RfToGate | LineCategory::Unclassified => None,
    }
}

/// Run one raw log line through the pipeline.
///
/// `None` for lines without a packet and for packets that fail to decode;
/// a failed decode never produces partial output.
pub fn summarize_line(line: &str, reference: Option<GeoFix>) -> Option<RenderedSummary> {
    let ClassifiedLine { category, payload } = classifier::classify(line);
    let Some(payload) = payload else {
        trace!("Ignoring {} line", category.as_str());
        return None;
    };
    let direction = direction_for(category)?;

    match packet::decode(&payload) {
        Ok(packet) => {
            metrics::counter!("dwm.pipeline.packets_decoded_total", "category" => category.as_str())
                .increment(1);
            Some(format_packet(&packet, &direction, reference))
        }
        Err(e) => {
            let reason = match e {
                DecodeError::Malformed { .. } => "malformed",
                DecodeError::UnknownFormat { .. } => "unknown_format",
            };
            metrics::counter!("dwm.pipeline.packets_undecodable_total", "reason" => reason)
                .increment(1);
            debug!("Dropping undecodable packet {:?}: {}", payload, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_for_categories() {
        assert_eq!(direction_for(LineCategory::Timed), Some(Direction::Rx));
        assert_eq!(direction_for(LineCategory::InterGateIn), Some(Direction::Rx));
        assert_eq!(direction_for(LineCategory::DigipeatTx), Some(Direction::Tx));
        assert_eq!(
            direction_for(LineCategory::GateToTx),
            Some(Direction::Relay("[ig>tx]".into()))
        );
        assert_eq!(direction_for(LineCategory::RfToGate), None);
    }

    #[test]
    fn test_gate_to_tx_line_renders_relay_marker() {
        let summary = summarize_line("[ig>tx] N0CALL>APRS:>hello\n", None).unwrap();
        assert!(summary.plain_text().starts_with("[ig>tx]↓ StatusPacket"));
    }

    #[test]
    fn test_noise_is_dropped() {
        assert!(summarize_line("Dire Wolf version 1.7\n", None).is_none());
        assert!(summarize_line("[rx>ig] N0CALL>APRS:>hi\n", None).is_none());
    }

    #[test]
    fn test_undecodable_payload_is_dropped() {
        assert!(summarize_line("[0L] not a packet at all", None).is_none());
        assert!(summarize_line("[1.0] N0CALL>APRS:#weird", None).is_none());
    }
}
