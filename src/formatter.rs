//! Compose a [`RenderedSummary`] for one decoded packet.
//!
//! Layout: `<marker> <Kind> [glyph] FROM→PATH→TO : payload : <Cardinal> @ <d> miles`.
//! Third-party packets show the relayed packet's endpoints in parentheses and
//! take their text and position from it.

use crossterm::style::Color;
use tracing::error;

use crate::geo::{self, GeoFix};
use crate::packet::{Packet, PacketKind};
use crate::summary::{Direction, RenderedSummary, Style};

const RX_COLOR: Color = Color::Rgb {
    r: 0x1A,
    g: 0xA7,
    b: 0x30,
};
const FROM_COLOR: Color = Color::Rgb {
    r: 0xC7,
    g: 0x00,
    b: 0x39,
};
const TO_COLOR: Color = Color::Rgb {
    r: 0xD0,
    g: 0x33,
    b: 0xFF,
};
const CARDINAL_COLOR: Color = Color::Rgb {
    r: 0xFF,
    g: 0xA9,
    b: 0x00,
};
const DISTANCE_COLOR: Color = Color::Rgb {
    r: 0xFF,
    g: 0x57,
    b: 0x33,
};
const KIND_STYLE: Style = Style::fg(Color::DarkCyan);
const PAYLOAD_STYLE: Style = Style::fg(Color::Yellow);
const AT_STYLE: Style = Style::fg(Color::DarkGreen);

const ARROW: &str = "\u{2192}";

fn marker_style(direction: &Direction) -> Style {
    match direction {
        Direction::Tx => Style::fg(Color::DarkRed).bold(),
        Direction::Rx => Style::fg(RX_COLOR),
        Direction::Relay(_) => Style::fg(Color::DarkGreen),
    }
}

fn arrow_style(direction: &Direction) -> Style {
    match direction {
        Direction::Tx => Style::fg(Color::DarkRed),
        Direction::Rx => Style::fg(RX_COLOR),
        Direction::Relay(_) => Style::fg(Color::DarkGreen),
    }
}

/// Render `packet`. Geo annotation is added only when `reference` is given and
/// the packet (or its relayed subpacket) carries coordinates.
pub fn format_packet(
    packet: &Packet,
    direction: &Direction,
    reference: Option<GeoFix>,
) -> RenderedSummary {
    let mut summary = RenderedSummary::new();
    let arrow = arrow_style(direction);

    summary.push_text(direction.marker(), marker_style(direction));
    summary.push_plain(" ");
    summary.push_text(packet.kind.display_name(), KIND_STYLE);

    match (packet.symbol, packet.symbol_table) {
        (Some(symbol), Some(table)) => {
            summary.push_plain(" ");
            summary.push_glyph(symbol, table);
            summary.push_plain(" ");
        }
        _ => summary.push_plain(" "),
    }

    push_endpoints(&mut summary, packet, arrow);

    match (&packet.kind, &packet.subpacket) {
        (PacketKind::ThirdParty, Some(subpacket)) => {
            summary.push_plain(" (");
            push_endpoints(&mut summary, subpacket, arrow);
            summary.push_plain(") :");
            if let Some(info) = &subpacket.human_info {
                summary.push_plain(" ");
                summary.push_text(sanitize(info), PAYLOAD_STYLE);
            }
            push_geo(&mut summary, subpacket, reference);
        }
        (kind, _) if kind.is_acknowledgement() => {}
        _ => {
            summary.push_plain(" : ");
            if let Some(info) = &packet.human_info {
                summary.push_text(sanitize(info), PAYLOAD_STYLE);
            }
            push_geo(&mut summary, packet, reference);
        }
    }

    summary
}

/// `FROM→hop→hop→TO`
fn push_endpoints(summary: &mut RenderedSummary, packet: &Packet, arrow: Style) {
    summary.push_text(packet.from_call.as_str(), Style::fg(FROM_COLOR));
    summary.push_text(ARROW, arrow);
    for hop in &packet.path {
        summary.push_plain(hop.as_str());
        summary.push_text(ARROW, arrow);
    }
    summary.push_text(packet.to_call.as_str(), Style::fg(TO_COLOR));
}

fn push_geo(summary: &mut RenderedSummary, packet: &Packet, reference: Option<GeoFix>) {
    let (Some(reference), Some(fix)) = (reference, packet.fix()) else {
        return;
    };

    let bearing = geo::bearing(reference, fix).unwrap_or_else(|e| {
        error!("Failed to calculate bearing to {}: {}", packet.from_call, e);
        metrics::counter!("dwm.format.bearing_errors_total").increment(1);
        0.0
    });
    let distance = geo::distance_miles(reference, fix);

    summary.push_plain(" : ");
    summary.push_text(geo::degrees_to_cardinal(bearing), Style::fg(CARDINAL_COLOR));
    summary.push_plain(" ");
    summary.push_text("@", AT_STYLE);
    summary.push_plain(" ");
    summary.push_text(format!("{:.2}", distance), Style::fg(DISTANCE_COLOR));
    summary.push_plain(" miles");
}

/// Make packet text safe for a single terminal line
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .replace('<', "\\<")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::decode;
    use crate::summary::Segment;

    fn near_reference() -> Option<GeoFix> {
        Some(GeoFix::new(49.0, -72.0))
    }

    #[test]
    fn test_position_layout() {
        let packet = decode("KD0ABC>APRS,WIDE1-1:!4903.50N/07201.75W-Test").unwrap();
        let summary = format_packet(&packet, &Direction::Rx, None);
        assert_eq!(
            summary.plain_text(),
            "RX↓ PositionPacket /- KD0ABC→WIDE1-1→APRS : Test"
        );
        assert!(
            summary
                .segments()
                .iter()
                .any(|s| matches!(s, Segment::Glyph { symbol: '-', table: '/' }))
        );
    }

    #[test]
    fn test_geo_annotation() {
        let packet = decode("KD0ABC>APRS,WIDE1-1:!4903.50N/07201.75W-Test").unwrap();
        let text = format_packet(&packet, &Direction::Rx, near_reference()).plain_text();
        // About 4 miles north-northwest of the reference
        assert!(text.ends_with(" miles"), "{}", text);
        assert!(text.contains(" : North-Northwest @ 4."), "{}", text);
    }

    #[test]
    fn test_reference_at_packet_position_uses_zero_bearing() {
        let packet = decode("KD0ABC>APRS:!4903.50N/07201.75W-").unwrap();
        let reference = packet.fix();
        let text = format_packet(&packet, &Direction::Rx, reference).plain_text();
        assert!(text.ends_with(" : North @ 0.00 miles"), "{}", text);
    }

    #[test]
    fn test_no_coordinates_no_geo() {
        let packet = decode("W1AW>APRS::N0CALL   :see you at 8{3").unwrap();
        let text = format_packet(&packet, &Direction::Rx, near_reference()).plain_text();
        assert_eq!(text, "RX↓ MessagePacket W1AW→N0CALL : see you at 8");
    }

    #[test]
    fn test_tx_marker_is_bold_red() {
        let packet = decode("N0CALL>APRS:>on the air").unwrap();
        let summary = format_packet(&packet, &Direction::Tx, None);
        assert!(summary.plain_text().starts_with("TX↑ StatusPacket"));
        assert_eq!(
            summary.segments()[0],
            Segment::Text {
                text: "TX↑".into(),
                style: Style::fg(Color::DarkRed).bold(),
            }
        );
    }

    #[test]
    fn test_relay_marker_uses_label() {
        let packet = decode("N0CALL>APRS:>hi").unwrap();
        let text = format_packet(&packet, &Direction::Relay("[ig>tx]".into()), None).plain_text();
        assert!(text.starts_with("[ig>tx]↓ StatusPacket"), "{}", text);
    }

    #[test]
    fn test_ack_omits_payload() {
        let packet = decode("N0CALL>APRS::W1AW     :ack42").unwrap();
        let text = format_packet(&packet, &Direction::Rx, near_reference()).plain_text();
        assert_eq!(text, "RX↓ AckPacket N0CALL→W1AW");
    }

    #[test]
    fn test_third_party_uses_subpacket() {
        let packet = decode(
            "N0CALL-10>APDW16,WIDE2-1:}KD0ABC>APRS,TCPIP,N0CALL-10:!4903.50N/07201.75W-inner",
        )
        .unwrap();
        let text = format_packet(&packet, &Direction::Rx, near_reference()).plain_text();
        assert!(
            text.starts_with(
                "RX↓ ThirdPartyPacket N0CALL-10→WIDE2-1→APDW16 (KD0ABC→TCPIP→N0CALL-10→APRS) : inner : "
            ),
            "{}",
            text
        );
        assert!(text.ends_with(" miles"), "{}", text);
    }

    #[test]
    fn test_payload_is_sanitized() {
        assert_eq!(sanitize("a<b\rc\x1fd"), "a\\<b c d");
    }
}
