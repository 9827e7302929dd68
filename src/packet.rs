//! Decode raw APRS packet text into a [`Packet`].
//!
//! The AX.25 header and the common information field types are handled by
//! `ogn-parser`; this module maps its output onto the shapes the formatter
//! needs (packet kind, endpoints, path, coordinates, symbol, readable text)
//! and decodes what the parser leaves as unknown data or rejects: compressed
//! positions, Mic-E, objects, items, weather, telemetry and third-party
//! wrappers.

mod mic_e;
mod position;
mod weather;

use ogn_parser::{AprsData, AprsPacket};
use std::fmt::{Display, Formatter};

use crate::geo::GeoFix;
use position::{PositionBlock, position_report};

/// Third-party traffic: `}` followed by a complete inner packet
const THIRD_PARTY_MARKER: char = '}';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    Position,
    MicE,
    Object,
    Item,
    Weather,
    Telemetry,
    Message,
    Ack,
    Reject,
    Status,
    ThirdParty,
}

impl PacketKind {
    /// Name shown next to the direction marker
    pub fn display_name(&self) -> &'static str {
        match self {
            PacketKind::Position => "PositionPacket",
            PacketKind::MicE => "MicEPacket",
            PacketKind::Object => "ObjectPacket",
            PacketKind::Item => "ItemPacket",
            PacketKind::Weather => "WeatherPacket",
            PacketKind::Telemetry => "TelemetryPacket",
            PacketKind::Message => "MessagePacket",
            PacketKind::Ack => "AckPacket",
            PacketKind::Reject => "RejectPacket",
            PacketKind::Status => "StatusPacket",
            PacketKind::ThirdParty => "ThirdPartyPacket",
        }
    }

    /// Acks and rejects have no text worth showing
    pub fn is_acknowledgement(&self) -> bool {
        matches!(self, PacketKind::Ack | PacketKind::Reject)
    }
}

/// A decoded APRS packet
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub kind: PacketKind,
    pub from_call: String,
    /// Message addressee for message kinds, otherwise the AX.25 destination
    pub to_call: String,
    pub path: Vec<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub symbol: Option<char>,
    pub symbol_table: Option<char>,
    pub human_info: Option<String>,
    /// Inner packet of a third-party wrapper
    pub subpacket: Option<Box<Packet>>,
}

impl Packet {
    /// Coordinates when the packet carries both latitude and longitude
    pub fn fix(&self) -> Option<GeoFix> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoFix::new(latitude, longitude)),
            _ => None,
        }
    }

    fn empty(kind: PacketKind, header: &Header) -> Self {
        Self {
            kind,
            from_call: header.from.clone(),
            to_call: header.to.clone(),
            path: header.via.clone(),
            latitude: None,
            longitude: None,
            symbol: None,
            symbol_table: None,
            human_info: None,
            subpacket: None,
        }
    }

    fn located(kind: PacketKind, header: &Header, block: &PositionBlock<'_>) -> Self {
        let mut packet = Self::empty(kind, header);
        packet.latitude = Some(block.latitude);
        packet.longitude = Some(block.longitude);
        packet.symbol = Some(block.symbol);
        packet.symbol_table = Some(block.symbol_table);
        packet.human_info = non_empty(block.comment);
        packet
    }
}

/// Source, destination and digipeater path
struct Header {
    from: String,
    to: String,
    via: Vec<String>,
}

impl Header {
    fn from_parsed(parsed: &AprsPacket) -> Self {
        Self {
            from: parsed.from.to_string(),
            to: parsed.to.to_string(),
            via: parsed.via.iter().map(ToString::to_string).collect(),
        }
    }

    /// `FROM>TO,VIA,VIA:` split by hand, for bodies the parser refuses
    fn from_raw(raw: &str) -> Option<Self> {
        let (header, _) = raw.split_once(':')?;
        let (from, rest) = header.split_once('>')?;
        let mut calls = rest.split(',');
        let to = calls.next()?;
        if from.is_empty() || to.is_empty() {
            return None;
        }
        Some(Self {
            from: from.to_string(),
            to: to.to_string(),
            via: calls.map(str::to_string).collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The text breaks the packet grammar
    Malformed { reason: String },
    /// Well-formed header, but an information field type we do not handle
    UnknownFormat { data_type: Option<char> },
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Malformed { reason } => write!(f, "malformed packet: {}", reason),
            DecodeError::UnknownFormat {
                data_type: Some(data_type),
            } => write!(f, "unknown packet format '{}'", data_type),
            DecodeError::UnknownFormat { data_type: None } => {
                write!(f, "unknown packet format (empty information field)")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Decode one raw packet, e.g. `N0CALL>APRS,WIDE1-1:!4903.50N/07201.75W-Test`
pub fn decode(raw: &str) -> Result<Packet, DecodeError> {
    let raw = raw.trim_end_matches(['\r', '\n']);
    let body = information_field(raw);

    let parsed: AprsPacket = match raw.parse() {
        Ok(parsed) => parsed,
        Err(e) => {
            // Compressed positions among others; keep the parser's reason when ours fails too
            let malformed = DecodeError::Malformed {
                reason: e.to_string(),
            };
            let header = Header::from_raw(raw).ok_or_else(|| malformed.clone())?;
            return decode_body(&header, body).map_err(|_| malformed);
        }
    };
    let header = Header::from_parsed(&parsed);

    match &parsed.data {
        AprsData::Position(position) => {
            let mut packet = Packet::empty(PacketKind::Position, &header);
            packet.latitude = Some(*position.latitude);
            packet.longitude = Some(*position.longitude);
            packet.symbol = Some(position.symbol_code);
            packet.symbol_table = Some(position.symbol_table);
            packet.human_info = position_report(body).and_then(|block| non_empty(block.comment));
            Ok(packet)
        }
        AprsData::Message(message) => {
            let text = message.text.trim_end();
            let kind = if is_reply(text, "ack") {
                PacketKind::Ack
            } else if is_reply(text, "rej") {
                PacketKind::Reject
            } else {
                PacketKind::Message
            };

            let mut packet = Packet::empty(kind, &header);
            packet.to_call = message.addressee.trim().to_string();
            packet.human_info = non_empty(text);
            Ok(packet)
        }
        AprsData::Status(_) => {
            let mut packet = Packet::empty(PacketKind::Status, &header);
            packet.human_info = body
                .strip_prefix('>')
                .map(strip_status_timestamp)
                .and_then(non_empty);
            Ok(packet)
        }
        _ => decode_body(&header, body),
    }
}

/// Information field types decoded here rather than by `ogn-parser`
fn decode_body(header: &Header, body: &str) -> Result<Packet, DecodeError> {
    match body.chars().next() {
        Some(THIRD_PARTY_MARKER) => {
            let subpacket = decode(&body[1..])?;
            let mut packet = Packet::empty(PacketKind::ThirdParty, header);
            packet.human_info = subpacket.human_info.clone();
            packet.subpacket = Some(Box::new(subpacket));
            Ok(packet)
        }
        Some('!' | '=' | '/' | '@') => position_report(body)
            .map(|block| Packet::located(PacketKind::Position, header, &block))
            .ok_or_else(|| malformed("position", body)),
        Some('`' | '\'') => {
            let report = mic_e::parse(&header.to, body).map_err(|reason| {
                DecodeError::Malformed {
                    reason: format!("Mic-E {}: {}", reason, body),
                }
            })?;
            let mut packet = Packet::empty(PacketKind::MicE, header);
            packet.latitude = Some(report.latitude);
            packet.longitude = Some(report.longitude);
            packet.symbol = Some(report.symbol);
            packet.symbol_table = Some(report.symbol_table);
            packet.human_info = Some(match non_empty(report.comment) {
                Some(comment) => format!("{}: {}", report.status, comment),
                None => report.status,
            });
            Ok(packet)
        }
        Some(';') => decode_object(header, &body[1..]).ok_or_else(|| malformed("object", body)),
        Some(')') => decode_item(header, &body[1..]).ok_or_else(|| malformed("item", body)),
        Some('_') => {
            let mut packet = Packet::empty(PacketKind::Weather, header);
            packet.human_info = weather::summarize(&body[1..]);
            Ok(packet)
        }
        Some('T') if body.starts_with("T#") => {
            let mut packet = Packet::empty(PacketKind::Telemetry, header);
            packet.human_info = telemetry_summary(&body[2..]);
            Ok(packet)
        }
        data_type => Err(DecodeError::UnknownFormat { data_type }),
    }
}

fn malformed(what: &str, body: &str) -> DecodeError {
    DecodeError::Malformed {
        reason: format!("Invalid {}: {}", what, body),
    }
}

/// `NAME_____*DDHHMMz` + position: nine character name, `*` live or `_` killed
fn decode_object(header: &Header, rest: &str) -> Option<Packet> {
    let name = rest.get(..9)?;
    let killed = match rest.get(9..10)? {
        "*" => false,
        "_" => true,
        _ => return None,
    };
    let block = PositionBlock::parse(rest.get(17..)?)?;
    Some(named(PacketKind::Object, header, name, killed, &block))
}

/// `NAME!` + position: three to nine character name, `!` live or `_` killed
fn decode_item(header: &Header, rest: &str) -> Option<Packet> {
    let end = rest.find(['!', '_']).filter(|end| (3..=9).contains(end))?;
    let killed = rest[end..].starts_with('_');
    let block = PositionBlock::parse(&rest[end + 1..])?;
    Some(named(PacketKind::Item, header, &rest[..end], killed, &block))
}

fn named(
    kind: PacketKind,
    header: &Header,
    name: &str,
    killed: bool,
    block: &PositionBlock<'_>,
) -> Packet {
    let mut packet = Packet::located(kind, header, block);
    let mut info = name.trim().to_string();
    if killed {
        info.push_str(" (killed)");
    }
    if let Some(comment) = &packet.human_info {
        info.push(' ');
        info.push_str(comment);
    }
    packet.human_info = Some(info);
    packet
}

/// `T#seq,a1,a2,a3,a4,a5,bbbbbbbb`
fn telemetry_summary(rest: &str) -> Option<String> {
    let mut fields = rest.split(',').map(str::trim);
    let sequence = fields.next().filter(|s| !s.is_empty())?;
    let values: Vec<&str> = fields.by_ref().take(5).collect();
    let mut summary = format!("#{} {}", sequence, values.join(" "));
    if let Some(bits) = fields.next().filter(|b| !b.is_empty()) {
        summary.push_str(" bits ");
        summary.push_str(bits);
    }
    Some(summary.trim_end().to_string())
}

/// Everything after the first `:` of the header
fn information_field(raw: &str) -> &str {
    raw.split_once(':').map(|(_, body)| body).unwrap_or("")
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// `ack12` / `rej12` replies; message numbers are at most five characters,
/// optionally followed by a `}` reply-ack suffix
fn is_reply(text: &str, prefix: &str) -> bool {
    let Some(rest) = text.strip_prefix(prefix) else {
        return false;
    };
    let number = rest.split_once('}').map(|(number, _)| number).unwrap_or(rest);
    number.len() <= 5 && number.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Status reports may start with a `DDHHMMz` timestamp
fn strip_status_timestamp(text: &str) -> &str {
    let bytes = text.as_bytes();
    if bytes.len() >= 7
        && bytes[..6].iter().all(u8::is_ascii_digit)
        && matches!(bytes[6], b'z' | b'/' | b'h')
    {
        &text[7..]
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_position() {
        let packet = decode("KD0ABC>APRS,WIDE1-1:!4903.50N/07201.75W-Test").unwrap();
        assert_eq!(packet.kind, PacketKind::Position);
        assert_eq!(packet.from_call, "KD0ABC");
        assert_eq!(packet.to_call, "APRS");
        assert_eq!(packet.path, vec!["WIDE1-1".to_string()]);
        assert!((packet.latitude.unwrap() - 49.058333).abs() < 1e-4);
        assert!((packet.longitude.unwrap() + 72.029166).abs() < 1e-4);
        assert_eq!(packet.symbol, Some('-'));
        assert_eq!(packet.symbol_table, Some('/'));
        assert_eq!(packet.human_info.as_deref(), Some("Test"));
        assert!(packet.fix().is_some());
    }

    #[test]
    fn test_decode_message() {
        let packet = decode("W1AW>APRS,TCPIP*::N0CALL-7 :Hello there{42").unwrap();
        assert_eq!(packet.kind, PacketKind::Message);
        assert_eq!(packet.to_call, "N0CALL-7");
        assert_eq!(packet.human_info.as_deref(), Some("Hello there"));
        assert!(packet.fix().is_none());
    }

    #[test]
    fn test_decode_ack_and_reject() {
        let ack = decode("N0CALL>APRS::W1AW     :ack42").unwrap();
        assert_eq!(ack.kind, PacketKind::Ack);
        assert!(ack.kind.is_acknowledgement());

        let rej = decode("N0CALL>APRS::W1AW     :rej42").unwrap();
        assert_eq!(rej.kind, PacketKind::Reject);
    }

    #[test]
    fn test_decode_status() {
        let packet = decode("N0CALL>APRS:>312359zNet tonight at 8").unwrap();
        assert_eq!(packet.kind, PacketKind::Status);
        assert_eq!(packet.human_info.as_deref(), Some("Net tonight at 8"));
    }

    #[test]
    fn test_decode_third_party() {
        let packet =
            decode("N0CALL-10>APDW16,WIDE2-1:}W1AW>APRS,TCPIP,N0CALL-10*::N0CALL   :hi{7")
                .unwrap();
        assert_eq!(packet.kind, PacketKind::ThirdParty);
        let sub = packet.subpacket.as_ref().unwrap();
        assert_eq!(sub.kind, PacketKind::Message);
        assert_eq!(sub.from_call, "W1AW");
        assert_eq!(sub.to_call, "N0CALL");
        assert_eq!(sub.path.len(), 3);
        assert_eq!(packet.human_info.as_deref(), Some("hi"));
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(
            decode("this is not a packet"),
            Err(DecodeError::Malformed { .. })
        ));
    }

    #[test]
    fn test_decode_unknown_format() {
        assert!(matches!(
            decode("N0CALL>APRS:#telemetry-ish"),
            Err(DecodeError::UnknownFormat {
                data_type: Some('#')
            })
        ));
    }

    #[test]
    fn test_third_party_with_bad_inner_packet_fails() {
        assert!(decode("N0CALL>APRS:}garbage").is_err());
    }

    #[test]
    fn test_decode_compressed_position() {
        let packet = decode("N0CALL>APRS:!/5L!!<*e7>7P[ comp").unwrap();
        assert_eq!(packet.kind, PacketKind::Position);
        assert_eq!(packet.from_call, "N0CALL");
        assert!((packet.latitude.unwrap() - 49.5).abs() < 1e-4);
        assert!((packet.longitude.unwrap() + 72.75).abs() < 1e-4);
        assert_eq!(packet.symbol, Some('>'));
        assert_eq!(packet.symbol_table, Some('/'));
        assert_eq!(packet.human_info.as_deref(), Some("comp"));
    }

    #[test]
    fn test_decode_compressed_position_with_timestamp() {
        let packet = decode("N0CALL>APRS,WIDE2-1:@092345z/5L!!<*e7>7P[").unwrap();
        assert_eq!(packet.kind, PacketKind::Position);
        assert_eq!(packet.path, vec!["WIDE2-1".to_string()]);
        assert!(packet.fix().is_some());
        assert_eq!(packet.human_info, None);
    }

    #[test]
    fn test_decode_mic_e() {
        let packet = decode("N0CALL-9>T2TP0W,WIDE1-1:`c]Pl!x>/]\"4X}=").unwrap();
        assert_eq!(packet.kind, PacketKind::MicE);
        assert_eq!(packet.to_call, "T2TP0W");
        assert!((packet.latitude.unwrap() - 42.667833).abs() < 1e-5);
        assert!((packet.longitude.unwrap() + 71.092).abs() < 1e-5);
        assert_eq!(packet.symbol, Some('>'));
        assert_eq!(packet.symbol_table, Some('/'));
        assert_eq!(packet.human_info.as_deref(), Some("In Service"));
    }

    #[test]
    fn test_decode_mic_e_with_bad_destination() {
        assert!(matches!(
            decode("N0CALL-9>APRS:`c]Pl!x>/"),
            Err(DecodeError::Malformed { .. })
        ));
    }

    #[test]
    fn test_decode_object() {
        let packet = decode("N0CALL>APRS:;LEADER   *092345z4903.50N/07201.75W>088/036").unwrap();
        assert_eq!(packet.kind, PacketKind::Object);
        assert_eq!(packet.symbol, Some('>'));
        assert!(packet.fix().is_some());
        assert_eq!(packet.human_info.as_deref(), Some("LEADER 088/036"));
    }

    #[test]
    fn test_decode_killed_item() {
        let packet = decode("N0CALL>APRS:)AID #2_4903.50N/07201.75WA").unwrap();
        assert_eq!(packet.kind, PacketKind::Item);
        assert_eq!(packet.symbol, Some('A'));
        assert_eq!(packet.human_info.as_deref(), Some("AID #2 (killed)"));
    }

    #[test]
    fn test_decode_broken_object() {
        assert!(matches!(
            decode("N0CALL>APRS:;SHORT*1234"),
            Err(DecodeError::Malformed { .. })
        ));
    }

    #[test]
    fn test_decode_weather() {
        let packet = decode("N0CALL>APRS:_10090556c220s004g005t077").unwrap();
        assert_eq!(packet.kind, PacketKind::Weather);
        assert!(packet.fix().is_none());
        assert_eq!(
            packet.human_info.as_deref(),
            Some("Wind 220°, 4 mph, gusts 5 mph, 77°F")
        );
    }

    #[test]
    fn test_decode_telemetry() {
        let packet = decode("N0CALL>APRS:T#005,199,000,255,073,123,01101001").unwrap();
        assert_eq!(packet.kind, PacketKind::Telemetry);
        assert_eq!(
            packet.human_info.as_deref(),
            Some("#005 199 000 255 073 123 bits 01101001")
        );
    }

    #[test]
    fn test_is_reply() {
        assert!(is_reply("ack1", "ack"));
        assert!(is_reply("ackAB}", "ack"));
        assert!(!is_reply("acknowledged, see you", "ack"));
        assert!(!is_reply("acknowledged", "ack"));
    }
}
