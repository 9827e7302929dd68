use direwolf_monitor::classifier::{LineCategory, classify};
use direwolf_monitor::geo::GeoFix;
use direwolf_monitor::pipeline::summarize_line;
use direwolf_monitor::summary::{RenderedSummary, Segment};

/// Reference a few miles south-east of the station in the sample packet
fn reference() -> Option<GeoFix> {
    Some(GeoFix::new(49.0, -72.0))
}

/// A received, timestamped position report renders with callsigns, path,
/// comment text and a distance in miles
#[test]
fn test_timed_position_end_to_end() {
    let line = "[1234.5] KD0ABC>APRS,WIDE1-1:!4903.50N/07201.75W-Test\n";
    assert_eq!(classify(line).category, LineCategory::Timed);

    let summary = summarize_line(line, reference()).expect("packet should render");
    let text = summary.plain_text();

    assert!(text.starts_with("RX↓"), "{}", text);
    assert!(text.contains("KD0ABC"), "{}", text);
    assert!(text.contains("WIDE1-1"), "{}", text);
    assert!(text.contains("Test"), "{}", text);

    let miles = miles(&text);
    assert!(miles >= 0.0);
    assert!(miles < 10.0, "{}", miles);
}

/// A digipeated line gets the transmit marker, a timed line the receive one
#[test]
fn test_digipeat_uses_transmit_marker() {
    let tx = summarize_line(
        "[0L] N0CALL>APDW16,WIDE2-1:!4903.50N/07201.75W#PHG2360 digi\n",
        None,
    )
    .expect("digipeated packet should render");
    let rx = summarize_line("[7.25] N0CALL>APDW16:!4903.50N/07201.75W#PHG2360 digi\n", None)
        .expect("timed packet should render");

    assert!(tx.plain_text().starts_with("TX↑ PositionPacket"));
    assert!(rx.plain_text().starts_with("RX↓ PositionPacket"));
    assert_ne!(tx.segments()[0], rx.segments()[0]);
}

#[test]
fn test_symbol_becomes_glyph_segment() {
    let summary = summarize_line("[ig] W1AW>APRS,TCPIP:=4903.50N\\07201.75Wkbase\n", None)
        .expect("igate packet should render");
    assert!(
        summary
            .segments()
            .iter()
            .any(|s| matches!(s, Segment::Glyph { symbol: 'k', table: '\\' }))
    );
}

fn has_glyph(summary: &RenderedSummary, symbol: char, table: char) -> bool {
    summary
        .segments()
        .iter()
        .any(|s| *s == Segment::Glyph { symbol, table })
}

/// Last number before " miles"
fn miles(text: &str) -> f64 {
    text.trim_end_matches(" miles")
        .rsplit(' ')
        .next()
        .and_then(|d| d.parse().ok())
        .expect("distance should be the last number")
}

#[test]
fn test_compressed_position_gets_glyph_and_distance() {
    let summary = summarize_line("[0.3] N0CALL>APRS,WIDE1-1:!/5L!!<*e7>7P[ comp\n", reference())
        .expect("compressed position should render");
    let text = summary.plain_text();

    assert!(text.starts_with("RX↓ PositionPacket /> N0CALL"), "{}", text);
    assert!(text.contains(" : comp : Northwest @ "), "{}", text);
    assert!(has_glyph(&summary, '>', '/'));
    let miles = miles(&text);
    assert!(miles > 40.0 && miles < 50.0, "{}", miles);
}

#[test]
fn test_mic_e_renders_with_position() {
    let summary = summarize_line(
        "[0.3] N0CALL-9>T2TP0W,WIDE1-1:`c]Pl!x>/]\"4X}Heading home=\n",
        reference(),
    )
    .expect("Mic-E report should render");
    let text = summary.plain_text();

    assert!(
        text.starts_with("RX↓ MicEPacket /> N0CALL-9→WIDE1-1→T2TP0W : In Service: Heading home : "),
        "{}",
        text
    );
    assert!(has_glyph(&summary, '>', '/'));
    assert!(text.ends_with(" miles"), "{}", text);
}

#[test]
fn test_object_renders_with_position() {
    let summary = summarize_line(
        "[ig] N0CALL>APRS:;LEADER   *092345z4903.50N/07201.75W>088/036\n",
        reference(),
    )
    .expect("object should render");
    let text = summary.plain_text();
    assert!(text.starts_with("RX↓ ObjectPacket /> N0CALL→APRS : LEADER 088/036 : "), "{}", text);
    assert!(miles(&text) < 10.0, "{}", text);
}

#[test]
fn test_heartbeat_never_renders() {
    assert!(!classify("[rx>ig] #").is_forwarded());
    assert!(summarize_line("[rx>ig] #\n", reference()).is_none());
}

#[test]
fn test_undecodable_payload_renders_nothing() {
    for line in [
        "[1.5] this is not a packet\n",
        "[0L] N0CALL>APRS:\n",
        "[ig>tx] N0CALL>APRS:}no inner packet\n",
    ] {
        assert!(summarize_line(line, reference()).is_none(), "{}", line);
    }
}

#[test]
fn test_packets_without_coordinates_skip_geo() {
    let summary = summarize_line("[ig] W1AW>APRS::N0CALL   :hello<there{12\n", reference())
        .expect("message should render");
    let text = summary.plain_text();
    assert!(text.contains("hello\\<there"), "{}", text);
    assert!(!text.contains("miles"), "{}", text);
}
