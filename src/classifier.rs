//! Classify raw direwolf log lines and pull out the embedded APRS payload.
//!
//! Classification is an ordered rule table evaluated top-down; the first rule
//! whose predicate matches decides the category and how the payload is
//! extracted. Only some categories carry a payload worth decoding.

use once_cell::sync::Lazy;
use regex::Regex;

/// `[<float timestamp>] <packet>` lines written when direwolf runs with `-t`
static TIMED_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[\d+(?:\.\d*)?\] (.*)$").unwrap());

/// direwolf writes non-printable bytes of a packet as `<0xNN>`
const CONTROL_ESCAPES: [(&str, &str); 5] = [
    ("<0x0d>", "\r"),
    ("<0x1c>", "\x1c"),
    ("<0x1e>", "\x1e"),
    ("<0x1f>", "\x1f"),
    ("<0x0a>", "\n"),
];

const DIGIPEAT_TX_TAG: &str = "[0L]";
const IGATE_IN_TAG: &str = "[ig]";
const RF_TO_IGATE_TAG: &str = "[rx>ig]";
const IGATE_TO_TX_TAG: &str = "[ig>tx]";
const IGATE_TO_TX_NOTICE: &str = "ig_to_tx";
const RF_TO_IGATE_HEARTBEAT: &str = "[rx>ig] #";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineCategory {
    /// Timestamped packet line (received)
    Timed,
    /// Packet transmitted by direwolf itself
    DigipeatTx,
    /// Packet handed to direwolf by the internet gateway
    InterGateIn,
    /// RF packet forwarded to the internet gateway (informational)
    RfToGate,
    /// Internet gateway packet queued for RF transmission
    GateToTx,
    Unclassified,
}

impl LineCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineCategory::Timed => "timed",
            LineCategory::DigipeatTx => "digipeat_tx",
            LineCategory::InterGateIn => "igate_in",
            LineCategory::RfToGate => "rf_to_gate",
            LineCategory::GateToTx => "gate_to_tx",
            LineCategory::Unclassified => "unclassified",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLine {
    pub category: LineCategory,
    /// Raw APRS packet text to hand to the decoder, when this line carries one
    pub payload: Option<String>,
}

impl ClassifiedLine {
    /// True when the line should flow on to decoding (and publishing)
    pub fn is_forwarded(&self) -> bool {
        self.payload.is_some()
    }
}

/// One entry of the classification table
struct Rule {
    category: LineCategory,
    matches: fn(&str) -> bool,
    extract: fn(&str) -> Option<String>,
}

static RULES: [Rule; 6] = [
    Rule {
        category: LineCategory::Timed,
        matches: |line| TIMED_LINE_RE.is_match(line),
        extract: extract_timed,
    },
    Rule {
        category: LineCategory::DigipeatTx,
        matches: |line| line.contains(DIGIPEAT_TX_TAG),
        extract: |line| strip_tag(line, DIGIPEAT_TX_TAG),
    },
    Rule {
        category: LineCategory::InterGateIn,
        matches: |line| line.contains(IGATE_IN_TAG),
        extract: |line| strip_tag(line, IGATE_IN_TAG),
    },
    Rule {
        category: LineCategory::RfToGate,
        matches: |line| line.contains(RF_TO_IGATE_TAG),
        extract: |_| None,
    },
    Rule {
        category: LineCategory::GateToTx,
        matches: |line| line.contains(IGATE_TO_TX_TAG),
        extract: |line| strip_tag(line, IGATE_TO_TX_TAG),
    },
    Rule {
        category: LineCategory::Unclassified,
        matches: |line| line.contains(IGATE_TO_TX_NOTICE),
        extract: |_| None,
    },
];

/// Classify one raw log line. The line may still carry its terminator.
pub fn classify(line: &str) -> ClassifiedLine {
    let line = line.trim();

    if line == RF_TO_IGATE_HEARTBEAT {
        return ClassifiedLine {
            category: LineCategory::RfToGate,
            payload: None,
        };
    }

    RULES
        .iter()
        .find(|rule| (rule.matches)(line))
        .map(|rule| ClassifiedLine {
            category: rule.category,
            payload: (rule.extract)(line),
        })
        .unwrap_or(ClassifiedLine {
            category: LineCategory::Unclassified,
            payload: None,
        })
}

fn extract_timed(line: &str) -> Option<String> {
    let captures = TIMED_LINE_RE.captures(line)?;
    Some(unescape_control_chars(captures.get(1)?.as_str()))
}

fn strip_tag(line: &str, tag: &str) -> Option<String> {
    Some(line.replace(tag, "").trim().to_string())
}

/// Replace direwolf's `<0xNN>` markers with the bytes they stand for
pub fn unescape_control_chars(text: &str) -> String {
    CONTROL_ESCAPES
        .iter()
        .fold(text.to_string(), |acc, (escape, byte)| {
            acc.replace(escape, byte)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timed_line() {
        let classified = classify("[1234.5] KD0ABC>APRS,WIDE1-1:!4903.50N/07201.75W-Test\n");
        assert_eq!(classified.category, LineCategory::Timed);
        assert_eq!(
            classified.payload.as_deref(),
            Some("KD0ABC>APRS,WIDE1-1:!4903.50N/07201.75W-Test")
        );
    }

    #[test]
    fn test_timed_line_integer_timestamp() {
        let classified = classify("[7] N0CALL>APRS:>status");
        assert_eq!(classified.category, LineCategory::Timed);
        assert_eq!(classified.payload.as_deref(), Some("N0CALL>APRS:>status"));
    }

    #[test]
    fn test_timed_line_control_escapes() {
        let classified = classify("[0.1] A>B:>x<0x0d>y<0x1c>z<0x1e>w<0x1f>v<0x0a>u");
        assert_eq!(
            classified.payload.as_deref(),
            Some("A>B:>x\ry\x1cz\x1ew\x1fv\nu")
        );
    }

    #[test]
    fn test_control_escapes_do_not_collide() {
        // An escape that spells another escape once substituted must stay literal
        assert_eq!(unescape_control_chars("<0x0<0x0a>d>"), "<0x0\nd>");
        assert_eq!(unescape_control_chars("<0x1f><0x1f>"), "\x1f\x1f");
    }

    #[test]
    fn test_digipeat_tx() {
        let classified = classify("[0L] N0CALL>APDW16,WIDE2-1:!4903.50N/07201.75W#PHG2360\n");
        assert_eq!(classified.category, LineCategory::DigipeatTx);
        assert_eq!(
            classified.payload.as_deref(),
            Some("N0CALL>APDW16,WIDE2-1:!4903.50N/07201.75W#PHG2360")
        );
    }

    #[test]
    fn test_igate_in() {
        let classified = classify("[ig] W1AW>APRS,TCPIP*::N0CALL   :hello{1");
        assert_eq!(classified.category, LineCategory::InterGateIn);
        assert_eq!(
            classified.payload.as_deref(),
            Some("W1AW>APRS,TCPIP*::N0CALL   :hello{1")
        );
    }

    #[test]
    fn test_rf_to_gate_is_informational() {
        let classified = classify("[rx>ig] N0CALL>APRS:>hi");
        assert_eq!(classified.category, LineCategory::RfToGate);
        assert!(!classified.is_forwarded());
    }

    #[test]
    fn test_heartbeat_is_ignored() {
        let classified = classify("[rx>ig] #\n");
        assert_eq!(classified.category, LineCategory::RfToGate);
        assert_eq!(classified.payload, None);
        assert!(!classified.is_forwarded());
    }

    #[test]
    fn test_gate_to_tx() {
        let classified = classify("[ig>tx] N0CALL>APRS::W1AW     :ack1");
        assert_eq!(classified.category, LineCategory::GateToTx);
        assert_eq!(
            classified.payload.as_deref(),
            Some("N0CALL>APRS::W1AW     :ack1")
        );
    }

    #[test]
    fn test_ig_to_tx_notice_is_ignored() {
        let classified = classify("ig_to_tx: rate limit exceeded");
        assert_eq!(classified.category, LineCategory::Unclassified);
        assert!(!classified.is_forwarded());
    }

    #[test]
    fn test_noise_is_unclassified() {
        for line in ["", "Dire Wolf version 1.7", "Digipeater WIDE2 (probably N0CALL-1) audio level = 47(22/12)"] {
            let classified = classify(line);
            assert_eq!(classified.category, LineCategory::Unclassified);
            assert!(!classified.is_forwarded());
        }
    }

    #[test]
    fn test_timed_takes_priority_over_tags() {
        let classified = classify("[12.0] [0L] N0CALL>APRS:>hi");
        assert_eq!(classified.category, LineCategory::Timed);
        assert_eq!(classified.payload.as_deref(), Some("[0L] N0CALL>APRS:>hi"));
    }

    #[test]
    fn test_tag_order_first_match_wins() {
        // Carries both tags; the digipeat rule is checked first
        let classified = classify("[0L] [ig] N0CALL>APRS:>hi");
        assert_eq!(classified.category, LineCategory::DigipeatTx);
        assert_eq!(classified.payload.as_deref(), Some("[ig] N0CALL>APRS:>hi"));
    }
}
