//! Position blocks shared by position reports, objects and items.

/// `DDMM.mmN` + table + `DDDMM.mmW` + symbol code
const UNCOMPRESSED_LEN: usize = 19;
/// table + 4 lat + 4 lon + symbol code + 2 course/speed + type
const COMPRESSED_LEN: usize = 13;

/// Coordinates and symbol of one position block, and the text after it
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PositionBlock<'a> {
    pub latitude: f64,
    pub longitude: f64,
    pub symbol_table: char,
    pub symbol: char,
    pub comment: &'a str,
}

impl<'a> PositionBlock<'a> {
    /// Parse `4903.50N/07201.75W-...` or the compressed `/5L!!<*e7>7P[...` form
    pub(crate) fn parse(text: &'a str) -> Option<Self> {
        if text.starts_with(|c: char| c.is_ascii_digit() || c == ' ') {
            Self::uncompressed(text)
        } else {
            Self::compressed(text)
        }
    }

    fn uncompressed(text: &'a str) -> Option<Self> {
        let block = text.get(..UNCOMPRESSED_LEN).filter(|b| b.is_ascii())?;
        let b = block.as_bytes();

        let latitude = coordinate(&block[0..2], &block[2..7], 90.0)?;
        let latitude = match b[7] {
            b'N' => latitude,
            b'S' => -latitude,
            _ => return None,
        };
        let longitude = coordinate(&block[9..12], &block[12..17], 180.0)?;
        let longitude = match b[17] {
            b'E' => longitude,
            b'W' => -longitude,
            _ => return None,
        };

        Some(Self {
            latitude,
            longitude,
            symbol_table: b[8] as char,
            symbol: b[18] as char,
            comment: &text[UNCOMPRESSED_LEN..],
        })
    }

    fn compressed(text: &'a str) -> Option<Self> {
        let block = text.get(..COMPRESSED_LEN).filter(|b| b.is_ascii())?;
        let b = block.as_bytes();

        let symbol_table = match b[0] {
            b'/' | b'\\' | b'A'..=b'Z' => b[0] as char,
            // Numeric overlays are sent as a-j
            b'a'..=b'j' => (b'0' + (b[0] - b'a')) as char,
            _ => return None,
        };
        let latitude = 90.0 - f64::from(base91(&b[1..5])?) / 380926.0;
        let longitude = -180.0 + f64::from(base91(&b[5..9])?) / 190463.0;
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }

        Some(Self {
            latitude,
            longitude,
            symbol_table,
            symbol: b[9] as char,
            comment: &text[COMPRESSED_LEN..],
        })
    }
}

/// The position block of a `!`, `=`, `/` or `@` report, after the optional timestamp
pub(crate) fn position_report(body: &str) -> Option<PositionBlock<'_>> {
    let rest = match body.chars().next()? {
        '!' | '=' => &body[1..],
        '/' | '@' => body.get(8..)?,
        _ => return None,
    };
    PositionBlock::parse(rest)
}

/// Degrees plus `MM.mm` minutes. Spaces (position ambiguity) count as zero.
fn coordinate(degrees: &str, minutes: &str, limit: f64) -> Option<f64> {
    let degrees: f64 = degrees.replace(' ', "0").parse().ok()?;
    let minutes: f64 = minutes.replace(' ', "0").parse().ok()?;
    let value = degrees + minutes / 60.0;
    (degrees >= 0.0 && (0.0..60.0).contains(&minutes) && value <= limit).then_some(value)
}

fn base91(digits: &[u8]) -> Option<u32> {
    digits.iter().try_fold(0u32, |acc, &c| {
        (b'!'..=b'{')
            .contains(&c)
            .then(|| acc * 91 + u32::from(c - b'!'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uncompressed_block() {
        let block = PositionBlock::parse("4903.50N/07201.75W-Test").unwrap();
        assert!((block.latitude - 49.058333).abs() < 1e-4);
        assert!((block.longitude + 72.029166).abs() < 1e-4);
        assert_eq!(block.symbol_table, '/');
        assert_eq!(block.symbol, '-');
        assert_eq!(block.comment, "Test");
    }

    #[test]
    fn test_ambiguous_minutes_count_as_zero() {
        let block = PositionBlock::parse("4903.  S\\07201.  E#").unwrap();
        assert!((block.latitude + 49.05).abs() < 1e-9);
        assert!((block.longitude - 72.016666).abs() < 1e-4);
        assert_eq!(block.symbol_table, '\\');
    }

    #[test]
    fn test_compressed_block() {
        let block = PositionBlock::parse("/5L!!<*e7>7P[ comp").unwrap();
        assert!((block.latitude - 49.5).abs() < 1e-4);
        assert!((block.longitude + 72.75).abs() < 1e-4);
        assert_eq!(block.symbol_table, '/');
        assert_eq!(block.symbol, '>');
        assert_eq!(block.comment, " comp");
    }

    #[test]
    fn test_compressed_overlay_becomes_digit() {
        let block = PositionBlock::parse("c5L!!<*e7#  !").unwrap();
        assert_eq!(block.symbol_table, '2');
        assert_eq!(block.symbol, '#');
    }

    #[test]
    fn test_rejects_broken_blocks() {
        assert!(PositionBlock::parse("4903.50X/07201.75W-").is_none());
        assert!(PositionBlock::parse("9903.50N/07201.75W-").is_none());
        assert!(PositionBlock::parse("4903.50N/07201").is_none());
        assert!(PositionBlock::parse("/5L!").is_none());
        assert!(PositionBlock::parse("~5L!!<*e7>7P[").is_none());
    }

    #[test]
    fn test_position_report_skips_timestamp() {
        let block = position_report("@092345z4903.50N/07201.75W>088/036 mobile").unwrap();
        assert_eq!(block.symbol, '>');
        assert_eq!(block.comment, "088/036 mobile");

        assert_eq!(position_report("!4903.50N/07201.75W-").unwrap().comment, "");
        assert!(position_report("!49").is_none());
        assert!(position_report(">status").is_none());
    }
}
