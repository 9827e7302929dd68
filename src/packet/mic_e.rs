//! Mic-E position reports.
//!
//! Latitude, the message bits and the longitude flags ride in the six
//! character AX.25 destination; longitude, speed/course and the symbol sit in
//! the first nine bytes of the information field.

const STANDARD_MESSAGES: [&str; 7] = [
    "Off Duty",
    "En Route",
    "In Service",
    "Returning",
    "Committed",
    "Special",
    "Priority",
];

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MicE<'a> {
    pub latitude: f64,
    pub longitude: f64,
    pub symbol_table: char,
    pub symbol: char,
    pub status: String,
    pub comment: &'a str,
}

/// Decode a Mic-E report from its destination call and information field
pub(crate) fn parse<'a>(destination: &str, info: &'a str) -> Result<MicE<'a>, &'static str> {
    let destination = destination.split('-').next().unwrap_or(destination);
    let dest = destination.as_bytes();
    if dest.len() != 6 {
        return Err("destination is not six characters");
    }

    let mut digits = [0u32; 6];
    for (digit, &c) in digits.iter_mut().zip(dest) {
        *digit = u32::from(match c {
            b'0'..=b'9' => c - b'0',
            b'A'..=b'J' => c - b'A',
            b'P'..=b'Y' => c - b'P',
            b'K' | b'L' | b'Z' => 0,
            _ => return Err("invalid destination character"),
        });
    }

    let degrees = f64::from(digits[0] * 10 + digits[1]);
    let minutes =
        f64::from(digits[2] * 10 + digits[3]) + f64::from(digits[4] * 10 + digits[5]) / 100.0;
    let mut latitude = degrees + minutes / 60.0;
    if minutes >= 60.0 || latitude > 90.0 {
        return Err("latitude out of range");
    }
    // 0-9 and L mean south, P-Z north
    if dest[3] < b'P' {
        latitude = -latitude;
    }
    let longitude_offset = if dest[4] >= b'P' { 100 } else { 0 };
    let west = dest[5] >= b'P';

    let bytes = info.as_bytes();
    if bytes.len() < 9 || !bytes[..9].is_ascii() {
        return Err("information field too short");
    }

    let mut lon_degrees = i32::from(bytes[1]) - 28 + longitude_offset;
    match lon_degrees {
        180..=189 => lon_degrees -= 80,
        190..=199 => lon_degrees -= 190,
        _ => {}
    }
    let mut lon_minutes = i32::from(bytes[2]) - 28;
    if lon_minutes >= 60 {
        lon_minutes -= 60;
    }
    let hundredths = i32::from(bytes[3]) - 28;
    if !(0..=179).contains(&lon_degrees)
        || !(0..60).contains(&lon_minutes)
        || !(0..100).contains(&hundredths)
    {
        return Err("longitude out of range");
    }
    let mut longitude =
        f64::from(lon_degrees) + (f64::from(lon_minutes) + f64::from(hundredths) / 100.0) / 60.0;
    if west {
        longitude = -longitude;
    }

    Ok(MicE {
        latitude,
        longitude,
        symbol: bytes[7] as char,
        symbol_table: bytes[8] as char,
        status: status(dest),
        comment: clean_comment(&info[9..]),
    })
}

/// Message bits A, B, C from the first three destination characters
fn status(dest: &[u8]) -> String {
    let (mut bits, mut standard, mut custom) = (0usize, false, false);
    for &c in &dest[..3] {
        bits <<= 1;
        match c {
            b'P'..=b'Z' => {
                bits |= 1;
                standard = true;
            }
            b'A'..=b'K' => {
                bits |= 1;
                custom = true;
            }
            _ => {}
        }
    }

    match (bits, standard, custom) {
        (0, _, _) => "Emergency".to_string(),
        (_, true, true) => "Unknown".to_string(),
        (_, false, true) => format!("Custom-{}", 7 - bits),
        _ => STANDARD_MESSAGES[7 - bits].to_string(),
    }
}

/// Drop the radio type byte, the altitude and the Kenwood trailer
fn clean_comment(text: &str) -> &str {
    let (text, kenwood) = match text.strip_prefix([']', '>']) {
        Some(rest) => (rest, true),
        None => (text.strip_prefix(['`', '\'']).unwrap_or(text), false),
    };
    // Altitude: three base-91 digits and a closing brace
    let text = match text.as_bytes().get(3) {
        Some(b'}') => &text[4..],
        _ => text,
    };
    let text = if kenwood {
        text.strip_suffix(['=', '^']).unwrap_or(text)
    } else {
        text
    };
    text.trim()
}
