//! Positionless weather reports: `_MMDDHHMM` followed by fixed-width fields.

/// Width of the value after each field letter
fn field_width(field: char) -> Option<usize> {
    match field {
        'c' | 's' | 'g' | 't' | 'r' | 'p' | 'P' | 'L' | 'l' => Some(3),
        'h' => Some(2),
        'b' => Some(5),
        _ => None,
    }
}

/// Readable text for the body after `_`, e.g. `Wind 220° 4 mph, 77°F`.
/// Stops at the first field it does not know; missing values (`...`) are skipped.
pub(crate) fn summarize(body: &str) -> Option<String> {
    let data = match body.get(..8) {
        Some(stamp) if stamp.bytes().all(|b| b.is_ascii_digit()) => &body[8..],
        _ => body,
    };

    let mut parts = Vec::new();
    let mut rest = data;
    while let Some(field) = rest.chars().next() {
        let Some(width) = field_width(field) else {
            break;
        };
        let Some(value) = rest.get(1..1 + width) else {
            break;
        };
        rest = &rest[1 + width..];
        let Ok(value) = value.trim().parse::<i32>() else {
            continue;
        };

        parts.push(match field {
            'c' => format!("Wind {}°", value),
            's' => format!("{} mph", value),
            'g' => format!("gusts {} mph", value),
            't' => format!("{}°F", value),
            'r' => format!("rain 1h {:.2} in", f64::from(value) / 100.0),
            'p' => format!("rain 24h {:.2} in", f64::from(value) / 100.0),
            'P' => format!("rain since midnight {:.2} in", f64::from(value) / 100.0),
            'h' => format!("{}% humidity", if value == 0 { 100 } else { value }),
            'b' => format!("{:.1} mbar", f64::from(value) / 10.0),
            'L' => format!("{} W/m²", value),
            _ => format!("{} W/m²", value + 1000),
        });
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}
