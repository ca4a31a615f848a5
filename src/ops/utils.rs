/// Parses a directive color value into an RGBA array.
///
/// Accepts `transparent`, a 4-component `r,g,b,a` decimal list, or a 3- or
/// 6-digit hex string (with or without a leading `#`). Hex colors are opaque.
/// Malformed values fall back to fully transparent.
pub fn parse_color(value: &str) -> [u8; 4] {
    let value = value.trim();
    if value.eq_ignore_ascii_case("transparent") {
        return [0, 0, 0, 0];
    }

    if value.contains(',') {
        let parts: Vec<_> = value.split(',').map(|p| p.trim().parse::<u8>()).collect();
        if parts.len() == 4 && parts.iter().all(|p| p.is_ok()) {
            let mut rgba = [0u8; 4];
            for (slot, part) in rgba.iter_mut().zip(parts) {
                *slot = part.unwrap_or(0);
            }
            return rgba;
        }
        return [0, 0, 0, 0];
    }

    parse_hex_color(value).unwrap_or([0, 0, 0, 0])
}

fn parse_hex_color(hex: &str) -> Option<[u8; 4]> {
    let hex = hex.trim_start_matches('#');
    match hex.len() {
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some([r, g, b, 255])
        }
        3 => {
            let component = |i: usize| {
                u8::from_str_radix(&hex[i..i + 1], 16)
                    .ok()
                    .map(|nibble| nibble * 16 + nibble)
            };
            Some([component(0)?, component(1)?, component(2)?, 255])
        }
        _ => None,
    }
}

/// Parses a directive boolean ("1" or "true" is true, anything else false).
pub fn parse_boolean(s: &str) -> bool {
    matches!(s, "1" | "true")
}
