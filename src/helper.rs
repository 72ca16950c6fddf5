const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generates a note ID: 64 random bits rendered in base 36.
///
/// Collisions are not checked; not suitable where unpredictability matters.
pub fn generate_note_id() -> String {
    to_base36(rand::random::<u64>())
}

/// Lowercase base-36 rendering of `value`, without padding
pub fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::with_capacity(13);
    while value > 0 {
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();

    // Only ASCII digits were pushed
    String::from_utf8(digits).unwrap_or_default()
}

// Helper method for parsing tags
pub fn parse_tags(tags: Option<String>) -> Vec<String> {
    tags.map(|t| {
        t.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

/// First non-empty line of `content`, cut to `max_chars` characters with a trailing `...`
pub fn content_preview(content: &str, max_chars: usize) -> String {
    let first_line = content
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("");

    if first_line.chars().count() <= max_chars {
        first_line.to_string()
    } else {
        let cut: String = first_line.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
