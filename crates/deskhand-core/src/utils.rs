//! Small string helpers.

/// Shorten text for display, appending `...` when it was cut.
///
/// `max_chars` counts characters, not bytes, so multi-byte text is never
/// split inside a character.
#[must_use]
pub fn summarize(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = s.chars().take(keep).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarize_short_text_untouched() {
        assert_eq!(summarize("open notepad", 50), "open notepad");
    }

    #[test]
    fn summarize_long_text() {
        let text = "x".repeat(60);
        let out = summarize(&text, 50);
        assert_eq!(out.chars().count(), 50);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn summarize_counts_characters() {
        assert_eq!(summarize("ééééé", 4), "é...");
    }
}
