/// Normalize keyword text into its identity form: lower-case, trimmed, and
/// with every run of whitespace collapsed to a single space.
///
/// Applying it twice yields the same string as applying it once.
#[must_use]
pub fn normalize_keyword(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Number of whitespace-separated words in `text`.
#[must_use]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_and_lowercases() {
        assert_eq!(
            normalize_keyword("  Minecraft\t  BUILDING\nTips "),
            "minecraft building tips"
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        let inputs = [
            "  Minecraft   Building ",
            "ÉCOLE  Française",
            "",
            "   ",
            "already normal",
            "Mixed\u{00A0}Space",
        ];
        for input in inputs {
            let once = normalize_keyword(input);
            assert_eq!(normalize_keyword(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn blank_input_normalizes_to_empty() {
        assert_eq!(normalize_keyword(" \t\n"), "");
    }

    #[test]
    fn counts_words() {
        assert_eq!(word_count("minecraft house build tutorial"), 4);
        assert_eq!(word_count(""), 0);
    }
}
