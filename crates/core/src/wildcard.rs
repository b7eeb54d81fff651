//! Glob-style matching for object keys
//!
//! `*` matches any run of characters and `?` matches exactly one. Both cross
//! `/`, so `logs/*.gz` also matches `logs/2024/01.gz`.

/// Whether `s` contains a wildcard character
pub fn has_wildcard(s: &str) -> bool {
    s.contains(['*', '?'])
}

/// The literal part of a pattern before its first wildcard
pub fn literal_prefix(pattern: &str) -> &str {
    match pattern.find(['*', '?']) {
        Some(pos) => &pattern[..pos],
        None => pattern,
    }
}

/// Match `text` against `pattern`
pub fn matches(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    // prev[j]: pattern[..i] matches text[..j]
    let mut prev = vec![false; text.len() + 1];
    let mut curr = vec![false; text.len() + 1];
    prev[0] = true;

    for &p in &pattern {
        curr[0] = prev[0] && p == '*';
        for j in 1..=text.len() {
            curr[j] = match p {
                '*' => prev[j] || curr[j - 1],
                '?' => prev[j - 1],
                c => prev[j - 1] && c == text[j - 1],
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[text.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_match() {
        assert!(matches("a.txt", "a.txt"));
        assert!(!matches("a.txt", "a.txt2"));
        assert!(!matches("a.txt", "b.txt"));
    }

    #[test]
    fn test_star() {
        assert!(matches("*.txt", "a.txt"));
        assert!(matches("*.txt", ".txt"));
        assert!(matches("a*", "a"));
        assert!(matches("*", ""));
        assert!(matches("**", "abc"));
        assert!(!matches("*.txt", "a.txt.bak"));
    }

    #[test]
    fn test_star_crosses_separator() {
        assert!(matches("logs/*.gz", "logs/2024/01.gz"));
        assert!(matches("*/b", "a/x/b"));
    }

    #[test]
    fn test_question_mark() {
        assert!(matches("file?.log", "file1.log"));
        assert!(!matches("file?.log", "file.log"));
        assert!(!matches("file?.log", "file12.log"));
        assert!(matches("?", "é"));
    }

    #[test]
    fn test_empty_pattern() {
        assert!(matches("", ""));
        assert!(!matches("", "a"));
    }

    #[test]
    fn test_has_wildcard() {
        assert!(has_wildcard("a*"));
        assert!(has_wildcard("a?b"));
        assert!(!has_wildcard("plain/key"));
    }

    #[test]
    fn test_literal_prefix() {
        assert_eq!(literal_prefix("logs/2024-*.gz"), "logs/2024-");
        assert_eq!(literal_prefix("img?/*.png"), "img");
        assert_eq!(literal_prefix("*.tmp"), "");
        assert_eq!(literal_prefix("exact"), "exact");
    }
}
