//! Filesystem-safe names

use regex::Regex;
use std::sync::LazyLock;

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// Lowercase, hyphen-separated ASCII form of `name`.
///
/// `&` becomes `and` and `@` becomes `a`; everything else outside
/// `[a-z0-9]` (accented letters and emoji included) collapses into a single
/// hyphen. The result may be empty.
pub fn slugify(name: &str) -> String {
    let lowered = name.to_ascii_lowercase().replace('&', "and").replace('@', "a");
    NON_ALPHANUMERIC
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        let cases = [
            ("Hello world", "hello-world"),
            ("Marks & Spencers", "marks-and-spencers"),
            ("Digit@l Wizards", "digital-wizards"),
            ("Between [Worlds]", "between-worlds"),
            ("--Future--", "future"),
            ("😁 Happy Cleaners 💦", "happy-cleaners"),
            ("déjà vu", "d-j-vu"),
            ("\n\0\x1f !~\x7f\u{80}\u{ff}\n", ""),
            ("😁", ""),
            ("\u{212A}elvin", "elvin"),
            ("İstanbul Office", "stanbul-office"),
        ];

        for (input, expected) in cases {
            assert_eq!(slugify(input), expected, "slugifying {input:?}");
        }
    }
}
