//! Typographic quote substitution for typed text.

use crate::config::QuoteGlyphs;

fn opens_quote(prev: Option<char>, glyphs: &QuoteGlyphs) -> bool {
    match prev {
        None => true,
        Some(c) => {
            c.is_whitespace()
                || matches!(c, '(' | '[' | '{' | '<' | '-' | '\u{2013}' | '\u{2014}')
                || c == glyphs.single_open
                || c == glyphs.double_open
        }
    }
}

/// The glyph `typed` becomes when it follows `prev`.
pub fn smart_quote(prev: Option<char>, typed: char, glyphs: &QuoteGlyphs) -> char {
    let double = match typed {
        '"' => true,
        '\'' => false,
        other => return other,
    };
    if prev.is_some_and(|c| c.is_ascii_digit()) {
        return if double {
            glyphs.double_prime
        } else {
            glyphs.single_prime
        };
    }
    match (double, opens_quote(prev, glyphs)) {
        (true, true) => glyphs.double_open,
        (true, false) => glyphs.double_close,
        (false, true) => glyphs.single_open,
        (false, false) => glyphs.single_close,
    }
}

/// Substitute every straight quote in `text`, given the character that
/// precedes it in the document.
pub fn apply_smart_quotes(text: &str, prev: Option<char>, glyphs: &QuoteGlyphs) -> String {
    let mut prev = prev;
    text.chars()
        .map(|c| {
            let out = smart_quote(prev, c, glyphs);
            prev = Some(out);
            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quotes_open_and_close() {
        let glyphs = QuoteGlyphs::default();
        assert_eq!(
            apply_smart_quotes(r#""hi" it's"#, None, &glyphs),
            "\u{201C}hi\u{201D} it\u{2019}s"
        );
        assert_eq!(apply_smart_quotes("'x'", Some(' '), &glyphs), "\u{2018}x\u{2019}");
        assert_eq!(smart_quote(Some('('), '"', &glyphs), '\u{201C}');
    }

    #[test]
    fn test_primes_after_digits() {
        let glyphs = QuoteGlyphs::default();
        assert_eq!(apply_smart_quotes(r#"5'10""#, None, &glyphs), "5\u{2032}10\u{2033}");
        assert_eq!(smart_quote(Some('a'), 'x', &glyphs), 'x');
    }
}
