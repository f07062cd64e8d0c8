//! Natural (numeric-aware) string ordering.
//!
//! Index links and feed items are ordered by sorting their rendered text.
//! Plain lexicographic order would put `/photo/9/` after `/photo/12/`, so
//! strings are split into alternating text and digit runs and digit runs
//! compare by value:
//!
//! - `"photo 2"` < `"photo 10"`
//! - `"a1b"` < `"a1c"` < `"a2"`
//! - `"007"` == `"7"` by value; ties fall back to the raw text so the order
//!   stays total
//!
//! Text runs compare byte-wise, same as the rest of the string.

use std::cmp::Ordering;

/// A maximal run of either digits or non-digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chunk<'a> {
    Text(&'a str),
    Number(&'a str),
}

/// Split a string into alternating text / digit chunks.
///
/// - `"photo12.jpg"` → `[Text("photo"), Number("12"), Text(".jpg")]`
/// - `"42"` → `[Number("42")]`
fn chunks(s: &str) -> Vec<Chunk<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_digits = None;

    for (idx, ch) in s.char_indices() {
        let is_digit = ch.is_ascii_digit();
        match in_digits {
            Some(prev) if prev != is_digit => {
                out.push(make_chunk(&s[start..idx], prev));
                start = idx;
            }
            _ => {}
        }
        in_digits = Some(is_digit);
    }
    if let Some(last) = in_digits {
        out.push(make_chunk(&s[start..], last));
    }
    out
}

fn make_chunk(text: &str, digits: bool) -> Chunk<'_> {
    if digits {
        Chunk::Number(text)
    } else {
        Chunk::Text(text)
    }
}

/// Compare two digit runs by numeric value without parsing (no overflow on
/// arbitrarily long runs).
fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn cmp_chunk(a: &Chunk<'_>, b: &Chunk<'_>) -> Ordering {
    match (a, b) {
        (Chunk::Number(x), Chunk::Number(y)) => cmp_digits(x, y),
        (Chunk::Text(x), Chunk::Text(y)) => x.cmp(y),
        // Mixed kinds differ in their first byte, so byte order decides.
        (Chunk::Number(x), Chunk::Text(y)) | (Chunk::Text(x), Chunk::Number(y)) => x.cmp(y),
    }
}

/// Natural ordering of two strings.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let ca = chunks(a);
    let cb = chunks(b);
    for (x, y) in ca.iter().zip(cb.iter()) {
        match cmp_chunk(x, y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    ca.len().cmp(&cb.len()).then_with(|| a.cmp(b))
}

/// Sort strings in natural descending order (largest number first).
pub fn sort_descending(items: &mut [String]) {
    items.sort_by(|a, b| natural_cmp(b, a));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_split_text_and_digits() {
        assert_eq!(
            chunks("photo12.jpg"),
            vec![
                Chunk::Text("photo"),
                Chunk::Number("12"),
                Chunk::Text(".jpg")
            ]
        );
        assert_eq!(chunks("42"), vec![Chunk::Number("42")]);
        assert!(chunks("").is_empty());
    }

    #[test]
    fn numbers_compare_by_value() {
        assert_eq!(natural_cmp("photo 2", "photo 10"), Ordering::Less);
        assert_eq!(natural_cmp("photo 10", "photo 9"), Ordering::Greater);
        assert_eq!(natural_cmp("/photo/12/", "/photo/12/"), Ordering::Equal);
    }

    #[test]
    fn leading_zeros_fall_back_to_text() {
        assert_ne!(natural_cmp("007", "7"), Ordering::Equal);
        assert_eq!(cmp_digits("007", "7"), Ordering::Equal);
    }

    #[test]
    fn long_digit_runs_do_not_overflow() {
        let big = "99999999999999999999999999";
        let bigger = "100000000000000000000000000";
        assert_eq!(natural_cmp(big, bigger), Ordering::Less);
    }

    #[test]
    fn prefix_sorts_first() {
        assert_eq!(natural_cmp("a1", "a1b"), Ordering::Less);
    }

    #[test]
    fn descending_fragments_are_newest_first() {
        let mut fragments: Vec<String> = (1..=12)
            .map(|id| format!("<a href=\"/photo/{id}/\"><img src=\"/images/{id}/thumb_x.jpg\"></a>"))
            .collect();
        sort_descending(&mut fragments);

        let order: Vec<u32> = fragments
            .iter()
            .map(|f| {
                f.trim_start_matches("<a href=\"/photo/")
                    .split('/')
                    .next()
                    .unwrap()
                    .parse()
                    .unwrap()
            })
            .collect();
        assert_eq!(order, vec![12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn lexicographic_order_would_differ() {
        let mut lexical: Vec<String> = (1..=12).map(|id| format!("item {id}")).collect();
        lexical.sort_by(|a, b| b.cmp(a));
        assert_eq!(lexical[0], "item 9");

        let mut natural = lexical.clone();
        sort_descending(&mut natural);
        assert_eq!(natural[0], "item 12");
    }
}
