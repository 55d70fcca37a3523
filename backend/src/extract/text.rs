//! Text helpers shared by every stage: header normalization, bounded
//! edit-distance matching against synonym lists, and amount coercion.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Cell, Money};

/// Text that looks like a currency value, e.g. `$15,000.00` or `(€ 120)`.
static CURRENCY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-(]?\s*[$€£]\s*-?\d[\d,]*(\.\d+)?\s*\)?$").expect("valid currency regex")
});

/// Cell contents that stand for "nothing here".
const BLANK_PLACEHOLDERS: [&str; 7] = ["-", "--", "—", "–", "n/a", "na", "none"];

/// Lowercase and keep only alphanumerics: `"Line-Item "` → `"lineitem"`.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Normalized text of a cell; numbers normalize to their digits.
pub fn normalize_cell(cell: &Cell) -> String {
    normalize(&cell.display_text())
}

/// Allowed edit distance for a comparison where the shorter side has `len` chars.
pub fn typo_bound(len: usize) -> usize {
    match len {
        0..=2 => 0,
        3..=4 => 1,
        _ => 2,
    }
}

/// Levenshtein distance over chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// How a normalized header matched a synonym list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SynonymMatch {
    Exact,
    /// Edit distance to the closest synonym, within the typo bound.
    Fuzzy(usize),
}

/// Exact match first, then the closest synonym within the typo bound.
///
/// `normalized` must already be passed through [`normalize`]; synonyms are
/// normalized here.
pub fn match_synonyms(normalized: &str, synonyms: &[String]) -> Option<SynonymMatch> {
    if normalized.is_empty() {
        return None;
    }

    let candidates: Vec<String> = synonyms.iter().map(|s| normalize(s)).collect();
    if candidates.iter().any(|s| s == normalized) {
        return Some(SynonymMatch::Exact);
    }

    let text_len = normalized.chars().count();
    candidates
        .iter()
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            let bound = typo_bound(text_len.min(s.chars().count()));
            if text_len.abs_diff(s.chars().count()) > bound {
                return None;
            }
            let distance = levenshtein(normalized, s);
            (distance <= bound).then_some(distance)
        })
        .min()
        .map(SynonymMatch::Fuzzy)
}

/// Exact normalized equality against a marker list (stop markers, total labels).
pub fn matches_marker(normalized: &str, markers: &[String]) -> bool {
    !normalized.is_empty() && markers.iter().any(|m| normalize(m) == normalized)
}

/// Whether a cell holds a data value rather than header text.
pub fn looks_like_value(cell: &Cell) -> bool {
    match cell {
        Cell::Number(_) => true,
        Cell::Text(s) => CURRENCY_PATTERN.is_match(s.trim()),
        Cell::Empty => false,
    }
}

/// Outcome of reading a cost cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedAmount {
    /// Empty cell or a placeholder such as `-`.
    Blank,
    Value(Money),
    /// Non-numeric text; callers coerce to zero and warn.
    Invalid(String),
    /// A number beyond [`Money::MAX_SHEET_CENTS`]; callers coerce to zero and warn.
    OutOfRange(String),
}

impl ParsedAmount {
    /// The amount, with blanks and invalid text read as zero.
    pub fn or_zero(&self) -> Money {
        match self {
            ParsedAmount::Value(m) => *m,
            _ => Money::ZERO,
        }
    }
}

/// Parse a cost cell: numbers as-is, text stripped of currency symbols and
/// thousands separators, `(123)` read as negative.
pub fn parse_amount(cell: &Cell) -> ParsedAmount {
    match cell {
        Cell::Empty => ParsedAmount::Blank,
        Cell::Number(n) if n.is_finite() => match Money::from_sheet_value(*n) {
            Some(amount) => ParsedAmount::Value(amount),
            None => ParsedAmount::OutOfRange(n.to_string()),
        },
        Cell::Number(n) => ParsedAmount::Invalid(n.to_string()),
        Cell::Text(raw) => parse_amount_text(raw),
    }
}

fn parse_amount_text(raw: &str) -> ParsedAmount {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || BLANK_PLACEHOLDERS
            .iter()
            .any(|p| trimmed.eq_ignore_ascii_case(p))
    {
        return ParsedAmount::Blank;
    }

    let (negative, body) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };

    let cleaned: String = body
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | ',' | '\u{a0}') && !c.is_whitespace())
        .collect();

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => {
            let value = if negative { -value } else { value };
            match Money::from_sheet_value(value) {
                Some(amount) => ParsedAmount::Value(amount),
                None => ParsedAmount::OutOfRange(trimmed.to_string()),
            }
        }
        _ => ParsedAmount::Invalid(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Line-Item "), "lineitem");
        assert_eq!(normalize("Mat'l $"), "matl");
        assert_eq!(normalize("U/M"), "um");
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("lbor", "labor"), 1);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn test_typo_tolerance() {
        let labor = vec!["labor".to_string(), "labour".to_string()];
        assert_eq!(match_synonyms("lbor", &labor), Some(SynonymMatch::Fuzzy(1)));
        assert_eq!(match_synonyms("labor", &labor), Some(SynonymMatch::Exact));
        assert_eq!(match_synonyms("lb", &labor), None);
    }

    #[test]
    fn test_short_words_need_tight_match() {
        let sub = vec!["sub".to_string()];
        assert_eq!(match_synonyms("sb", &sub), None);
        assert_eq!(match_synonyms("subs", &sub), Some(SynonymMatch::Fuzzy(1)));
        assert_eq!(match_synonyms("tax", &sub), None);
    }

    #[test]
    fn test_markers() {
        let markers = vec!["Total Cost".to_string(), "Expenses".to_string()];
        assert!(matches_marker("totalcost", &markers));
        assert!(!matches_marker("totallynew", &markers));
        assert!(!matches_marker("", &markers));
    }

    #[test]
    fn test_looks_like_value() {
        assert!(looks_like_value(&Cell::Number(12.0)));
        assert!(looks_like_value(&Cell::from("$15,000.00")));
        assert!(looks_like_value(&Cell::from("($120)")));
        assert!(!looks_like_value(&Cell::from("Labor $")));
        assert!(!looks_like_value(&Cell::Empty));
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(&Cell::Number(1500.0)), ParsedAmount::Value(Money::from_cents(150_000)));
        assert_eq!(parse_amount(&Cell::from("$1,234.50")), ParsedAmount::Value(Money::from_cents(123_450)));
        assert_eq!(parse_amount(&Cell::from("(200)")), ParsedAmount::Value(Money::from_cents(-20_000)));
        assert_eq!(parse_amount(&Cell::from(" - ")), ParsedAmount::Blank);
        assert_eq!(parse_amount(&Cell::from("N/A")), ParsedAmount::Blank);
        assert_eq!(parse_amount(&Cell::Empty), ParsedAmount::Blank);
        assert_eq!(parse_amount(&Cell::from("TBD")), ParsedAmount::Invalid("TBD".into()));
        assert_eq!(
            parse_amount(&Cell::from("$1e17")),
            ParsedAmount::OutOfRange("$1e17".into())
        );
        assert!(matches!(parse_amount(&Cell::Number(1e17)), ParsedAmount::OutOfRange(_)));
        assert_eq!(parse_amount(&Cell::from("TBD")).or_zero(), Money::ZERO);
    }
}
