//! Name Canonicalization
//!
//! Reduces free-form item names to an order- and punctuation-insensitive
//! token signature. The signature is only ever used for matching; the
//! display name always comes from the catalog or an estimate label.

use itertools::Itertools;

/// Lowercase, strip punctuation, split on whitespace, sort, rejoin.
///
/// `"Chair, Dining"` and `"Dining Chair"` both become `"chair dining"`.
pub fn canonicalize(name: &str) -> String {
    words(name).into_iter().sorted().join(" ")
}

/// Lowercased, punctuation-free tokens of `name` whose char length is at
/// least `min_len`, in their original order.
pub fn tokenize(name: &str, min_len: usize) -> Vec<String> {
    words(name)
        .into_iter()
        .filter(|token| token.chars().count() >= min_len)
        .collect()
}

/// Drop a leading count token ("4", "4x", "x4") when other words follow it.
///
/// `"4 Dining Chairs"` is matched as `"Dining Chairs"`; the candidate's own
/// quantity field stays authoritative.
pub fn strip_quantity_prefix(name: &str) -> &str {
    let trimmed = name.trim_start();
    let Some(first) = trimmed.split_whitespace().next() else {
        return trimmed;
    };

    if !is_count_token(first) {
        return trimmed;
    }

    let rest = trimmed[first.len()..].trim_start();
    if rest.is_empty() {
        trimmed
    } else {
        rest
    }
}

fn is_count_token(token: &str) -> bool {
    let digits = token
        .strip_suffix(&['x', 'X'][..])
        .or_else(|| token.strip_prefix(&['x', 'X'][..]))
        .unwrap_or(token);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn words(name: &str) -> Vec<String> {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    cleaned.split_whitespace().map(str::to_string).collect()
}
