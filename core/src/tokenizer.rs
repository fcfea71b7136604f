use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"[^a-z0-9\s]").expect("valid regex");
}

/// Tokens of this many bytes or fewer are dropped.
pub const MIN_TOKEN_LEN: usize = 2;

/// Tokenize text into lower-cased alphanumeric tokens.
///
/// Punctuation becomes a separator rather than being deleted, so `user_id` yields
/// `user` and not `userid`. Tokens of length <= 2 are discarded.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let cleaned = NON_WORD.replace_all(&lowered, " ");
    cleaned
        .split_whitespace()
        .filter(|t| t.len() > MIN_TOKEN_LEN)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        assert_eq!(tokenize("GET /users/{id}!! ab abc"), vec!["get", "users", "abc"]);
    }

    #[test]
    fn punctuation_separates() {
        assert_eq!(tokenize("create_payment,refund"), vec!["create", "payment", "refund"]);
    }
}
