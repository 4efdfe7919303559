//! Input cleanup shared by the resolver and its callers.

use crate::error::InputError;
use regex::Regex;
use std::sync::OnceLock;

fn unsafe_chars() -> &'static Regex {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    UNSAFE.get_or_init(|| {
        Regex::new(r"[^a-zA-Z0-9áéíóúàâêôãõüçÁÉÍÓÚÀÂÊÔÃÕÜÇ.,!?\s]")
            .expect("sanitizer pattern is valid")
    })
}

/// Trim and lower-case. The only transformation the cascade applies.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Strip everything except letters, digits, Portuguese accents, basic
/// punctuation and whitespace, then normalize.
pub fn sanitize_input(text: &str) -> String {
    let trimmed = text.trim();
    normalize(&unsafe_chars().replace_all(trimmed, ""))
}

/// Caller-boundary check: sanitized text must be non-empty and at most
/// `max_chars` characters long.
pub fn validate_input(text: &str, max_chars: usize) -> Result<String, InputError> {
    let clean = sanitize_input(text);
    if clean.is_empty() {
        return Err(InputError::Empty);
    }
    if clean.chars().count() > max_chars {
        return Err(InputError::TooLong(max_chars));
    }
    Ok(clean)
}
