//! Logging helpers for channel adapters

use parley_llm::util::truncate_safe;

/// Maximum length of text to log
pub const MAX_LOG_TEXT_LENGTH: usize = 50;

/// Patterns that indicate potentially sensitive content
pub const SENSITIVE_PATTERNS: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "token",
    "api_key",
    "apikey",
    "api-key",
    "bearer",
    "authorization",
    "credential",
    "-----begin",
];

/// Mask potentially sensitive text for logging
///
/// Redacts text containing a sensitive pattern and truncates long text.
///
/// # Examples
/// ```
/// use parley_channels::util::mask_for_logging;
///
/// assert!(mask_for_logging("my password is hunter2").contains("REDACTED"));
/// assert_eq!(mask_for_logging("Hello"), "Hello");
/// ```
#[must_use]
pub fn mask_for_logging(text: &str) -> String {
    let lower = text.to_lowercase();

    if SENSITIVE_PATTERNS.iter().any(|p| lower.contains(p)) {
        return "[REDACTED - potentially sensitive content]".to_string();
    }

    if text.len() > MAX_LOG_TEXT_LENGTH {
        format!("{}...[truncated]", truncate_safe(text, MAX_LOG_TEXT_LENGTH))
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_for_logging_sensitive() {
        assert!(mask_for_logging("my password is secret123").contains("REDACTED"));
        assert!(mask_for_logging("API_KEY=sk-1234567890").contains("REDACTED"));
        assert!(mask_for_logging("Bearer eyJhbGciOiJ").contains("REDACTED"));
    }

    #[test]
    fn test_mask_for_logging_truncate() {
        let long_msg = "a".repeat(100);
        let masked = mask_for_logging(&long_msg);
        assert!(masked.contains("truncated"));
        assert!(masked.len() < long_msg.len());
    }

    #[test]
    fn test_mask_for_logging_multibyte_boundary() {
        let long_msg = "я".repeat(60);
        let masked = mask_for_logging(&long_msg);
        assert!(masked.ends_with("...[truncated]"));
    }

    #[test]
    fn test_mask_for_logging_pass_through() {
        assert_eq!(mask_for_logging("Hello, world!"), "Hello, world!");
    }
}
