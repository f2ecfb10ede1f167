//! Result type alias for Masquerade
//!
//! Every fallible library operation returns this alias so `?` converts
//! driver, parser and I/O failures into [`MasqueradeError`] in one place.

use super::errors::MasqueradeError;

/// Result type alias for Masquerade operations
pub type Result<T> = std::result::Result<T, MasqueradeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_err() {
        let result: Result<i32> = Err(MasqueradeError::Database("relation missing".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> Result<u64> {
            let parsed: serde_json::Value = serde_json::from_str("250")?;
            Ok(parsed.as_u64().unwrap_or_default())
        }

        assert_eq!(inner()?, 250);
        Ok(())
    }
}
