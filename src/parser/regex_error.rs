// Errors for build-validated grammar patterns
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum RegexError {
    #[error("Regex compilation failed for pattern '{pattern}' (name: {name}): {source}")]
    CompilationFailed {
        pattern: String,
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("Grammar '{name}' has no capture named '{capture}'")]
    MissingCapture { name: String, capture: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_compilation_failed_message() {
        let invalid_pattern = r#"[invalid regex pattern"#;
        let result = Regex::new(invalid_pattern);
        assert!(result.is_err());

        let error = RegexError::CompilationFailed {
            pattern: invalid_pattern.to_string(),
            name: "test_pattern".to_string(),
            source: result.unwrap_err(),
        };

        let message = error.to_string();
        assert!(message.contains("test_pattern"));
        assert!(message.contains(invalid_pattern));
    }

    #[test]
    fn test_missing_capture_message() {
        let error = RegexError::MissingCapture {
            name: "haproxy_http".to_string(),
            capture: "protocol",
        };

        assert_eq!(
            error.to_string(),
            "Grammar 'haproxy_http' has no capture named 'protocol'"
        );
    }
}
