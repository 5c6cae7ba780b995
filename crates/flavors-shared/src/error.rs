use thiserror::Error;

/// Input rejected before it reaches a store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Passwords do not match!")]
    PasswordMismatch,
}

/// Return `MissingField(field)` if `value` is empty or whitespace.
pub fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_counts_as_missing() {
        assert_eq!(
            require("dish", "   \t"),
            Err(ValidationError::MissingField("dish"))
        );
        assert!(require("dish", "Modak").is_ok());
    }

    #[test]
    fn message_names_the_field() {
        let err = ValidationError::MissingField("instructions");
        assert_eq!(err.to_string(), "instructions is required");
    }
}
