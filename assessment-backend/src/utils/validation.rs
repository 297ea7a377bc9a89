use validator::ValidationError;

/// Rejects strings that are empty after trimming.
pub fn non_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_only_is_blank() {
        assert!(non_blank("  \n").is_err());
        assert!(non_blank(" a ").is_ok());
    }
}
