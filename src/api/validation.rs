use super::ApiError;

pub const MISSING_FORM_DATA: &str = "Missing form data.";

pub fn validate_limit(limit: usize) -> Result<usize, ApiError> {
    const MAX_LIMIT: usize = 1000;
    const MIN_LIMIT: usize = 1;

    if !(MIN_LIMIT..=MAX_LIMIT).contains(&limit) {
        return Err(ApiError::validation(format!(
            "Invalid limit: {}. Limit must be between {} and {}",
            limit, MIN_LIMIT, MAX_LIMIT
        )));
    }
    Ok(limit)
}

/// Reads a required form field. Strings must be non-empty; numbers are
/// accepted and rendered as text. Anything else counts as missing.
pub fn required_field(body: &serde_json::Value, name: &str) -> Result<String, ApiError> {
    match body.get(name) {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
        _ => Err(ApiError::validation(MISSING_FORM_DATA)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_limit() {
        assert!(validate_limit(1).is_ok());
        assert!(validate_limit(500).is_ok());
        assert!(validate_limit(1000).is_ok());
        assert!(validate_limit(0).is_err());
        assert!(validate_limit(1001).is_err());
    }

    #[test]
    fn test_required_field() {
        let body = json!({"caseNumber": "123", "filingYear": 2023, "caseType": "", "x": null});
        assert_eq!(required_field(&body, "caseNumber").unwrap(), "123");
        assert_eq!(required_field(&body, "filingYear").unwrap(), "2023");
        assert!(required_field(&body, "caseType").is_err());
        assert!(required_field(&body, "x").is_err());
        assert!(required_field(&body, "missing").is_err());
        assert!(required_field(&json!("not an object"), "caseNumber").is_err());
    }
}
