//! Upload validation
//!
//! Checks every submitted file against the size and content-type policy
//! before any backend traffic. The content type checked here is the one the
//! client declared; the type stored with the object is sniffed from the bytes
//! later, in the orchestrator.

use super::types::{UploadRequest, ValidationError, ValidationPolicy};

/// Validate a batch, stopping at the first file that violates `policy`
pub fn validate(files: &[UploadRequest], policy: &ValidationPolicy) -> Result<(), ValidationError> {
    for file in files {
        validate_file(file, policy)?;
    }
    Ok(())
}

/// Validate a single file
pub fn validate_file(file: &UploadRequest, policy: &ValidationPolicy) -> Result<(), ValidationError> {
    if file.size > policy.max_file_size {
        return Err(ValidationError::TooLarge {
            name: file.name.clone(),
            size: file.size,
            max: policy.max_file_size,
        });
    }

    if !policy.allowed_content_types.contains(&file.declared_content_type) {
        return Err(ValidationError::UnsupportedType {
            name: file.name.clone(),
            content_type: file.declared_content_type.clone(),
        });
    }

    if file.size == 0 && !policy.allow_empty {
        return Err(ValidationError::Empty {
            name: file.name.clone(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ValidationPolicy {
        ValidationPolicy {
            max_file_size: 1024,
            allowed_content_types: ["image/jpeg", "image/png"]
                .into_iter()
                .map(String::from)
                .collect(),
            allow_empty: false,
        }
    }

    #[test]
    fn test_accepts_valid_batch() {
        let files = vec![
            UploadRequest::new("a.png", "image/png", vec![1u8; 1024]),
            UploadRequest::new("b.jpg", "image/jpeg", vec![1u8; 10]),
        ];
        assert!(validate(&files, &policy()).is_ok());
    }

    #[test]
    fn test_rejects_too_large() {
        let files = vec![UploadRequest::new("a.png", "image/png", vec![1u8; 1025])];
        let err = validate(&files, &policy()).unwrap_err();

        assert_eq!(err.to_string(), "File too large");
        assert!(matches!(err, ValidationError::TooLarge { size: 1025, max: 1024, .. }));
    }

    #[test]
    fn test_rejects_unsupported_type() {
        let files = vec![UploadRequest::new("a.gif", "image/gif", vec![1u8; 10])];
        let err = validate(&files, &policy()).unwrap_err();

        assert_eq!(err.to_string(), "Filetype is not supported");
    }

    #[test]
    fn test_reports_first_violation_only() {
        // Second file is too large, third has a bad type; only the first violation counts
        let files = vec![
            UploadRequest::new("ok.png", "image/png", vec![1u8; 10]),
            UploadRequest::new("big.png", "image/png", vec![1u8; 4096]),
            UploadRequest::new("a.gif", "image/gif", vec![1u8; 10]),
        ];
        let err = validate(&files, &policy()).unwrap_err();

        assert!(matches!(err, ValidationError::TooLarge { ref name, .. } if name == "big.png"));
    }

    #[test]
    fn test_size_is_checked_before_type() {
        let files = vec![UploadRequest::new("big.gif", "image/gif", vec![1u8; 4096])];
        assert_eq!(validate(&files, &policy()).unwrap_err().to_string(), "File too large");
    }

    #[test]
    fn test_empty_file_policy() {
        let files = vec![UploadRequest::new("empty.png", "image/png", Vec::<u8>::new())];
        assert_eq!(validate(&files, &policy()).unwrap_err().to_string(), "File is empty");

        let permissive = ValidationPolicy {
            allow_empty: true,
            ..policy()
        };
        assert!(validate(&files, &permissive).is_ok());
    }

    #[test]
    fn test_declared_type_must_match_exactly() {
        let files = vec![UploadRequest::new("a.png", "image/png; charset=binary", vec![1u8])];
        assert!(validate(&files, &policy()).is_err());
    }
}
