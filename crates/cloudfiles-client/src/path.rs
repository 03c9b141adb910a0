//! Path-segment encoding and name validation

use crate::{CloudFilesError, Result};

/// Maximum container name length in bytes
pub const MAX_CONTAINER_NAME_LEN: usize = 256;

/// Maximum object name length in bytes
pub const MAX_OBJECT_NAME_LEN: usize = 1024;

/// Percent-encode a name for use in a URL path, leaving '/' literal so that
/// pseudo-directory object names keep their hierarchy.
pub fn encode_segment(name: &str) -> String {
    urlencoding::encode(name).replace("%2F", "/")
}

/// Check a container name before it is put on the wire
pub fn validate_container_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CloudFilesError::Validation(
            "container name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_CONTAINER_NAME_LEN {
        return Err(CloudFilesError::Validation(format!(
            "container name exceeds {} bytes",
            MAX_CONTAINER_NAME_LEN
        )));
    }
    if name.contains('/') {
        return Err(CloudFilesError::Validation(format!(
            "container name must not contain '/': {}",
            name
        )));
    }
    Ok(())
}

/// Check an object name before it is put on the wire
pub fn validate_object_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CloudFilesError::Validation(
            "object name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_OBJECT_NAME_LEN {
        return Err(CloudFilesError::Validation(format!(
            "object name exceeds {} bytes",
            MAX_OBJECT_NAME_LEN
        )));
    }
    Ok(())
}

/// `/{container}` relative to an endpoint
pub(crate) fn container_path(container: &str) -> Result<String> {
    validate_container_name(container)?;
    Ok(format!("/{}", encode_segment(container)))
}

/// `/{container}/{object}` relative to an endpoint
pub(crate) fn object_path(container: &str, name: &str) -> Result<String> {
    validate_container_name(container)?;
    validate_object_name(name)?;
    Ok(format!(
        "/{}/{}",
        encode_segment(container),
        encode_segment(name)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_keeps_slashes() {
        assert_eq!(encode_segment("photos/2024/beach day.jpg"), "photos/2024/beach%20day.jpg");
        assert_eq!(encode_segment("a+b&c"), "a%2Bb%26c");
        assert_eq!(encode_segment("plain-name_1.txt"), "plain-name_1.txt");
    }

    #[test]
    fn test_encode_unicode() {
        assert_eq!(encode_segment("é"), "%C3%A9");
    }

    #[test]
    fn test_container_name_rules() {
        assert!(validate_container_name("photos").is_ok());
        assert!(validate_container_name("").unwrap_err().is_validation());
        assert!(validate_container_name("a/b").unwrap_err().is_validation());
        let long = "x".repeat(MAX_CONTAINER_NAME_LEN + 1);
        assert!(validate_container_name(&long).is_err());
    }

    #[test]
    fn test_object_paths() {
        assert_eq!(object_path("photos", "dir/a b.png").unwrap(), "/photos/dir/a%20b.png");
        assert_eq!(container_path("my photos").unwrap(), "/my%20photos");
        assert!(object_path("photos", "").is_err());
        let long = "x".repeat(MAX_OBJECT_NAME_LEN + 1);
        assert!(object_path("photos", &long).is_err());
    }
}
