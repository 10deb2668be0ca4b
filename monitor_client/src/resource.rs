//! Monitor resource identifiers
//!
//! A monitor is addressed by its capture URL (for example
//! `udpserver://0.0.0.0:8099/192.168.10.102`). Before the identifier can be
//! embedded in a request path, every `/` and `:` is swapped for a placeholder
//! character. The backend resolves the encoded form by splitting it on `,`
//! and matching every fragment against its registered monitors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder used when none is configured
pub const DEFAULT_PLACEHOLDER: char = ',';

/// Characters that may not appear in an encoded identifier
pub const PATH_DELIMITERS: [char; 2] = ['/', ':'];

/// Opaque name of a monitor stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// Wrap a raw identifier
    pub fn new<S: Into<String>>(raw: S) -> Self {
        Self(raw.into())
    }

    /// Raw identifier as given by the backend
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the identifier is empty or whitespace only
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Encode for transport by replacing path delimiters with `placeholder`
    pub fn encode(&self, placeholder: char) -> String {
        self.0
            .chars()
            .map(|c| if PATH_DELIMITERS.contains(&c) { placeholder } else { c })
            .collect()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ResourceId {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

/// Check that a placeholder does not reintroduce a delimiter
pub fn is_valid_placeholder(placeholder: char) -> bool {
    !PATH_DELIMITERS.contains(&placeholder) && !placeholder.is_whitespace()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_capture_url() {
        let id = ResourceId::new("udpserver://0.0.0.0:8099/192.168.10.102");
        assert_eq!(id.encode(','), "udpserver,,,0.0.0.0,8099,192.168.10.102");
        assert_eq!(id.encode('-'), "udpserver---0.0.0.0-8099-192.168.10.102");
    }

    #[test]
    fn test_empty_detection() {
        assert!(ResourceId::new("").is_empty());
        assert!(ResourceId::new("   ").is_empty());
        assert!(!ResourceId::new("cam").is_empty());
    }

    #[test]
    fn test_placeholder_validation() {
        assert!(is_valid_placeholder(','));
        assert!(is_valid_placeholder('-'));
        assert!(!is_valid_placeholder('/'));
        assert!(!is_valid_placeholder(':'));
        assert!(!is_valid_placeholder(' '));
    }

    proptest! {
        #[test]
        fn encoded_id_has_no_delimiters(raw in "[a-z0-9./:,-]{0,48}", placeholder in "[,\\-_~]") {
            let placeholder = placeholder.chars().next().unwrap();
            let encoded = ResourceId::new(raw.clone()).encode(placeholder);
            prop_assert!(!encoded.contains('/'));
            prop_assert!(!encoded.contains(':'));
            prop_assert_eq!(encoded.chars().count(), raw.chars().count());
        }
    }
}
