//! Identifier types shared by the buffer, the store, and the API.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Maximum length of an annotator or signal identifier.
pub const MAX_ID_LEN: usize = 128;

/// Identifies one pending-annotation queue and its pair of durable tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BufferKey {
    pub annotator_id: String,
    pub signal_id: String,
}

impl BufferKey {
    /// Build a key after checking both identifiers with [`validate_id`].
    pub fn new(
        annotator_id: impl Into<String>,
        signal_id: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let annotator_id = annotator_id.into();
        let signal_id = signal_id.into();
        validate_id("annotator_id", &annotator_id)?;
        validate_id("signal_id", &signal_id)?;
        Ok(Self {
            annotator_id,
            signal_id,
        })
    }
}

impl fmt::Display for BufferKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.annotator_id, self.signal_id)
    }
}

/// Validate an identifier that ends up as a file-name component.
///
/// Allowed: 1..=[`MAX_ID_LEN`] characters from `[A-Za-z0-9._-]`, not
/// starting with `.`.
pub fn validate_id(field: &str, value: &str) -> Result<(), CoreError> {
    if value.is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    if value.len() > MAX_ID_LEN {
        return Err(CoreError::Validation(format!(
            "{field} must be at most {MAX_ID_LEN} characters, got {}",
            value.len()
        )));
    }
    if value.starts_with('.') {
        return Err(CoreError::Validation(format!(
            "{field} '{value}' must not start with '.'"
        )));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(CoreError::Validation(format!(
            "{field} '{value}' may only contain letters, digits, '.', '_' and '-'"
        )));
    }
    Ok(())
}
