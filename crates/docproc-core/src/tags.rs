//! Tag name rules.

use crate::defaults::TAG_NAME_MAX_LEN;
use crate::error::{Error, Result};

/// Trim a proposed tag name and check its length.
pub fn normalize_tag_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("Tag name cannot be empty".to_string()));
    }
    if trimmed.chars().count() > TAG_NAME_MAX_LEN {
        return Err(Error::InvalidInput(format!(
            "Tag name cannot exceed {} characters",
            TAG_NAME_MAX_LEN
        )));
    }
    Ok(trimmed.to_string())
}
