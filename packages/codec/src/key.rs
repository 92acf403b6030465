//! Key validation.

use crate::{CodecError, DELIMITER};

/// Check that `key` can be written as the left-hand side of a line.
///
/// Keys may not contain the delimiter or a raw line break.
pub fn validate(key: &str) -> Result<(), CodecError> {
    let reason = if key.contains(DELIMITER) {
        "contains '='"
    } else if key.contains(['\r', '\n']) {
        "contains a line break"
    } else {
        return Ok(());
    };

    Err(CodecError::InvalidKey {
        key: key.to_string(),
        reason,
    })
}
