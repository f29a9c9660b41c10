//! Image payload helpers.

use std::fs;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::FaceError;

/// Read a whole file and return it as standard, padded base64 text, ready
/// to pass as the `data` argument of the face operations.
pub fn read_file_to_base64(path: impl AsRef<Path>) -> Result<String, FaceError> {
    let bytes = fs::read(path.as_ref())?;
    Ok(STANDARD.encode(bytes))
}
