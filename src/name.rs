//! Segment name handling
//!
//! Names are kept as plain Rust strings and only turned into the OS-native
//! form (`/name` C string on POSIX, NUL-terminated UTF-16 on Windows) when a
//! backing call needs them.

use crate::error::{MapError, Result};

/// NAME_MAX; the leading `/` is not counted
pub const MAX_NAME_LEN: usize = 255;

/// A validated shared segment name, stored without a leading `/`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentName(String);

impl SegmentName {
    pub fn new(name: &str) -> Result<Self> {
        let bare = name.strip_prefix('/').unwrap_or(name);

        let reason = if bare.is_empty() {
            Some("name is empty")
        } else if bare.contains('\0') {
            Some("name contains a NUL byte")
        } else if bare.contains('/') {
            Some("name contains '/' after the first character")
        } else if bare.len() > MAX_NAME_LEN {
            Some("name is longer than 255 bytes")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(MapError::InvalidName {
                name: name.to_string(),
                reason,
            }),
            None => Ok(Self(bare.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[cfg(unix)]
    pub fn to_posix(&self) -> std::ffi::CString {
        // Validation above rules out interior NULs
        std::ffi::CString::new(format!("/{}", self.0)).unwrap_or_default()
    }

    #[cfg(windows)]
    pub fn to_wide(&self) -> Vec<u16> {
        self.0.encode_utf16().chain(std::iter::once(0)).collect()
    }
}

/// Checks a file path before handing it to the OS.
pub fn check_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(MapError::InvalidName {
            name: String::new(),
            reason: "path is empty",
        });
    }
    if path.contains('\0') {
        return Err(MapError::InvalidName {
            name: path.to_string(),
            reason: "path contains a NUL byte",
        });
    }
    Ok(())
}
