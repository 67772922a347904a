//! OS backends
//!
//! Each backend implements [`Backing`]; exactly one is compiled in and
//! exported as [`Platform`].

use crate::error::{MapError, Result};
use crate::name::SegmentName;
use crate::options::AccessMode;
use std::io;
use std::path::Path;
use std::ptr::NonNull;

#[cfg(unix)]
mod posix;
#[cfg(unix)]
pub use posix::Posix as Platform;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::Windows as Platform;

/// Operations a platform provides to back a [`Mapping`](crate::Mapping).
///
/// Objects and views are owning types: dropping one releases the OS
/// resource, so a failure part-way through an open never leaks a handle.
/// The explicit `unmap`/`release` calls exist to report errors that a
/// drop would swallow.
pub trait Backing {
    /// Open backing object (descriptor, section or file handle)
    type Object;
    /// Active view over an object
    type View;

    /// Opens or creates a named shared segment and negotiates its size.
    fn open_segment(
        name: &SegmentName,
        access: AccessMode,
        size: usize,
    ) -> Result<(Self::Object, usize)>;

    /// Opens or creates a regular file and negotiates its size.
    fn open_file(path: &Path, access: AccessMode, size: usize) -> Result<(Self::Object, usize)>;

    /// Maps `len` bytes of `object` from offset zero.
    fn map(object: &Self::Object, len: usize, access: AccessMode) -> Result<Self::View>;

    fn view_ptr(view: &Self::View) -> NonNull<u8>;

    /// Synchronously writes dirty pages of the view back to the object.
    fn flush(view: &Self::View, len: usize) -> Result<()>;

    fn unmap(view: Self::View, len: usize) -> Result<()>;

    fn release(object: Self::Object) -> Result<()>;

    /// Removes a named segment. Missing segments are not an error.
    fn unlink(name: &SegmentName) -> Result<()>;

    /// Alignment unit for view placement and offsets
    fn granularity() -> usize;
}

/// Settles an object's size once it is open.
///
/// Creating opens (writable, `requested > 0`) set the length and then re-read
/// it, failing unless it matches exactly. Every other open adopts the size
/// the OS reports; an explicit request larger than that fails.
pub(crate) fn negotiate_size(
    access: AccessMode,
    requested: usize,
    set_len: impl FnOnce(u64) -> io::Result<()>,
    query_len: impl Fn() -> io::Result<u64>,
) -> Result<usize> {
    let creates = access.is_writable() && requested > 0;
    if creates {
        set_len(requested as u64).map_err(MapError::Truncate)?;
    }

    let actual = query_len().map_err(MapError::Metadata)?;
    let actual = usize::try_from(actual).map_err(|_| MapError::SizeMismatch {
        requested,
        actual: usize::MAX,
    })?;

    if creates && actual != requested {
        return Err(MapError::SizeMismatch { requested, actual });
    }
    if requested > actual {
        return Err(MapError::SizeMismatch { requested, actual });
    }

    Ok(if creates { requested } else { actual })
}
