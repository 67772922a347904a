//! Memory mapping over a named shared segment or a regular file
//!
//! A [`Mapping`] walks a fixed state machine:
//!
//! ```text
//! Closed --open()/open_file()--> Open --map()--> Mapped
//!    ^                            |  ^             |
//!    |                            |  +--unmap()----+
//!    +-----------close()----------+----------------+
//! ```
//!
//! `close()` is valid from every state and always unmaps before releasing
//! the backing object. Dropping a `Mapping` closes it.

use crate::error::{MapError, Result};
use crate::name::{check_path, SegmentName};
use crate::options::{AccessMode, BackingKind, MapOptions, MapState, UnlinkPolicy};
use crate::platform::{Backing, Platform};
use std::path::Path;
use std::ptr;
use tracing::{debug, warn};

type Object = <Platform as Backing>::Object;
type View = <Platform as Backing>::View;

/// Backing object held while Open or Mapped
struct Acquired {
    object: Object,
    kind: BackingKind,
    /// Set when this mapping created (or truncated) a shared segment
    created: bool,
}

enum State {
    Closed,
    Open(Acquired),
    Mapped(Acquired, View),
}

/// One backing object plus, optionally, one view over it
pub struct Mapping {
    options: MapOptions,
    /// Negotiated size once opened, the requested size before that
    size: usize,
    state: State,
}

// SAFETY: the mapping exclusively owns its handle and view; moving it to
// another thread moves that ownership with it. It is not Sync: all methods
// assume a single caller at a time.
unsafe impl Send for Mapping {}

impl Mapping {
    /// Closed mapping that adopts the existing object's size when opened
    pub fn new(target: impl Into<String>, access: AccessMode) -> Self {
        Self::with_options(MapOptions::new(target).access(access))
    }

    /// Closed mapping that creates the object with exactly `size` bytes when
    /// opened with write access
    pub fn with_size(target: impl Into<String>, size: usize, access: AccessMode) -> Self {
        Self::with_options(MapOptions::new(target).access(access).size(size))
    }

    pub fn with_options(options: MapOptions) -> Self {
        Self {
            size: options.size,
            options,
            state: State::Closed,
        }
    }

    /// Opens the target as a named shared memory segment.
    ///
    /// With write access and a non-zero size the segment is created, or
    /// truncated to exactly that size, discarding prior content. Otherwise
    /// an existing segment is opened and its size adopted.
    pub fn open(&mut self) -> Result<()> {
        self.expect_state(MapState::Closed)?;
        let name = SegmentName::new(&self.options.target)?;

        let (object, size) =
            Platform::open_segment(&name, self.options.access, self.options.size)?;

        self.acquire(object, size, BackingKind::Segment);
        Ok(())
    }

    /// Opens the target as a file path, with the same sizing rules as
    /// [`open`](Self::open). Closing keeps the file on disk.
    pub fn open_file(&mut self) -> Result<()> {
        self.expect_state(MapState::Closed)?;
        check_path(&self.options.target)?;

        let (object, size) = Platform::open_file(
            Path::new(&self.options.target),
            self.options.access,
            self.options.size,
        )?;

        self.acquire(object, size, BackingKind::File);
        Ok(())
    }

    fn acquire(&mut self, object: Object, size: usize, kind: BackingKind) {
        let created = self.options.creates();
        debug!(
            name = %self.options.target,
            ?kind,
            size,
            created,
            "opened backing object"
        );

        self.size = size;
        self.state = State::Open(Acquired {
            object,
            kind,
            created,
        });
    }

    /// Maps the whole negotiated size from offset zero. On failure the
    /// mapping stays Open.
    pub fn map(&mut self) -> Result<()> {
        let State::Open(acquired) = &self.state else {
            return Err(self.invalid_state(MapState::Open));
        };

        let view = Platform::map(&acquired.object, self.size, self.options.access)?;

        if let State::Open(acquired) = std::mem::replace(&mut self.state, State::Closed) {
            self.state = State::Mapped(acquired, view);
        }
        debug!(name = %self.options.target, size = self.size, "mapped view");
        Ok(())
    }

    /// Releases the view. A no-op when nothing is mapped.
    ///
    /// The mapping returns to Open even if the OS reports an error.
    pub fn unmap(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Mapped(acquired, view) => {
                self.state = State::Open(acquired);
                debug!(name = %self.options.target, "unmapping view");
                Platform::unmap(view, self.size)
            }
            other => {
                self.state = other;
                Ok(())
            }
        }
    }

    /// Unmaps, then releases the backing object, from any state.
    ///
    /// Shared segments are unlinked according to the [`UnlinkPolicy`].
    /// The mapping ends up Closed regardless of the result; the first
    /// error encountered is returned.
    pub fn close(&mut self) -> Result<()> {
        let unmapped = self.unmap();

        let released = match std::mem::replace(&mut self.state, State::Closed) {
            State::Open(acquired) => self.release(acquired),
            State::Closed => Ok(()),
            // unmap() never leaves the state Mapped
            State::Mapped(acquired, view) => {
                drop(view);
                self.release(acquired)
            }
        };

        unmapped.and(released)
    }

    fn release(&self, acquired: Acquired) -> Result<()> {
        let Acquired {
            object,
            kind,
            created,
        } = acquired;
        debug!(name = %self.options.target, ?kind, "releasing backing object");

        let closed = Platform::release(object);
        let unlinked = match kind {
            BackingKind::Segment if self.options.unlink.should_unlink(created) => {
                SegmentName::new(&self.options.target).and_then(|name| Platform::unlink(&name))
            }
            _ => Ok(()),
        };
        closed.and(unlinked)
    }

    /// Synchronously writes modified pages back to the backing object.
    /// A no-op when nothing is mapped.
    pub fn flush(&self) -> Result<()> {
        match &self.state {
            State::Mapped(_, view) => Platform::flush(view, self.size),
            _ => Ok(()),
        }
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        !matches!(self.state, State::Closed)
    }

    #[inline]
    pub fn is_mapped(&self) -> bool {
        matches!(self.state, State::Mapped(..))
    }

    pub fn state(&self) -> MapState {
        match self.state {
            State::Closed => MapState::Closed,
            State::Open(_) => MapState::Open,
            State::Mapped(..) => MapState::Mapped,
        }
    }

    /// Kind of object currently held, `None` when Closed
    pub fn backing_kind(&self) -> Option<BackingKind> {
        match &self.state {
            State::Closed => None,
            State::Open(acquired) | State::Mapped(acquired, _) => Some(acquired.kind),
        }
    }

    /// Size in bytes: negotiated once opened, requested before that
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Start of the view, or null when not mapped
    #[inline]
    pub fn data(&self) -> *mut u8 {
        match &self.state {
            State::Mapped(_, view) => Platform::view_ptr(view).as_ptr(),
            _ => ptr::null_mut(),
        }
    }

    /// Mapped bytes, `None` when not mapped.
    ///
    /// Other processes attached to the same object may change these bytes
    /// at any time; coordinating that is up to the caller.
    pub fn as_slice(&self) -> Option<&[u8]> {
        match &self.state {
            State::Mapped(_, view) => Some(unsafe {
                std::slice::from_raw_parts(Platform::view_ptr(view).as_ptr(), self.size)
            }),
            _ => None,
        }
    }

    /// Mutable mapped bytes, `None` when not mapped or read-only
    pub fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        if !self.options.access.is_writable() {
            return None;
        }
        match &self.state {
            State::Mapped(_, view) => Some(unsafe {
                std::slice::from_raw_parts_mut(Platform::view_ptr(view).as_ptr(), self.size)
            }),
            _ => None,
        }
    }

    /// Copies `bytes` into the view at `offset`.
    pub fn write_at(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        if !self.options.access.is_writable() {
            return Err(MapError::ReadOnly);
        }
        if !self.is_mapped() {
            return Err(self.invalid_state(MapState::Mapped));
        }
        let size = self.size;
        let dst = self.as_mut_slice().ok_or(MapError::ReadOnly)?;

        let end = offset
            .checked_add(bytes.len())
            .filter(|&end| end <= size)
            .ok_or(MapError::SizeMismatch {
                requested: offset.saturating_add(bytes.len()),
                actual: size,
            })?;
        dst[offset..end].copy_from_slice(bytes);
        Ok(())
    }

    #[inline]
    pub fn granularity(&self) -> usize {
        granularity()
    }

    pub fn target(&self) -> &str {
        &self.options.target
    }

    pub fn access(&self) -> AccessMode {
        self.options.access
    }

    pub fn unlink_policy(&self) -> UnlinkPolicy {
        self.options.unlink
    }

    fn expect_state(&self, expected: MapState) -> Result<()> {
        if self.state() == expected {
            Ok(())
        } else {
            Err(self.invalid_state(expected))
        }
    }

    fn invalid_state(&self, expected: MapState) -> MapError {
        MapError::InvalidState {
            expected,
            actual: self.state(),
        }
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(name = %self.options.target, error = %e, "failed to tear down mapping");
        }
    }
}

impl std::fmt::Debug for Mapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapping")
            .field("target", &self.options.target)
            .field("access", &self.options.access)
            .field("size", &self.size)
            .field("state", &self.state())
            .field("kind", &self.backing_kind())
            .finish()
    }
}

/// OS allocation granularity for view placement and offsets
pub fn granularity() -> usize {
    Platform::granularity()
}

/// Removes a named shared segment left behind by a mapping that did not
/// unlink it. Succeeds if the segment does not exist.
pub fn remove_segment(name: &str) -> Result<()> {
    let name = SegmentName::new(name)?;
    Platform::unlink(&name)
}
