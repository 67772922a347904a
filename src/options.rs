//! Mapping configuration

use std::fmt;

/// Access requested for both the backing object and its view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    /// Open existing objects only; views are read-only
    ReadOnly,
    /// Open or create; views are read+write
    #[default]
    ReadWrite,
}

impl AccessMode {
    #[inline]
    pub fn is_writable(self) -> bool {
        matches!(self, AccessMode::ReadWrite)
    }
}

/// Kind of OS object backing a mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackingKind {
    /// Named OS-managed shared memory segment
    Segment,
    /// Regular file on disk
    File,
}

/// Lifecycle state of a [`Mapping`](crate::Mapping)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapState {
    Closed,
    Open,
    Mapped,
}

impl fmt::Display for MapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MapState::Closed => "closed",
            MapState::Open => "open",
            MapState::Mapped => "mapped",
        })
    }
}

/// Who removes a named shared segment when a mapping is closed.
///
/// File-backed mappings are never removed; the file persists on disk.
/// Windows destroys named sections when the last handle goes away, so
/// the policy has no effect there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnlinkPolicy {
    /// Only the mapping that created the segment unlinks it; attachers detach
    #[default]
    Creator,
    /// Unlink on every close, whoever opened it
    Always,
    /// Leave the segment in place (see [`remove_segment`](crate::remove_segment))
    Never,
}

impl UnlinkPolicy {
    pub(crate) fn should_unlink(self, created: bool) -> bool {
        match self {
            UnlinkPolicy::Creator => created,
            UnlinkPolicy::Always => true,
            UnlinkPolicy::Never => false,
        }
    }
}

/// Mapping configuration
#[derive(Debug, Clone)]
pub struct MapOptions {
    /// Segment name or file path
    pub target: String,
    /// Access mode for the object and the view
    pub access: AccessMode,
    /// Requested size in bytes; `0` adopts the existing object's size
    pub size: usize,
    /// Segment removal policy on close
    pub unlink: UnlinkPolicy,
}

impl MapOptions {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            access: AccessMode::default(),
            size: 0,
            unlink: UnlinkPolicy::default(),
        }
    }

    pub fn access(mut self, access: AccessMode) -> Self {
        self.access = access;
        self
    }

    pub fn read_only(self) -> Self {
        self.access(AccessMode::ReadOnly)
    }

    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn unlink(mut self, unlink: UnlinkPolicy) -> Self {
        self.unlink = unlink;
        self
    }

    /// Whether opening with these options creates (and truncates) the object
    #[inline]
    pub fn creates(&self) -> bool {
        self.access.is_writable() && self.size > 0
    }
}
