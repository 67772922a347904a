//! VenomMap - portable shared memory and file mapping
//!
//! One API for mapping a named shared memory segment (volatile,
//! process-to-process IPC) or a file on disk (persistent) into the address
//! space, with explicit control over access and size.
//!
//! # Lifecycle
//!
//! - **Open**: [`Mapping::open`] for a named segment, [`Mapping::open_file`]
//!   for a file. Write access with a size creates or truncates; otherwise
//!   the existing object's size is adopted.
//! - **Map**: [`Mapping::map`] views the whole object from offset zero.
//! - **Close**: [`Mapping::close`], or drop, unmaps then releases.
//!
//! # Example
//!
//! ```no_run
//! use venom_map::{AccessMode, Mapping};
//!
//! let mut writer = Mapping::with_size("venom_demo", 64, AccessMode::ReadWrite);
//! writer.open()?;
//! writer.map()?;
//! writer.write_at(0, &[1, 2, 3, 4])?;
//!
//! let mut reader = Mapping::new("venom_demo", AccessMode::ReadOnly);
//! reader.open()?;
//! reader.map()?;
//! assert_eq!(&reader.as_slice().unwrap()[..4], &[1, 2, 3, 4]);
//! # Ok::<(), venom_map::MapError>(())
//! ```
//!
//! Synchronisation between attachers is left to the caller.

pub mod bindings;
pub mod error;
pub mod mapping;
pub mod name;
pub mod options;
pub mod platform;

pub use error::{MapError, Result};
pub use mapping::{granularity, remove_segment, Mapping};
pub use options::{AccessMode, BackingKind, MapOptions, MapState, UnlinkPolicy};
