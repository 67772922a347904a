//! C Bindings for VenomMap
//!
//! Mirrors the [`Mapping`] API with boolean results. Failures are logged at
//! debug level and reported as `false`.

use crate::mapping::{granularity, Mapping};
use crate::options::AccessMode;
use crate::Result;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr;
use tracing::debug;

/// Opaque handle
pub struct VenomMapHandle(Mapping);

fn report(op: &str, result: Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            debug!(op, error = %e, "venom_map call failed");
            false
        }
    }
}

/// Create a closed mapping
///
/// `size == 0` adopts the existing object's size on open.
///
/// # Safety
/// target must be a valid null-terminated string
#[no_mangle]
pub unsafe extern "C" fn venom_map_new(
    target: *const c_char,
    size: usize,
    read_only: bool,
) -> *mut VenomMapHandle {
    if target.is_null() {
        return ptr::null_mut();
    }

    let c_str = CStr::from_ptr(target);
    let str_slice = match c_str.to_str() {
        Ok(s) => s,
        Err(_) => return ptr::null_mut(),
    };

    let access = if read_only {
        AccessMode::ReadOnly
    } else {
        AccessMode::ReadWrite
    };

    Box::into_raw(Box::new(VenomMapHandle(Mapping::with_size(
        str_slice, size, access,
    ))))
}

/// Destroy a handle, closing the mapping
#[no_mangle]
pub unsafe extern "C" fn venom_map_destroy(handle: *mut VenomMapHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Open the target as a shared memory segment
#[no_mangle]
pub unsafe extern "C" fn venom_map_open(handle: *mut VenomMapHandle) -> bool {
    match handle.as_mut() {
        Some(h) => report("open", h.0.open()),
        None => false,
    }
}

/// Open the target as a file
#[no_mangle]
pub unsafe extern "C" fn venom_map_open_file(handle: *mut VenomMapHandle) -> bool {
    match handle.as_mut() {
        Some(h) => report("open_file", h.0.open_file()),
        None => false,
    }
}

#[no_mangle]
pub unsafe extern "C" fn venom_map_map(handle: *mut VenomMapHandle) -> bool {
    match handle.as_mut() {
        Some(h) => report("map", h.0.map()),
        None => false,
    }
}

#[no_mangle]
pub unsafe extern "C" fn venom_map_unmap(handle: *mut VenomMapHandle) -> bool {
    match handle.as_mut() {
        Some(h) => report("unmap", h.0.unmap()),
        None => false,
    }
}

/// Unmap and release; the handle stays valid and can be reopened
#[no_mangle]
pub unsafe extern "C" fn venom_map_close(handle: *mut VenomMapHandle) -> bool {
    match handle.as_mut() {
        Some(h) => report("close", h.0.close()),
        None => false,
    }
}

#[no_mangle]
pub unsafe extern "C" fn venom_map_is_open(handle: *const VenomMapHandle) -> bool {
    handle.as_ref().is_some_and(|h| h.0.is_open())
}

#[no_mangle]
pub unsafe extern "C" fn venom_map_is_mapped(handle: *const VenomMapHandle) -> bool {
    handle.as_ref().is_some_and(|h| h.0.is_mapped())
}

#[no_mangle]
pub unsafe extern "C" fn venom_map_size(handle: *const VenomMapHandle) -> usize {
    handle.as_ref().map_or(0, |h| h.0.size())
}

/// Get raw pointer to the mapped bytes, null when not mapped
#[no_mangle]
pub unsafe extern "C" fn venom_map_data(handle: *const VenomMapHandle) -> *mut u8 {
    handle.as_ref().map_or(ptr::null_mut(), |h| h.0.data())
}

#[no_mangle]
pub extern "C" fn venom_map_granularity() -> usize {
    granularity()
}
