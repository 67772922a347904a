//! Windows backend: named file-mapping sections and regular files, mapped
//! with `MapViewOfFile`

use super::{negotiate_size, Backing};
use crate::error::{MapError, Result};
use crate::name::SegmentName;
use crate::options::AccessMode;
use std::fs::{File, OpenOptions};
use std::io;
use std::mem::{self, ManuallyDrop, MaybeUninit};
use std::os::windows::io::{AsRawHandle, FromRawHandle, OwnedHandle};
use std::path::Path;
use std::ptr::{self, NonNull};
use windows_sys::Win32::Foundation::{GetLastError, ERROR_ALREADY_EXISTS, HANDLE, INVALID_HANDLE_VALUE};
use windows_sys::Win32::System::Memory::{
    CreateFileMappingW, FlushViewOfFile, MapViewOfFile, OpenFileMappingW, UnmapViewOfFile,
    VirtualQuery, FILE_MAP_READ, FILE_MAP_WRITE, MEMORY_BASIC_INFORMATION,
    MEMORY_MAPPED_VIEW_ADDRESS, PAGE_READONLY, PAGE_READWRITE,
};
use windows_sys::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

pub struct Windows;

/// Backing object: a pagefile-backed named section, or a file whose
/// section is created per view.
pub enum WinObject {
    Section(OwnedHandle),
    File(File),
}

/// A live view. File views own the section they were mapped from.
pub struct WinView {
    addr: NonNull<u8>,
    section: Option<OwnedHandle>,
}

impl WinView {
    fn release(self) -> io::Result<()> {
        let mut view = ManuallyDrop::new(self);
        let ok = unsafe { UnmapViewOfFile(view_address(view.addr)) } != 0;
        let err = io::Error::last_os_error();
        drop(view.section.take());
        if ok {
            Ok(())
        } else {
            Err(err)
        }
    }
}

impl Drop for WinView {
    fn drop(&mut self) {
        unsafe {
            UnmapViewOfFile(view_address(self.addr));
        }
    }
}

fn view_address(addr: NonNull<u8>) -> MEMORY_MAPPED_VIEW_ADDRESS {
    MEMORY_MAPPED_VIEW_ADDRESS {
        Value: addr.as_ptr().cast(),
    }
}

fn view_access(access: AccessMode) -> u32 {
    if access.is_writable() {
        FILE_MAP_READ | FILE_MAP_WRITE
    } else {
        FILE_MAP_READ
    }
}

fn page_protection(access: AccessMode) -> u32 {
    if access.is_writable() {
        PAGE_READWRITE
    } else {
        PAGE_READONLY
    }
}

/// Takes ownership of a handle returned by a Win32 call, null meaning failure.
fn owned(handle: HANDLE) -> io::Result<OwnedHandle> {
    if handle.is_null() {
        Err(io::Error::last_os_error())
    } else {
        Ok(unsafe { OwnedHandle::from_raw_handle(handle) })
    }
}

fn map_view(section: &OwnedHandle, access: AccessMode, len: usize) -> io::Result<NonNull<u8>> {
    let view = unsafe { MapViewOfFile(section.as_raw_handle(), view_access(access), 0, 0, len) };
    NonNull::new(view.Value.cast::<u8>()).ok_or_else(io::Error::last_os_error)
}

/// Size of an existing section, rounded up to whole pages.
fn section_size(section: &OwnedHandle) -> io::Result<u64> {
    let addr = map_view(section, AccessMode::ReadOnly, 0)?;

    let mut info = MaybeUninit::<MEMORY_BASIC_INFORMATION>::zeroed();
    let written = unsafe {
        VirtualQuery(
            addr.as_ptr().cast(),
            info.as_mut_ptr(),
            mem::size_of::<MEMORY_BASIC_INFORMATION>(),
        )
    };
    let err = io::Error::last_os_error();
    unsafe {
        UnmapViewOfFile(view_address(addr));
    }

    if written == 0 {
        return Err(err);
    }
    Ok(unsafe { info.assume_init() }.RegionSize as u64)
}

impl Backing for Windows {
    type Object = WinObject;
    type View = WinView;

    fn open_segment(
        name: &SegmentName,
        access: AccessMode,
        size: usize,
    ) -> Result<(WinObject, usize)> {
        let wide = name.to_wide();

        if access.is_writable() && size > 0 {
            let len = size as u64;
            let handle = unsafe {
                CreateFileMappingW(
                    INVALID_HANDLE_VALUE,
                    ptr::null(),
                    PAGE_READWRITE,
                    (len >> 32) as u32,
                    len as u32,
                    wide.as_ptr(),
                )
            };
            let last = unsafe { GetLastError() };
            let section = owned(handle).map_err(|source| MapError::SegmentCreate {
                name: name.as_str().to_string(),
                source,
            })?;

            // An existing section keeps the size it was created with
            if last == ERROR_ALREADY_EXISTS {
                return Err(MapError::SegmentInUse {
                    name: name.as_str().to_string(),
                });
            }
            return Ok((WinObject::Section(section), size));
        }

        let handle = unsafe { OpenFileMappingW(view_access(access), 0, wide.as_ptr()) };
        let section = owned(handle).map_err(|source| MapError::SegmentOpen {
            name: name.as_str().to_string(),
            source,
        })?;

        let size = negotiate_size(access, size, |_| Ok(()), || section_size(&section))?;
        Ok((WinObject::Section(section), size))
    }

    fn open_file(path: &Path, access: AccessMode, size: usize) -> Result<(WinObject, usize)> {
        let creates = access.is_writable() && size > 0;

        let file = OpenOptions::new()
            .read(true)
            .write(access.is_writable())
            .create(creates)
            .truncate(creates)
            .open(path)
            .map_err(|source| MapError::FileOpen {
                path: path.to_path_buf(),
                source,
            })?;

        let size = negotiate_size(access, size, |len| file.set_len(len), || {
            file.metadata().map(|m| m.len())
        })?;
        Ok((WinObject::File(file), size))
    }

    fn map(object: &WinObject, len: usize, access: AccessMode) -> Result<WinView> {
        if len == 0 {
            return Err(MapError::EmptyObject);
        }

        match object {
            WinObject::Section(section) => {
                let addr = map_view(section, access, len).map_err(MapError::Mmap)?;
                Ok(WinView { addr, section: None })
            }
            WinObject::File(file) => {
                let handle = unsafe {
                    CreateFileMappingW(
                        file.as_raw_handle(),
                        ptr::null(),
                        page_protection(access),
                        0,
                        0,
                        ptr::null(),
                    )
                };
                let section = owned(handle).map_err(MapError::Mmap)?;
                let addr = map_view(&section, access, len).map_err(MapError::Mmap)?;
                Ok(WinView {
                    addr,
                    section: Some(section),
                })
            }
        }
    }

    #[inline]
    fn view_ptr(view: &WinView) -> NonNull<u8> {
        view.addr
    }

    fn flush(view: &WinView, len: usize) -> Result<()> {
        if unsafe { FlushViewOfFile(view.addr.as_ptr().cast(), len) } == 0 {
            return Err(MapError::Flush(io::Error::last_os_error()));
        }
        Ok(())
    }

    fn unmap(view: WinView, _len: usize) -> Result<()> {
        view.release().map_err(MapError::Munmap)
    }

    fn release(object: WinObject) -> Result<()> {
        drop(object);
        Ok(())
    }

    fn unlink(_name: &SegmentName) -> Result<()> {
        // Sections disappear with their last handle
        Ok(())
    }

    fn granularity() -> usize {
        let mut info = MaybeUninit::<SYSTEM_INFO>::zeroed();
        let info = unsafe {
            GetSystemInfo(info.as_mut_ptr());
            info.assume_init()
        };
        info.dwAllocationGranularity as usize
    }
}
