//! POSIX backend: `shm_open` segments and regular files, mapped with `mmap`

use super::{negotiate_size, Backing};
use crate::error::{MapError, Result};
use crate::name::SegmentName;
use crate::options::AccessMode;
use rustix::fd::OwnedFd;
use rustix::fs::{fstat, ftruncate};
use rustix::io::Errno;
use rustix::mm::{mmap, msync, munmap, MapFlags, MsyncFlags, ProtFlags};
use rustix::shm::{shm_open, shm_unlink, Mode, ShmOFlags};
use std::fs::OpenOptions;
use std::io;
use std::mem::ManuallyDrop;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::ptr::NonNull;

/// Permission bits for created files (owner read/write)
const CREATE_MODE: u32 = 0o600;

pub struct Posix;

/// A live `mmap` region. Dropping it unmaps silently.
pub struct PosixView {
    addr: NonNull<u8>,
    len: usize,
}

impl PosixView {
    fn release(self) -> io::Result<()> {
        let view = ManuallyDrop::new(self);
        unsafe { munmap(view.addr.as_ptr().cast(), view.len) }.map_err(Into::into)
    }
}

impl Drop for PosixView {
    fn drop(&mut self) {
        unsafe {
            let _ = munmap(self.addr.as_ptr().cast(), self.len);
        }
    }
}

fn fd_len(fd: &OwnedFd) -> io::Result<u64> {
    let stat = fstat(fd)?;
    Ok(stat.st_size as u64)
}

fn fd_set_len(fd: &OwnedFd, len: u64) -> io::Result<()> {
    ftruncate(fd, len).map_err(Into::into)
}

impl Backing for Posix {
    type Object = OwnedFd;
    type View = PosixView;

    fn open_segment(
        name: &SegmentName,
        access: AccessMode,
        size: usize,
    ) -> Result<(OwnedFd, usize)> {
        let c_name = name.to_posix();
        let creates = access.is_writable() && size > 0;

        let flags = match (access, creates) {
            (_, true) => ShmOFlags::CREATE | ShmOFlags::TRUNC | ShmOFlags::RDWR,
            (AccessMode::ReadWrite, false) => ShmOFlags::RDWR,
            (AccessMode::ReadOnly, false) => ShmOFlags::RDONLY,
        };

        let fd = shm_open(c_name.as_c_str(), flags, Mode::RUSR | Mode::WUSR)
            .map_err(|e| {
                let name = name.as_str().to_string();
                if creates {
                    MapError::SegmentCreate { name, source: e.into() }
                } else {
                    MapError::SegmentOpen { name, source: e.into() }
                }
            })?;

        match negotiate_size(access, size, |len| fd_set_len(&fd, len), || fd_len(&fd)) {
            Ok(size) => Ok((fd, size)),
            Err(e) => {
                drop(fd);
                // A segment this call created must not outlive the failed open
                if creates {
                    let _ = Self::unlink(name);
                }
                Err(e)
            }
        }
    }

    fn open_file(path: &Path, access: AccessMode, size: usize) -> Result<(OwnedFd, usize)> {
        let creates = access.is_writable() && size > 0;

        let file = OpenOptions::new()
            .read(true)
            .write(access.is_writable())
            .create(creates)
            .truncate(creates)
            .mode(CREATE_MODE)
            .open(path)
            .map_err(|source| MapError::FileOpen {
                path: path.to_path_buf(),
                source,
            })?;
        let fd = OwnedFd::from(file);

        let size = negotiate_size(access, size, |len| fd_set_len(&fd, len), || fd_len(&fd))?;
        Ok((fd, size))
    }

    fn map(object: &OwnedFd, len: usize, access: AccessMode) -> Result<PosixView> {
        if len == 0 {
            return Err(MapError::EmptyObject);
        }

        let prot = if access.is_writable() {
            ProtFlags::READ | ProtFlags::WRITE
        } else {
            ProtFlags::READ
        };

        let addr = unsafe {
            mmap(std::ptr::null_mut(), len, prot, MapFlags::SHARED, object, 0)
                .map_err(|e| MapError::Mmap(e.into()))?
        };

        let addr = NonNull::new(addr.cast::<u8>())
            .ok_or_else(|| MapError::Mmap(io::Error::other("mmap returned null")))?;

        Ok(PosixView { addr, len })
    }

    #[inline]
    fn view_ptr(view: &PosixView) -> NonNull<u8> {
        view.addr
    }

    fn flush(view: &PosixView, len: usize) -> Result<()> {
        unsafe { msync(view.addr.as_ptr().cast(), len, MsyncFlags::SYNC) }
            .map_err(|e| MapError::Flush(e.into()))
    }

    fn unmap(view: PosixView, _len: usize) -> Result<()> {
        view.release().map_err(MapError::Munmap)
    }

    fn release(object: OwnedFd) -> Result<()> {
        // close(2) errors are not reported through OwnedFd
        drop(object);
        Ok(())
    }

    fn unlink(name: &SegmentName) -> Result<()> {
        match shm_unlink(name.to_posix().as_c_str()) {
            Ok(()) => Ok(()),
            Err(e) if e == Errno::NOENT => Ok(()),
            Err(e) => Err(MapError::Release(e.into())),
        }
    }

    fn granularity() -> usize {
        rustix::param::page_size()
    }
}
