//! Windows backend: `VirtualAlloc`/`VirtualFree` with explicit flags.

#![allow(unsafe_code)]

use std::io;
use std::ptr::{self, NonNull};
use std::sync::OnceLock;

use vmarena_core::PageBackend;
use windows_sys::Win32::System::Memory::{
    VirtualAlloc, VirtualFree, MEM_COMMIT, MEM_DECOMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_NOACCESS,
    PAGE_READWRITE,
};
use windows_sys::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

/// Virtual-memory backend for the current platform.
///
/// Reserving uses `MEM_RESERVE` with no access, committing uses
/// `MEM_COMMIT` read/write, and releasing frees the whole reservation with
/// `MEM_RELEASE`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SystemBackend;

fn cached_page_size() -> usize {
    static PAGE_SIZE: OnceLock<usize> = OnceLock::new();
    *PAGE_SIZE.get_or_init(|| {
        // SAFETY: SYSTEM_INFO is plain data; GetSystemInfo fills it in.
        let info = unsafe {
            let mut info: SYSTEM_INFO = std::mem::zeroed();
            GetSystemInfo(&mut info);
            info
        };
        info.dwPageSize as usize
    })
}

impl PageBackend for SystemBackend {
    fn page_size(&self) -> usize {
        cached_page_size()
    }

    fn reserve(&self, size: usize) -> io::Result<NonNull<u8>> {
        // SAFETY: reserving without an address hint never aliases existing
        // memory.
        let ptr = unsafe { VirtualAlloc(ptr::null(), size, MEM_RESERVE, PAGE_NOACCESS) };
        NonNull::new(ptr.cast::<u8>()).ok_or_else(io::Error::last_os_error)
    }

    unsafe fn commit(&self, ptr: NonNull<u8>, size: usize) -> io::Result<()> {
        // SAFETY: the caller guarantees the range is inside one of our
        // reservations.
        let out = unsafe { VirtualAlloc(ptr.as_ptr().cast(), size, MEM_COMMIT, PAGE_READWRITE) };
        if out.is_null() {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    unsafe fn decommit(&self, ptr: NonNull<u8>, size: usize) -> io::Result<()> {
        // SAFETY: same range contract as `commit`; no references remain.
        if unsafe { VirtualFree(ptr.as_ptr().cast(), size, MEM_DECOMMIT) } == 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    unsafe fn release(&self, ptr: NonNull<u8>, _size: usize) -> io::Result<()> {
        // MEM_RELEASE requires a zero size and frees the whole reservation.
        // SAFETY: the caller passes the base of a live reservation.
        if unsafe { VirtualFree(ptr.as_ptr().cast(), 0, MEM_RELEASE) } == 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}
