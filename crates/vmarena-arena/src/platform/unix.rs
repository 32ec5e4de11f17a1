//! Unix backend: anonymous mappings with protection-based commit.

#![allow(unsafe_code)]

use std::io;
use std::ptr::{self, NonNull};
use std::sync::OnceLock;

use vmarena_core::PageBackend;

/// Virtual-memory backend for the current platform.
///
/// Reserving maps `PROT_NONE` anonymous memory, committing flips pages to
/// read/write with `mprotect`, and releasing unmaps the whole range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SystemBackend;

fn cached_page_size() -> usize {
    static PAGE_SIZE: OnceLock<usize> = OnceLock::new();
    *PAGE_SIZE.get_or_init(|| {
        // SAFETY: sysconf has no preconditions.
        let raw = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if raw > 0 {
            raw as usize
        } else {
            4096
        }
    })
}

fn check(ret: libc::c_int) -> io::Result<()> {
    if ret == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

impl PageBackend for SystemBackend {
    fn page_size(&self) -> usize {
        cached_page_size()
    }

    fn reserve(&self, size: usize) -> io::Result<NonNull<u8>> {
        // SAFETY: a private anonymous mapping without an address hint never
        // aliases existing memory.
        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size,
                libc::PROT_NONE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        NonNull::new(ptr.cast::<u8>()).ok_or_else(|| io::Error::other("mmap returned null"))
    }

    unsafe fn commit(&self, ptr: NonNull<u8>, size: usize) -> io::Result<()> {
        // SAFETY: the caller guarantees the range is inside one of our
        // reservations and page-aligned.
        check(unsafe {
            libc::mprotect(
                ptr.as_ptr().cast(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
            )
        })
    }

    unsafe fn decommit(&self, ptr: NonNull<u8>, size: usize) -> io::Result<()> {
        // Dropping the pages is advisory; only the protection change decides
        // success.
        // SAFETY: same range contract as `commit`; no references remain.
        unsafe {
            libc::madvise(ptr.as_ptr().cast(), size, libc::MADV_DONTNEED);
            check(libc::mprotect(ptr.as_ptr().cast(), size, libc::PROT_NONE))
        }
    }

    unsafe fn release(&self, ptr: NonNull<u8>, size: usize) -> io::Result<()> {
        // SAFETY: the caller passes the exact base and size of a live
        // reservation.
        check(unsafe { libc::munmap(ptr.as_ptr().cast(), size) })
    }
}
