//! The platform capability interface used by arenas.

use std::io;
use std::ptr::NonNull;

/// Virtual-memory primitives an arena is built on.
///
/// Exactly one implementation is compiled in per target platform (see
/// `vmarena_arena::platform::SystemBackend`). Arenas are generic over this
/// trait only so tests can wrap the system backend with fault injection;
/// there is no runtime dispatch.
///
/// Failures are reported per call. A failed call makes no promise about
/// rolling back side effects of earlier successful calls.
#[allow(unsafe_code)]
pub trait PageBackend {
    /// The granularity of reservation and protection changes, in bytes.
    ///
    /// Always a power of two.
    fn page_size(&self) -> usize;

    /// Reserve `size` bytes of address space with no backing and no access.
    ///
    /// The returned address is page-aligned and stays valid until
    /// [`PageBackend::release`] is called on it.
    fn reserve(&self, size: usize) -> io::Result<NonNull<u8>>;

    /// Grant read/write access and physical backing to `[ptr, ptr + size)`.
    ///
    /// Committing an already committed range is a no-op.
    ///
    /// # Safety
    ///
    /// The range must lie inside a single live reservation returned by
    /// [`PageBackend::reserve`] on this backend, and `ptr` must be
    /// page-aligned.
    unsafe fn commit(&self, ptr: NonNull<u8>, size: usize) -> io::Result<()>;

    /// Strip backing and access from `[ptr, ptr + size)`.
    ///
    /// # Safety
    ///
    /// Same range requirements as [`PageBackend::commit`]. No live
    /// reference may point into the range afterwards.
    unsafe fn decommit(&self, ptr: NonNull<u8>, size: usize) -> io::Result<()>;

    /// Return the whole reservation starting at `ptr` to the OS.
    ///
    /// # Safety
    ///
    /// `ptr` and `size` must be exactly the base and size of a live
    /// reservation from this backend. Every pointer into it is dangling
    /// once this returns.
    unsafe fn release(&self, ptr: NonNull<u8>, size: usize) -> io::Result<()>;
}

#[allow(unsafe_code)]
impl<B: PageBackend + ?Sized> PageBackend for &B {
    fn page_size(&self) -> usize {
        (**self).page_size()
    }

    fn reserve(&self, size: usize) -> io::Result<NonNull<u8>> {
        (**self).reserve(size)
    }

    unsafe fn commit(&self, ptr: NonNull<u8>, size: usize) -> io::Result<()> {
        // SAFETY: forwarded unchanged.
        unsafe { (**self).commit(ptr, size) }
    }

    unsafe fn decommit(&self, ptr: NonNull<u8>, size: usize) -> io::Result<()> {
        // SAFETY: forwarded unchanged.
        unsafe { (**self).decommit(ptr, size) }
    }

    unsafe fn release(&self, ptr: NonNull<u8>, size: usize) -> io::Result<()> {
        // SAFETY: forwarded unchanged.
        unsafe { (**self).release(ptr, size) }
    }
}
