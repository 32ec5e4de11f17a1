//! The virtual-memory arena.
//!
//! An [`Arena`] reserves its whole address range at creation and commits
//! it lazily in `commit_size` steps as the bump offset advances. The
//! bookkeeping lives in-band: a header record occupies the first
//! [`HEADER_SIZE`] bytes of the region, and the `Arena` value itself is
//! only a pointer to that header plus the backend.
//!
//! ```text
//! base                                                     base + reserve_size
//! ├─ header ─┬──── live allocations ────┬── committed, free ──┬── reserved ──┤
//! 0     HEADER_SIZE                    pos               commit_pos
//! ```
//!
//! Rewinding (pop, pop_to, clear) only moves `pos`. Committed pages are
//! kept for the next push.

#![allow(unsafe_code)]

use std::cell::Cell;
use std::fmt;
use std::mem::{self, MaybeUninit};
use std::ptr::NonNull;

use tracing::{debug, error, trace, warn};
use vmarena_core::{align_up, align_up_pow2, ArenaConfig, ArenaError, ArenaId, PageBackend};

use crate::platform::SystemBackend;

/// Bookkeeping stored at offset 0 of every arena region.
#[repr(C)]
struct ArenaHeader {
    reserve_size: usize,
    commit_size: usize,
    pos: Cell<usize>,
    commit_pos: Cell<usize>,
}

/// Bytes at the start of every arena taken by its own header.
///
/// A fresh or cleared arena has `pos() == HEADER_SIZE`.
pub const HEADER_SIZE: usize = mem::size_of::<ArenaHeader>();

/// Alignment of every [`Arena::push`]: the platform pointer alignment.
pub const ARENA_ALIGN: usize = mem::align_of::<*const u8>();

/// A reserved virtual-address region with bump allocation.
///
/// Pushing takes `&self`, so several allocations can be alive at once.
/// Every rewind takes `&mut self`, which guarantees no reference handed out
/// by a push survives the memory being reused.
///
/// Dropping the arena releases the whole reservation.
pub struct Arena<B: PageBackend = SystemBackend> {
    header: NonNull<ArenaHeader>,
    backend: B,
}

// SAFETY: the arena exclusively owns its reservation and the header cells
// are only reachable through this handle. It is deliberately not `Sync`.
unsafe impl<B: PageBackend + Send> Send for Arena<B> {}

impl Arena<SystemBackend> {
    /// Create an arena on the platform backend.
    pub fn new(config: ArenaConfig) -> Result<Self, ArenaError> {
        Self::with_backend(config, SystemBackend)
    }
}

impl<B: PageBackend> Arena<B> {
    /// Create an arena on an explicit backend.
    ///
    /// Sizes are normalized with [`ArenaConfig::normalized`]. The whole
    /// reservation is made up front and the first `commit_size` bytes are
    /// committed to hold the header. If that commit fails the reservation
    /// is released before the error is returned.
    pub fn with_backend(config: ArenaConfig, backend: B) -> Result<Self, ArenaError> {
        let config = config.normalized(backend.page_size(), HEADER_SIZE)?;

        let base = backend.reserve(config.reserve_size).map_err(|err| {
            warn!(size = config.reserve_size, %err, "arena reservation failed");
            ArenaError::ReservationFailed {
                size: config.reserve_size,
                os_code: err.raw_os_error(),
            }
        })?;

        // SAFETY: `base` starts a fresh reservation of `reserve_size` bytes
        // and `commit_size <= reserve_size` after normalization.
        if let Err(err) = unsafe { backend.commit(base, config.commit_size) } {
            warn!(size = config.commit_size, %err, "initial arena commit failed");
            // SAFETY: exact base and size of the reservation above; nothing
            // points into it yet.
            if let Err(release_err) = unsafe { backend.release(base, config.reserve_size) } {
                warn!(%release_err, "releasing reservation after failed commit");
            }
            return Err(ArenaError::CommitFailed {
                offset: 0,
                size: config.commit_size,
                os_code: err.raw_os_error(),
            });
        }

        let header = base.cast::<ArenaHeader>();
        // SAFETY: the first page is committed read/write, and a page-aligned
        // base satisfies the header's alignment.
        unsafe {
            header.as_ptr().write(ArenaHeader {
                reserve_size: config.reserve_size,
                commit_size: config.commit_size,
                pos: Cell::new(HEADER_SIZE),
                commit_pos: Cell::new(config.commit_size),
            });
        }

        let arena = Self { header, backend };
        debug!(
            id = %arena.id(),
            reserve_size = config.reserve_size,
            commit_size = config.commit_size,
            "arena created"
        );
        Ok(arena)
    }

    /// Release the reservation. Equivalent to dropping the arena.
    pub fn destroy(self) {
        drop(self);
    }

    fn header(&self) -> &ArenaHeader {
        // SAFETY: the header is written in `with_backend` and stays committed
        // until `drop` releases the region.
        unsafe { self.header.as_ref() }
    }

    fn base(&self) -> NonNull<u8> {
        self.header.cast::<u8>()
    }

    /// Bump-allocate `size` bytes aligned to [`ARENA_ALIGN`].
    ///
    /// Commits more of the reservation when the allocation runs past the
    /// committed prefix, rounding the new commit end up to a multiple of
    /// `commit_size` (capped at the reserve end). On any error the arena
    /// is left exactly as it was.
    ///
    /// With `zero_init` the returned bytes are zeroed; otherwise they hold
    /// whatever a previous, rewound allocation left there.
    pub fn push(&self, size: usize, zero_init: bool) -> Result<NonNull<u8>, ArenaError> {
        self.push_aligned(size, ARENA_ALIGN, zero_init)
    }

    /// Bump-allocate `size` bytes at an address aligned to `align`.
    ///
    /// `align` must be a power of two. Alignment is applied to the absolute
    /// address, so alignments larger than a page are honoured too.
    pub(crate) fn push_aligned(
        &self,
        size: usize,
        align: usize,
        zero_init: bool,
    ) -> Result<NonNull<u8>, ArenaError> {
        debug_assert!(align.is_power_of_two());
        let header = self.header();
        let reserve_size = header.reserve_size;
        let pos = header.pos.get();
        let base_addr = self.base().as_ptr() as usize;

        let aligned = base_addr
            .checked_add(pos)
            .and_then(|addr| align_up_pow2(addr, align))
            .map(|addr| addr - base_addr)
            .filter(|&offset| offset <= reserve_size);
        let Some(aligned) = aligned else {
            return Err(ArenaError::CapacityExceeded {
                requested: size,
                available: 0,
            });
        };
        let new_pos = match aligned.checked_add(size) {
            Some(end) if end <= reserve_size => end,
            _ => {
                return Err(ArenaError::CapacityExceeded {
                    requested: size,
                    available: reserve_size - aligned,
                })
            }
        };

        if new_pos > header.commit_pos.get() {
            self.grow_commit(new_pos)?;
        }

        header.pos.set(new_pos);
        if header.pos.get() > reserve_size || header.commit_pos.get() > reserve_size {
            abort_on_corruption(header.pos.get(), header.commit_pos.get(), reserve_size);
        }

        // SAFETY: `aligned + size <= commit_pos`, so the range is inside the
        // committed prefix and past the header.
        let ptr = unsafe { self.base().add(aligned) };
        if zero_init {
            // SAFETY: `size` committed bytes starting at `ptr`, see above.
            unsafe { ptr.as_ptr().write_bytes(0, size) };
        }
        Ok(ptr)
    }

    fn grow_commit(&self, required_end: usize) -> Result<(), ArenaError> {
        let header = self.header();
        let commit_pos = header.commit_pos.get();
        let new_commit = align_up(required_end, header.commit_size)
            .map_or(header.reserve_size, |end| end.min(header.reserve_size));
        let size = new_commit - commit_pos;

        // SAFETY: `[commit_pos, new_commit)` is inside the reservation, and
        // `commit_pos` is a page multiple because both the commit size and
        // the reserve size are.
        let result = unsafe { self.backend.commit(self.base().add(commit_pos), size) };
        if let Err(err) = result {
            warn!(id = %self.id(), offset = commit_pos, size, %err, "arena commit failed");
            return Err(ArenaError::CommitFailed {
                offset: commit_pos,
                size,
                os_code: err.raw_os_error(),
            });
        }

        trace!(id = %self.id(), from = commit_pos, to = new_commit, "arena commit grew");
        header.commit_pos.set(new_commit);
        Ok(())
    }

    /// Push `size` zeroed bytes and borrow them as a slice.
    #[allow(clippy::mut_from_ref)]
    pub fn push_bytes(&self, size: usize) -> Result<&mut [u8], ArenaError> {
        let ptr = self.push(size, true)?;
        // SAFETY: `push` handed out `size` fresh, zeroed bytes that no other
        // reference covers. Reuse needs `&mut self`, which this borrow blocks.
        Ok(unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), size) })
    }

    /// Push `size` bytes without zeroing them.
    #[allow(clippy::mut_from_ref)]
    pub fn push_bytes_uninit(&self, size: usize) -> Result<&mut [MaybeUninit<u8>], ArenaError> {
        let ptr = self.push(size, false)?;
        // SAFETY: as in `push_bytes`; `MaybeUninit` makes no claim about the
        // contents.
        Ok(unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr().cast(), size) })
    }

    /// Rewind the bump offset by `size` bytes, stopping at the header.
    pub fn pop(&mut self, size: usize) {
        let header = self.header();
        let pos = header.pos.get();
        header.pos.set(pos - size.min(pos - HEADER_SIZE));
    }

    /// Rewind the bump offset to `pos`.
    ///
    /// Targets inside the header are clamped to [`HEADER_SIZE`]. Targets at
    /// or past the current offset are ignored; this never grows the arena.
    pub fn pop_to(&mut self, pos: usize) {
        self.rewind_to(pos);
    }

    /// Rewind to an empty arena. Committed memory is kept.
    pub fn clear(&mut self) {
        self.rewind_to(HEADER_SIZE);
    }

    /// Shared-borrow rewind for guards that already own the only path to
    /// the memory above `pos`.
    pub(crate) fn rewind_to(&self, pos: usize) {
        let header = self.header();
        let target = pos.max(HEADER_SIZE);
        if target < header.pos.get() {
            header.pos.set(target);
        }
    }

    /// Identity of this arena: its base address.
    pub fn id(&self) -> ArenaId {
        ArenaId::from_ptr(self.base().as_ptr())
    }

    /// Current bump offset from the arena base, header included.
    pub fn pos(&self) -> usize {
        self.header().pos.get()
    }

    /// Offset up to which the region is backed by memory.
    pub fn commit_pos(&self) -> usize {
        self.header().commit_pos.get()
    }

    /// Total reserved address space, after page rounding.
    pub fn reserve_size(&self) -> usize {
        self.header().reserve_size
    }

    /// Commit granularity, after page rounding.
    pub fn commit_size(&self) -> usize {
        self.header().commit_size
    }

    /// Bytes handed out since the arena was last empty, padding included.
    pub fn used(&self) -> usize {
        self.pos() - HEADER_SIZE
    }

    /// Bytes between the bump offset and the end of the reservation.
    pub fn remaining(&self) -> usize {
        self.reserve_size() - self.pos()
    }

    /// The backend this arena was created on.
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[cold]
#[inline(never)]
fn abort_on_corruption(pos: usize, commit_pos: usize, reserve_size: usize) -> ! {
    error!(
        pos,
        commit_pos,
        reserve_size,
        "arena offsets ran past the reservation; aborting"
    );
    std::process::abort()
}

impl<B: PageBackend> Drop for Arena<B> {
    fn drop(&mut self) {
        let id = self.id();
        let reserve_size = self.reserve_size();
        // SAFETY: base and size of the reservation made in `with_backend`.
        // `&mut self` means no borrow of the region is alive.
        match unsafe { self.backend.release(self.base(), reserve_size) } {
            Ok(()) => debug!(%id, reserve_size, "arena destroyed"),
            Err(err) => warn!(%id, reserve_size, %err, "arena release failed"),
        }
    }
}

impl<B: PageBackend> fmt::Debug for Arena<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("id", &self.id())
            .field("pos", &self.pos())
            .field("commit_pos", &self.commit_pos())
            .field("reserve_size", &self.reserve_size())
            .field("commit_size", &self.commit_size())
            .finish()
    }
}
