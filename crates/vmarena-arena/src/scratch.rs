//! Per-thread scratch arenas for short-lived, function-scoped allocation.
//!
//! Each thread owns [`SCRATCH_SLOTS`] lazily-created arenas (64 MiB
//! reserved, 1 MiB commit steps). [`get_scratch`] checks one out as a
//! [`Scratch`] guard, skipping any arena the caller already holds, and the
//! guard rewinds the arena when released. The arenas themselves are reused
//! across calls and only torn down by [`destroy_all_scratch`] or at thread
//! exit.
//!
//! Two slots cover the usual shape: a function takes scratch space and
//! calls a helper that needs its own, without either aliasing the other.
//! A helper that does not list the caller's arena as a conflict may be
//! handed the same arena again; the guards then nest, and must be released
//! innermost first.
//!
//! ```
//! use vmarena_arena::scratch::get_scratch;
//!
//! let outer = get_scratch(&[]).unwrap();
//! let buf = outer.push_bytes(256).unwrap();
//! buf[0] = 1;
//!
//! let inner = get_scratch(&[outer.id()]).unwrap();
//! assert_ne!(inner.id(), outer.id());
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use tracing::debug;
use vmarena_core::{ArenaConfig, ArenaError, ArenaId};

use crate::arena::Arena;

/// Number of scratch arenas each thread owns.
pub const SCRATCH_SLOTS: usize = 2;

/// A scratch arena and the number of live guards nested on it.
struct ScratchArena {
    arena: Arena,
    depth: Cell<usize>,
}

struct ScratchSlot {
    arena: RefCell<Option<Rc<ScratchArena>>>,
}

impl ScratchSlot {
    const fn new() -> Self {
        Self {
            arena: RefCell::new(None),
        }
    }

    fn arena_id(&self) -> Option<ArenaId> {
        self.arena.borrow().as_ref().map(|entry| entry.arena.id())
    }
}

struct ScratchPool {
    slots: [ScratchSlot; SCRATCH_SLOTS],
}

impl ScratchPool {
    const fn new() -> Self {
        Self {
            slots: [ScratchSlot::new(), ScratchSlot::new()],
        }
    }

    fn checkout(&self, conflicts: &[ArenaId]) -> Result<Scratch, ArenaError> {
        for (index, slot) in self.slots.iter().enumerate() {
            let mut entry = slot.arena.borrow_mut();
            let scratch = match entry.as_ref() {
                Some(existing) if conflicts.contains(&existing.arena.id()) => continue,
                Some(existing) => Rc::clone(existing),
                None => {
                    let created = Rc::new(ScratchArena {
                        arena: Arena::new(ArenaConfig::scratch())?,
                        depth: Cell::new(0),
                    });
                    debug!(slot = index, id = %created.arena.id(), "scratch arena created");
                    *entry = Some(Rc::clone(&created));
                    created
                }
            };
            let depth = scratch.depth.get() + 1;
            scratch.depth.set(depth);
            let start = scratch.arena.pos();
            return Ok(Scratch {
                scratch,
                slot: index,
                start,
                depth,
            });
        }
        Err(ArenaError::ScratchExhausted {
            slots: SCRATCH_SLOTS,
        })
    }

    fn destroy_all(&self) {
        for (index, slot) in self.slots.iter().enumerate() {
            if let Some(entry) = slot.arena.borrow_mut().take() {
                debug!(
                    slot = index,
                    id = %entry.arena.id(),
                    live_guards = entry.depth.get(),
                    "scratch arena destroyed"
                );
            }
        }
    }
}

thread_local! {
    static POOL: ScratchPool = const { ScratchPool::new() };
}

/// A checked-out scratch arena.
///
/// Derefs to [`Arena`] for pushing. Rewinding is only possible by
/// releasing the guard, which returns the arena to the offset it had at
/// checkout. Guards nested on the same arena must be released in reverse
/// order of checkout. The guard is tied to the thread that created it.
#[must_use = "dropping a Scratch immediately releases it"]
pub struct Scratch {
    scratch: Rc<ScratchArena>,
    slot: usize,
    start: usize,
    depth: usize,
}

impl Scratch {
    /// Which of the thread's slots this scratch arena lives in.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Identity of the underlying arena, for passing as a conflict.
    pub fn id(&self) -> ArenaId {
        self.scratch.arena.id()
    }

    /// Bump offset the arena will be rewound to on release.
    pub fn start_pos(&self) -> usize {
        self.start
    }

    /// Nesting depth of this guard on its arena, starting at 1.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Rewind the arena and hand the slot back. Equivalent to dropping.
    ///
    /// # Panics
    ///
    /// Panics if a guard checked out later on the same arena is still
    /// alive.
    pub fn release(self) {
        drop(self);
    }
}

impl Deref for Scratch {
    type Target = Arena;

    fn deref(&self) -> &Arena {
        &self.scratch.arena
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let live = self.scratch.depth.get();
        if live != self.depth {
            // Unwinding already drops guards in whatever order they were
            // stored; leave the offset alone rather than abort.
            if std::thread::panicking() {
                return;
            }
            panic!(
                "scratch arena {} released out of order: guard at depth {} while {} are live",
                self.scratch.arena.id(),
                self.depth,
                live,
            );
        }
        // This is the innermost live guard, so nothing above `start` is
        // reachable through any other guard.
        self.scratch.arena.rewind_to(self.start);
        self.scratch.depth.set(live - 1);
    }
}

impl fmt::Debug for Scratch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scratch")
            .field("slot", &self.slot)
            .field("depth", &self.depth)
            .field("start", &self.start)
            .field("arena", &self.scratch.arena)
            .finish()
    }
}

/// Check out a scratch arena that is not in `conflicts`.
///
/// Slots are examined in order and the first one whose arena is not listed
/// in `conflicts` is returned, creating its arena on first use. A slot
/// that already has live guards is handed out again, nested on top of
/// them. Fails with [`ArenaError::ScratchExhausted`] when every slot
/// conflicts; callers must treat that as a hard failure.
pub fn get_scratch(conflicts: &[ArenaId]) -> Result<Scratch, ArenaError> {
    POOL.with(|pool| pool.checkout(conflicts))
}

/// Release a scratch arena. Same as [`Scratch::release`].
pub fn release_scratch(scratch: Scratch) {
    scratch.release();
}

/// Destroy this thread's scratch arenas.
///
/// Later [`get_scratch`] calls create fresh ones. A [`Scratch`] that is
/// still alive keeps its arena until it is dropped.
pub fn destroy_all_scratch() {
    POOL.with(ScratchPool::destroy_all);
}

/// Ids of this thread's scratch arenas, `None` for slots not yet created.
pub fn scratch_arena_ids() -> [Option<ArenaId>; SCRATCH_SLOTS] {
    POOL.with(|pool| [pool.slots[0].arena_id(), pool.slots[1].arena_id()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmarena_core::mib;

    use crate::arena::HEADER_SIZE;

    #[test]
    fn first_get_creates_slot_zero() {
        assert_eq!(scratch_arena_ids(), [None, None]);
        let scratch = get_scratch(&[]).unwrap();
        assert_eq!(scratch.slot(), 0);
        assert_eq!(scratch_arena_ids()[0], Some(scratch.id()));
        assert_eq!(scratch.pos(), HEADER_SIZE);
        assert_eq!(scratch.reserve_size(), mib(64));
        assert_eq!(scratch.commit_pos(), mib(1));
    }

    #[test]
    fn conflict_with_slot_zero_yields_slot_one() {
        let first = get_scratch(&[]).unwrap();
        let second = get_scratch(&[first.id()]).unwrap();
        assert_eq!(second.slot(), 1);
        assert_ne!(second.id(), first.id());
    }

    #[test]
    fn both_slots_conflicting_is_exhausted() {
        let first = get_scratch(&[]).unwrap();
        let second = get_scratch(&[first.id()]).unwrap();
        let err = get_scratch(&[first.id(), second.id()]).unwrap_err();
        assert_eq!(err, ArenaError::ScratchExhausted { slots: 2 });
    }

    #[test]
    fn listed_conflicts_are_skipped_even_when_free() {
        let id0 = get_scratch(&[]).unwrap().id();
        let id1 = {
            let a = get_scratch(&[]).unwrap();
            let b = get_scratch(&[a.id()]).unwrap();
            b.id()
        };
        let picked = get_scratch(&[id0]).unwrap();
        assert_eq!(picked.id(), id1);
        drop(picked);
        assert!(get_scratch(&[id0, id1]).is_err());
    }

    #[test]
    fn nested_get_without_conflicts_reuses_slot_zero() {
        let a = get_scratch(&[]).unwrap();
        a.push_bytes(100).unwrap();
        let b = get_scratch(&[]).unwrap();
        let b_mark = b.pos();
        b.push_bytes(200).unwrap();
        let c = get_scratch(&[]).unwrap();
        c.push_bytes(300).unwrap();

        assert_eq!((a.slot(), b.slot(), c.slot()), (0, 0, 0));
        assert_eq!(b.id(), a.id());
        assert_eq!(c.id(), a.id());
        assert_eq!((a.depth(), b.depth(), c.depth()), (1, 2, 3));
        assert_eq!(b.start_pos(), b_mark);

        let c_start = c.start_pos();
        c.release();
        assert_eq!(b.pos(), c_start);
        b.release();
        assert_eq!(a.pos(), b_mark);
        a.release();

        let again = get_scratch(&[]).unwrap();
        assert_eq!(again.depth(), 1);
        assert_eq!(again.pos(), HEADER_SIZE);
    }

    #[test]
    fn exhaustion_needs_every_slot_listed() {
        let first = get_scratch(&[]).unwrap();
        let _second = get_scratch(&[]).unwrap();
        let _third = get_scratch(&[]).unwrap();
        // Live guards alone never exhaust the pool.
        let other = get_scratch(&[first.id()]).unwrap();
        assert_eq!(other.slot(), 1);
        let _nested = get_scratch(&[first.id()]).unwrap();
        assert!(matches!(
            get_scratch(&[first.id(), other.id()]),
            Err(ArenaError::ScratchExhausted { slots: 2 })
        ));
    }

    #[test]
    #[should_panic(expected = "released out of order")]
    fn releasing_outer_before_inner_panics() {
        let outer = get_scratch(&[]).unwrap();
        let _inner = get_scratch(&[]).unwrap();
        outer.release();
    }

    #[test]
    fn guards_on_different_slots_release_in_any_order() {
        let first = get_scratch(&[]).unwrap();
        let second = get_scratch(&[first.id()]).unwrap();
        first.release();
        second.push_bytes(64).unwrap();
        second.release();
        assert_eq!(get_scratch(&[]).unwrap().depth(), 1);
    }

    #[test]
    fn release_rewinds_and_frees_slot() {
        let scratch = get_scratch(&[]).unwrap();
        let id = scratch.id();
        scratch.push_bytes(10_000).unwrap();
        release_scratch(scratch);

        let again = get_scratch(&[]).unwrap();
        assert_eq!(again.id(), id);
        assert_eq!(again.pos(), HEADER_SIZE);
    }

    #[test]
    fn release_keeps_commit() {
        let scratch = get_scratch(&[]).unwrap();
        scratch.push(3 * mib(1), false).unwrap();
        let commit_pos = scratch.commit_pos();
        scratch.release();
        let again = get_scratch(&[]).unwrap();
        assert_eq!(again.commit_pos(), commit_pos);
    }

    #[test]
    fn destroy_all_recreates_fresh_arenas() {
        let scratch = get_scratch(&[]).unwrap();
        scratch.push(3 * mib(1), false).unwrap();
        scratch.release();

        destroy_all_scratch();
        assert_eq!(scratch_arena_ids(), [None, None]);

        let fresh = get_scratch(&[]).unwrap();
        assert_eq!(fresh.slot(), 0);
        assert_eq!(fresh.pos(), HEADER_SIZE);
        assert_eq!(fresh.commit_pos(), mib(1));
    }

    #[test]
    fn destroy_all_with_live_guard_keeps_guard_usable() {
        let held = get_scratch(&[]).unwrap();
        held.push_bytes(64).unwrap();
        destroy_all_scratch();

        let fresh = get_scratch(&[]).unwrap();
        assert_eq!(fresh.slot(), 0);
        assert_ne!(fresh.id(), held.id());
        held.push_bytes(64).unwrap()[63] = 1;

        // The stale guard is nested on its own arena, not the new one.
        assert_eq!(fresh.depth(), 1);
        drop(held);
        let other = get_scratch(&[]).unwrap();
        assert_eq!(other.id(), fresh.id());
        assert_eq!(other.depth(), 2);
        drop(other);
        drop(fresh);
    }

    #[test]
    fn scratch_is_per_thread() {
        let here = get_scratch(&[]).unwrap();
        let there = std::thread::spawn(|| {
            let scratch = get_scratch(&[]).unwrap();
            (scratch.slot(), scratch.id())
        })
        .join()
        .unwrap();
        assert_eq!(there.0, 0);
        assert_ne!(there.1, here.id());
    }
}
