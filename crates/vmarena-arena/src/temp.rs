//! Checkpoints and scoped rollback.
//!
//! Allocation is strictly linear, so one saved bump offset is enough to
//! undo any number of pushes made after it. [`Checkpoint`] is the plain
//! value form; [`TempArena`] is the RAII form that rewinds on drop.

use std::ops::{Deref, DerefMut};

use vmarena_core::{ArenaId, PageBackend};

use crate::arena::Arena;

/// A saved bump offset on one arena.
///
/// Checkpoints do not borrow or own the arena. Nested checkpoints on the
/// same arena must be restored in reverse order of creation: restoring an
/// outer one also discards everything an inner one would have restored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub struct Checkpoint {
    arena: ArenaId,
    pos: usize,
}

impl Checkpoint {
    /// The arena this checkpoint was taken on.
    pub fn arena(&self) -> ArenaId {
        self.arena
    }

    /// The saved bump offset.
    pub fn pos(&self) -> usize {
        self.pos
    }
}

impl<B: PageBackend> Arena<B> {
    /// Save the current bump offset. O(1), no side effects.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            arena: self.id(),
            pos: self.pos(),
        }
    }

    /// Rewind to a saved checkpoint, discarding every later push.
    ///
    /// # Panics
    ///
    /// Panics if the checkpoint was taken on a different arena.
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        assert_eq!(
            checkpoint.arena,
            self.id(),
            "checkpoint from arena {} restored on arena {}",
            checkpoint.arena,
            self.id(),
        );
        self.pop_to(checkpoint.pos);
    }

    /// Begin a scoped temporary region.
    ///
    /// Everything pushed through the returned guard is discarded when it
    /// is ended or dropped. Nested regions are opened from the guard, so
    /// the borrow checker forces them to end first.
    pub fn begin_temp(&mut self) -> TempArena<'_, B> {
        let start = self.pos();
        TempArena { arena: self, start }
    }
}

/// Scoped rollback guard returned by [`Arena::begin_temp`].
#[must_use = "dropping a TempArena immediately rewinds it"]
pub struct TempArena<'a, B: PageBackend> {
    arena: &'a mut Arena<B>,
    start: usize,
}

impl<B: PageBackend> TempArena<'_, B> {
    /// Bump offset the arena will be rewound to.
    pub fn start_pos(&self) -> usize {
        self.start
    }

    /// Rewind the arena and end the region.
    pub fn end(self) {
        drop(self);
    }
}

impl<B: PageBackend> Deref for TempArena<'_, B> {
    type Target = Arena<B>;

    fn deref(&self) -> &Arena<B> {
        self.arena
    }
}

impl<B: PageBackend> DerefMut for TempArena<'_, B> {
    fn deref_mut(&mut self) -> &mut Arena<B> {
        self.arena
    }
}

impl<B: PageBackend> Drop for TempArena<'_, B> {
    fn drop(&mut self) {
        self.arena.pop_to(self.start);
    }
}
