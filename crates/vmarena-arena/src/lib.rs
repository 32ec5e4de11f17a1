//! Virtual-memory bump arenas for the vmarena allocator.
//!
//! An arena reserves a large span of address space up front and backs it
//! with memory lazily, in fixed steps, as allocations advance. Memory is
//! handed out by bumping an offset and reclaimed only by rewinding it,
//! either all at once or back to a saved checkpoint. This crate is the
//! only one in the workspace that contains `unsafe` code.
//!
//! # Architecture
//!
//! ```text
//! Scratch (thread-local pool, 2 slots)
//! └── Arena<SystemBackend> (64 MiB reserve / 1 MiB commit)
//!
//! TempArena / Checkpoint (saved bump offset)
//! └── Arena<B>
//!     ├── in-band header at offset 0 (reserve, commit, pos, commit_pos)
//!     └── B: PageBackend (reserve / commit / decommit / release)
//!         └── SystemBackend (mmap on unix, VirtualAlloc on windows)
//! ```
//!
//! # Example
//!
//! ```
//! use vmarena_arena::Arena;
//! use vmarena_core::{kib, mib, ArenaConfig};
//!
//! let mut arena = Arena::new(ArenaConfig::new(mib(1), kib(64))).unwrap();
//! let weights = arena.push_array::<f32>(1024).unwrap();
//! weights[0] = 0.5;
//!
//! let mark = arena.checkpoint();
//! arena.push_bytes(100_000).unwrap();
//! arena.restore(mark);
//! assert_eq!(arena.pos(), mark.pos());
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod arena;
pub mod platform;
pub mod scratch;
pub mod temp;
mod typed;

// Public re-exports for the primary API surface.
pub use arena::{Arena, ARENA_ALIGN, HEADER_SIZE};
pub use platform::SystemBackend;
pub use scratch::{
    destroy_all_scratch, get_scratch, release_scratch, Scratch, SCRATCH_SLOTS,
};
pub use temp::{Checkpoint, TempArena};
