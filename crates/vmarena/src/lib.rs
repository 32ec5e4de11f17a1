//! vmarena: virtual-memory bump arenas.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the vmarena sub-crates. For most users, adding `vmarena` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use bytemuck::Zeroable;
//! use vmarena::prelude::*;
//!
//! #[derive(Clone, Copy, Zeroable)]
//! #[repr(C)]
//! struct Layer {
//!     inputs: u32,
//!     outputs: u32,
//! }
//!
//! // One long-lived arena per model: reserve 256 MiB, commit 1 MiB at a time.
//! let mut arena = Arena::new(ArenaConfig::new(mib(256), mib(1))).unwrap();
//! let layer = arena.push_zeroed::<Layer>().unwrap();
//! layer.inputs = 784;
//! layer.outputs = 16;
//! let weights = arena.push_array::<f32>(784 * 16).unwrap();
//! weights.fill(0.01);
//!
//! // Per-step buffers live inside a temporary region.
//! for _ in 0..3 {
//!     let step = arena.begin_temp();
//!     let activations = step.push_array::<f32>(16).unwrap();
//!     activations[0] = 1.0;
//! }
//!
//! // Helpers borrow thread-local scratch space that never aliases the
//! // caller's own scratch arena.
//! fn normalize(values: &mut [f32], conflicts: &[ArenaId]) -> Result<(), ArenaError> {
//!     let scratch = get_scratch(conflicts)?;
//!     let copy = scratch.push_copy(values)?;
//!     let total: f32 = copy.iter().sum();
//!     for v in values.iter_mut() {
//!         *v /= total;
//!     }
//!     Ok(())
//! }
//!
//! let outer = get_scratch(&[]).unwrap();
//! let values = outer.push_copy(&[1.0f32, 3.0]).unwrap();
//! normalize(values, &[outer.id()]).unwrap();
//! assert_eq!(&*values, &[0.25f32, 0.75]);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`arena`] | `vmarena-arena` | `Arena`, checkpoints, temp regions, scratch pool, platform backend |
//! | [`types`] | `vmarena-core` | Configuration, errors, ids, size helpers, `PageBackend` |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Arenas, checkpoints, and scratch space (`vmarena-arena`).
///
/// Most users only need [`arena::Arena`] and [`arena::get_scratch`] from
/// this module; they are also available in the [`prelude`].
pub use vmarena_arena as arena;

/// Core types, traits, and IDs (`vmarena-core`).
///
/// Contains [`types::ArenaConfig`], [`types::ArenaError`], and the
/// [`types::PageBackend`] trait for custom page providers.
pub use vmarena_core as types;

/// Common imports for typical vmarena usage.
///
/// ```rust
/// use vmarena::prelude::*;
/// ```
///
/// This imports the arena handle and its guards, the scratch functions,
/// configuration and size helpers, and the error type.
pub mod prelude {
    // Arena and guards
    pub use vmarena_arena::{Arena, Checkpoint, Scratch, SystemBackend, TempArena};

    // Scratch pool
    pub use vmarena_arena::{destroy_all_scratch, get_scratch, release_scratch};

    // Core types
    pub use vmarena_core::{gib, kib, mib, ArenaConfig, ArenaId, PageBackend};

    // Errors
    pub use vmarena_core::ArenaError;
}
