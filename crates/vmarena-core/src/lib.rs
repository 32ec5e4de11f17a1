//! Core types and traits for the vmarena allocator.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the rest of the workspace: arena identity,
//! configuration, size arithmetic, error types, and the [`PageBackend`]
//! trait that the platform layer implements.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod id;
pub mod size;
pub mod traits;

pub use config::ArenaConfig;
pub use error::ArenaError;
pub use id::ArenaId;
pub use size::{align_up, align_up_pow2, gib, kib, mib};
pub use traits::PageBackend;
