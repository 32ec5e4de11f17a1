//! Error types for arena creation, growth, and scratch checkout.
//!
//! Every variant is recoverable: the arena involved is left exactly as it
//! was before the failing call. Corruption of the arena's own bookkeeping
//! is not represented here; it aborts the process instead.

use std::error::Error;
use std::fmt;

/// Errors that can occur during arena operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// The OS refused to reserve the requested address space.
    ///
    /// Nothing was reserved, so there is nothing to release.
    ReservationFailed {
        /// Number of bytes of address space requested.
        size: usize,
        /// Raw OS error code, when the platform reported one.
        os_code: Option<i32>,
    },
    /// Backing a sub-range of the reservation with memory failed.
    ///
    /// During creation the reservation has already been released. During
    /// a push the arena is untouched and still usable for smaller requests.
    CommitFailed {
        /// Offset of the range from the arena base, in bytes.
        offset: usize,
        /// Length of the range that could not be committed, in bytes.
        size: usize,
        /// Raw OS error code, when the platform reported one.
        os_code: Option<i32>,
    },
    /// The request does not fit in what is left of the reservation.
    ///
    /// Arenas never grow past their reserved size.
    CapacityExceeded {
        /// Number of bytes requested.
        requested: usize,
        /// Bytes left between the aligned bump offset and the reserve end.
        available: usize,
    },
    /// Every scratch arena on this thread was listed as a conflict.
    ScratchExhausted {
        /// Number of scratch slots per thread.
        slots: usize,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReservationFailed { size, os_code } => {
                write!(f, "failed to reserve {size} bytes of address space")?;
                write_os_code(f, *os_code)
            }
            Self::CommitFailed {
                offset,
                size,
                os_code,
            } => {
                write!(f, "failed to commit {size} bytes at arena offset {offset}")?;
                write_os_code(f, *os_code)
            }
            Self::CapacityExceeded {
                requested,
                available,
            } => {
                write!(
                    f,
                    "arena capacity exceeded: requested {requested} bytes, available {available} bytes"
                )
            }
            Self::ScratchExhausted { slots } => {
                write!(f, "no scratch arena available: all {slots} slots conflict")
            }
        }
    }
}

fn write_os_code(f: &mut fmt::Formatter<'_>, os_code: Option<i32>) -> fmt::Result {
    match os_code {
        Some(code) => write!(f, " (os error {code})"),
        None => Ok(()),
    }
}

impl Error for ArenaError {}
