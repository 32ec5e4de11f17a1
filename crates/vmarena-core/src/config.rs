//! Arena configuration parameters.

use crate::error::ArenaError;
use crate::size::{align_up_pow2, mib};

/// Configuration for a single arena.
///
/// Both sizes are requests: [`ArenaConfig::normalized`] applies the page
/// rounding rules, and the arena records the normalized values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Bytes of address space reserved up front.
    ///
    /// Default: 64 MiB. Fixed for the arena's life; pushes that would run
    /// past it fail with [`ArenaError::CapacityExceeded`].
    pub reserve_size: usize,

    /// Granularity of physical backing, in bytes.
    ///
    /// Default: 1 MiB. Also the size of the initial commit, which must be
    /// large enough to hold the arena header.
    pub commit_size: usize,
}

impl ArenaConfig {
    /// Default reservation: 64 MiB.
    pub const DEFAULT_RESERVE_SIZE: usize = mib(64);

    /// Default commit granularity: 1 MiB.
    pub const DEFAULT_COMMIT_SIZE: usize = mib(1);

    /// Create a config with explicit reserve and commit sizes.
    pub const fn new(reserve_size: usize, commit_size: usize) -> Self {
        Self {
            reserve_size,
            commit_size,
        }
    }

    /// The fixed configuration used for per-thread scratch arenas.
    pub const fn scratch() -> Self {
        Self::new(Self::DEFAULT_RESERVE_SIZE, Self::DEFAULT_COMMIT_SIZE)
    }

    /// Replace the reserve size.
    pub const fn with_reserve_size(mut self, reserve_size: usize) -> Self {
        self.reserve_size = reserve_size;
        self
    }

    /// Replace the commit granularity.
    pub const fn with_commit_size(mut self, commit_size: usize) -> Self {
        self.commit_size = commit_size;
        self
    }

    /// Apply the page rounding rules.
    ///
    /// Both sizes are rounded up to `page_size`. The commit size is then
    /// floored to `header_size` rounded up to a page, so the first commit
    /// always covers the in-band header. A reserve smaller than the
    /// resulting commit is raised to match it.
    ///
    /// Sizes that overflow while rounding cannot be reserved and are
    /// reported as [`ArenaError::ReservationFailed`].
    pub fn normalized(&self, page_size: usize, header_size: usize) -> Result<Self, ArenaError> {
        let overflow = ArenaError::ReservationFailed {
            size: self.reserve_size,
            os_code: None,
        };
        let reserve = align_up_pow2(self.reserve_size, page_size).ok_or(overflow.clone())?;
        let min_commit = align_up_pow2(header_size, page_size).ok_or(overflow.clone())?;
        let commit = align_up_pow2(self.commit_size.max(min_commit), page_size).ok_or(overflow)?;
        Ok(Self {
            reserve_size: reserve.max(commit),
            commit_size: commit,
        })
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RESERVE_SIZE, Self::DEFAULT_COMMIT_SIZE)
    }
}
