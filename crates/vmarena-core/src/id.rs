//! Arena identity.

use std::fmt;

/// Identifies an arena by the base address of its reserved region.
///
/// The base address is fixed from creation to destruction, so two live
/// arenas never share an id. Once an arena is destroyed its id may be
/// handed out again to a later reservation at the same address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaId(pub usize);

impl ArenaId {
    /// Build an id from a region base pointer.
    pub fn from_ptr<T>(base: *const T) -> Self {
        Self(base as usize)
    }

    /// The base address this id was built from.
    pub fn addr(self) -> usize {
        self.0
    }
}

impl fmt::Display for ArenaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
