//! Typed push helpers.
//!
//! Thin wrappers over the byte-level push that compute
//! `count * size_of::<T>()` and align to
//! `max(ARENA_ALIGN, align_of::<T>())`. Zeroed forms need
//! [`bytemuck::Zeroable`] so the all-zero bit pattern is a valid `T`.

#![allow(unsafe_code)]

use std::mem::{self, MaybeUninit};

use bytemuck::Zeroable;
use vmarena_core::{ArenaError, PageBackend};

use crate::arena::{Arena, ARENA_ALIGN};

fn align_for<T>() -> usize {
    mem::align_of::<T>().max(ARENA_ALIGN)
}

impl<B: PageBackend> Arena<B> {
    fn array_bytes<T>(&self, count: usize) -> Result<usize, ArenaError> {
        count
            .checked_mul(mem::size_of::<T>())
            .ok_or(ArenaError::CapacityExceeded {
                requested: usize::MAX,
                available: self.remaining(),
            })
    }

    /// Push one zeroed `T`.
    #[allow(clippy::mut_from_ref)]
    pub fn push_zeroed<T: Zeroable>(&self) -> Result<&mut T, ArenaError> {
        let ptr = self.push_aligned(mem::size_of::<T>(), align_for::<T>(), true)?;
        // SAFETY: fresh, aligned, zeroed bytes; `Zeroable` makes them a valid T.
        Ok(unsafe { &mut *ptr.as_ptr().cast::<T>() })
    }

    /// Push one `T` without initialising it.
    #[allow(clippy::mut_from_ref)]
    pub fn push_uninit<T>(&self) -> Result<&mut MaybeUninit<T>, ArenaError> {
        let ptr = self.push_aligned(mem::size_of::<T>(), align_for::<T>(), false)?;
        // SAFETY: fresh, aligned bytes; `MaybeUninit` asserts nothing about them.
        Ok(unsafe { &mut *ptr.as_ptr().cast::<MaybeUninit<T>>() })
    }

    /// Push `count` contiguous zeroed `T`s.
    #[allow(clippy::mut_from_ref)]
    pub fn push_array<T: Zeroable>(&self, count: usize) -> Result<&mut [T], ArenaError> {
        let bytes = self.array_bytes::<T>(count)?;
        let ptr = self.push_aligned(bytes, align_for::<T>(), true)?;
        // SAFETY: as in `push_zeroed`, for `count` elements.
        Ok(unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr().cast::<T>(), count) })
    }

    /// Push `count` contiguous `T`s without initialising them.
    #[allow(clippy::mut_from_ref)]
    pub fn push_array_uninit<T>(&self, count: usize) -> Result<&mut [MaybeUninit<T>], ArenaError> {
        let bytes = self.array_bytes::<T>(count)?;
        let ptr = self.push_aligned(bytes, align_for::<T>(), false)?;
        // SAFETY: as in `push_uninit`, for `count` elements.
        Ok(unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr().cast(), count) })
    }

    /// Push a copy of `src`.
    #[allow(clippy::mut_from_ref)]
    pub fn push_copy<T: Copy>(&self, src: &[T]) -> Result<&mut [T], ArenaError> {
        let dst = self.push_array_uninit::<T>(src.len())?;
        for (slot, value) in dst.iter_mut().zip(src) {
            slot.write(*value);
        }
        // SAFETY: every element was written above.
        Ok(unsafe { &mut *(dst as *mut [MaybeUninit<T>] as *mut [T]) })
    }
}
