//! Test utilities and mock backends for vmarena development.
//!
//! Provides a [`FaultyBackend`] that wraps any [`PageBackend`] and fails
//! reservations or commits on demand, plus arena configurations used by
//! the scenario tests.

#![deny(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{growth_scenario_config, tiny_config};

use std::io;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use vmarena_core::PageBackend;

/// OS error code reported by injected failures (`ENOMEM` on Linux).
pub const INJECTED_OS_CODE: i32 = 12;

fn injected() -> io::Error {
    io::Error::from_raw_os_error(INJECTED_OS_CODE)
}

/// A [`PageBackend`] wrapper that fails on demand and counts calls.
///
/// Every call is forwarded to the inner backend unless a fault is armed.
/// Counters record successful calls only, so `reserves() - releases()`
/// is the number of reservations still outstanding.
pub struct FaultyBackend<B> {
    inner: B,
    fail_reserve: AtomicBool,
    /// Successful commits still allowed; `usize::MAX` means unlimited.
    commit_budget: AtomicUsize,
    reserves: AtomicUsize,
    commits: AtomicUsize,
    failed_commits: AtomicUsize,
    decommits: AtomicUsize,
    releases: AtomicUsize,
}

impl<B: PageBackend> FaultyBackend<B> {
    /// Wrap `inner` with no faults armed.
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            fail_reserve: AtomicBool::new(false),
            commit_budget: AtomicUsize::new(usize::MAX),
            reserves: AtomicUsize::new(0),
            commits: AtomicUsize::new(0),
            failed_commits: AtomicUsize::new(0),
            decommits: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
        }
    }

    /// Make every reservation fail.
    pub fn failing_reserve(self) -> Self {
        self.fail_reserve.store(true, Ordering::Relaxed);
        self
    }

    /// Allow `n` more successful commits, then fail every commit.
    pub fn with_commit_budget(self, n: usize) -> Self {
        self.set_commit_budget(Some(n));
        self
    }

    /// Re-arm or clear (`None`) the commit budget.
    pub fn set_commit_budget(&self, n: Option<usize>) {
        self.commit_budget
            .store(n.unwrap_or(usize::MAX), Ordering::Relaxed);
    }

    pub fn reserves(&self) -> usize {
        self.reserves.load(Ordering::Relaxed)
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::Relaxed)
    }

    pub fn failed_commits(&self) -> usize {
        self.failed_commits.load(Ordering::Relaxed)
    }

    pub fn decommits(&self) -> usize {
        self.decommits.load(Ordering::Relaxed)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::Relaxed)
    }

    /// Reservations made and not yet released.
    pub fn outstanding(&self) -> usize {
        self.reserves() - self.releases()
    }

    fn take_commit(&self) -> bool {
        self.commit_budget
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |left| match left {
                0 => None,
                usize::MAX => Some(usize::MAX),
                n => Some(n - 1),
            })
            .is_ok()
    }
}

#[allow(unsafe_code)]
impl<B: PageBackend> PageBackend for FaultyBackend<B> {
    fn page_size(&self) -> usize {
        self.inner.page_size()
    }

    fn reserve(&self, size: usize) -> io::Result<NonNull<u8>> {
        if self.fail_reserve.load(Ordering::Relaxed) {
            return Err(injected());
        }
        let ptr = self.inner.reserve(size)?;
        self.reserves.fetch_add(1, Ordering::Relaxed);
        Ok(ptr)
    }

    unsafe fn commit(&self, ptr: NonNull<u8>, size: usize) -> io::Result<()> {
        if !self.take_commit() {
            self.failed_commits.fetch_add(1, Ordering::Relaxed);
            return Err(injected());
        }
        // SAFETY: forwarded unchanged; the caller upholds the range contract.
        unsafe { self.inner.commit(ptr, size)? };
        self.commits.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    unsafe fn decommit(&self, ptr: NonNull<u8>, size: usize) -> io::Result<()> {
        // SAFETY: forwarded unchanged.
        unsafe { self.inner.decommit(ptr, size)? };
        self.decommits.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    unsafe fn release(&self, ptr: NonNull<u8>, size: usize) -> io::Result<()> {
        // SAFETY: forwarded unchanged.
        unsafe { self.inner.release(ptr, size)? };
        self.releases.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
