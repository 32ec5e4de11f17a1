//! OS virtual-memory backends.
//!
//! Exactly one backend is compiled per target and exported as
//! [`SystemBackend`]: anonymous `mmap`/`mprotect`/`munmap` on Unix, and
//! `VirtualAlloc`/`VirtualFree` on Windows.

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::SystemBackend;
#[cfg(windows)]
pub use windows::SystemBackend;

#[cfg(not(any(unix, windows)))]
compile_error!("vmarena needs a virtual-memory backend: only unix and windows targets are supported");

#[cfg(test)]
mod tests {
    #![allow(unsafe_code)]

    use super::SystemBackend;
    use vmarena_core::PageBackend;

    #[test]
    fn page_size_is_power_of_two() {
        let page = SystemBackend.page_size();
        assert!(page.is_power_of_two());
        assert!(page >= 4096);
    }

    #[test]
    fn reserve_is_page_aligned() {
        let backend = SystemBackend;
        let page = backend.page_size();
        let base = backend.reserve(16 * page).unwrap();
        assert_eq!(base.as_ptr() as usize % page, 0);
        // SAFETY: base/size describe the reservation made above.
        unsafe { backend.release(base, 16 * page).unwrap() };
    }

    #[test]
    fn committed_pages_are_writable_and_zeroed() {
        let backend = SystemBackend;
        let page = backend.page_size();
        let base = backend.reserve(4 * page).unwrap();
        // SAFETY: the first two pages lie inside the reservation above.
        unsafe {
            backend.commit(base, 2 * page).unwrap();
            let bytes = std::slice::from_raw_parts_mut(base.as_ptr(), 2 * page);
            assert!(bytes.iter().all(|&b| b == 0));
            bytes[0] = 0xAB;
            bytes[2 * page - 1] = 0xCD;
            assert_eq!(bytes[0], 0xAB);
            backend.release(base, 4 * page).unwrap();
        }
    }

    #[test]
    fn commit_is_idempotent() {
        let backend = SystemBackend;
        let page = backend.page_size();
        let base = backend.reserve(2 * page).unwrap();
        // SAFETY: every range lies inside the reservation above.
        unsafe {
            backend.commit(base, page).unwrap();
            base.as_ptr().write(7);
            backend.commit(base, page).unwrap();
            assert_eq!(base.as_ptr().read(), 7);
            backend.release(base, 2 * page).unwrap();
        }
    }

    #[test]
    fn decommit_then_recommit_succeeds() {
        let backend = SystemBackend;
        let page = backend.page_size();
        let base = backend.reserve(2 * page).unwrap();
        // SAFETY: every range lies inside the reservation above and no
        // reference into it outlives the block.
        unsafe {
            backend.commit(base, 2 * page).unwrap();
            base.as_ptr().write(1);
            backend.decommit(base, 2 * page).unwrap();
            backend.commit(base, page).unwrap();
            base.as_ptr().write(2);
            assert_eq!(base.as_ptr().read(), 2);
            backend.release(base, 2 * page).unwrap();
        }
    }
}
