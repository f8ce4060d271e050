//! Region source over the Unix program break.

use heap::region::RegionSource;

/// Feeds a heap from the process data segment via `sbrk`. The break is
/// process-wide state: run at most one arena over it, and expect stray
/// moves when the host libc allocates from the break as well.
pub struct ProgramBreak;

impl ProgramBreak {
    pub const fn new() -> Self {
        ProgramBreak
    }
}

impl RegionSource for ProgramBreak {
    fn extend(&mut self, delta: isize) -> Option<*mut u8> {
        // Safety: sbrk only moves this process's break and reports refusal
        // instead of failing halfway.
        let previous = unsafe { libc::sbrk(delta as libc::intptr_t) };
        if previous == usize::MAX as *mut libc::c_void {
            return None;
        }
        Some(previous as *mut u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heap::heap::Heap;

    #[test]
    fn zero_delta_reports_the_current_break() {
        let mut source = ProgramBreak::new();

        let brk = source.extend(0);
        assert!(brk.is_some_and(|p| !p.is_null()));
    }

    #[test]
    fn heap_over_the_break_allocates_and_releases() {
        let mut heap = Heap::new(ProgramBreak::new());

        let p = heap.alloc(64);
        assert!(!p.is_null());
        assert_eq!(p as usize % core::mem::size_of::<*mut u8>(), 0);

        unsafe {
            core::ptr::write_bytes(p, 0x5A, 64);
            assert!(core::slice::from_raw_parts(p, 64).iter().all(|&b| b == 0x5A));
        }

        heap.free(p);
        assert!(heap.free_bytes() >= 64);
    }
}
