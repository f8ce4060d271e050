//! Where the managed bytes come from.

/// Moves the boundary of a contiguous address range.
pub trait RegionSource {
    /// Moves the boundary by `delta` bytes and returns the boundary as it
    /// was before the call. A zero `delta` queries the boundary, a negative
    /// one gives bytes back. `None` reports refusal and leaves the boundary
    /// where it was.
    fn extend(&mut self, delta: isize) -> Option<*mut u8>;
}

/// Region source over a caller-owned span of memory. The span is handed out
/// from its start; the capacity is the hard ceiling.
pub struct FixedRegion {
    base: *mut u8,
    capacity: usize,
    brk: usize,
}

impl FixedRegion {
    pub const fn new(base: *mut u8, capacity: usize) -> Self {
        FixedRegion {
            base,
            capacity,
            brk: 0,
        }
    }
}

impl RegionSource for FixedRegion {
    fn extend(&mut self, delta: isize) -> Option<*mut u8> {
        let moved = self.brk.checked_add_signed(delta)?;
        if moved > self.capacity {
            return None;
        }
        let previous = (self.base as usize + self.brk) as *mut u8;
        self.brk = moved;
        Some(previous)
    }
}

// Safety: FixedRegion holds only the bounds of a span it does not itself
// access; whoever owns the backing bytes controls where they may travel.
unsafe impl Send for FixedRegion {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_returns_the_previous_boundary() {
        let mut memory = vec![0u8; 256];
        let base = memory.as_mut_ptr();
        let mut region = FixedRegion::new(base, memory.len());

        assert_eq!(region.extend(64), Some(base));
        assert_eq!(region.extend(64), Some((base as usize + 64) as *mut u8));
    }

    #[test]
    fn zero_delta_queries_without_moving() {
        let mut memory = vec![0u8; 256];
        let base = memory.as_mut_ptr();
        let mut region = FixedRegion::new(base, memory.len());

        region.extend(32);
        assert_eq!(region.extend(0), Some((base as usize + 32) as *mut u8));
        assert_eq!(region.extend(0), Some((base as usize + 32) as *mut u8));
    }

    #[test]
    fn negative_delta_gives_bytes_back() {
        let mut memory = vec![0u8; 256];
        let base = memory.as_mut_ptr();
        let mut region = FixedRegion::new(base, memory.len());

        region.extend(64);
        assert_eq!(region.extend(-32), Some((base as usize + 64) as *mut u8));
        assert_eq!(region.extend(0), Some((base as usize + 32) as *mut u8));
    }

    #[test]
    fn refuses_to_grow_past_the_capacity() {
        let mut memory = vec![0u8; 256];
        let base = memory.as_mut_ptr();
        let mut region = FixedRegion::new(base, memory.len());

        assert_eq!(region.extend(256), Some(base));
        assert_eq!(region.extend(1), None);
        assert_eq!(region.extend(0), Some((base as usize + 256) as *mut u8));
    }

    #[test]
    fn refuses_to_shrink_below_the_base() {
        let mut memory = vec![0u8; 256];
        let mut region = FixedRegion::new(memory.as_mut_ptr(), memory.len());

        assert_eq!(region.extend(-1), None);
        region.extend(64);
        assert_eq!(region.extend(-65), None);
        assert_eq!(region.extend(-64), Some((memory.as_ptr() as usize + 64) as *mut u8));
    }
}
