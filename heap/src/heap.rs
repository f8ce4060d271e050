use core::ptr;

use crate::chunk::{
    chunk_of, end_of, payload_of, payload_size, size_for_payload, Chunk, ALIGNMENT,
    HEADER_SIZE, MIN_CHUNK_SIZE,
};
use crate::region::RegionSource;
use crate::trace;

/// A free-list arena over one contiguous region obtained from `S`.
///
/// Free chunks form a singly linked list kept in strict address order with
/// no two list neighbors touching: releasing coalesces, allocating splits.
/// The region only ever grows; the chunk touching its end is grown in place
/// before fresh bytes are requested.
pub struct Heap<S: RegionSource> {
    source: S,
    region_start: *mut u8,
    region_end: *mut u8,
    free_head: *mut Chunk,
}

// Safety: the arena owns its region exclusively; the raw pointers inside
// never alias another heap's chunks.
unsafe impl<S: RegionSource + Send> Send for Heap<S> {}

impl<S: RegionSource> Heap<S> {
    pub const fn new(source: S) -> Self {
        Heap {
            source,
            region_start: ptr::null_mut(),
            region_end: ptr::null_mut(),
            free_head: ptr::null_mut(),
        }
    }

    /// Hands out `size` writable bytes aligned to the pointer width, or null
    /// when the request cannot be satisfied. Zero-size requests are refused.
    pub fn alloc(&mut self, size: usize) -> *mut u8 {
        if size == 0 {
            return ptr::null_mut();
        }
        let Some(needed) = size_for_payload(size) else {
            return ptr::null_mut();
        };

        if let Some(found) = self.take_best_fit(needed) {
            return found;
        }

        // No fit on the list: grow the chunk touching the region end, then
        // fall back to claiming fresh bytes.
        if self.grow_top_for(needed) {
            if let Some(found) = self.take_best_fit(needed) {
                return found;
            }
        }

        match self.aligned_extend(needed) {
            Some(grant) => {
                let cnk = grant as *mut Chunk;
                // Safety: aligned_extend returned `needed` fresh aligned bytes.
                unsafe {
                    (*cnk).size = needed;
                }
                payload_of(cnk)
            }
            None => ptr::null_mut(),
        }
    }

    /// Returns `ptr`'s chunk to the free list, coalescing with any free
    /// neighbor it touches. Null and pointers from outside the region are
    /// ignored; releasing the same pointer twice in a row is caught and
    /// ignored as long as the chunk still sits on the list unmerged.
    pub fn free(&mut self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }
        let addr = ptr as usize;
        if addr < self.region_start as usize || addr >= self.region_end as usize {
            return;
        }

        let mut cnk = chunk_of(ptr);
        // Safety: the bounds check keeps cnk inside the region; its header
        // was written by alloc, and every list link points at a live header.
        unsafe {
            if end_of(cnk) > self.region_end as usize {
                trace!("release: chunk {:p} runs past the region end", cnk);
                return;
            }

            let mut parent: *mut *mut Chunk = &mut self.free_head;
            let mut cur;
            let mut merged = false;
            loop {
                cur = *parent;
                if cur.is_null() || cur >= cnk {
                    break;
                }
                if end_of(cur) == cnk as usize {
                    // The chunk right below is free: absorb in place and
                    // skip the insertion.
                    (*cur).size += (*cnk).size;
                    trace!("release: left merge into {:p}, {} bytes", cur, (*cur).size);
                    cnk = cur;
                    cur = (*cur).next;
                    merged = true;
                    break;
                }
                parent = &mut (*cur).next;
            }

            if !merged {
                if cur == cnk {
                    trace!("release: double free of {:p}", cnk);
                    return;
                }
                (*cnk).next = cur;
                *parent = cnk;
            }

            if !cur.is_null() && end_of(cnk) == cur as usize {
                (*cnk).size += (*cur).size;
                (*cnk).next = (*cur).next;
                trace!("release: right merge into {:p}, {} bytes", cnk, (*cnk).size);
            }
        }
    }

    /// Resizes `ptr`'s allocation to `size` bytes, preserving the common
    /// payload prefix. Growth prefers widening the chunk where it sits --
    /// region-top growth, then absorbing free neighbors -- over moving the
    /// payload. Null reports failure and leaves the allocation intact.
    pub fn realloc(&mut self, ptr: *mut u8, size: usize) -> *mut u8 {
        if ptr.is_null() {
            return self.alloc(size);
        }
        if size == 0 {
            self.free(ptr);
            return ptr::null_mut();
        }
        let addr = ptr as usize;
        if addr < self.region_start as usize || addr >= self.region_end as usize {
            return ptr::null_mut();
        }
        let Some(needed) = size_for_payload(size) else {
            return ptr::null_mut();
        };

        let mut ptr = ptr;
        let mut cnk = chunk_of(ptr);
        // Safety: bounds-checked above; chunk headers and list links all sit
        // inside the region.
        unsafe {
            let cnk_end = end_of(cnk);
            if cnk_end > self.region_end as usize {
                return ptr::null_mut();
            }

            if (*cnk).size < needed && !self.grow_top_chunk(cnk, needed) {
                // Fold in free neighbors until the chunk is large enough.
                let mut parent: *mut *mut Chunk = &mut self.free_head;
                while (*cnk).size < needed {
                    let adj = *parent;
                    if adj.is_null() || adj as usize > cnk_end {
                        break;
                    }
                    if end_of(adj) == cnk as usize {
                        // Free chunk right below: slide the payload down.
                        // The copy can run over cnk's own header, so take
                        // the size first.
                        let cnk_size = (*cnk).size;
                        *parent = (*adj).next;
                        ptr::copy(ptr, payload_of(adj), cnk_size - HEADER_SIZE);
                        (*adj).size += cnk_size;
                        trace!("reallocate: left merge into {:p}, {} bytes", adj, (*adj).size);
                        cnk = adj;
                        ptr = payload_of(cnk);
                        continue;
                    }
                    if adj as usize == cnk_end {
                        // Free chunk right above: absorb it where we are. At
                        // most one exists, the list never keeps two adjacent.
                        *parent = (*adj).next;
                        (*cnk).size += (*adj).size;
                        trace!("reallocate: right merge into {:p}, {} bytes", cnk, (*cnk).size);
                        break;
                    }
                    parent = &mut (*adj).next;
                }
            }

            if (*cnk).size >= needed {
                let extra = (*cnk).size - needed;
                if extra >= MIN_CHUNK_SIZE {
                    (*cnk).size = needed;
                    trace!("reallocate: split off {} bytes at {:p}", extra, end_of(cnk) as *mut u8);
                    self.insert_free_at(end_of(cnk), extra);
                }
                return ptr;
            }

            // Last resort: move the payload to a fresh allocation.
            let moved = self.alloc(size);
            if !moved.is_null() {
                ptr::copy_nonoverlapping(ptr, moved, payload_size(cnk));
                self.free(ptr);
            }
            moved
        }
    }

    /// Allocates `count * size` bytes with every byte zero. An overflowing
    /// product is refused before any memory moves.
    pub fn alloc_zeroed(&mut self, count: usize, size: usize) -> *mut u8 {
        let Some(total) = count.checked_mul(size) else {
            trace!("zeroed alloc: {} x {} bytes overflows", count, size);
            return ptr::null_mut();
        };
        let ptr = self.alloc(total);
        if !ptr.is_null() {
            // Safety: alloc returned at least `total` writable bytes.
            unsafe {
                ptr::write_bytes(ptr, 0, total);
            }
        }
        ptr
    }

    /// Bytes currently parked on the free list, headers included.
    pub fn free_bytes(&self) -> usize {
        let mut total = 0;
        let mut cur = self.free_head;
        while !cur.is_null() {
            // Safety: list links always point at live chunk headers.
            unsafe {
                total += (*cur).size;
                cur = (*cur).next;
            }
        }
        total
    }

    /// Bytes the region spans in total, allocated or not.
    pub fn region_bytes(&self) -> usize {
        self.region_end as usize - self.region_start as usize
    }

    // Best-fit pass: splices out the chunk wasting the least, splitting it
    // when the leftover can stand alone as a chunk of its own.
    fn take_best_fit(&mut self, needed: usize) -> Option<*mut u8> {
        let mut parent: *mut *mut Chunk = &mut self.free_head;
        let mut best: *mut *mut Chunk = ptr::null_mut();
        let mut best_extra = usize::MAX;

        // Safety: free-list links always point at live chunk headers inside
        // the region.
        unsafe {
            loop {
                let cur = *parent;
                if cur.is_null() {
                    break;
                }
                let cur_size = (*cur).size;
                if cur_size >= needed && cur_size - needed < best_extra {
                    best_extra = cur_size - needed;
                    best = parent;
                    if best_extra < ALIGNMENT {
                        // No tighter fit can exist.
                        break;
                    }
                }
                parent = &mut (*cur).next;
            }

            if best.is_null() {
                return None;
            }

            let cnk = *best;
            let next = (*cnk).next;
            if best_extra < MIN_CHUNK_SIZE {
                // The leftover cannot stand alone: it rides along.
                *best = next;
                (*cnk).size = needed + best_extra;
            } else {
                let rest = (cnk as usize + needed) as *mut Chunk;
                (*rest).size = best_extra;
                (*rest).next = next;
                *best = rest;
                (*cnk).size = needed;
            }
            Some(payload_of(cnk))
        }
    }

    // Finds the address-highest free chunk and grows it in place. Only
    // called once the best-fit pass came up empty, so that chunk is known to
    // be smaller than `needed`.
    fn grow_top_for(&mut self, needed: usize) -> bool {
        let mut top = ptr::null_mut();
        let mut cur = self.free_head;
        while !cur.is_null() {
            top = cur;
            // Safety: list links point at live headers.
            cur = unsafe { (*cur).next };
        }
        if top.is_null() {
            return false;
        }
        // Safety: top is a live free chunk with size below `needed`.
        unsafe { self.grow_top_chunk(top, needed) }
    }

    // In-place growth for a chunk touching the region end. Reports false
    // when the chunk is not on top or the source refuses. A grant landing
    // anywhere else is kept as a free chunk instead of leaking.
    //
    // Safety: `cnk` must point at a live chunk header with size below
    // `new_size`.
    unsafe fn grow_top_chunk(&mut self, cnk: *mut Chunk, new_size: usize) -> bool {
        let cnk_end = unsafe { end_of(cnk) };
        if cnk_end != self.region_end as usize {
            return false;
        }
        let mut add = new_size - unsafe { (*cnk).size };
        if add < MIN_CHUNK_SIZE {
            add = MIN_CHUNK_SIZE;
        }
        let Some(grant) = self.aligned_extend(add) else {
            return false;
        };
        if grant as usize == cnk_end {
            // Safety: the fresh bytes follow the chunk directly.
            unsafe {
                (*cnk).size += add;
            }
            return true;
        }
        trace!("extend: grant landed at {:p}, region top is {:p}", grant, cnk_end as *mut u8);
        unsafe { self.insert_free_at(grant as usize, add) };
        false
    }

    // Stamps a chunk header at `addr` and routes it through release, so
    // split leftovers and stray grants obey ordering and coalescing.
    //
    // Safety: `addr .. addr + size` must be unused in-region bytes, aligned,
    // with `size` no smaller than MIN_CHUNK_SIZE.
    unsafe fn insert_free_at(&mut self, addr: usize, size: usize) {
        let cnk = addr as *mut Chunk;
        unsafe {
            (*cnk).size = size;
        }
        self.free(payload_of(cnk));
    }

    // Pulls `len` more bytes from the source, padding out a misaligned
    // grant so chunks always start on the alignment unit.
    fn aligned_extend(&mut self, len: usize) -> Option<*mut u8> {
        if len > isize::MAX as usize {
            return None;
        }
        let grant = self.source.extend(len as isize)?;
        self.region_end = (grant as usize + len) as *mut u8;

        let misalign = grant as usize % ALIGNMENT;
        let grant = if misalign == 0 {
            grant
        } else {
            let pad = ALIGNMENT - misalign;
            let pad_grant = self.source.extend(pad as isize)?;
            if pad_grant as usize != self.region_end as usize {
                trace!("extend: boundary moved to {:p} behind our back", pad_grant);
                return None;
            }
            self.region_end = (pad_grant as usize + pad) as *mut u8;
            (grant as usize + pad) as *mut u8
        };

        if self.region_start.is_null() {
            self.region_start = grant;
        }
        Some(grant)
    }
}
