use core::alloc::{GlobalAlloc, Layout};
use core::ptr;

use spin::Mutex;

use crate::chunk::ALIGNMENT;
use crate::heap::Heap;
use crate::region::RegionSource;

/// Lock-wrapped arena. Const-constructible, so one can live in a `static`
/// and back `#[global_allocator]`.
pub struct HeapRef<S: RegionSource> {
    inner: Mutex<Heap<S>>,
}

impl<S: RegionSource> HeapRef<S> {
    pub const fn new(source: S) -> Self {
        HeapRef {
            inner: Mutex::new(Heap::new(source)),
        }
    }

    pub fn alloc(&self, size: usize) -> *mut u8 {
        self.inner.lock().alloc(size)
    }

    pub fn free(&self, ptr: *mut u8) {
        self.inner.lock().free(ptr);
    }

    pub fn realloc(&self, ptr: *mut u8, size: usize) -> *mut u8 {
        self.inner.lock().realloc(ptr, size)
    }

    pub fn alloc_zeroed(&self, count: usize, size: usize) -> *mut u8 {
        self.inner.lock().alloc_zeroed(count, size)
    }

    pub fn free_bytes(&self) -> usize {
        self.inner.lock().free_bytes()
    }
}

// Payloads always sit HEADER_SIZE past their chunk, so only layouts up to
// the native alignment can be honored; stricter ones are refused outright.
unsafe impl<S: RegionSource + Send> GlobalAlloc for HeapRef<S> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.align() > ALIGNMENT {
            return ptr::null_mut();
        }
        self.inner.lock().alloc(layout.size())
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        self.inner.lock().free(ptr);
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if layout.align() > ALIGNMENT {
            return ptr::null_mut();
        }
        self.inner.lock().realloc(ptr, new_size)
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        if layout.align() > ALIGNMENT {
            return ptr::null_mut();
        }
        self.inner.lock().alloc_zeroed(layout.size(), 1)
    }
}
