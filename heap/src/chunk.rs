//! On-region chunk layout: a size-prefixed header whose link field doubles
//! as the first payload bytes while the chunk is allocated.

use core::mem::{offset_of, size_of};

pub const ALIGNMENT: usize = size_of::<*mut u8>();
pub const HEADER_SIZE: usize = offset_of!(Chunk, next);
pub const MIN_CHUNK_SIZE: usize = size_of::<Chunk>();

const _: () = assert!(HEADER_SIZE % ALIGNMENT == 0);
const _: () = assert!(MIN_CHUNK_SIZE % ALIGNMENT == 0);
const _: () = assert!(MIN_CHUNK_SIZE >= HEADER_SIZE + size_of::<*mut Chunk>());

#[repr(C)]
pub(crate) struct Chunk {
    pub(crate) size: usize,
    pub(crate) next: *mut Chunk,
}

// Total chunk bytes needed to serve `payload` bytes: the payload rounded up
// to the alignment unit, plus the header in front of it.
pub(crate) fn size_for_payload(payload: usize) -> Option<usize> {
    let padded = payload.checked_add(ALIGNMENT - 1)? & !(ALIGNMENT - 1);
    padded.checked_add(HEADER_SIZE)
}

pub(crate) fn payload_of(chunk: *mut Chunk) -> *mut u8 {
    (chunk as usize + HEADER_SIZE) as *mut u8
}

pub(crate) fn chunk_of(payload: *mut u8) -> *mut Chunk {
    (payload as usize - HEADER_SIZE) as *mut Chunk
}

// Safety: `chunk` must point at an initialized chunk header.
pub(crate) unsafe fn end_of(chunk: *mut Chunk) -> usize {
    chunk as usize + unsafe { (*chunk).size }
}

// Safety: `chunk` must point at an initialized chunk header.
pub(crate) unsafe fn payload_size(chunk: *mut Chunk) -> usize {
    (unsafe { (*chunk).size }) - HEADER_SIZE
}
