//! A freestanding free-list heap over a single growable region.
//!
//! The arena hands out pointer-aligned payloads carved from one contiguous
//! span of bytes obtained through a [`region::RegionSource`]. Free chunks
//! form an address-ordered singly linked list with no two list neighbors
//! touching: releasing merges, allocating splits, and the chunk sitting at
//! the region end grows in place before fresh bytes are requested.
//!
//! All bookkeeping lives inside the managed region itself; nothing here
//! allocates behind the caller's back.

#![cfg_attr(not(test), no_std)]

pub mod chunk;
pub mod global;
pub mod heap;
pub mod region;
pub mod trace;
