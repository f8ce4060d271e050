//! Randomized allocate/release/reallocate workload with stamped payloads.
//! Exits nonzero on the first sign of corruption.

mod random;

use std::process::ExitCode;

use heap::heap::Heap;
use heap::region::FixedRegion;

use crate::random::Lcg;

const REGION_BYTES: usize = 8 * 1024 * 1024;
const MAX_LIVE: usize = 512;
const MIN_SIZE: u32 = 1;
const MAX_SIZE: u32 = 2048;

struct Slot {
    ptr: *mut u8,
    len: usize,
    stamp: u8,
}

fn stamp(ptr: *mut u8, len: usize, seed: u8) {
    for i in 0..len {
        // Safety: the slot owns `len` bytes at `ptr`.
        unsafe { *ptr.add(i) = seed.wrapping_add(i as u8) };
    }
}

fn verify(slot: &Slot) -> bool {
    for i in 0..slot.len {
        // Safety: the slot owns `len` bytes at `ptr`.
        let found = unsafe { *slot.ptr.add(i) };
        let expected = slot.stamp.wrapping_add(i as u8);
        if found != expected {
            println!(
                "[stress] corruption at {:p}+{}: expected {:#04x}, found {:#04x}",
                slot.ptr, i, expected, found
            );
            return false;
        }
    }
    true
}

fn fail(round: usize) -> ExitCode {
    println!("[stress] [FAIL] corruption detected in round {}", round);
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    let rounds: usize = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(100_000);

    let mut memory = vec![0u8; REGION_BYTES];
    let mut heap = Heap::new(FixedRegion::new(memory.as_mut_ptr(), memory.len()));
    let mut rng = Lcg::new(0x1337);
    let mut slots: Vec<Slot> = Vec::new();

    let mut allocs = 0usize;
    let mut reallocs = 0usize;
    let mut releases = 0usize;
    let mut refusals = 0usize;

    println!(
        "[stress] {} rounds over a {}MB region",
        rounds,
        REGION_BYTES / 1024 / 1024
    );

    for round in 0..rounds {
        let roll = rng.next_range(0, 9);
        let should_allocate = slots.is_empty() || (slots.len() < MAX_LIVE && roll < 5);

        if should_allocate {
            let len = rng.next_range(MIN_SIZE, MAX_SIZE) as usize;
            let zeroed = roll == 0;
            let ptr = if zeroed {
                heap.alloc_zeroed(len, 1)
            } else {
                heap.alloc(len)
            };
            if ptr.is_null() {
                refusals += 1;
                continue;
            }
            // Safety: the heap granted `len` bytes at `ptr`.
            if zeroed && (0..len).any(|i| unsafe { *ptr.add(i) } != 0) {
                println!("[stress] zeroed block at {:p} has dirty bytes", ptr);
                return fail(round);
            }
            let seed = rng.next() as u8;
            stamp(ptr, len, seed);
            slots.push(Slot { ptr, len, stamp: seed });
            allocs += 1;
        } else if roll < 8 {
            let index = rng.next() as usize % slots.len();
            let slot = slots.swap_remove(index);
            if !verify(&slot) {
                return fail(round);
            }
            heap.free(slot.ptr);
            releases += 1;
        } else {
            let index = rng.next() as usize % slots.len();
            let len = rng.next_range(MIN_SIZE, MAX_SIZE) as usize;
            let slot = &mut slots[index];

            let moved = heap.realloc(slot.ptr, len);
            if moved.is_null() {
                // A refused resize must leave the old block untouched.
                if !verify(slot) {
                    return fail(round);
                }
                refusals += 1;
                continue;
            }

            let prefix = Slot {
                ptr: moved,
                len: slot.len.min(len),
                stamp: slot.stamp,
            };
            if !verify(&prefix) {
                return fail(round);
            }

            let seed = rng.next() as u8;
            stamp(moved, len, seed);
            *slot = Slot { ptr: moved, len, stamp: seed };
            reallocs += 1;
        }

        if round > 0 && round % 10_000 == 0 {
            println!(
                "[stress] {}/{} rounds, {} live blocks, {} free bytes",
                round,
                rounds,
                slots.len(),
                heap.free_bytes()
            );
        }
    }

    println!("[stress] draining {} remaining blocks", slots.len());
    for slot in slots.drain(..) {
        if !verify(&slot) {
            return fail(rounds);
        }
        heap.free(slot.ptr);
    }

    if heap.free_bytes() != heap.region_bytes() {
        println!(
            "[stress] [FAIL] only {} of {} region bytes came back",
            heap.free_bytes(),
            heap.region_bytes()
        );
        return ExitCode::FAILURE;
    }

    println!(
        "[stress] [PASS] {} allocs, {} reallocs, {} releases, {} refusals; the region closed back into one span",
        allocs, reallocs, releases, refusals
    );
    ExitCode::SUCCESS
}
