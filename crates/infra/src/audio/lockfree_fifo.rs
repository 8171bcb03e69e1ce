//! Lock-free single-producer single-consumer FIFO of preallocated slots
//!
//! Moves whole items (sample blocks, magnitude vectors) from one thread to
//! another. Every slot is allocated up front from a prototype; push and pull
//! copy into existing storage with `clone_from`, so for `Vec` items of a fixed
//! length neither side ever allocates.
//!
//! Performance characteristics:
//! - Lock-free and wait-free for one producer and one consumer
//! - Cache-padded counters to prevent false sharing between cores
//! - Push fails instead of blocking when full; pull fails when empty

use crossbeam::utils::CachePadded;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Slot count used for both analyzer FIFOs
pub const FIFO_CAPACITY: usize = 30;

struct Shared<T> {
    slots: Box<[UnsafeCell<T>]>,

    /// Total items pushed (written by the producer only)
    write_pos: CachePadded<AtomicUsize>,

    /// Total items pulled (written by the consumer only)
    read_pos: CachePadded<AtomicUsize>,
}

// SAFETY: a slot is only touched by the producer while it is outside the
// readable window and by the consumer while it is inside; the Release store
// of the owning side's counter hands the slot over.
unsafe impl<T: Send> Sync for Shared<T> {}

impl<T> Shared<T> {
    #[inline]
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn slot(&self, pos: usize) -> &UnsafeCell<T> {
        &self.slots[pos % self.capacity()]
    }

    fn len(&self) -> usize {
        let write_pos = self.write_pos.load(Ordering::Acquire);
        let read_pos = self.read_pos.load(Ordering::Acquire);
        write_pos.wrapping_sub(read_pos)
    }
}

/// A bounded FIFO before it is split between two threads
pub struct Fifo<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Clone> Fifo<T> {
    /// Allocate `capacity` slots, each a clone of `prototype`
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize, prototype: T) -> Self {
        let slots: Box<[UnsafeCell<T>]> = (0..capacity.max(1))
            .map(|_| UnsafeCell::new(prototype.clone()))
            .collect();

        Self {
            shared: Arc::new(Shared {
                slots,
                write_pos: CachePadded::new(AtomicUsize::new(0)),
                read_pos: CachePadded::new(AtomicUsize::new(0)),
            }),
        }
    }
}

impl<T> Fifo<T> {
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// Split into the producer and consumer handles
    pub fn split(self) -> (FifoProducer<T>, FifoConsumer<T>) {
        (
            FifoProducer {
                shared: Arc::clone(&self.shared),
            },
            FifoConsumer { shared: self.shared },
        )
    }
}

/// Writing end; owned by exactly one thread
pub struct FifoProducer<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Clone> FifoProducer<T> {
    /// Copy `item` into the next free slot
    ///
    /// Returns `false` and leaves the FIFO untouched when it is full.
    pub fn push(&mut self, item: &T) -> bool {
        let shared = &*self.shared;
        let write_pos = shared.write_pos.load(Ordering::Relaxed);
        let read_pos = shared.read_pos.load(Ordering::Acquire);

        if write_pos.wrapping_sub(read_pos) >= shared.capacity() {
            return false;
        }

        // SAFETY: the slot is outside the readable window until the store below
        unsafe {
            (*shared.slot(write_pos).get()).clone_from(item);
        }

        shared.write_pos.store(write_pos.wrapping_add(1), Ordering::Release);
        true
    }
}

impl<T> FifoProducer<T> {
    /// Slots that can be pushed right now
    pub fn free_slots(&self) -> usize {
        self.shared.capacity() - self.shared.len()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }
}

/// Reading end; owned by exactly one thread
pub struct FifoConsumer<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Clone> FifoConsumer<T> {
    /// Copy the oldest item into `out`
    ///
    /// Returns `false` and leaves `out` untouched when the FIFO is empty.
    pub fn pull(&mut self, out: &mut T) -> bool {
        let shared = &*self.shared;
        let read_pos = shared.read_pos.load(Ordering::Relaxed);
        let write_pos = shared.write_pos.load(Ordering::Acquire);

        if write_pos == read_pos {
            return false;
        }

        // SAFETY: the Acquire load above makes the producer's write visible
        // and the producer will not touch this slot until read_pos moves on
        unsafe {
            out.clone_from(&*shared.slot(read_pos).get());
        }

        shared.read_pos.store(read_pos.wrapping_add(1), Ordering::Release);
        true
    }
}

impl<T> FifoConsumer<T> {
    /// Items ready to be pulled
    pub fn num_available(&self) -> usize {
        self.shared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_available() == 0
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// Discard everything currently readable, returning how many items went
    pub fn skip_all(&mut self) -> usize {
        let shared = &*self.shared;
        let read_pos = shared.read_pos.load(Ordering::Relaxed);
        let write_pos = shared.write_pos.load(Ordering::Acquire);
        shared.read_pos.store(write_pos, Ordering::Release);
        write_pos.wrapping_sub(read_pos)
    }
}
