//! Template slot allocator.
//!
//! The sensor library holds `capacity` templates addressed by [`SlotId`].
//! The allocator keeps an ordered free list seeded once at boot from an
//! occupancy scan and mutated incrementally afterwards; it never rescans.
//!
//! ```text
//!   free[0]      the "next never-used" counter (or the exhausted sentinel)
//!   free[1..]    holes below the counter, reused LIFO
//! ```
//!
//! While the list holds only the counter, `allocate` hands it out and bumps
//! it in place.  Once holes exist they are popped from the tail first, so the
//! contiguous range only grows when every hole has been reused.

use log::{debug, info, warn};

use crate::app::ports::{FingerprintPort, Occupancy};
use crate::error::{Error, Result};

/// Index of a template slot on the sensor.
pub type SlotId = u16;

#[derive(Debug, Clone)]
pub struct SlotAllocator {
    free: Vec<SlotId>,
    capacity: u16,
}

impl SlotAllocator {
    /// Probe every slot on the sensor and build the free list.
    ///
    /// A probe that errors is treated as an empty slot.  This is the only
    /// full scan the allocator ever performs.
    pub fn scan(sensor: &mut dyn FingerprintPort, capacity: u16) -> Self {
        info!("Scanning {} template slots", capacity);
        let mut occupied = Vec::new();
        for id in 0..capacity {
            match sensor.probe(id) {
                Ok(Occupancy::Occupied) => occupied.push(id),
                Ok(Occupancy::Empty) => {}
                Err(e) => debug!("slot {} probe failed ({}), counted as free", id, e),
            }
        }
        let alloc = Self::with_occupied(capacity, &occupied);
        info!(
            "Slot scan complete: {} occupied, free list {:?}",
            occupied.len(),
            alloc.free
        );
        alloc
    }

    /// Build the free list from a known set of occupied slots.
    pub fn with_occupied(capacity: u16, occupied: &[SlotId]) -> Self {
        let highest = occupied.iter().copied().filter(|&id| id < capacity).max();

        let mut free = Vec::new();
        let next = highest.map_or(0, |h| h + 1);
        if next >= capacity {
            warn!("Template library is full");
        }
        // `next == capacity` doubles as the exhausted sentinel.
        free.push(next.min(capacity));

        if let Some(h) = highest {
            free.extend((0..h).rev().filter(|id| !occupied.contains(id)));
        }

        Self { free, capacity }
    }

    /// Hand out a slot id.
    ///
    /// With only the counter left, returns it and advances it by one.
    /// Otherwise pops the most recently freed hole.
    pub fn allocate(&mut self) -> Result<SlotId> {
        match self.free.len() {
            0 => Err(Error::ResourceExhausted),
            1 => {
                let next = self.free[0];
                if next >= self.capacity {
                    return Err(Error::ResourceExhausted);
                }
                self.free[0] = next + 1;
                Ok(next)
            }
            _ => self.free.pop().ok_or(Error::ResourceExhausted),
        }
    }

    /// Return `id` to the pool as a reusable hole.
    ///
    /// Ids at or above the counter were never handed out and are ignored,
    /// as are ids already on the list.
    pub fn release(&mut self, id: SlotId) {
        let counter = self.free.first().copied().unwrap_or(self.capacity);
        if id >= counter || id >= self.capacity {
            warn!("release of never-allocated slot {} ignored", id);
            return;
        }
        if self.free.iter().skip(1).any(|&free| free == id) {
            warn!("slot {} is already free", id);
            return;
        }
        self.free.push(id);
    }

    /// True when `allocate` would fail.
    pub fn is_exhausted(&self) -> bool {
        match self.free.as_slice() {
            [] => true,
            [only] => *only >= self.capacity,
            _ => false,
        }
    }

    /// Current free list in internal order (counter first).
    pub fn free_ids(&self) -> &[SlotId] {
        &self.free
    }

    /// Number of ids that can still be allocated.
    pub fn available(&self) -> usize {
        match self.free.split_first() {
            Some((counter, holes)) => {
                holes.len() + usize::from(self.capacity.saturating_sub(*counter))
            }
            None => 0,
        }
    }

    pub fn capacity(&self) -> u16 {
        self.capacity
    }
}
