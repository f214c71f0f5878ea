//! Descriptor ring bookkeeping shared by the transmit and receive paths of a NIC driver.
//!
//! A ring is a contiguous DMA-visible array of hardware descriptors plus a parallel
//! array of software slots that track who currently owns each buffer. The driver
//! advances a producer index as it hands descriptors to the device and a consumer
//! index as the device reports completions. Indices always stay in `0..capacity`
//! and the producer is never allowed to catch up to the consumer, so a full ring
//! is indistinguishable from an empty one only to code that ignores this module.

#![no_std]

extern crate alloc;

use alloc::vec::Vec;
use core::marker::PhantomData;
use core::mem;

use nic_buffers::{DmaBlock, DmaMapping, TransmitBuffer};
use zerocopy::FromZeroes;

/// Transmit slots held back from the producer so it can never fill the ring
/// completely. Some controllers misread a producer index equal to the consumer
/// index as an empty ring, so two descriptors stay permanently unusable.
pub const RESERVED_TX_SLOTS: u16 = 2;

/// One hardware transmit descriptor, written by software and read by the device.
pub trait TxDescriptor: FromZeroes {
    /// Point this descriptor at one DMA segment of an outgoing frame.
    /// Any flags left over from a previous use must be cleared.
    fn set_segment(&mut self, addr: u64, len: u16);

    /// Mark this descriptor as the last one of its frame.
    fn mark_end_of_packet(&mut self);

    /// Return the descriptor to its all-zeroes state.
    fn clear(&mut self);
}

/// One hardware receive descriptor, written by software to offer a buffer
/// to the device.
pub trait RxDescriptor: FromZeroes {
    /// Point this descriptor at an empty receive buffer.
    fn set_buffer(&mut self, addr: u64);

    /// Return the descriptor to its all-zeroes state.
    fn clear(&mut self);
}

/// Advance a ring index by one, wrapping at `capacity`.
#[inline]
pub fn advance(index: u16, capacity: u16) -> u16 {
    let next = index + 1;
    if next == capacity {
        0
    } else {
        next
    }
}

/// Number of descriptors currently handed to the device,
/// i.e. the distance from `cidx` up to `pidx` modulo `capacity`.
#[inline]
pub fn occupancy(pidx: u16, cidx: u16, capacity: u16) -> u16 {
    (pidx + capacity - cidx) % capacity
}

/// Number of descriptors the producer may still claim.
///
/// This is bounded twice: one slot always separates the producer from the
/// consumer so the ring never reads as full, and [`RESERVED_TX_SLOTS`]
/// descriptors are withheld outright.
#[inline]
pub fn available_slots(pidx: u16, cidx: u16, capacity: u16) -> u16 {
    let raw_free = capacity - occupancy(pidx, cidx, capacity);
    core::cmp::min(capacity - RESERVED_TX_SLOTS, raw_free - 1)
}

/// Ownership state of one transmit ring slot.
///
/// The mapping of a multi-segment frame is recorded only in the slot of its
/// *last* descriptor, which is the slot the consumer index lands on when the
/// device finishes the frame. All other slots of that frame stay `Free`.
pub enum TxSlot {
    /// No buffer is associated with this slot.
    Free,
    /// A mapping has been written into descriptors but not yet exposed
    /// to the device via the producer register.
    Pending(DmaMapping),
    /// The device owns the descriptors; the buffer must stay alive until
    /// the consumer index passes this slot.
    Posted {
        mapping: DmaMapping,
        buffer: TransmitBuffer,
    },
}

impl TxSlot {
    /// Take the current state, leaving `Free` behind.
    pub fn take(&mut self) -> TxSlot {
        mem::replace(self, TxSlot::Free)
    }

    pub fn is_free(&self) -> bool {
        matches!(self, TxSlot::Free)
    }
}

/// A transmit descriptor ring: the DMA-visible descriptor array plus the
/// per-slot ownership states and the software shadow of both ring indices.
pub struct TxRing<T: TxDescriptor> {
    mem: DmaBlock,
    capacity: u16,
    pidx: u16,
    cidx: u16,
    slots: Vec<TxSlot>,
    _desc: PhantomData<T>,
}

impl<T: TxDescriptor> TxRing<T> {
    /// Wrap `mem` as a ring of `capacity` descriptors of type `T`.
    ///
    /// `mem` must be large enough and suitably aligned for `capacity`
    /// descriptors; it is zeroed here, which is a valid initial state for
    /// any `T: FromZeroes`.
    pub fn new(mut mem: DmaBlock, capacity: u16) -> Result<TxRing<T>, &'static str> {
        check_ring_layout::<T>(&mem, capacity)?;
        if capacity <= RESERVED_TX_SLOTS + 1 {
            return Err("ring capacity leaves no usable descriptors");
        }
        mem.zero();
        let mut slots = Vec::with_capacity(capacity as usize);
        slots.resize_with(capacity as usize, || TxSlot::Free);
        Ok(TxRing {
            mem,
            capacity,
            pidx: 0,
            cidx: 0,
            slots,
            _desc: PhantomData,
        })
    }

    pub fn capacity(&self) -> u16 {
        self.capacity
    }

    pub fn producer_index(&self) -> u16 {
        self.pidx
    }

    /// The consumer index as of the last reclaim pass, not necessarily
    /// the device's live value.
    pub fn consumer_index(&self) -> u16 {
        self.cidx
    }

    /// Physical base address of the descriptor array, for ring base registers.
    pub fn base_phys(&self) -> u64 {
        self.mem.phys_addr()
    }

    /// Descriptors the producer may claim, judged against the reclaim
    /// shadow rather than the device's live consumer index. A completed
    /// slot becomes reusable only once reclamation has released its
    /// buffer; judging against the live index would let the producer
    /// write into slots the next reclaim pass will take.
    pub fn available(&self) -> u16 {
        available_slots(self.pidx, self.cidx, self.capacity)
    }

    pub fn descriptor_mut(&mut self, index: u16) -> &mut T {
        debug_assert!(index < self.capacity);
        // In bounds per check_ring_layout, and &mut self guarantees exclusivity.
        unsafe {
            &mut *self
                .mem
                .virt_addr()
                .as_ptr()
                .cast::<T>()
                .add(index as usize)
        }
    }

    pub fn slot_mut(&mut self, index: u16) -> &mut TxSlot {
        &mut self.slots[index as usize]
    }

    pub fn set_producer_index(&mut self, pidx: u16) {
        debug_assert!(pidx < self.capacity);
        self.pidx = pidx;
    }

    pub fn set_consumer_index(&mut self, cidx: u16) {
        debug_assert!(cidx < self.capacity);
        self.cidx = cidx;
    }

    /// Drop every outstanding buffer and return the ring to its post-`new`
    /// state. Only valid while the device is quiesced.
    pub fn reset(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = TxSlot::Free;
        }
        self.mem.zero();
        self.pidx = 0;
        self.cidx = 0;
    }
}

/// A receive descriptor ring: offered-buffer descriptors plus the buffer
/// each slot currently lends to the device.
pub struct RxRing<T: RxDescriptor> {
    mem: DmaBlock,
    capacity: u16,
    pidx: u16,
    cidx: u16,
    buffers: Vec<Option<nic_buffers::ReceiveBuffer>>,
    _desc: PhantomData<T>,
}

impl<T: RxDescriptor> RxRing<T> {
    pub fn new(mut mem: DmaBlock, capacity: u16) -> Result<RxRing<T>, &'static str> {
        check_ring_layout::<T>(&mem, capacity)?;
        if capacity < 2 {
            return Err("receive ring needs at least two descriptors");
        }
        mem.zero();
        let mut buffers = Vec::with_capacity(capacity as usize);
        buffers.resize_with(capacity as usize, || None);
        Ok(RxRing {
            mem,
            capacity,
            pidx: 0,
            cidx: 0,
            buffers,
            _desc: PhantomData,
        })
    }

    pub fn capacity(&self) -> u16 {
        self.capacity
    }

    pub fn producer_index(&self) -> u16 {
        self.pidx
    }

    pub fn consumer_index(&self) -> u16 {
        self.cidx
    }

    pub fn base_phys(&self) -> u64 {
        self.mem.phys_addr()
    }

    pub fn descriptor_mut(&mut self, index: u16) -> &mut T {
        debug_assert!(index < self.capacity);
        unsafe {
            &mut *self
                .mem
                .virt_addr()
                .as_ptr()
                .cast::<T>()
                .add(index as usize)
        }
    }

    pub fn buffer_mut(&mut self, index: u16) -> &mut Option<nic_buffers::ReceiveBuffer> {
        &mut self.buffers[index as usize]
    }

    pub fn set_producer_index(&mut self, pidx: u16) {
        debug_assert!(pidx < self.capacity);
        self.pidx = pidx;
    }

    pub fn set_consumer_index(&mut self, cidx: u16) {
        debug_assert!(cidx < self.capacity);
        self.cidx = cidx;
    }

    /// Return all lent buffers to their pool and clear the descriptor array.
    /// Only valid while the device is quiesced.
    pub fn reset(&mut self) {
        for buf in self.buffers.iter_mut() {
            *buf = None;
        }
        self.mem.zero();
        self.pidx = 0;
        self.cidx = 0;
    }
}

fn check_ring_layout<T>(mem: &DmaBlock, capacity: u16) -> Result<(), &'static str> {
    let needed = capacity as usize * mem::size_of::<T>();
    if mem.len() < needed {
        return Err("DMA block too small for descriptor ring");
    }
    if mem.virt_addr().as_ptr() as usize % mem::align_of::<T>() != 0 {
        return Err("DMA block misaligned for descriptor type");
    }
    Ok(())
}
