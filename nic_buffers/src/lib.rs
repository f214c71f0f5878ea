//! Defines the DMA memory and packet buffer types used to send and receive
//! packets.
//!
//! The platform layer owns bus enumeration and page mapping; it hands this
//! crate physically-contiguous memory in the form of [`DmaSegment`]s (packet
//! payload) and [`DmaBlock`]s (descriptor ring backing). Everything above
//! tracks ownership: a [`TransmitBuffer`] belongs to the driver from submit
//! until completion reclamation, and a [`ReceiveBuffer`] returns itself to
//! its pool when dropped.

#![no_std]

extern crate alloc;

use alloc::vec::Vec;
use core::ptr::NonNull;
use log::error;

/// One physically-contiguous piece of a packet buffer, as seen by the DMA
/// engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DmaSegment {
    /// Starting physical address of the segment.
    pub addr: u64,
    /// Length of the segment in bytes. NIC buffer length fields are 16 bits.
    pub len: u16,
}

/// A physically- and virtually-contiguous, DMA-coherent memory region.
///
/// Descriptor rings live inside one of these. The platform allocates it
/// (uncacheable, device-visible) and tells us both addresses; the device is
/// programmed with `phys_addr`, the driver writes descriptors through
/// `virt`.
pub struct DmaBlock {
    virt: NonNull<u8>,
    phys: u64,
    len: usize,
}

impl DmaBlock {
    /// Wraps a DMA-coherent region.
    ///
    /// # Safety
    ///
    /// `virt` must point to a writable region of `len` bytes that the device
    /// can reach at physical address `phys`, valid and exclusively ours for
    /// the lifetime of the returned block.
    pub unsafe fn new(virt: NonNull<u8>, phys: u64, len: usize) -> DmaBlock {
        DmaBlock { virt, phys, len }
    }

    pub fn phys_addr(&self) -> u64 {
        self.phys
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn virt_addr(&self) -> NonNull<u8> {
        self.virt
    }

    /// Zeroes the whole region.
    pub fn zero(&mut self) {
        unsafe { core::ptr::write_bytes(self.virt.as_ptr(), 0, self.len) }
    }
}

// A DmaBlock is an exclusively-owned region; moving it across threads is
// fine, shared access is governed by whoever owns it.
unsafe impl Send for DmaBlock {}

/// Why binding a packet buffer to a DMA mapping failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapError {
    /// The buffer's physical layout needs more segments than the device
    /// supports. Recoverable once, via [`TransmitBuffer::collapse`].
    TooManySegments,
    /// The buffer has no payload.
    Empty,
}

/// The scatter-gather list a packet was bound to, handed to the hardware one
/// descriptor per segment.
///
/// A mapping must outlive every descriptor that references it; the transmit
/// ring keeps it in the tracking slot that completion reclamation will
/// visit, and dropping it releases the binding.
#[derive(Debug, PartialEq, Eq)]
pub struct DmaMapping {
    segments: Vec<DmaSegment>,
}

impl DmaMapping {
    pub fn segments(&self) -> &[DmaSegment] {
        &self.segments
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }
}

/// A packet to be transmitted, owned by the driver from submission until
/// completion reclamation.
///
/// The payload may be split across multiple physical segments; the driver
/// only ever consults the segment list, never the bytes.
#[derive(Debug)]
pub struct TransmitBuffer {
    segments: Vec<DmaSegment>,
    length: u32,
}

impl TransmitBuffer {
    /// Creates a transmit buffer over the given physical segments.
    pub fn new(segments: Vec<DmaSegment>) -> TransmitBuffer {
        let length = segments.iter().map(|s| u32::from(s.len)).sum();
        TransmitBuffer { segments, length }
    }

    /// Total payload length in bytes.
    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Binds the buffer to a DMA mapping of at most `max_segments` segments.
    pub fn map(&self, max_segments: usize) -> Result<DmaMapping, MapError> {
        if self.segments.is_empty() {
            return Err(MapError::Empty);
        }
        if self.segments.len() > max_segments {
            return Err(MapError::TooManySegments);
        }
        Ok(DmaMapping {
            segments: self.segments.clone(),
        })
    }

    /// Coalesces physically adjacent segments into fewer, larger contiguous
    /// regions.
    ///
    /// Runs are merged only while the combined length still fits the 16-bit
    /// descriptor length field. A buffer that is genuinely scattered in
    /// physical memory cannot be collapsed further; the caller must then
    /// drop the packet rather than retry again.
    pub fn collapse(&mut self) {
        let mut merged: Vec<DmaSegment> = Vec::with_capacity(self.segments.len());
        for seg in self.segments.drain(..) {
            match merged.last_mut() {
                Some(prev)
                    if prev.addr + u64::from(prev.len) == seg.addr
                        && prev.len.checked_add(seg.len).is_some() =>
                {
                    prev.len += seg.len;
                }
                _ => merged.push(seg),
            }
        }
        self.segments = merged;
    }
}

/// A buffer that stores a packet received by the NIC.
///
/// Popped from its pool to be posted to the receive ring, handed to a higher
/// layer on completion, and automatically returned to the pool for reuse
/// when dropped.
pub struct ReceiveBuffer {
    segment: Option<DmaSegment>,
    pool: mpmc::Queue<ReceiveBuffer>,
}

impl ReceiveBuffer {
    /// Creates a new receive buffer over `segment`, tied to the given pool.
    pub fn new(segment: DmaSegment, pool: mpmc::Queue<ReceiveBuffer>) -> ReceiveBuffer {
        ReceiveBuffer {
            segment: Some(segment),
            pool,
        }
    }

    pub fn phys_addr(&self) -> u64 {
        self.segment.map(|s| s.addr).unwrap_or(0)
    }

    pub fn capacity(&self) -> u16 {
        self.segment.map(|s| s.len).unwrap_or(0)
    }
}

impl Drop for ReceiveBuffer {
    fn drop(&mut self) {
        // Return the underlying memory to the pool by rebuilding an
        // identical buffer; `segment` is taken so this drop body cannot
        // recurse through the rebuilt value.
        if let Some(segment) = self.segment.take() {
            let rebuilt = ReceiveBuffer::new(segment, self.pool.clone());
            if let Err(mut lost) = self.pool.push(rebuilt) {
                lost.segment = None;
                error!(
                    "NIC: receive buffer pool full, leaking buffer at {:#x}",
                    segment.addr
                );
            }
        }
    }
}

/// Seeds a receive buffer pool with one buffer per payload segment.
///
/// The platform provides the segments (one per pre-allocated receive
/// buffer); this mirrors the driver-side pool initialization done at attach.
pub fn init_rx_buf_pool(
    segments: impl IntoIterator<Item = DmaSegment>,
    pool: &mpmc::Queue<ReceiveBuffer>,
) -> Result<(), &'static str> {
    for segment in segments {
        let buf = ReceiveBuffer::new(segment, pool.clone());
        if let Err(mut lost) = pool.push(buf) {
            lost.segment = None;
            return Err("receive buffer pool is full");
        }
    }
    Ok(())
}
