//! In-memory descriptor layouts shared with the DMA engine.
//!
//! Three rings use three formats: TPD (transmit packet descriptor, one per
//! payload segment), RFD (receive free descriptor, offers an empty buffer),
//! and RRD (receive return descriptor, filled in by the device when a frame
//! arrives). The chip is little-endian and so are all supported hosts, so
//! fields are stored native. Descriptors live in DMA-coherent memory and
//! become visible to the device only at the producer-register write, which
//! is preceded by a release fence.

use bit_field::BitField;
use nic_queues::{RxDescriptor, TxDescriptor};
use static_assertions::const_assert_eq;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

/// `word0` bits 0..16: length of this segment in bytes.
const TPD_BUFLEN_RANGE: core::ops::Range<usize> = 0..16;
/// `word1` bit 19: last descriptor of the frame.
const TPD_EOP_BIT: usize = 19;

/// Transmit packet descriptor. A frame occupies one TPD per DMA segment;
/// only the last one carries the end-of-packet flag.
#[derive(Clone, Copy, Debug, FromZeroes, FromBytes, AsBytes)]
#[repr(C)]
pub struct TpdDescriptor {
    word0: u32,
    word1: u32,
    addr: u64,
}

const_assert_eq!(core::mem::size_of::<TpdDescriptor>(), 16);

impl TpdDescriptor {
    pub fn buffer_len(&self) -> u16 {
        self.word0.get_bits(TPD_BUFLEN_RANGE) as u16
    }

    pub fn buffer_addr(&self) -> u64 {
        self.addr
    }

    pub fn is_end_of_packet(&self) -> bool {
        self.word1.get_bit(TPD_EOP_BIT)
    }
}

impl TxDescriptor for TpdDescriptor {
    fn set_segment(&mut self, addr: u64, len: u16) {
        self.addr = addr;
        let mut word0 = 0u32;
        word0.set_bits(TPD_BUFLEN_RANGE, u32::from(len));
        self.word0 = word0;
        // Stale flags from the slot's previous frame must not leak.
        self.word1 = 0;
    }

    fn mark_end_of_packet(&mut self) {
        self.word1.set_bit(TPD_EOP_BIT, true);
    }

    fn clear(&mut self) {
        *self = TpdDescriptor::new_zeroed();
    }
}

/// Receive free descriptor: nothing but the physical address of an empty
/// buffer the device may fill.
#[derive(Clone, Copy, Debug, FromZeroes, FromBytes, AsBytes)]
#[repr(C)]
pub struct RfdDescriptor {
    addr: u64,
}

const_assert_eq!(core::mem::size_of::<RfdDescriptor>(), 8);

impl RfdDescriptor {
    pub fn buffer_addr(&self) -> u64 {
        self.addr
    }
}

impl RxDescriptor for RfdDescriptor {
    fn set_buffer(&mut self, addr: u64) {
        self.addr = addr;
    }

    fn clear(&mut self) {
        self.addr = 0;
    }
}

/// `word0` bits 0..14: received frame length including CRC.
const RRD_PKT_LEN_RANGE: core::ops::Range<usize> = 0..14;
/// `word3` bit 31: device has finished writing this descriptor.
const RRD_UPDATED_BIT: usize = 31;
/// `word3` bits 0..12: RFD index the frame landed in.
const RRD_RFD_IDX_RANGE: core::ops::Range<usize> = 0..12;

/// Receive return descriptor, written back by the device for each
/// received frame.
#[derive(Clone, Copy, Debug, FromZeroes, FromBytes, AsBytes)]
#[repr(C)]
pub struct RrdDescriptor {
    word0: u32,
    rss_hash: u32,
    word2: u32,
    word3: u32,
}

const_assert_eq!(core::mem::size_of::<RrdDescriptor>(), 16);

impl RrdDescriptor {
    pub fn packet_len(&self) -> u16 {
        self.word0.get_bits(RRD_PKT_LEN_RANGE) as u16
    }

    pub fn rfd_index(&self) -> u16 {
        self.word3.get_bits(RRD_RFD_IDX_RANGE) as u16
    }

    pub fn is_updated(&self) -> bool {
        self.word3.get_bit(RRD_UPDATED_BIT)
    }

    /// Hand the descriptor back to the device for reuse.
    pub fn clear(&mut self) {
        *self = RrdDescriptor::new_zeroed();
    }
}
