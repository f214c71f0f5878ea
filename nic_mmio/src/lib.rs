//! Register access for memory-mapped NIC control/status registers.
//!
//! The driver never touches device registers directly; every component takes
//! a handle implementing [`NicMmio`] and reads/writes registers through it.
//! This keeps the register window a single-owner value rather than ambient
//! global state, and lets tests substitute a fake backend for the real
//! memory-mapped BAR.
//!
//! Offsets are device-relative byte offsets into the register window. Their
//! meaning is the hardware's documented register map; this crate treats them
//! as opaque.

#![no_std]

use core::ptr::{read_volatile, write_volatile, NonNull};

/// Access to a NIC's memory-mapped register window.
///
/// All accesses are volatile with respect to the compiler. `flush` is the
/// write-ordering barrier: it performs a dummy read, which on PCIe forces all
/// prior posted writes to complete before it returns.
pub trait NicMmio {
    fn read16(&self, reg: u32) -> u16;
    fn read32(&self, reg: u32) -> u32;
    fn write16(&self, reg: u32, value: u16);
    fn write32(&self, reg: u32, value: u32);

    /// Forces prior writes out to the device by reading a register back.
    fn flush(&self) {
        self.read32(0);
    }
}

/// A register window mapped into the driver's address space.
///
/// This is the production implementation of [`NicMmio`]: a base pointer to
/// the device's BAR, mapped uncacheable by the platform layer that owns bus
/// enumeration.
pub struct MappedMmio {
    base: NonNull<u8>,
    len: usize,
}

impl MappedMmio {
    /// Wraps a mapped register window of `len` bytes starting at `base`.
    ///
    /// # Safety
    ///
    /// `base` must point to a live device-register mapping of at least `len`
    /// bytes, mapped with caching disabled, and must remain valid for the
    /// lifetime of the returned value.
    pub unsafe fn new(base: NonNull<u8>, len: usize) -> MappedMmio {
        MappedMmio { base, len }
    }

    fn reg_ptr(&self, reg: u32, size: usize) -> *mut u8 {
        let offset = reg as usize;
        assert!(
            offset + size <= self.len && offset % size == 0,
            "register {:#x} outside or misaligned in {}-byte window",
            reg,
            self.len
        );
        // In bounds per the assert above; the mapping is live per `new`'s
        // contract.
        unsafe { self.base.as_ptr().add(offset) }
    }
}

impl NicMmio for MappedMmio {
    fn read16(&self, reg: u32) -> u16 {
        unsafe { read_volatile(self.reg_ptr(reg, 2) as *const u16) }
    }

    fn read32(&self, reg: u32) -> u32 {
        unsafe { read_volatile(self.reg_ptr(reg, 4) as *const u32) }
    }

    fn write16(&self, reg: u32, value: u16) {
        unsafe { write_volatile(self.reg_ptr(reg, 2) as *mut u16, value) }
    }

    fn write32(&self, reg: u32, value: u32) {
        unsafe { write_volatile(self.reg_ptr(reg, 4) as *mut u32, value) }
    }
}

// The window is plain device memory; concurrent access discipline is the
// driver's responsibility (single interrupt context + device lock).
unsafe impl Send for MappedMmio {}
unsafe impl Sync for MappedMmio {}
