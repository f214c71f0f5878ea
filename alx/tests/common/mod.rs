//! Test harness: a scripted register backend standing in for the chip, plus
//! helpers to build a driver instance around it.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use spin::Mutex;

use alx::regs::*;
use alx::{AlxConfig, AlxDma, AlxNic, LinkEvent, LinkObserver};
use nic_buffers::{DmaBlock, DmaSegment, ReceiveBuffer};
use nic_mmio::NicMmio;

/// Register width of a logged write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Width {
    W16,
    W32,
}

#[derive(Default)]
pub struct FakeState {
    regs32: BTreeMap<u32, u32>,
    regs16: BTreeMap<u32, u16>,
    phy: BTreeMap<u16, u16>,
    /// Every write in order, for sequencing assertions.
    writes: Vec<(u32, u32, Width)>,
    flushes: usize,
    /// When set, the MAC reset strobe never self-clears.
    fail_mac_reset: bool,
}

/// Cloneable handle over the shared fake chip state.
#[derive(Clone)]
pub struct FakeMmio(Arc<Mutex<FakeState>>);

impl FakeMmio {
    pub fn new() -> FakeMmio {
        FakeMmio(Arc::new(Mutex::new(FakeState::default())))
    }

    pub fn set_reg32(&self, reg: u32, value: u32) {
        self.0.lock().regs32.insert(reg, value);
    }

    pub fn reg32(&self, reg: u32) -> u32 {
        self.0.lock().regs32.get(&reg).copied().unwrap_or(0)
    }

    pub fn set_reg16(&self, reg: u32, value: u16) {
        self.0.lock().regs16.insert(reg, value);
    }

    pub fn reg16(&self, reg: u32) -> u16 {
        self.0.lock().regs16.get(&reg).copied().unwrap_or(0)
    }

    pub fn set_phy_reg(&self, reg: u16, value: u16) {
        self.0.lock().phy.insert(reg, value);
    }

    pub fn fail_mac_reset(&self, fail: bool) {
        self.0.lock().fail_mac_reset = fail;
    }

    /// Script the PHY as link-up at the given PSSR status word.
    pub fn set_phy_link_up(&self, pssr: u16) {
        let mut st = self.0.lock();
        st.phy.insert(MII_BMSR, BMSR_LINK);
        st.phy.insert(MII_PSSR, pssr);
    }

    pub fn set_phy_link_down(&self) {
        let mut st = self.0.lock();
        st.phy.insert(MII_BMSR, 0);
        st.phy.insert(MII_PSSR, 0);
    }

    pub fn clear_writes(&self) {
        self.0.lock().writes.clear();
    }

    pub fn writes(&self) -> Vec<(u32, u32, Width)> {
        self.0.lock().writes.clone()
    }

    /// Values written to one register, in order.
    pub fn writes_to(&self, reg: u32) -> Vec<u32> {
        self.0
            .lock()
            .writes
            .iter()
            .filter(|(r, _, _)| *r == reg)
            .map(|(_, v, _)| *v)
            .collect()
    }

    /// Index of the first write to `reg`, for ordering assertions.
    pub fn first_write_index(&self, reg: u32) -> Option<usize> {
        self.0.lock().writes.iter().position(|(r, _, _)| *r == reg)
    }

    fn mdio_cycle(st: &mut FakeState, cmd: u32) {
        let reg = ((cmd >> MDIO_REG_SHIFT) & 0x1F) as u16;
        let done = if cmd & MDIO_OP_READ != 0 {
            let data = st.phy.get(&reg).copied().unwrap_or(0);
            if reg == MII_ISR {
                // Read-to-clear interrupt latch.
                st.phy.insert(MII_ISR, 0);
            }
            (cmd & !(MDIO_START | MDIO_DATA_MASK)) | u32::from(data)
        } else {
            let mut data = (cmd & MDIO_DATA_MASK) as u16;
            if reg == MII_BMCR {
                // The reset strobe self-clears immediately.
                data &= !BMCR_RESET;
            }
            st.phy.insert(reg, data);
            cmd & !MDIO_START
        };
        st.regs32.insert(ALX_MDIO, done);
    }
}

impl NicMmio for FakeMmio {
    fn read16(&self, reg: u32) -> u16 {
        self.0.lock().regs16.get(&reg).copied().unwrap_or(0)
    }

    fn read32(&self, reg: u32) -> u32 {
        self.0.lock().regs32.get(&reg).copied().unwrap_or(0)
    }

    fn write16(&self, reg: u32, value: u16) {
        let mut st = self.0.lock();
        st.writes.push((reg, u32::from(value), Width::W16));
        st.regs16.insert(reg, value);
    }

    fn write32(&self, reg: u32, value: u32) {
        let mut st = self.0.lock();
        st.writes.push((reg, value, Width::W32));
        match reg {
            ALX_MDIO if value & MDIO_START != 0 => FakeMmio::mdio_cycle(&mut st, value),
            ALX_MASTER => {
                let stored = if st.fail_mac_reset {
                    value
                } else {
                    value & !MASTER_DMA_MAC_RST
                };
                st.regs32.insert(reg, stored);
            }
            _ => {
                st.regs32.insert(reg, value);
            }
        }
    }

    fn flush(&self) {
        self.0.lock().flushes += 1;
    }
}

/// Link observer that records every notification.
pub struct RecordingObserver(pub Arc<Mutex<Vec<LinkEvent>>>);

impl LinkObserver for RecordingObserver {
    fn link_changed(&mut self, event: LinkEvent) {
        self.0.lock().push(event);
    }
}

pub fn alloc_block(len: usize) -> (DmaBlock, *mut u8) {
    let mem = vec![0u8; len].into_boxed_slice();
    let ptr = Box::leak(mem).as_mut_ptr();
    let virt = std::ptr::NonNull::new(ptr).unwrap();
    (unsafe { DmaBlock::new(virt, ptr as u64, len) }, ptr)
}

pub struct Harness {
    pub nic: AlxNic<FakeMmio>,
    pub mmio: FakeMmio,
    pub events: Arc<Mutex<Vec<LinkEvent>>>,
    pub rx_pool: mpmc::Queue<ReceiveBuffer>,
    /// Raw view of the receive return ring, for simulating device writeback.
    pub rrd_ptr: *mut u8,
}

/// Build a driver over the fake chip with `pool_bufs` receive buffers.
pub fn build(config: AlxConfig, pool_bufs: usize) -> Harness {
    let mmio = FakeMmio::new();

    let (tpd, _) = alloc_block(usize::from(config.tx_ring_size) * 16);
    let (rfd, _) = alloc_block(usize::from(config.rx_ring_size) * 8);
    let (rrd, rrd_ptr) = alloc_block(usize::from(config.rx_ring_size) * 16);

    let rx_pool = mpmc::Queue::with_capacity(
        usize::from(config.rx_ring_size).next_power_of_two(),
    );
    let segs = (0..pool_bufs as u64).map(|i| DmaSegment {
        addr: 0x10_0000 + i * 0x800,
        len: 2048,
    });
    nic_buffers::init_rx_buf_pool(segs, &rx_pool).unwrap();

    let nic = AlxNic::new(
        mmio.clone(),
        config,
        AlxDma {
            tpd_ring: tpd,
            rfd_ring: rfd,
            rrd_ring: rrd,
        },
        rx_pool.clone(),
    )
    .unwrap();

    let events = Arc::new(Mutex::new(Vec::new()));
    let mut harness = Harness {
        nic,
        mmio,
        events: events.clone(),
        rx_pool,
        rrd_ptr,
    };
    harness
        .nic
        .set_link_observer(Box::new(RecordingObserver(events)));
    harness
}

/// Small-ring config used by most scenarios.
pub fn small_config() -> AlxConfig {
    AlxConfig {
        tx_ring_size: 4,
        rx_ring_size: 4,
        ..AlxConfig::default()
    }
}

/// PSSR word for a resolved gigabit full-duplex link.
pub fn pssr_1000_full() -> u16 {
    PSSR_RESOLVED | PSSR_FULL_DUPLEX | PSSR_SPEED_1000
}

/// Bring the link up and start the interface.
pub fn start_with_link(h: &mut Harness) {
    h.mmio.set_phy_link_up(pssr_1000_full());
    h.nic.start([0x02, 0x00, 0x5e, 0x00, 0x00, 0x01]).unwrap();
}

/// A transmit buffer of `n` segments laid out so no two are physically
/// adjacent and collapse cannot merge them.
pub fn scattered_buffer(n: usize) -> nic_buffers::TransmitBuffer {
    let segs = (0..n as u64)
        .map(|i| DmaSegment {
            addr: 0x20_0000 + i * 0x4000,
            len: 256,
        })
        .collect();
    nic_buffers::TransmitBuffer::new(segs)
}

/// A transmit buffer of `n` physically contiguous segments, which collapse
/// can merge into one.
pub fn contiguous_buffer(n: usize) -> nic_buffers::TransmitBuffer {
    let segs = (0..n as u64)
        .map(|i| DmaSegment {
            addr: 0x30_0000 + i * 64,
            len: 64,
        })
        .collect();
    nic_buffers::TransmitBuffer::new(segs)
}
