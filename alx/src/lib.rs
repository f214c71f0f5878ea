//! Driver core for the Qualcomm Atheros AR816x/AR817x gigabit Ethernet
//! family.
//!
//! The driver owns a transmit descriptor ring, a receive free/return ring
//! pair, and the interrupt plumbing between them. The embedder supplies the
//! register window (anything implementing [`nic_mmio::NicMmio`]), the
//! DMA-coherent memory for the rings, a pool of receive buffers, and the
//! execution contexts: one caller invokes [`AlxNic::handle_interrupt`] from
//! the shared interrupt line and later calls [`AlxNic::service_deferred`]
//! from task context. All methods take `&mut self`; the embedder holds
//! whatever lock makes that exclusive.
//!
//! Interrupt handling is two-phase: the fast path acknowledges the chip,
//! masks the cause that fired, and queues a deferred unit of work; the
//! deferred pass drains the condition and only then unmasks the cause.
//! A cause can therefore never storm the line while its handler is pending.

#![no_std]

extern crate alloc;

use alloc::boxed::Box;
use core::fmt;
use core::sync::atomic::{fence, Ordering};

use log::{debug, error, info, warn};
use nic_buffers::{DmaBlock, MapError, ReceiveBuffer, TransmitBuffer};
use nic_mmio::NicMmio;
use nic_queues::{advance, RxDescriptor, RxRing, TxDescriptor, TxRing, TxSlot};

use deferred_tasks::DeferredQueue;

pub mod descriptors;
pub mod regs;

mod hw;

pub use hw::{AlxHw, Caps, FULL_DUPLEX, HALF_DUPLEX, SPEED_10, SPEED_100, SPEED_1000};

use descriptors::{RfdDescriptor, RrdDescriptor, TpdDescriptor};

/// Scatter-gather limit of the DMA engine, per frame. A frame whose mapping
/// needs more segments than this is collapsed once and then dropped.
pub const MAX_TX_SEGMENTS: usize = 32;

/// Default hash key loaded into the RSS engine so it never runs with an
/// uninitialized one, even though all traffic lands in queue 0.
const DEF_RSS_KEY: [u8; 40] = [
    0xE2, 0x91, 0xD7, 0x3D, 0x18, 0x05, 0xEC, 0x6C, 0x2A, 0x94, 0xB3, 0x0D, 0xA5, 0x4F, 0x2B,
    0xEC, 0xEA, 0x49, 0xAF, 0x7C, 0xE2, 0x14, 0xAD, 0x3D, 0xB8, 0x55, 0xAA, 0xBE, 0x6A, 0x3E,
    0x67, 0xEA, 0x14, 0x36, 0x4D, 0x17, 0x3B, 0xED, 0x20, 0x0D,
];

/// Software configuration fixed at construction.
#[derive(Clone, Debug)]
pub struct AlxConfig {
    pub device_id: u16,
    pub revision: u8,
    pub tx_ring_size: u16,
    pub rx_ring_size: u16,
    pub mtu: u32,
    /// Interrupt moderation timer, in 2us units.
    pub imt: u16,
    /// Statistics-mailbox timer, in ms.
    pub smb_timer: u16,
    pub rss_key: [u8; 40],
    pub rss_idt_size: u16,
    /// Receive-side MAC control bits, ORed into `MAC_CTRL` on every
    /// reconfiguration. Engine-enable bits are managed separately.
    pub rx_ctrl: u32,
}

impl Default for AlxConfig {
    fn default() -> AlxConfig {
        AlxConfig {
            device_id: regs::DEV_ID_AR8161,
            revision: regs::REV_B0,
            tx_ring_size: 256,
            rx_ring_size: 512,
            mtu: 1500,
            imt: 200,
            smb_timer: 400,
            rss_key: DEF_RSS_KEY,
            rss_idt_size: 128,
            rx_ctrl: regs::MAC_CTRL_WOLSPED_SWEN
                | regs::MAC_CTRL_MHASH_ALG_HI5B
                | regs::MAC_CTRL_BRD_EN
                | regs::MAC_CTRL_PCRCE
                | regs::MAC_CTRL_CRCE
                | regs::MAC_CTRL_RXFC_EN
                | regs::MAC_CTRL_TXFC_EN
                | (7 << regs::MAC_CTRL_PRMBLEN_SHIFT),
        }
    }
}

impl AlxConfig {
    /// Receive buffer size programmed into the chip: MTU plus frame
    /// overhead, rounded up to an 8-byte boundary.
    pub fn rx_buf_size(&self) -> u32 {
        (self.mtu + regs::MTU_OVERHEAD + 7) & !7
    }
}

/// DMA-coherent memory for the three descriptor rings, allocated by the
/// platform and handed over at construction.
pub struct AlxDma {
    pub tpd_ring: DmaBlock,
    pub rfd_ring: DmaBlock,
    pub rrd_ring: DmaBlock,
}

/// Errors surfaced by identification, reset sequencing and the link state
/// machine. Transmit has its own taxonomy, [`TxError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// Device/revision pair this driver does not know; attach must refuse.
    UnknownChip { device_id: u16, revision: u8 },
    MdioTimeout,
    PhyResetTimeout,
    MacResetTimeout,
    /// Link reported up before speed/duplex resolution finished.
    PhyUnresolved,
    /// MAC reset failed mid link-down transition; the state machine stopped
    /// and interrupts remain disabled until a full stop/start.
    PartialRecovery,
    Ring(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UnknownChip {
                device_id,
                revision,
            } => write!(f, "unrecognized chip {:#06x} rev {}", device_id, revision),
            Error::MdioTimeout => write!(f, "MDIO cycle did not complete"),
            Error::PhyResetTimeout => write!(f, "PHY reset did not self-clear"),
            Error::MacResetTimeout => write!(f, "MAC/DMA reset did not self-clear"),
            Error::PhyUnresolved => write!(f, "PHY speed/duplex not resolved"),
            Error::PartialRecovery => {
                write!(f, "MAC reset failed during link transition, interrupts left disabled")
            }
            Error::Ring(msg) => write!(f, "ring setup: {}", msg),
        }
    }
}

/// Why a frame was not queued. Variants that hand the buffer back are
/// retryable by the caller; the others consumed (dropped) the frame.
#[derive(Debug)]
pub enum TxError {
    /// Interface not running or link down; the frame is handed back for
    /// requeueing. Not an error worth logging.
    LinkDown(TransmitBuffer),
    /// Not enough free descriptors right now; the frame is handed back and
    /// the caller retries after the next completion.
    InsufficientDescriptors(TransmitBuffer),
    /// Still over the segment limit after one collapse; frame dropped.
    SegmentOverflow,
    /// The buffer could not be bound at all; frame dropped.
    MappingFailure,
}

/// Outcome of the interrupt fast path on a shared line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterruptClaim {
    Claimed,
    NotClaimed,
}

/// Link transition reported to the embedder's network-stack layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkEvent {
    Up { speed: u16, duplex: u16 },
    Down,
}

/// Receiver for link transitions, typically the interface layer above.
pub trait LinkObserver {
    fn link_changed(&mut self, event: LinkEvent);
}

/// Transmit-path bookkeeping for the failure taxonomy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TxCounters {
    pub queued: u64,
    pub reclaimed: u64,
    pub mapping_failures: u64,
    pub overflow_drops: u64,
    pub backpressure: u64,
}

/// Deferred work recorded by the interrupt fast path.
#[derive(Debug, PartialEq)]
enum Cause {
    LinkChange,
    Transmit,
    Receive,
}

/// One AR816x/AR817x device.
pub struct AlxNic<R: NicMmio> {
    hw: AlxHw<R>,
    config: AlxConfig,
    tx_ring: TxRing<TpdDescriptor>,
    rx_ring: RxRing<RfdDescriptor>,
    rrd_ring: DmaBlock,
    rrd_cidx: u16,
    rx_pool: mpmc::Queue<ReceiveBuffer>,
    /// Software copy of the interrupt mask register.
    imask: u32,
    /// Interrupt-disable depth; interrupts reach the line only at zero.
    irq_sem: i32,
    running: bool,
    link_up: bool,
    link_speed: u16,
    link_duplex: u16,
    deferred: DeferredQueue<Cause>,
    observer: Option<Box<dyn LinkObserver + Send>>,
    counters: TxCounters,
}

impl<R: NicMmio> AlxNic<R> {
    /// Identify the chip and lay the rings out in the provided DMA memory.
    /// Nothing is programmed into the device until [`start`](Self::start).
    pub fn new(
        regs: R,
        config: AlxConfig,
        dma: AlxDma,
        rx_pool: mpmc::Queue<ReceiveBuffer>,
    ) -> Result<AlxNic<R>, Error> {
        let hw = AlxHw::identify(regs, config.device_id, config.revision)?;
        let tx_ring =
            TxRing::new(dma.tpd_ring, config.tx_ring_size).map_err(Error::Ring)?;
        let rx_ring =
            RxRing::new(dma.rfd_ring, config.rx_ring_size).map_err(Error::Ring)?;
        let mut rrd_ring = dma.rrd_ring;
        let rrd_bytes =
            usize::from(config.rx_ring_size) * core::mem::size_of::<RrdDescriptor>();
        if rrd_ring.len() < rrd_bytes {
            return Err(Error::Ring("DMA block too small for return ring"));
        }
        rrd_ring.zero();

        Ok(AlxNic {
            hw,
            config,
            tx_ring,
            rx_ring,
            rrd_ring,
            rrd_cidx: 0,
            rx_pool,
            imask: regs::ISR_MISC,
            irq_sem: 1,
            running: false,
            link_up: false,
            link_speed: 0,
            link_duplex: 0,
            deferred: DeferredQueue::new(),
            observer: None,
            counters: TxCounters::default(),
        })
    }

    pub fn set_link_observer(&mut self, observer: Box<dyn LinkObserver + Send>) {
        self.observer = Some(observer);
    }

    pub fn capabilities(&self) -> Caps {
        self.hw.caps
    }

    pub fn counters(&self) -> TxCounters {
        self.counters
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn link_up(&self) -> bool {
        self.link_up
    }

    /// `(speed, duplex)` of the current link, zeroes while down.
    pub fn link_state(&self) -> (u16, u16) {
        (self.link_speed, self.link_duplex)
    }

    /// Bring the interface up from any state.
    ///
    /// Quiesces, resets PCIe/PHY/MAC, programs the station address and both
    /// rings, latches the ring pointers into the DMA engine, applies the
    /// basic and RSS configuration, and finally enables interrupts. Any
    /// failure aborts bring-up with the interface left not running.
    pub fn start(&mut self, mac_addr: [u8; 6]) -> Result<(), Error> {
        self.stop();
        // The device is quiesced; bring-up rebaselines the disable depth so
        // the single enable below opens the gate.
        self.irq_sem = 1;
        self.reset()?;

        self.hw.set_macaddr(&mac_addr);
        self.init_rx_ring();
        self.init_tx_ring();

        // Latch the freshly programmed base/size registers into the engine.
        self.hw.regs.write32(regs::ALX_SRAM9, regs::SRAM_LOAD_PTR);

        self.hw.configure_basic(&self.config);
        self.hw.configure_rss(&self.config, false);

        self.refill_rx();

        self.running = true;
        self.update_link()?;

        // Ack everything outstanding, then open the gate.
        self.hw.regs.write32(regs::ALX_ISR, !regs::ISR_DIS);
        self.intr_enable();
        info!("interface started, mac {:02x?}", mac_addr);
        Ok(())
    }

    /// Reset to a known-good state: PCIe first, then the PHY unless its
    /// configuration survived, then the MAC. A MAC reset failure here is
    /// fatal to bring-up.
    fn reset(&mut self) -> Result<(), Error> {
        self.hw.reset_pcie();
        if !self.hw.phy_configured() {
            self.hw.reset_phy()?;
        }
        self.hw.reset_mac()
    }

    fn init_tx_ring(&mut self) {
        self.tx_ring.reset();
        self.imask |= regs::ISR_TX_Q0;

        let base = self.tx_ring.base_phys();
        self.hw.regs.write32(regs::ALX_TPD_PRI0_ADDR_LO, base as u32);
        self.hw
            .regs
            .write32(regs::ALX_TX_BASE_ADDR_HI, (base >> 32) as u32);
        self.hw
            .regs
            .write32(regs::ALX_TPD_RING_SZ, u32::from(self.tx_ring.capacity()));
    }

    fn init_rx_ring(&mut self) {
        self.rx_ring.reset();
        self.rrd_ring.zero();
        self.rrd_cidx = 0;
        self.imask |= regs::ISR_RX_Q0;

        let rfd_base = self.rx_ring.base_phys();
        let rrd_base = self.rrd_ring.phys_addr();
        self.hw
            .regs
            .write32(regs::ALX_RFD_ADDR_LO, rfd_base as u32);
        self.hw
            .regs
            .write32(regs::ALX_RRD_ADDR_LO, rrd_base as u32);
        self.hw
            .regs
            .write32(regs::ALX_RX_BASE_ADDR_HI, (rfd_base >> 32) as u32);
        let count = u32::from(self.rx_ring.capacity());
        self.hw.regs.write32(regs::ALX_RRD_RING_SZ, count);
        self.hw.regs.write32(regs::ALX_RFD_RING_SZ, count);
        self.hw
            .regs
            .write32(regs::ALX_RFD_BUF_SZ, self.config.rx_buf_size());
    }

    /// Stop admitting work and close the interrupt gate. In-flight DMA is
    /// not cancelled; a subsequent [`start`](Self::start) resets through it.
    pub fn stop(&mut self) {
        self.running = false;
        self.intr_disable();
    }

    /// [`stop`](Self::stop) plus a final PHY interrupt acknowledgment, for
    /// system shutdown paths.
    pub fn shutdown(&mut self) {
        self.stop();
        if let Err(err) = self.hw.clear_phy_intr() {
            warn!("failed to ack PHY interrupt at shutdown: {}", err);
        }
    }

    /// Re-open the interrupt gate (depth-counted; the matching
    /// [`intr_disable`](Self::intr_disable) calls must all be unwound).
    pub fn intr_enable(&mut self) {
        self.irq_sem -= 1;
        if self.irq_sem != 0 {
            return;
        }
        self.hw.regs.write32(regs::ALX_ISR, 0);
        self.hw.regs.write32(regs::ALX_IMR, self.imask);
        self.hw.regs.flush();
    }

    /// Close the interrupt gate, depth-counted.
    pub fn intr_disable(&mut self) {
        self.irq_sem += 1;
        self.hw.regs.write32(regs::ALX_ISR, regs::ISR_DIS);
        self.hw.regs.write32(regs::ALX_IMR, 0);
        self.hw.regs.flush();
    }

    /// Queue one frame for transmission.
    ///
    /// Fully synchronous: on return the frame's descriptors are visible to
    /// the device (producer register written) or the call has failed. Only
    /// completion reclamation happens later.
    pub fn transmit(&mut self, buffer: TransmitBuffer) -> Result<(), TxError> {
        if !self.running || !self.link_up {
            return Err(TxError::LinkDown(buffer));
        }

        let mut buffer = buffer;
        let mapping = match buffer.map(MAX_TX_SEGMENTS) {
            Ok(m) => m,
            Err(MapError::TooManySegments) => {
                // One collapse, one retry; a frame that still overflows
                // is dropped rather than retried forever.
                buffer.collapse();
                match buffer.map(MAX_TX_SEGMENTS) {
                    Ok(m) => m,
                    Err(MapError::TooManySegments) => {
                        self.counters.overflow_drops += 1;
                        debug!(
                            "dropping frame, {} segments after collapse",
                            buffer.segment_count()
                        );
                        return Err(TxError::SegmentOverflow);
                    }
                    Err(MapError::Empty) => {
                        self.counters.mapping_failures += 1;
                        return Err(TxError::MappingFailure);
                    }
                }
            }
            Err(MapError::Empty) => {
                self.counters.mapping_failures += 1;
                return Err(TxError::MappingFailure);
            }
        };

        // Completed frames must release their slots before admission is
        // judged; the producer never enters a slot reclamation has not
        // visited, so descriptors of in-flight frames cannot be overwritten.
        self.reclaim_tx();
        let nsegs = mapping.segment_count() as u16;
        if nsegs > self.tx_ring.available() {
            drop(mapping);
            self.counters.backpressure += 1;
            return Err(TxError::InsufficientDescriptors(buffer));
        }

        let capacity = self.tx_ring.capacity();
        let first = self.tx_ring.producer_index();
        let mut idx = first;
        let mut last = first;
        for seg in mapping.segments() {
            self.tx_ring.descriptor_mut(idx).set_segment(seg.addr, seg.len);
            last = idx;
            idx = advance(idx, capacity);
        }
        self.tx_ring.descriptor_mut(last).mark_end_of_packet();

        // The mapping enters at the first slot and is immediately moved to
        // the last descriptor's slot, which is where the consumer index
        // lands when the device completes the frame.
        *self.tx_ring.slot_mut(first) = TxSlot::Pending(mapping);
        if let TxSlot::Pending(mapping) = self.tx_ring.slot_mut(first).take() {
            *self.tx_ring.slot_mut(last) = TxSlot::Posted { mapping, buffer };
        }

        self.tx_ring.set_producer_index(idx);
        // Descriptor stores must be visible before the doorbell.
        fence(Ordering::Release);
        self.hw.regs.write16(regs::ALX_TPD_PRI0_PIDX, idx);

        self.counters.queued += 1;
        Ok(())
    }

    /// Release buffers for every frame the device has finished with, from
    /// the last reclaimed position up to the live consumer index.
    pub fn reclaim_tx(&mut self) {
        let hw_cidx = self.hw.regs.read16(regs::ALX_TPD_PRI0_CIDX);
        let capacity = self.tx_ring.capacity();
        let mut cidx = self.tx_ring.consumer_index();
        while cidx != hw_cidx {
            if let TxSlot::Posted { mapping, buffer } = self.tx_ring.slot_mut(cidx).take() {
                drop(mapping);
                drop(buffer);
                self.counters.reclaimed += 1;
            }
            cidx = advance(cidx, capacity);
        }
        self.tx_ring.set_consumer_index(cidx);
    }

    fn rrd_mut(&mut self, index: u16) -> &mut RrdDescriptor {
        debug_assert!(index < self.rx_ring.capacity());
        // Bounds checked at construction; &mut self gives exclusivity.
        unsafe {
            &mut *self
                .rrd_ring
                .virt_addr()
                .as_ptr()
                .cast::<RrdDescriptor>()
                .add(usize::from(index))
        }
    }

    /// Harvest completed receive descriptors and re-post fresh buffers.
    /// Buffers drop back into the pool; frame delivery upward is the
    /// embedder's concern and uses the pool as its hand-off point.
    pub fn process_rx(&mut self) {
        let capacity = self.rx_ring.capacity();
        loop {
            let rrd_idx = self.rrd_cidx;
            if !self.rrd_mut(rrd_idx).is_updated() {
                break;
            }
            let rfd_idx = self.rrd_mut(rrd_idx).rfd_index();
            if rfd_idx >= capacity {
                warn!("return descriptor names bad buffer index {}", rfd_idx);
                self.rrd_mut(rrd_idx).clear();
                self.rrd_cidx = advance(rrd_idx, capacity);
                continue;
            }
            // Dropping the buffer returns it to the pool.
            let _ = self.rx_ring.buffer_mut(rfd_idx).take();
            self.rx_ring
                .set_consumer_index(advance(rfd_idx, capacity));
            self.rrd_mut(rrd_idx).clear();
            self.rrd_cidx = advance(rrd_idx, capacity);
        }
        self.refill_rx();
    }

    /// Post empty buffers from the pool into every free receive slot,
    /// leaving the one-slot producer/consumer gap, then ring the doorbell.
    pub fn refill_rx(&mut self) {
        let capacity = self.rx_ring.capacity();
        let mut pidx = self.rx_ring.producer_index();
        let mut posted = false;
        while advance(pidx, capacity) != self.rx_ring.consumer_index() {
            if self.rx_ring.buffer_mut(pidx).is_some() {
                break;
            }
            let Some(buf) = self.rx_pool.pop() else {
                break;
            };
            self.rx_ring.descriptor_mut(pidx).set_buffer(buf.phys_addr());
            *self.rx_ring.buffer_mut(pidx) = Some(buf);
            pidx = advance(pidx, capacity);
            posted = true;
        }
        if posted {
            self.rx_ring.set_producer_index(pidx);
            fence(Ordering::Release);
            self.hw.regs.write16(regs::ALX_RFD_PIDX, pidx);
        }
    }

    /// Interrupt fast path, safe on a shared line.
    ///
    /// Returns [`InterruptClaim::NotClaimed`] without touching any register
    /// beyond the status read when the snapshot is not ours. Otherwise acks
    /// the chip, masks each cause that fired, queues its deferred work, and
    /// re-arms delivery.
    pub fn handle_interrupt(&mut self) -> InterruptClaim {
        let intr = self.hw.regs.read32(regs::ALX_ISR);
        if intr & regs::ISR_DIS != 0 || intr & self.imask == 0 {
            return InterruptClaim::NotClaimed;
        }

        // Ack what fired and hold further delivery while we classify.
        self.hw.regs.write32(regs::ALX_ISR, intr | regs::ISR_DIS);
        self.hw.regs.flush();

        let causes = intr & self.imask;
        if causes & regs::ISR_PHY != 0 {
            self.imask &= !regs::ISR_PHY;
            self.deferred.enqueue(Cause::LinkChange);
        }
        if causes & regs::ISR_TX_Q0 != 0 {
            self.imask &= !regs::ISR_TX_Q0;
            self.deferred.enqueue(Cause::Transmit);
        }
        if causes & regs::ISR_RX_Q0 != 0 {
            self.imask &= !regs::ISR_RX_Q0;
            self.deferred.enqueue(Cause::Receive);
        }
        self.hw.regs.write32(regs::ALX_IMR, self.imask);

        self.hw.regs.write32(regs::ALX_ISR, 0);
        InterruptClaim::Claimed
    }

    /// Drain the deferred-work queue. Each cause is unmasked only after its
    /// condition has been handled, closing the storm window.
    pub fn service_deferred(&mut self) -> Result<(), Error> {
        while let Some(cause) = self.deferred.take() {
            match cause {
                Cause::LinkChange => {
                    if let Err(err) = self.hw.clear_phy_intr() {
                        warn!("failed to ack PHY interrupt: {}", err);
                    }
                    // On partial recovery the PHY cause stays masked; only
                    // a full stop/start may re-arm it.
                    self.update_link()?;
                    self.unmask(regs::ISR_PHY);
                }
                Cause::Transmit => {
                    self.reclaim_tx();
                    self.unmask(regs::ISR_TX_Q0);
                }
                Cause::Receive => {
                    self.process_rx();
                    self.unmask(regs::ISR_RX_Q0);
                }
            }
        }
        Ok(())
    }

    /// Teardown helper: make sure no deferred work is left pending.
    pub fn drain_deferred(&mut self) -> Result<(), Error> {
        self.service_deferred()
    }

    fn unmask(&mut self, bits: u32) {
        self.imask |= bits;
        if self.irq_sem == 0 {
            self.hw.regs.write32(regs::ALX_IMR, self.imask);
        }
    }

    /// Fold the latest PHY report into the link state machine.
    pub fn update_link(&mut self) -> Result<(), Error> {
        let (phy_up, encoded) = match self.hw.get_phy_link() {
            Ok(v) => v,
            Err(err) => {
                debug!("link query failed: {}", err);
                return Ok(());
            }
        };

        if (!phy_up && !self.link_up) || !self.running {
            return Ok(());
        }

        let prev_up = self.link_up;
        let prev_encoded = self.link_speed + self.link_duplex;

        if phy_up && prev_up && encoded == prev_encoded {
            // Repeated identical report; the MAC is already programmed.
            return Ok(());
        }

        if phy_up && !prev_up {
            self.link_up = true;
            self.link_duplex = encoded % 10;
            self.link_speed = encoded - self.link_duplex;

            self.hw.post_phy_link(self.link_speed)?;
            self.hw.enable_aspm(true, true);
            self.hw
                .start_mac(self.config.rx_ctrl, self.link_speed, self.link_duplex);

            info!(
                "link up, {} Mb/s {} duplex",
                self.link_speed,
                if self.link_duplex == FULL_DUPLEX {
                    "full"
                } else {
                    "half"
                }
            );
            self.notify(LinkEvent::Up {
                speed: self.link_speed,
                duplex: self.link_duplex,
            });
            return Ok(());
        }

        // Link lost, or up with a different speed/duplex: quiesce the MAC
        // and let the next PHY report bring it back up cleanly.
        self.link_up = false;
        self.link_speed = 0;
        self.link_duplex = 0;

        if let Err(err) = self.hw.reset_mac() {
            error!("failed to reset MAC during link transition: {}", err);
            return Err(Error::PartialRecovery);
        }
        self.intr_disable();
        self.hw.configure_basic(&self.config);
        self.hw.configure_rss(&self.config, false);
        self.hw.enable_aspm(false, true);
        self.hw.post_phy_link(0)?;
        self.intr_enable();

        info!("link down");
        self.notify(LinkEvent::Down);
        Ok(())
    }

    fn notify(&mut self, event: LinkEvent) {
        if let Some(observer) = self.observer.as_mut() {
            observer.link_changed(event);
        }
    }
}
