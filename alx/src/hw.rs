//! MAC, PHY and PCIe operations over the raw register window.
//!
//! Everything here is a straight-line register sequence with bounded polls;
//! policy (when to reset, when to reprogram) lives in the driver layer.

use bitflags::bitflags;
use log::{debug, warn};
use nic_mmio::NicMmio;

use crate::regs::*;
use crate::{AlxConfig, Error};

/// Duplex values as encoded by the PHY status query: the encoded link word
/// is `speed + duplex`, so duplex is recoverable as `encoded % 10`.
pub const FULL_DUPLEX: u16 = 1;
pub const HALF_DUPLEX: u16 = 2;

pub const SPEED_10: u16 = 10;
pub const SPEED_100: u16 = 100;
pub const SPEED_1000: u16 = 1000;

bitflags! {
    /// Feature set of an identified chip, fixed for its lifetime.
    pub struct Caps: u32 {
        /// Gigabit-capable part (odd device id).
        const GIGA = 1 << 0;
        const L0S  = 1 << 1;
        const L1   = 1 << 2;
        /// Multiple transmit queues.
        const MTQ  = 1 << 3;
        const RSS  = 1 << 4;
        const MSIX = 1 << 5;
        /// Sleep-wake-on-interrupt patterns.
        const SWOI = 1 << 6;
        /// Energy-efficient PHY idle.
        const AZ   = 1 << 7;
    }
}

/// The identified device plus its register window. All register traffic of
/// the driver funnels through this type.
pub struct AlxHw<R: NicMmio> {
    pub(crate) regs: R,
    pub device_id: u16,
    pub revision: u8,
    pub caps: Caps,
    pub max_dma_chnl: u8,
    pub ptrn_ofs: u32,
    pub max_ptrns: u8,
}

impl<R: NicMmio> AlxHw<R> {
    /// Identify the chip from its PCI ids and derive the capability set.
    /// Unrecognized parts are refused; nothing is written to the device.
    pub fn identify(regs: R, device_id: u16, revision: u8) -> Result<AlxHw<R>, Error> {
        match device_id {
            DEV_ID_AR8161 | DEV_ID_AR8162 | DEV_ID_AR8171 | DEV_ID_AR8172
                if revision <= REV_C0 => {}
            _ => {
                return Err(Error::UnknownChip {
                    device_id,
                    revision,
                })
            }
        }

        let mut caps = Caps::L0S | Caps::L1 | Caps::MTQ | Caps::RSS | Caps::MSIX | Caps::SWOI;
        if device_id & 1 != 0 {
            caps |= Caps::GIGA;
        }
        if revision >= REV_B0 {
            caps |= Caps::AZ;
        }
        let max_dma_chnl = if revision >= REV_B0 { 4 } else { 2 };
        let (ptrn_ofs, max_ptrns) = if revision < REV_C0 {
            (0x600, 8)
        } else {
            (0x14000, 16)
        };

        debug!(
            "identified alx chip {:#06x} rev {} caps {:?}",
            device_id, revision, caps
        );
        Ok(AlxHw {
            regs,
            device_id,
            revision,
            caps,
            max_dma_chnl,
            ptrn_ofs,
            max_ptrns,
        })
    }

    /// One MDIO read cycle against the internal PHY, bounded poll.
    pub fn mdio_read(&mut self, reg: u16) -> Result<u16, Error> {
        let cmd = MDIO_SPRES_PRMBL
            | MDIO_OP_READ
            | MDIO_START
            | (u32::from(reg) << MDIO_REG_SHIFT);
        self.regs.write32(ALX_MDIO, cmd);
        for _ in 0..MDIO_MAX_AC_TO {
            let val = self.regs.read32(ALX_MDIO);
            if val & MDIO_START == 0 {
                return Ok((val & MDIO_DATA_MASK) as u16);
            }
        }
        Err(Error::MdioTimeout)
    }

    /// One MDIO write cycle, bounded poll.
    pub fn mdio_write(&mut self, reg: u16, data: u16) -> Result<(), Error> {
        let cmd = MDIO_SPRES_PRMBL
            | MDIO_START
            | (u32::from(reg) << MDIO_REG_SHIFT)
            | u32::from(data);
        self.regs.write32(ALX_MDIO, cmd);
        for _ in 0..MDIO_MAX_AC_TO {
            if self.regs.read32(ALX_MDIO) & MDIO_START == 0 {
                return Ok(());
            }
        }
        Err(Error::MdioTimeout)
    }

    /// Quiesce the PCIe side: clear advisory error severity and drop out of
    /// the aggressive low-power link states until link comes back up.
    pub fn reset_pcie(&mut self) {
        self.regs.write32(ALX_UE_SVRT, 0);

        let mut master = self.regs.read32(ALX_MASTER);
        master |= MASTER_WAKEN_25M;
        master &= !MASTER_OOB_DIS;
        self.regs.write32(ALX_MASTER, master);

        let mut pm = self.regs.read32(ALX_PMCTRL);
        pm &= !(PMCTRL_L0S_EN | PMCTRL_L1_EN);
        self.regs.write32(ALX_PMCTRL, pm);
        self.regs.flush();
    }

    /// Whether the PHY already carries our advertisement configuration,
    /// in which case a reset (and renegotiation) can be skipped.
    pub fn phy_configured(&mut self) -> bool {
        let anar = match self.mdio_read(MII_ANAR) {
            Ok(v) => v,
            Err(_) => return false,
        };
        if anar != ANAR_DEFAULT {
            return false;
        }
        if self.caps.contains(Caps::GIGA) {
            match self.mdio_read(MII_GIGA_CR) {
                Ok(giga) => giga & GIGA_CR_1000T_FD != 0,
                Err(_) => false,
            }
        } else {
            true
        }
    }

    /// Hard-reset the PHY and reprogram advertisement and interrupt enables,
    /// then restart autonegotiation.
    pub fn reset_phy(&mut self) -> Result<(), Error> {
        let mut ctrl = self.regs.read32(ALX_PHY_CTRL);
        ctrl &= !(PHY_CTRL_IDDQ | PHY_CTRL_GATE_25M);
        self.regs.write32(ALX_PHY_CTRL, ctrl);
        self.regs.flush();

        self.mdio_write(MII_BMCR, BMCR_RESET)?;
        let mut cleared = false;
        for _ in 0..PHY_RST_TO {
            if self.mdio_read(MII_BMCR)? & BMCR_RESET == 0 {
                cleared = true;
                break;
            }
        }
        if !cleared {
            return Err(Error::PhyResetTimeout);
        }

        self.mdio_write(MII_ANAR, ANAR_DEFAULT)?;
        let giga = if self.caps.contains(Caps::GIGA) {
            GIGA_CR_1000T_FD
        } else {
            0
        };
        self.mdio_write(MII_GIGA_CR, giga)?;
        self.mdio_write(MII_IER, IER_LINK_UP | IER_LINK_DOWN)?;
        self.mdio_write(MII_BMCR, BMCR_AUTOEN | BMCR_STARTNEG)
    }

    /// Strobe the self-clearing MAC/DMA reset and wait for it to complete.
    pub fn reset_mac(&mut self) -> Result<(), Error> {
        let master = self.regs.read32(ALX_MASTER);
        self.regs.write32(ALX_MASTER, master | MASTER_DMA_MAC_RST);
        self.regs.flush();
        for _ in 0..DMA_MAC_RST_TO {
            if self.regs.read32(ALX_MASTER) & MASTER_DMA_MAC_RST == 0 {
                return Ok(());
            }
        }
        Err(Error::MacResetTimeout)
    }

    /// Turn the transmit and receive engines on at the negotiated
    /// speed/duplex, on top of the configured receive control bits.
    pub fn start_mac(&mut self, rx_ctrl: u32, speed: u16, duplex: u16) {
        let mut ctrl = rx_ctrl | MAC_CTRL_TXEN | MAC_CTRL_RXEN;
        let spd = if speed == SPEED_1000 {
            MAC_CTRL_SPEED_1000
        } else {
            MAC_CTRL_SPEED_10_100
        };
        ctrl |= spd << MAC_CTRL_SPEED_SHIFT;
        if duplex == FULL_DUPLEX {
            ctrl |= MAC_CTRL_FULLD;
        }
        self.regs.write32(ALX_MAC_CTRL, ctrl);
    }

    /// Program the non-queue MAC configuration: frame size, interrupt
    /// moderation, statistics timer, arbitration, DMA, and the receive
    /// control word without the engine-enable bits.
    pub fn configure_basic(&mut self, config: &AlxConfig) {
        self.regs
            .write32(ALX_MTU_REG, config.mtu + MTU_OVERHEAD);
        let imt = u32::from(config.imt);
        self.regs.write32(ALX_IM_TIMER, imt << 16 | imt);
        self.regs
            .write32(ALX_SMB_TIMER, u32::from(config.smb_timer) * 500);
        self.regs.write32(ALX_WRR, WRR_PRI_RESTRICT_NONE);
        self.regs
            .write32(ALX_DMA, u32::from(self.max_dma_chnl) << DMA_CHNL_SHIFT);
        self.regs.write32(ALX_MAC_CTRL, config.rx_ctrl);
    }

    /// Load the hash key and indirection table and set the hash-enable bit
    /// to match `enable`. With a single hardware queue the table is all
    /// zeroes; the key is still loaded so the chip never hashes with an
    /// uninitialized one.
    pub fn configure_rss(&mut self, config: &AlxConfig, enable: bool) {
        for (i, chunk) in config.rss_key.chunks_exact(4).enumerate() {
            let word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            self.regs.write32(ALX_RSS_KEY0 + (i as u32) * 4, word);
        }
        // Four 8-bit table entries per register word.
        for i in 0..(u32::from(config.rss_idt_size) / 4) {
            self.regs.write32(ALX_RSS_IDT_TBL0 + i * 4, 0);
        }
        let mut rxq = self.regs.read32(ALX_RXQ0_CTRL);
        if enable {
            rxq |= RXQ0_RSS_HASH_EN;
        } else {
            rxq &= !RXQ0_RSS_HASH_EN;
        }
        self.regs.write32(ALX_RXQ0_CTRL, rxq);
    }

    /// Select the PCIe low-power link states the chip may enter.
    pub fn enable_aspm(&mut self, l0s: bool, l1: bool) {
        let mut pm = self.regs.read32(ALX_PMCTRL);
        pm &= !(PMCTRL_L0S_EN | PMCTRL_L1_EN);
        if l0s && self.caps.contains(Caps::L0S) {
            pm |= PMCTRL_L0S_EN;
        }
        if l1 && self.caps.contains(Caps::L1) {
            pm |= PMCTRL_L1_EN;
        }
        self.regs.write32(ALX_PMCTRL, pm);
    }

    /// Post-negotiation PHY adjustment. At link-down (`speed == 0`) the
    /// 25MHz PHY clock is gated to save power; link interrupts stay armed
    /// either way so the next transition is heard.
    pub fn post_phy_link(&mut self, speed: u16) -> Result<(), Error> {
        let mut ctrl = self.regs.read32(ALX_PHY_CTRL);
        if speed == 0 {
            ctrl |= PHY_CTRL_GATE_25M;
        } else {
            ctrl &= !PHY_CTRL_GATE_25M;
        }
        self.regs.write32(ALX_PHY_CTRL, ctrl);
        self.mdio_write(MII_IER, IER_LINK_UP | IER_LINK_DOWN)
    }

    /// Acknowledge the PHY's interrupt latch (read-to-clear).
    pub fn clear_phy_intr(&mut self) -> Result<(), Error> {
        self.mdio_read(MII_ISR).map(|_| ())
    }

    /// Query link state. Returns `(up, encoded)` where `encoded` is
    /// `speed + duplex` and zero while down. An up link whose speed has not
    /// yet resolved is reported as an error; the caller polls again later.
    pub fn get_phy_link(&mut self) -> Result<(bool, u16), Error> {
        // BMSR link status is latched-low; read twice for the live value.
        let _ = self.mdio_read(MII_BMSR)?;
        let bmsr = self.mdio_read(MII_BMSR)?;
        if bmsr & BMSR_LINK == 0 {
            return Ok((false, 0));
        }

        let pssr = self.mdio_read(MII_PSSR)?;
        if pssr & PSSR_RESOLVED == 0 {
            warn!("link up but speed/duplex not yet resolved");
            return Err(Error::PhyUnresolved);
        }
        let speed = match pssr & PSSR_SPEED_MASK {
            PSSR_SPEED_1000 => SPEED_1000,
            PSSR_SPEED_100 => SPEED_100,
            _ => SPEED_10,
        };
        let duplex = if pssr & PSSR_FULL_DUPLEX != 0 {
            FULL_DUPLEX
        } else {
            HALF_DUPLEX
        };
        Ok((true, speed + duplex))
    }

    /// Program the station MAC address into the address filter.
    pub fn set_macaddr(&mut self, addr: &[u8; 6]) {
        let low = u32::from_be_bytes([addr[2], addr[3], addr[4], addr[5]]);
        let high = u32::from(addr[0]) << 8 | u32::from(addr[1]);
        self.regs.write32(ALX_STAD0, low);
        self.regs.write32(ALX_STAD1, high);
    }
}
