//! Register offsets and bit assignments for the AR816x/AR817x MAC.
//!
//! Offsets are relative to the start of the memory-mapped register BAR.
//! The interrupt status register is write-1-to-clear except for
//! [`ISR_DIS`], which gates delivery of every other bit.

/// PCI identity of the supported chips. The low device-id bit distinguishes
/// the gigabit parts from their fast-ethernet siblings.
pub const DEV_ID_AR8161: u16 = 0x1091;
pub const DEV_ID_AR8162: u16 = 0x1090;
pub const DEV_ID_AR8171: u16 = 0x10A1;
pub const DEV_ID_AR8172: u16 = 0x10A0;

pub const REV_A0: u8 = 0;
pub const REV_A1: u8 = 1;
pub const REV_B0: u8 = 2;
pub const REV_C0: u8 = 3;

/* Interrupt block */

/// Interrupt status register, write-1-to-clear.
pub const ALX_ISR: u32 = 0x1600;
/// Interrupt mask register; a set bit lets the matching status bit interrupt.
pub const ALX_IMR: u32 = 0x1604;

/// Global interrupt disable. While set, the chip raises no interrupts and
/// any ISR snapshot carrying it must be treated as not-ours.
pub const ISR_DIS: u32 = 1 << 31;
pub const ISR_TIMER: u32 = 1 << 1;
pub const ISR_SMB: u32 = 1 << 2;
pub const ISR_MANU: u32 = 1 << 3;
pub const ISR_RXF_OV: u32 = 1 << 4;
pub const ISR_RFD_UR: u32 = 1 << 5;
pub const ISR_TXF_UR: u32 = 1 << 6;
pub const ISR_TX_Q0: u32 = 1 << 7;
pub const ISR_DMAR: u32 = 1 << 9;
pub const ISR_DMAW: u32 = 1 << 10;
pub const ISR_PHY: u32 = 1 << 12;
pub const ISR_PCIE_LNKDOWN: u32 = 1 << 13;
pub const ISR_RX_Q0: u32 = 1 << 16;

/// Housekeeping causes always left unmasked while the device is up.
pub const ISR_MISC: u32 =
    ISR_TIMER | ISR_SMB | ISR_MANU | ISR_PHY | ISR_PCIE_LNKDOWN | ISR_DMAR | ISR_DMAW;

/* Master control / reset */

pub const ALX_MASTER: u32 = 0x1400;
/// Self-clearing MAC/DMA reset strobe.
pub const MASTER_DMA_MAC_RST: u32 = 1 << 7;
pub const MASTER_OOB_DIS: u32 = 1 << 6;
pub const MASTER_WAKEN_25M: u32 = 1 << 5;
/// Poll iterations allowed for [`MASTER_DMA_MAC_RST`] to self-clear.
pub const DMA_MAC_RST_TO: u32 = 50;

/// Uncorrectable-error severity register, cleared during PCIe reset.
pub const ALX_UE_SVRT: u32 = 0x10BC;

/* Power management */

pub const ALX_PMCTRL: u32 = 0x12F8;
pub const PMCTRL_L0S_EN: u32 = 1 << 12;
pub const PMCTRL_L1_EN: u32 = 1 << 3;

/* PHY control / MDIO */

pub const ALX_PHY_CTRL: u32 = 0x140C;
pub const PHY_CTRL_IDDQ: u32 = 1 << 5;
pub const PHY_CTRL_GATE_25M: u32 = 1 << 18;

pub const ALX_MDIO: u32 = 0x1414;
pub const MDIO_DATA_MASK: u32 = 0xFFFF;
pub const MDIO_REG_SHIFT: u32 = 16;
pub const MDIO_SPRES_PRMBL: u32 = 1 << 27;
/// Set for a read cycle, clear for a write cycle.
pub const MDIO_OP_READ: u32 = 1 << 29;
/// Kicks the cycle off; stays set while the cycle is in flight.
pub const MDIO_START: u32 = 1 << 30;
/// Poll iterations allowed for [`MDIO_START`] to self-clear.
pub const MDIO_MAX_AC_TO: u32 = 120;

/* MII registers behind the MDIO bridge */

pub const MII_BMCR: u16 = 0x00;
pub const BMCR_RESET: u16 = 0x8000;
pub const BMCR_AUTOEN: u16 = 0x1000;
pub const BMCR_STARTNEG: u16 = 0x0200;
/// Poll iterations allowed for [`BMCR_RESET`] to self-clear.
pub const PHY_RST_TO: u32 = 80;

pub const MII_BMSR: u16 = 0x01;
pub const BMSR_LINK: u16 = 0x0004;

pub const MII_ANAR: u16 = 0x04;
/// Advertise 10/100 half+full with 802.3 selector and pause.
pub const ANAR_DEFAULT: u16 = 0x0DE1;

pub const MII_GIGA_CR: u16 = 0x09;
/// Advertise 1000BASE-T full duplex.
pub const GIGA_CR_1000T_FD: u16 = 0x0200;

/// PHY-specific status: resolved speed and duplex after autoneg.
pub const MII_PSSR: u16 = 0x11;
pub const PSSR_RESOLVED: u16 = 0x0800;
pub const PSSR_FULL_DUPLEX: u16 = 0x2000;
pub const PSSR_SPEED_MASK: u16 = 0xC000;
pub const PSSR_SPEED_10: u16 = 0x0000;
pub const PSSR_SPEED_100: u16 = 0x4000;
pub const PSSR_SPEED_1000: u16 = 0x8000;

/// PHY interrupt enable.
pub const MII_IER: u16 = 0x12;
pub const IER_LINK_UP: u16 = 0x0400;
pub const IER_LINK_DOWN: u16 = 0x0800;

/// PHY interrupt status, read-to-clear.
pub const MII_ISR: u16 = 0x13;

/* Station address */

/// Low 32 bits of the station MAC address (bytes 2..6, big-endian).
pub const ALX_STAD0: u32 = 0x1488;
/// High 16 bits of the station MAC address (bytes 0..2).
pub const ALX_STAD1: u32 = 0x148C;

/* MAC control */

pub const ALX_MAC_CTRL: u32 = 0x1480;
pub const MAC_CTRL_TXEN: u32 = 1 << 0;
pub const MAC_CTRL_RXEN: u32 = 1 << 1;
pub const MAC_CTRL_TXFC_EN: u32 = 1 << 2;
pub const MAC_CTRL_RXFC_EN: u32 = 1 << 3;
pub const MAC_CTRL_PCRCE: u32 = 1 << 7;
pub const MAC_CTRL_CRCE: u32 = 1 << 8;
pub const MAC_CTRL_PRMBLEN_SHIFT: u32 = 10;
/// 2-bit port speed field: 1 = 10/100, 2 = 1000.
pub const MAC_CTRL_SPEED_SHIFT: u32 = 12;
pub const MAC_CTRL_SPEED_10_100: u32 = 1;
pub const MAC_CTRL_SPEED_1000: u32 = 2;
pub const MAC_CTRL_MHASH_ALG_HI5B: u32 = 1 << 18;
pub const MAC_CTRL_FULLD: u32 = 1 << 20;
pub const MAC_CTRL_BRD_EN: u32 = 1 << 26;
pub const MAC_CTRL_WOLSPED_SWEN: u32 = 1 << 30;

/* Basic MAC configuration */

pub const ALX_WRR: u32 = 0x1408;
pub const WRR_PRI_RESTRICT_NONE: u32 = 0;
pub const ALX_IM_TIMER: u32 = 0x1438;
pub const ALX_MTU_REG: u32 = 0x149C;
/// Frame overhead added on top of the configured MTU: Ethernet header,
/// VLAN tag, and CRC.
pub const MTU_OVERHEAD: u32 = 14 + 4 + 4;
pub const ALX_DMA: u32 = 0x1580;
pub const DMA_CHNL_SHIFT: u32 = 0;
pub const ALX_SMB_TIMER: u32 = 0x15C4;

/* SRAM / ring pointer load */

pub const ALX_SRAM9: u32 = 0x1554;
/// Strobe: latch all ring base/size registers into the DMA engine.
pub const SRAM_LOAD_PTR: u32 = 1 << 0;

/* Receive ring block */

pub const ALX_RX_BASE_ADDR_HI: u32 = 0x1520;
pub const ALX_RFD_ADDR_LO: u32 = 0x1524;
pub const ALX_RRD_ADDR_LO: u32 = 0x1528;
pub const ALX_RFD_RING_SZ: u32 = 0x152C;
pub const ALX_RFD_BUF_SZ: u32 = 0x1530;
pub const ALX_RRD_RING_SZ: u32 = 0x1534;
pub const ALX_RFD_PIDX: u32 = 0x15E0;
pub const ALX_RFD_CIDX: u32 = 0x15E2;

/* Transmit ring block */

pub const ALX_TX_BASE_ADDR_HI: u32 = 0x1590;
pub const ALX_TPD_PRI0_ADDR_LO: u32 = 0x1594;
pub const ALX_TPD_RING_SZ: u32 = 0x1598;
pub const ALX_TPD_PRI0_PIDX: u32 = 0x15F0;
pub const ALX_TPD_PRI0_CIDX: u32 = 0x15F2;

/* RSS */

pub const ALX_RXQ0_CTRL: u32 = 0x1560;
pub const RXQ0_RSS_HASH_EN: u32 = 1 << 29;
/// Base of the 40-byte hash key, ten consecutive 32-bit words.
pub const ALX_RSS_KEY0: u32 = 0x14B0;
/// Base of the 128-entry indirection table, 32 consecutive 32-bit words.
pub const ALX_RSS_IDT_TBL0: u32 = 0x1B00;
