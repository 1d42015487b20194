//! The per-NIC `PortStats` table co-located with the framebuffer in shared memory.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::MAX_PORTS;

/// A MAC address, stored as six raw bytes (no external MAC type needed on this hot path).
pub type MacAddr = [u8; 6];

const ZERO_MAC: MacAddr = [0; 6];

/// Device counters snapshotted by a worker into its claimed slot, and read back by the stats
/// printer / external observers. Plain `u64`s rather than atomics: each slot has exactly one
/// writer (the worker that claimed it), and readers tolerate a momentarily inconsistent
/// snapshot.
#[derive(Debug, Default, Clone, Copy)]
#[repr(C)]
pub struct DeviceStats {
    pub rx_packets: u64,
    pub rx_bytes: u64,
    pub tx_packets: u64,
    pub tx_bytes: u64,
    pub rx_missed: u64,
    pub rx_errors: u64,
    pub rx_nombuf: u64,
}

/// One row of the `PortStats` table: the MAC address that owns it, plus its latest counters.
///
/// Claims are idempotent and done with plain atomic loads/stores rather than a lock,
/// matching the lock-free design of the rest of the dataplane.
#[repr(C)]
pub struct PortStatsSlot {
    /// The MAC packed into the low 6 bytes of a `u64`.
    mac_lo: AtomicU64,
    /// Distinguishes an unclaimed slot from one legitimately claimed by the all-zero MAC,
    /// since `mac_lo == 0` alone can't tell those apart.
    claimed: AtomicU64,
    pub rx_packets: AtomicU64,
    pub rx_bytes: AtomicU64,
    pub tx_packets: AtomicU64,
    pub tx_bytes: AtomicU64,
    pub rx_missed: AtomicU64,
    pub rx_errors: AtomicU64,
    pub rx_nombuf: AtomicU64,
}

impl PortStatsSlot {
    const fn empty() -> Self {
        Self {
            mac_lo: AtomicU64::new(0),
            claimed: AtomicU64::new(0),
            rx_packets: AtomicU64::new(0),
            rx_bytes: AtomicU64::new(0),
            tx_packets: AtomicU64::new(0),
            tx_bytes: AtomicU64::new(0),
            rx_missed: AtomicU64::new(0),
            rx_errors: AtomicU64::new(0),
            rx_nombuf: AtomicU64::new(0),
        }
    }

    fn mac(&self) -> MacAddr {
        mac_from_u64(self.mac_lo.load(Ordering::Relaxed))
    }

    fn is_zero(&self) -> bool {
        self.claimed.load(Ordering::Relaxed) == 0
    }

    fn claim(&self, mac: MacAddr) {
        self.mac_lo.store(mac_to_u64(mac), Ordering::Relaxed);
        self.claimed.store(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, stats: &DeviceStats) {
        self.rx_packets.store(stats.rx_packets, Ordering::Relaxed);
        self.rx_bytes.store(stats.rx_bytes, Ordering::Relaxed);
        self.tx_packets.store(stats.tx_packets, Ordering::Relaxed);
        self.tx_bytes.store(stats.tx_bytes, Ordering::Relaxed);
        self.rx_missed.store(stats.rx_missed, Ordering::Relaxed);
        self.rx_errors.store(stats.rx_errors, Ordering::Relaxed);
        self.rx_nombuf.store(stats.rx_nombuf, Ordering::Relaxed);
    }

    pub fn read(&self) -> DeviceStats {
        DeviceStats {
            rx_packets: self.rx_packets.load(Ordering::Relaxed),
            rx_bytes: self.rx_bytes.load(Ordering::Relaxed),
            tx_packets: self.tx_packets.load(Ordering::Relaxed),
            tx_bytes: self.tx_bytes.load(Ordering::Relaxed),
            rx_missed: self.rx_missed.load(Ordering::Relaxed),
            rx_errors: self.rx_errors.load(Ordering::Relaxed),
            rx_nombuf: self.rx_nombuf.load(Ordering::Relaxed),
        }
    }
}

fn mac_to_u64(mac: MacAddr) -> u64 {
    let mut bytes = [0u8; 8];
    bytes[..6].copy_from_slice(&mac);
    u64::from_ne_bytes(bytes)
}

fn mac_from_u64(value: u64) -> MacAddr {
    let bytes = value.to_ne_bytes();
    let mut mac = ZERO_MAC;
    mac.copy_from_slice(&bytes[..6]);
    mac
}

/// Fixed-capacity table of [`PortStatsSlot`]s, co-located with the framebuffer.
#[repr(C)]
pub struct PortStatsTable {
    slots: [PortStatsSlot; MAX_PORTS],
}

#[derive(Debug, thiserror::Error)]
#[error("all {MAX_PORTS} PortStats slots are claimed; increase MAX_PORTS to support more ports")]
pub struct TableFullError;

impl PortStatsTable {
    pub const BYTE_SIZE: usize = std::mem::size_of::<PortStatsTable>();

    pub fn new_boxed() -> Box<Self> {
        Box::new(Self {
            slots: std::array::from_fn(|_| PortStatsSlot::empty()),
        })
    }

    /// Claims a slot for `mac`: the first slot already owned by `mac` wins (idempotent across
    /// restarts), otherwise the first all-zero slot is claimed by writing `mac` into it.
    pub fn claim(&self, mac: MacAddr) -> Result<usize, TableFullError> {
        for (index, slot) in self.slots.iter().enumerate() {
            if slot.mac() == mac {
                return Ok(index);
            }
        }
        for (index, slot) in self.slots.iter().enumerate() {
            if slot.is_zero() {
                slot.claim(mac);
                return Ok(index);
            }
        }
        Err(TableFullError)
    }

    pub fn slot(&self, index: usize) -> &PortStatsSlot {
        &self.slots[index]
    }

    pub fn iter_claimed(&self) -> impl Iterator<Item = (MacAddr, &PortStatsSlot)> {
        self.slots
            .iter()
            .filter(|slot| !slot.is_zero())
            .map(|slot| (slot.mac(), slot))
    }
}
