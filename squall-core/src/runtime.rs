//! The boundary between the dataplane and the kernel-bypass runtime that owns NICs, packet
//! pools and device configuration. Initialising that runtime and binding it to real hardware is
//! an external concern; everything in this crate only needs the primitives below.

use crate::stats::DeviceStats;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("port {port} is invalid or was not discovered by the runtime")]
    UnknownPort { port: u16 },
    #[error("failed to configure port {port}")]
    Configure {
        port: u16,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("failed to start port {port}")]
    Start {
        port: u16,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("failed to allocate a packet buffer from the pool")]
    PoolExhausted,
}

/// A single packet buffer borrowed from the runtime's pool for the duration of one burst slot.
pub trait PacketBuffer {
    fn data(&self) -> &[u8];
    fn data_mut(&mut self) -> &mut [u8];

    /// Shrinks or grows the logical packet length within the buffer's backing capacity.
    fn set_len(&mut self, len: usize);
}

/// The primitives the dataplane needs from a kernel-bypass runtime: burst RX/TX, buffer
/// allocation, and device configuration/statistics. A concrete implementation owns EAL/device
/// initialisation and NIC binding; this crate never does.
pub trait PortRuntime {
    type Buffer: PacketBuffer;

    /// Number of ports the runtime discovered and bound at startup.
    fn num_ports(&self) -> u16;

    fn mac_address(&self, port: u16) -> Result<[u8; 6], RuntimeError>;

    /// NUMA node backing `port`'s device, so its RX queues can be allocated node-local.
    fn numa_node(&self, port: u16) -> Result<usize, RuntimeError>;

    /// Configures `port` with `num_queues` RX queues at descriptor depth per
    /// [`crate::NUM_RX_DESC`], allocated on the port's own NUMA node (see [`Self::numa_node`]).
    /// Does not touch RSS or flow control; see [`Self::configure_rss`] and
    /// [`Self::set_flow_control`] for those.
    fn configure_rx(&mut self, port: u16, num_queues: u16) -> Result<(), RuntimeError>;

    /// Configures `port`'s RSS hash to span IPv6 source and destination addresses, so
    /// destination-address entropy fans work evenly across its queues.
    fn configure_rss(&mut self, port: u16) -> Result<(), RuntimeError>;

    /// Enables or disables Ethernet pause frames (802.3x flow control) on `port`.
    fn set_flow_control(&mut self, port: u16, enabled: bool) -> Result<(), RuntimeError>;

    fn set_promiscuous(&mut self, port: u16, enabled: bool) -> Result<(), RuntimeError>;

    fn start(&mut self, port: u16) -> Result<(), RuntimeError>;

    /// Allocates one buffer from the port's pool. Returns `None` if the pool is exhausted.
    fn alloc(&self) -> Option<Self::Buffer>;

    /// Polls up to `out.len()` packets from `(port, queue)`, filling the leading entries of
    /// `out` and returning how many were received.
    fn rx_burst(&self, port: u16, queue: u16, out: &mut [Option<Self::Buffer>]) -> usize;

    /// Attempts to transmit every `Some` entry in `bufs` on `(port, queue)`, taking ownership of
    /// all of them (each slot is left `None` afterwards) regardless of how many were actually
    /// accepted by the device. Returns the number sent; the caller is responsible for treating
    /// the remainder as dropped.
    fn tx_burst(&self, port: u16, queue: u16, bufs: &mut [Option<Self::Buffer>]) -> usize;

    fn device_stats(&self, port: u16) -> Result<DeviceStats, RuntimeError>;
}
