use std::time::Duration;

use const_format::formatcp;

pub mod codec;
pub mod framebuffer;
pub mod port_core_map;
pub mod runtime;
pub mod stats;

pub use framebuffer::FrameBuffer;
pub use port_core_map::{CoreWork, PortConfig, PortCoreMap};
pub use runtime::{PacketBuffer, PortRuntime, RuntimeError};
pub use stats::PortStatsTable;

/// Packets moved between the NIC and the application per `rx_burst`/`tx_burst` call.
pub const BURST_SIZE: usize = 32;

/// RX descriptor ring depth configured on every queue we set up.
pub const NUM_RX_DESC: u16 = 1024;

/// TX descriptor ring depth configured on the client's sending queue.
pub const NUM_TX_DESC: u16 = 1024;

/// Maximum number of `PortStats` rows co-located with the framebuffer.
pub const MAX_PORTS: usize = 32;

/// Maximum RX queues (and therefore worker cores) a single port may be split across.
pub const MAX_CORES_PER_PORT: usize = 16;

/// Maximum number of (port, queue) tasks a single core may be handed.
pub const MAX_QUEUES_PER_CORE: usize = 4;

/// How often a worker/sender thread is allowed to snapshot device counters.
pub const STATS_INTERVAL: Duration = Duration::from_millis(250);

/// Loop iterations a worker burst-polls between `clock_gettime` checks, to amortise the
/// syscall cost of checking whether [`STATS_INTERVAL`] has elapsed.
pub const STATS_CHECK_EVERY_N_BURSTS: u32 = 10_000;

pub const HELP_TEXT: &[u8] = formatcp!(
    "\
squall: a pixel-graffiti kernel-bypass endpoint
Protocols understood by squall-server on a single (port, queue):
  pixelflut-v6: UDP/IPv6 packet whose destination address encodes (x, y, r, g, b)
  pingxelflut (v4 and v6): ICMPv6/ICMPv4 echo request with a SET_PIXEL payload
Pixel plane is row-major RGBA32 (little-endian per word); the alpha byte is reserved and ignored on the wire.
Up to {} ports and {} cores per port are supported; core 0 is reserved for reporting.
",
    MAX_PORTS,
    MAX_CORES_PER_PORT,
)
.as_bytes();
