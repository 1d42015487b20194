//! Binds [`squall_core::runtime::PortRuntime`] to `capsule`, the kernel-bypass NFV framework
//! this dataplane targets. Port discovery, EAL initialisation and device binding happen once in
//! [`CapsuleRuntime::init`] and are never touched again on the hot path; everything below that
//! is a thin pass-through onto the queue handles capsule hands back.

use capsule::{Mbuf, PortQueue};
use squall_core::runtime::{PacketBuffer, PortRuntime, RuntimeError};
use squall_core::stats::DeviceStats;
use tracing::{info, instrument};

pub struct CapsuleBuffer(Mbuf);

impl PacketBuffer for CapsuleBuffer {
    fn data(&self) -> &[u8] {
        self.0.data_slice()
    }

    fn data_mut(&mut self) -> &mut [u8] {
        self.0.data_slice_mut()
    }

    fn set_len(&mut self, len: usize) {
        let current = self.0.data_len();
        let _ = self.0.resize(current, len as isize - current as isize);
    }
}

/// One discovered port. `queues` starts empty and is populated by `configure_rx` once the
/// dispatcher knows how many queues this port needs.
struct Port {
    mac: [u8; 6],
    queues: Vec<PortQueue>,
}

pub struct CapsuleRuntime {
    ports: Vec<Port>,
}

impl CapsuleRuntime {
    /// Brings up the EAL and enumerates the ports it bound, reading each one's MAC address.
    /// Queues are not configured yet — that happens per-port via `configure_rx`, once the
    /// dispatcher has validated the operator's port/core mapping against `num_ports()`.
    /// `eal_args` are forwarded verbatim (e.g. `-l 0-3 -n 4`).
    #[instrument(skip(eal_args))]
    pub fn init(eal_args: &[String]) -> Result<Self, RuntimeError> {
        capsule::dpdk::eal_init(eal_args.to_vec()).map_err(|source| RuntimeError::Configure {
            port: 0,
            source: Box::new(source),
        })?;

        let num_ports = capsule::dpdk::num_ports();
        let mut ports = Vec::with_capacity(num_ports as usize);
        for port_id in 0..num_ports {
            let mac = capsule::dpdk::port_mac_addr(port_id)
                .map_err(|source| RuntimeError::Configure {
                    port: port_id,
                    source: Box::new(source),
                })?
                .octets();
            ports.push(Port { mac, queues: Vec::new() });
        }

        info!(num_ports = ports.len(), "capsule runtime ready");
        Ok(Self { ports })
    }
}

impl PortRuntime for CapsuleRuntime {
    type Buffer = CapsuleBuffer;

    fn num_ports(&self) -> u16 {
        self.ports.len() as u16
    }

    fn mac_address(&self, port: u16) -> Result<[u8; 6], RuntimeError> {
        self.ports
            .get(port as usize)
            .map(|p| p.mac)
            .ok_or(RuntimeError::UnknownPort { port })
    }

    fn numa_node(&self, port: u16) -> Result<usize, RuntimeError> {
        if (port as usize) >= self.ports.len() {
            return Err(RuntimeError::UnknownPort { port });
        }
        capsule::dpdk::port_numa_node(port).map_err(|source| RuntimeError::Configure {
            port,
            source: Box::new(source),
        })
    }

    fn configure_rx(&mut self, port: u16, num_queues: u16) -> Result<(), RuntimeError> {
        let numa_node = self.numa_node(port)?;
        let entry = self.ports.get_mut(port as usize).ok_or(RuntimeError::UnknownPort { port })?;
        entry.queues = capsule::dpdk::configure_port(port, num_queues, squall_core::NUM_RX_DESC, numa_node)
            .map_err(|source| RuntimeError::Configure {
                port,
                source: Box::new(source),
            })?;
        info!(port, num_queues, numa_node, "port queues allocated node-local");
        Ok(())
    }

    fn configure_rss(&mut self, port: u16) -> Result<(), RuntimeError> {
        capsule::dpdk::configure_rss_ipv6(port).map_err(|source| RuntimeError::Configure {
            port,
            source: Box::new(source),
        })?;
        info!(port, "port configured with RSS over IPv6 source/destination");
        Ok(())
    }

    fn set_flow_control(&mut self, port: u16, enabled: bool) -> Result<(), RuntimeError> {
        capsule::dpdk::set_flow_control(port, enabled).map_err(|source| RuntimeError::Configure {
            port,
            source: Box::new(source),
        })?;
        info!(port, enabled, "port flow control (pause frames) set");
        Ok(())
    }

    fn set_promiscuous(&mut self, port: u16, enabled: bool) -> Result<(), RuntimeError> {
        capsule::dpdk::set_promiscuous(port, enabled).map_err(|source| RuntimeError::Configure {
            port,
            source: Box::new(source),
        })
    }

    fn start(&mut self, port: u16) -> Result<(), RuntimeError> {
        capsule::dpdk::start_port(port).map_err(|source| RuntimeError::Start {
            port,
            source: Box::new(source),
        })
    }

    fn alloc(&self) -> Option<Self::Buffer> {
        Mbuf::new().ok().map(CapsuleBuffer)
    }

    fn rx_burst(&self, port: u16, queue: u16, out: &mut [Option<Self::Buffer>]) -> usize {
        let Some(port) = self.ports.get(port as usize) else {
            return 0;
        };
        let Some(queue) = port.queues.get(queue as usize) else {
            return 0;
        };
        let received = queue.receive(out.len());
        let count = received.len();
        for (slot, mbuf) in out.iter_mut().zip(received) {
            *slot = Some(CapsuleBuffer(mbuf));
        }
        count
    }

    fn tx_burst(&self, port: u16, queue: u16, bufs: &mut [Option<Self::Buffer>]) -> usize {
        let Some(port) = self.ports.get(port as usize) else {
            return 0;
        };
        let Some(queue) = port.queues.get(queue as usize) else {
            return 0;
        };

        let batch: Vec<Mbuf> = bufs.iter_mut().filter_map(|slot| slot.take().map(|b| b.0)).collect();
        let requested = batch.len();
        let sent = queue.transmit(batch);
        sent.min(requested)
    }

    fn device_stats(&self, port: u16) -> Result<DeviceStats, RuntimeError> {
        let port_id = port;
        let stats = capsule::dpdk::port_stats(port_id).map_err(|source| RuntimeError::Configure {
            port: port_id,
            source: Box::new(source),
        })?;

        Ok(DeviceStats {
            rx_packets: stats.ipackets,
            rx_bytes: stats.ibytes,
            tx_packets: stats.opackets,
            tx_bytes: stats.obytes,
            rx_missed: stats.imissed,
            rx_errors: stats.ierrors,
            rx_nombuf: stats.rx_nombuf,
        })
    }
}
