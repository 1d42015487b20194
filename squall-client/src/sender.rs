//! The single-core burst encoder: walks the image in row-major order, fills a burst of packet
//! buffers in place, and transmits with spin-until-accepted semantics.

use std::net::Ipv6Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use squall_core::codec::{self, PacketCursor};
use squall_core::runtime::{PacketBuffer, PortRuntime};
use squall_core::{BURST_SIZE, STATS_CHECK_EVERY_N_BURSTS};
use tracing::{info, warn};

use crate::addressing;
use crate::image::FluterImage;

/// Which wire encoding to mint packets with.
pub enum Encoding {
    PixelflutV6,
    Pingxelflut { target: Ipv6Addr },
}

pub fn run<R: PortRuntime>(
    runtime: &R,
    port: u16,
    queue: u16,
    image: &FluterImage,
    encoding: Encoding,
    dest_mac: Option<[u8; 6]>,
    stats_interval: Duration,
    force_quit: &AtomicBool,
) -> Result<(), squall_core::runtime::RuntimeError> {
    let src_mac = runtime.mac_address(port)?;
    let mut cursor = PacketCursor::new(image.width, image.height);

    let frame_len = match &encoding {
        Encoding::PixelflutV6 => codec::PIXELFLUT_V6_FRAME_LEN.max(codec::MIN_ETHERNET_FRAME_LEN),
        Encoding::Pingxelflut { .. } => codec::PINGXELFLUT_V6_FRAME_LEN.max(codec::MIN_ETHERNET_FRAME_LEN),
    };

    let mut sent_packets: u64 = 0;
    let mut dropped_packets: u64 = 0;
    let mut bursts_since_check: u32 = 0;
    let mut last_report = Instant::now();

    info!(
        width = image.width,
        height = image.height,
        encoding = match encoding {
            Encoding::PixelflutV6 => "pixelflut-v6",
            Encoding::Pingxelflut { .. } => "pingxelflut",
        },
        "sender starting"
    );

    while !force_quit.load(Ordering::Relaxed) {
        let mut burst: Vec<Option<R::Buffer>> = Vec::with_capacity(BURST_SIZE);

        for _ in 0..BURST_SIZE {
            let Some(mut buffer) = runtime.alloc() else {
                warn!("packet buffer pool exhausted while filling a burst");
                break;
            };

            let (x, y) = cursor.position();
            let rgba = image.pixel(x, y);

            // Grow the buffer to its final wire length before writing into it: the encoders
            // zero-fill and index up to `frame_len`.
            buffer.set_len(frame_len);
            let data = buffer.data_mut();
            let len = match &encoding {
                Encoding::PixelflutV6 => {
                    let addrs = addressing::pixelflut_v6_addresses(src_mac, dest_mac);
                    codec::encode_pixelflut_v6(data, &addrs, x, y, rgba)
                }
                Encoding::Pingxelflut { target } => {
                    let addrs = addressing::pingxelflut_addresses(src_mac, dest_mac, *target);
                    codec::encode_pingxelflut_v6(data, &addrs, x, y, rgba)
                }
            };
            debug_assert_eq!(len, frame_len);

            burst.push(Some(buffer));
            cursor.advance();
        }

        let requested = burst.len();
        if requested == 0 {
            continue;
        }

        let sent = loop {
            let sent = runtime.tx_burst(port, queue, &mut burst);
            if sent > 0 || force_quit.load(Ordering::Relaxed) {
                break sent;
            }
        };

        if sent < requested {
            warn!(
                requested,
                sent,
                dropped = requested - sent,
                "burst was only partially accepted by the device; dropping the tail"
            );
            dropped_packets += (requested - sent) as u64;
        }
        sent_packets += sent as u64;

        // Any buffers `tx_burst` did not take ownership of (the unsent tail) are still `Some`
        // in `burst`; dropping the vec here releases them back to the pool.
        drop(burst);

        bursts_since_check += 1;
        if bursts_since_check >= STATS_CHECK_EVERY_N_BURSTS {
            bursts_since_check = 0;
            if last_report.elapsed() >= stats_interval {
                last_report = Instant::now();
                if let Ok(stats) = runtime.device_stats(port) {
                    info!(
                        sent_packets,
                        dropped_packets,
                        tx_packets = stats.tx_packets,
                        tx_bytes = stats.tx_bytes,
                        "sender progress"
                    );
                }
            }
        }
    }

    info!(sent_packets, dropped_packets, "sender stopping");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::sync::atomic::AtomicBool;

    use squall_core::runtime::RuntimeError;
    use squall_core::stats::DeviceStats;

    use super::*;

    struct FakeBuffer(Vec<u8>);

    impl PacketBuffer for FakeBuffer {
        fn data(&self) -> &[u8] {
            &self.0
        }

        fn data_mut(&mut self) -> &mut [u8] {
            &mut self.0
        }

        fn set_len(&mut self, len: usize) {
            self.0.resize(len, 0);
        }
    }

    /// Accepts a whole burst in full, records every transmitted frame, and flips the shared
    /// `force_quit` flag after the first burst so the test drives exactly one iteration.
    struct FakeRuntime {
        sent: RefCell<Vec<Vec<u8>>>,
        force_quit_after_first: AtomicBool,
    }

    impl PortRuntime for FakeRuntime {
        type Buffer = FakeBuffer;

        fn num_ports(&self) -> u16 {
            1
        }

        fn mac_address(&self, _port: u16) -> Result<[u8; 6], RuntimeError> {
            Ok([0, 0, 0, 0, 0, 1])
        }

        fn numa_node(&self, _port: u16) -> Result<usize, RuntimeError> {
            Ok(0)
        }

        fn configure_rx(&mut self, _port: u16, _num_queues: u16) -> Result<(), RuntimeError> {
            Ok(())
        }

        fn configure_rss(&mut self, _port: u16) -> Result<(), RuntimeError> {
            Ok(())
        }

        fn set_flow_control(&mut self, _port: u16, _enabled: bool) -> Result<(), RuntimeError> {
            Ok(())
        }

        fn set_promiscuous(&mut self, _port: u16, _enabled: bool) -> Result<(), RuntimeError> {
            Ok(())
        }

        fn start(&mut self, _port: u16) -> Result<(), RuntimeError> {
            Ok(())
        }

        fn alloc(&self) -> Option<Self::Buffer> {
            Some(FakeBuffer(Vec::new()))
        }

        fn rx_burst(&self, _port: u16, _queue: u16, _out: &mut [Option<Self::Buffer>]) -> usize {
            0
        }

        fn tx_burst(&self, _port: u16, _queue: u16, bufs: &mut [Option<Self::Buffer>]) -> usize {
            let mut sent = self.sent.borrow_mut();
            let mut count = 0;
            for slot in bufs.iter_mut() {
                if let Some(buffer) = slot.take() {
                    sent.push(buffer.0);
                    count += 1;
                }
            }
            self.force_quit_after_first.store(true, Ordering::Relaxed);
            count
        }

        fn device_stats(&self, _port: u16) -> Result<DeviceStats, RuntimeError> {
            Ok(DeviceStats::default())
        }
    }

    #[test]
    fn one_burst_walks_the_image_row_major_and_wraps() {
        let image = FluterImage::from_pixels(2, 2, vec![0x0001, 0x0002, 0x0003, 0x0004]);
        let runtime = FakeRuntime {
            sent: RefCell::new(Vec::new()),
            force_quit_after_first: AtomicBool::new(false),
        };

        run(
            &runtime,
            0,
            0,
            &image,
            Encoding::PixelflutV6,
            None,
            Duration::from_secs(3600),
            &runtime.force_quit_after_first,
        )
        .unwrap();

        let sent = runtime.sent.borrow();
        assert!(sent.len() >= 5);

        let decoded: Vec<(u16, u16)> = sent[..5]
            .iter()
            .map(|frame| codec::decode(frame).1.map(|p| (p.x, p.y)).unwrap())
            .collect();
        assert_eq!(decoded, vec![(0, 0), (1, 0), (0, 1), (1, 1), (0, 0)]);
    }
}
