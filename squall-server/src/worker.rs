//! The per-core busy-poll RX loop: burst-poll a core's assigned (port, queue)s, decode each
//! packet, commit pixels, and periodically publish device counters.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use squall_core::runtime::{PacketBuffer, PortRuntime};
use squall_core::{codec, CoreWork, FrameBuffer, BURST_SIZE, STATS_CHECK_EVERY_N_BURSTS, STATS_INTERVAL};
use tracing::debug;

use crate::error::{ResourceError, ServerError};

/// One worker's running counters for its assigned (port, queue)s, indexed in task order.
#[derive(Debug, Default, Clone, Copy)]
struct QueueCounters {
    rx_packets: u64,
}

pub fn run<R: PortRuntime>(
    core: usize,
    work: CoreWork,
    runtime: Arc<R>,
    fb: Arc<dyn FrameBuffer>,
    force_quit: Arc<AtomicBool>,
) -> Result<(), ServerError> {
    let stats = fb.stats();
    let mut slots: Vec<Option<usize>> = vec![None; work.tasks.len()];
    if let Some(stats) = stats {
        for (index, &(port, _queue)) in work.tasks.iter().enumerate() {
            let mac = runtime.mac_address(port)?;
            // A full PortStats table at worker startup is fatal to this worker: every claimed
            // queue needs a place to publish its counters.
            let slot = stats.claim(mac).map_err(|_| ResourceError::StatsTableFull {
                max_ports: squall_core::MAX_PORTS,
            })?;
            slots[index] = Some(slot);
        }
    }

    let mut counters = vec![QueueCounters::default(); work.tasks.len()];
    let mut bursts_since_check: u32 = 0;
    let mut last_report = Instant::now();

    debug!(core, tasks = work.tasks.len(), "worker starting");

    'outer: loop {
        if force_quit.load(Ordering::Relaxed) {
            break;
        }

        for (task_index, &(port, queue)) in work.tasks.iter().enumerate() {
            if force_quit.load(Ordering::Relaxed) {
                break 'outer;
            }

            let mut burst: Vec<Option<R::Buffer>> = (0..BURST_SIZE).map(|_| None).collect();
            let received = runtime.rx_burst(port, queue, &mut burst);
            if received == 0 {
                continue;
            }

            counters[task_index].rx_packets += received as u64;

            for slot in burst.iter_mut().take(received) {
                if let Some(buffer) = slot.take() {
                    let (classification, pixel) = codec::decode(buffer.data());
                    let _ = classification;
                    if let Some(pixel) = pixel {
                        fb.set(pixel.x, pixel.y, pixel.rgba);
                    }
                }
            }
        }

        bursts_since_check += 1;
        if bursts_since_check >= STATS_CHECK_EVERY_N_BURSTS {
            bursts_since_check = 0;
            if last_report.elapsed() >= STATS_INTERVAL {
                last_report = Instant::now();
                if let Some(stats) = stats {
                    for (task_index, &(port, _queue)) in work.tasks.iter().enumerate() {
                        if let Some(slot_index) = slots[task_index] {
                            if let Ok(device_stats) = runtime.device_stats(port) {
                                stats.slot(slot_index).snapshot(&device_stats);
                            }
                        }
                    }
                }
            }
        }
    }

    debug!(core, "worker stopping");
    Ok(())
}
