//! Periodically logs a human-readable table of per-port device counters. Runs on the main
//! thread; has no effect on the dataplane. A no-op when the active framebuffer has no
//! co-located `PortStats` table to read (a process-local [`squall_core::framebuffer::SimpleFrameBuffer`] run).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use squall_core::FrameBuffer;
use tracing::info;

pub fn run(fb: Arc<dyn FrameBuffer>, interval: Duration, force_quit: Arc<AtomicBool>) {
    while !force_quit.load(Ordering::Relaxed) {
        std::thread::sleep(interval);
        if force_quit.load(Ordering::Relaxed) {
            break;
        }

        let Some(stats) = fb.stats() else {
            continue;
        };

        for (mac, slot) in stats.iter_claimed() {
            let counters = slot.read();
            info!(
                mac = %mac.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(":"),
                rx_packets = counters.rx_packets,
                rx_bytes = counters.rx_bytes,
                rx_missed = counters.rx_missed,
                rx_errors = counters.rx_errors,
                rx_nombuf = counters.rx_nombuf,
                "port stats"
            );
        }
    }
}
