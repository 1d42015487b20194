//! Validates the operator-supplied port/core mapping against the runtime's discovered ports and
//! enabled cores, configures each port's RX queues, and spawns one worker per core.

use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use squall_core::runtime::PortRuntime;
use squall_core::{FrameBuffer, PortCoreMap};
use tracing::info;

use crate::error::ServerError;
use crate::worker;

/// Parses and validates `mapping`, configures RSS/promiscuous mode/flow-control on every port it
/// references, then spawns one worker thread per core. Returns the join handles so the caller
/// can wait for cooperative shutdown.
pub fn launch<R>(
    mapping: &str,
    mut runtime: R,
    fb: Arc<dyn FrameBuffer>,
    force_quit: Arc<AtomicBool>,
) -> Result<Vec<std::thread::JoinHandle<()>>, ServerError>
where
    R: PortRuntime + Send + Sync + 'static,
{
    let available_ports = runtime.num_ports();
    let enabled_cores: HashSet<usize> = core_affinity::get_core_ids()
        .unwrap_or_default()
        .into_iter()
        .map(|id| id.id)
        .collect();

    info!(
        logical_cpus = num_cpus::get(),
        core_affinity_cores = enabled_cores.len(),
        "host topology detected"
    );

    let port_core_map = PortCoreMap::parse(mapping, available_ports, &enabled_cores)
        .map_err(crate::error::ConfigError::PortCoreMap)?;

    for port_config in port_core_map.ports() {
        let num_queues = port_config.num_queues() as u16;
        let numa_node = runtime.numa_node(port_config.port)?;
        runtime.configure_rx(port_config.port, num_queues)?;
        runtime.configure_rss(port_config.port)?;
        // The service prefers packet drop over back-pressure to upstream peers.
        runtime.set_flow_control(port_config.port, false)?;
        runtime.set_promiscuous(port_config.port, true)?;
        runtime.start(port_config.port)?;
        info!(port = port_config.port, num_queues, numa_node, cores = ?port_config.cores, "port launched");
    }

    let runtime = Arc::new(runtime);
    let mut handles = Vec::new();
    for core in port_core_map.worker_cores() {
        let work = port_core_map.core_work(core).cloned().unwrap_or_default();
        let runtime = runtime.clone();
        let fb = fb.clone();
        let force_quit = force_quit.clone();

        let handle = std::thread::Builder::new()
            .name(format!("squall-worker-{core}"))
            .spawn(move || {
                core_affinity::set_for_current(core_affinity::CoreId { id: core });
                if let Err(err) = worker::run(core, work, runtime, fb, force_quit) {
                    tracing::error!(core, %err, "worker exited with an error");
                }
            })
            .expect("failed to spawn worker thread");
        handles.push(handle);
    }

    Ok(handles)
}
