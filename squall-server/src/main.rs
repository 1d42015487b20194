use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{self, Context};
use squall_core::framebuffer::{SharedMemoryFrameBuffer, SimpleFrameBuffer};
use squall_core::FrameBuffer;

mod capsule_runtime;
mod cli_args;
mod dispatch;
mod error;
mod stats_printer;
mod worker;

use capsule_runtime::CapsuleRuntime;
use cli_args::CliArgs;

fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(if cfg!(debug_assertions) {
            tracing::Level::DEBUG.into()
        } else {
            tracing::Level::INFO.into()
        })
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .with_thread_names(true)
        .init();
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    setup_logging();

    let args = CliArgs::parse();
    args.validate().map_err(|msg| eyre::eyre!(msg))?;

    let force_quit = Arc::new(AtomicBool::new(false));
    {
        let force_quit = force_quit.clone();
        ctrlc::set_handler(move || {
            tracing::info!("shutdown requested");
            force_quit.store(true, Ordering::Relaxed);
        })
        .context("failed to install SIGINT/SIGTERM handler")?;
    }

    let fb: Arc<dyn FrameBuffer> = if args.no_shared_memory {
        Arc::new(SimpleFrameBuffer::new(args.width, args.height))
    } else {
        Arc::new(
            SharedMemoryFrameBuffer::create_or_attach(args.width, args.height, &args.shared_memory_name)
                .context("failed to create shared memory framebuffer")?,
        )
    };

    let runtime = CapsuleRuntime::init(&args.eal_args).context("failed to initialise the kernel-bypass runtime")?;

    let handles = dispatch::launch(&args.port_core_map, runtime, fb.clone(), force_quit.clone())
        .context("failed to launch workers")?;

    stats_printer::run(fb, Duration::from_secs(args.stats_interval_s), force_quit.clone());

    for handle in handles {
        handle.join().expect("worker thread panicked");
    }

    Ok(())
}
