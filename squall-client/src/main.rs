use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{self, Context};
use squall_core::runtime::PortRuntime;

mod addressing;
mod capsule_runtime;
mod cli_args;
mod error;
mod image;
mod sender;

use capsule_runtime::CapsuleRuntime;
use cli_args::CliArgs;
use image::FluterImage;

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

    let force_quit = Arc::new(AtomicBool::new(false));
    {
        let force_quit = force_quit.clone();
        ctrlc::set_handler(move || {
            tracing::info!("shutdown requested");
            force_quit.store(true, Ordering::Relaxed);
        })
        .context("failed to install SIGINT/SIGTERM handler")?;
    }

    let image = FluterImage::load(&args.image).context("failed to load source image")?;

    let mut runtime = CapsuleRuntime::init(&args.eal_args).context("failed to initialise the kernel-bypass runtime")?;
    if args.port >= runtime.num_ports() {
        eyre::bail!(
            "--port {} is out of range; the runtime only discovered {} port(s)",
            args.port,
            runtime.num_ports()
        );
    }

    // One TX queue is all the single-core sender ever uses.
    runtime.configure_rx(args.port, 1).context("failed to configure the sending port")?;
    runtime.set_promiscuous(args.port, true)?;
    runtime.start(args.port).context("failed to start the sending port")?;

    let encoding = match args.pingxelflut {
        Some(target) => sender::Encoding::Pingxelflut { target },
        None => sender::Encoding::PixelflutV6,
    };
    let dest_mac = args.dest_mac.map(|mac| mac.bytes());

    sender::run(
        &runtime,
        args.port,
        0,
        &image,
        encoding,
        dest_mac,
        Duration::from_secs(args.stats_interval_s),
        &force_quit,
    )
    .context("sender loop failed")?;

    Ok(())
}
