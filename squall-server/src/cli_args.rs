use clap::Parser;
use const_format::formatcp;

const DEFAULT_WIDTH_STR: &str = formatcp!("{}", 1920);
const DEFAULT_HEIGHT_STR: &str = formatcp!("{}", 1080);

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Width of the canvas.
    #[clap(long, default_value = DEFAULT_WIDTH_STR)]
    pub width: u16,

    /// Height of the canvas.
    #[clap(long, default_value = DEFAULT_HEIGHT_STR)]
    pub height: u16,

    /// `port:core[,core...]` assignment, space separated, e.g. `"0:1,2 1:3"`.
    /// Port ids refer to the ports the runtime discovered at startup; core 0 is reserved for
    /// the stats printer and cannot be assigned a queue.
    #[clap(short = 'm', long)]
    pub port_core_map: String,

    /// Name of the shared memory region to create (or attach to) for the framebuffer and
    /// PortStats table.
    #[clap(long, default_value = "/pixelflut")]
    pub shared_memory_name: String,

    /// Skip shared memory entirely and keep the framebuffer process-private. Useful for running
    /// the dataplane without a display sink attached (e.g. benchmarking).
    #[clap(long)]
    pub no_shared_memory: bool,

    /// How often (in seconds) to print the per-port statistics table.
    #[clap(long, default_value_t = 1)]
    pub stats_interval_s: u64,

    /// EAL arguments forwarded verbatim to the kernel-bypass runtime, e.g. `-l 0-3 -n 4`.
    #[clap(long)]
    pub eal_args: Vec<String>,
}

impl CliArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err("width and height must both be non-zero".to_owned());
        }
        if self.width as u32 * self.height as u32 > u32::MAX / 4 {
            return Err("canvas is too large to address as 32-bit RGBA pixels".to_owned());
        }
        Ok(())
    }
}
