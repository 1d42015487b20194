use std::net::Ipv6Addr;
use std::path::PathBuf;

use clap::Parser;
use mac_address::MacAddress;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the image to flut.
    #[clap(short, long)]
    pub image: PathBuf,

    /// Use the pingxelflut (ICMPv6 echo request) encoding instead of pixelflut-v6, targeting
    /// this IPv6 address. Without this flag, pixelflut-v6 is used with a hardcoded source
    /// `fe80::1` and `/64` destination `fe80::/64`.
    #[clap(long)]
    pub pingxelflut: Option<Ipv6Addr>,

    /// Which port (as discovered by the runtime) to transmit from.
    #[clap(long, default_value_t = 0)]
    pub port: u16,

    /// Next-hop MAC address to address every frame to. Defaults to a fixed constant; override
    /// this when the operator's network routes through a different gateway/switch port.
    #[clap(long)]
    pub dest_mac: Option<MacAddress>,

    /// How often (in seconds) to log transmit counters.
    #[clap(long, default_value_t = 1)]
    pub stats_interval_s: u64,

    /// EAL arguments forwarded verbatim to the kernel-bypass runtime, e.g. `-l 0-1 -n 4`.
    #[clap(long)]
    pub eal_args: Vec<String>,
}
