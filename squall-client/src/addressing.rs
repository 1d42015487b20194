//! Pre-resolved source/destination addressing for the two wire encodings. The dataplane does
//! no neighbour discovery: the next-hop MAC is a fixed constant the operator's network must be
//! configured to route through, same as the original C client.

use std::net::Ipv6Addr;

use squall_core::codec::{PingxelflutAddresses, PixelflutV6Addresses};

/// Next-hop MAC the encoded frames are addressed to. Not discovered at runtime: the operator's
/// switch/router must already have a route to the real destination via this MAC.
const NEXT_HOP_MAC: [u8; 6] = [0x14, 0xa0, 0xf8, 0x8b, 0x1e, 0xe4];

/// Source address used for the pixelflut-v6 encoding when no explicit target is given.
const PIXELFLUT_SRC_ADDR: Ipv6Addr = Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1);

/// Destination /64 prefix pixelflut-v6 writes pixels into.
const PIXELFLUT_DST_PREFIX: Ipv6Addr = Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0);

/// Source address used for the pingxelflut encoding.
const PINGXELFLUT_SRC_ADDR: Ipv6Addr = Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1);

pub fn pixelflut_v6_addresses(src_mac: [u8; 6], dst_mac: Option<[u8; 6]>) -> PixelflutV6Addresses {
    let mut dst_prefix = [0u8; 8];
    dst_prefix.copy_from_slice(&PIXELFLUT_DST_PREFIX.octets()[..8]);

    PixelflutV6Addresses {
        src_mac,
        dst_mac: dst_mac.unwrap_or(NEXT_HOP_MAC),
        src_addr: PIXELFLUT_SRC_ADDR.octets(),
        dst_prefix,
    }
}

pub fn pingxelflut_addresses(src_mac: [u8; 6], dst_mac: Option<[u8; 6]>, target: Ipv6Addr) -> PingxelflutAddresses {
    PingxelflutAddresses {
        src_mac,
        dst_mac: dst_mac.unwrap_or(NEXT_HOP_MAC),
        src_addr: PINGXELFLUT_SRC_ADDR.octets(),
        dst_addr: target.octets(),
    }
}
