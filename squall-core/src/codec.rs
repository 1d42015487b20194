//! Pure classify/extract and encode functions for pixelflut-v6 and pingxelflut.
//!
//! Every function here takes a byte slice or writes into one the caller owns; none of them
//! allocate, so they are safe to call once per packet on the hot path.

pub const ETH_HDR_LEN: usize = 14;
pub const IPV4_HDR_LEN: usize = 20;
pub const IPV6_HDR_LEN: usize = 40;
pub const ICMP_HDR_LEN: usize = 8;
pub const UDP_HDR_LEN: usize = 8;

/// Minimum length of any Ethernet frame on the wire; shorter payloads are padded with zeros.
pub const MIN_ETHERNET_FRAME_LEN: usize = 64;

pub const PIXELFLUT_V6_FRAME_LEN: usize = ETH_HDR_LEN + IPV6_HDR_LEN + UDP_HDR_LEN;
pub const PINGXELFLUT_PAYLOAD_LEN: usize = 8;
pub const PINGXELFLUT_V6_FRAME_LEN: usize = ETH_HDR_LEN + IPV6_HDR_LEN + ICMP_HDR_LEN + PINGXELFLUT_PAYLOAD_LEN;

const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_IPV6: u16 = 0x86dd;

const IPPROTO_ICMP: u8 = 1;
const IPPROTO_ICMPV6: u8 = 58;
const IPPROTO_UDP: u8 = 17;

const ICMPV4_ECHO_REQUEST: u8 = 8;
const ICMPV6_ECHO_REQUEST: u8 = 128;

pub const MSG_SET_PIXEL: u8 = 0xcc;
pub const MSG_SIZE_REQUEST: u8 = 0xaa;
pub const MSG_SIZE_RESPONSE: u8 = 0xbb;

/// What a frame turned out to be, regardless of whether a pixel came out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    PixelflutV6,
    PingxelflutV6,
    PingxelflutV4,
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedPixel {
    pub x: u16,
    pub y: u16,
    pub rgba: u32,
}

#[inline(always)]
fn be16(frame: &[u8], offset: usize) -> Option<u16> {
    frame
        .get(offset..offset + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
}

#[inline(always)]
fn rgb_word(frame: &[u8], offset: usize) -> Option<u32> {
    let b = frame.get(offset..offset + 3)?;
    Some(b[0] as u32 | (b[1] as u32) << 8 | (b[2] as u32) << 16)
}

/// Classifies `frame` and extracts its pixel, if any. Never reads past `frame.len()`.
///
/// IPv6 is checked before IPv4: the workload is overwhelmingly IPv6 and this order is a
/// deliberate, load-bearing choice, not an arbitrary one.
pub fn decode(frame: &[u8]) -> (Classification, Option<DecodedPixel>) {
    match be16(frame, 12) {
        Some(ETHERTYPE_IPV6) => decode_ipv6(frame),
        Some(ETHERTYPE_IPV4) => decode_ipv4(frame),
        _ => (Classification::Ignored, None),
    }
}

fn is_echo_request(frame: &[u8], icmp_offset: usize, echo_request_type: u8) -> bool {
    matches!(
        (frame.get(icmp_offset), frame.get(icmp_offset + 1)),
        (Some(&t), Some(&0)) if t == echo_request_type
    )
}

/// Parses the SET_PIXEL payload that starts at `msg_kind_offset`, which must already have been
/// confirmed to hold [`MSG_SET_PIXEL`]. `frame_len` is the logical length of the whole frame so
/// the 8- vs 9-byte (alpha) payload variants can be told apart without reading past it.
fn decode_set_pixel(frame: &[u8], msg_kind_offset: usize, frame_len: usize) -> Option<DecodedPixel> {
    let x = be16(frame, msg_kind_offset + 1)?;
    let y = be16(frame, msg_kind_offset + 3)?;
    let payload_len = frame_len.checked_sub(msg_kind_offset)?;
    if payload_len != PINGXELFLUT_PAYLOAD_LEN && payload_len != PINGXELFLUT_PAYLOAD_LEN + 1 {
        return None;
    }
    let rgba = rgb_word(frame, msg_kind_offset + 5)?;
    Some(DecodedPixel { x, y, rgba })
}

fn decode_ipv6(frame: &[u8]) -> (Classification, Option<DecodedPixel>) {
    let ipv6 = ETH_HDR_LEN;
    if frame.len() < ipv6 + IPV6_HDR_LEN {
        return (Classification::Ignored, None);
    }

    let next_header = frame[ipv6 + 6];
    if next_header == IPPROTO_ICMPV6 {
        let icmp = ipv6 + IPV6_HDR_LEN;
        if is_echo_request(frame, icmp, ICMPV6_ECHO_REQUEST) {
            let msg_kind_offset = icmp + ICMP_HDR_LEN;
            match frame.get(msg_kind_offset) {
                Some(&MSG_SET_PIXEL) => {
                    return (
                        Classification::PingxelflutV6,
                        decode_set_pixel(frame, msg_kind_offset, frame.len()),
                    );
                }
                Some(&MSG_SIZE_REQUEST) | Some(&MSG_SIZE_RESPONSE) => {
                    return (Classification::PingxelflutV6, None);
                }
                _ => {
                    // Not a recognised pingxelflut message: falls through to pixelflut-v6 below,
                    // mirroring the source's `was_pingxelflut` staying false in this case.
                }
            }
        }
    }

    let dst = ipv6 + 24;
    let (Some(x), Some(y), Some(rgba)) = (be16(frame, dst + 8), be16(frame, dst + 10), rgb_word(frame, dst + 12))
    else {
        return (Classification::Ignored, None);
    };
    (Classification::PixelflutV6, Some(DecodedPixel { x, y, rgba }))
}

fn decode_ipv4(frame: &[u8]) -> (Classification, Option<DecodedPixel>) {
    let ipv4 = ETH_HDR_LEN;
    if frame.len() < ipv4 + IPV4_HDR_LEN {
        return (Classification::Ignored, None);
    }

    let next_proto = frame[ipv4 + 9];
    if next_proto != IPPROTO_ICMP {
        return (Classification::Ignored, None);
    }

    let icmp = ipv4 + IPV4_HDR_LEN;
    if !is_echo_request(frame, icmp, ICMPV4_ECHO_REQUEST) {
        return (Classification::Ignored, None);
    }

    let msg_kind_offset = icmp + ICMP_HDR_LEN;
    if frame.get(msg_kind_offset) != Some(&MSG_SET_PIXEL) {
        return (Classification::Ignored, None);
    }

    (
        Classification::PingxelflutV4,
        decode_set_pixel(frame, msg_kind_offset, frame.len()),
    )
}

/// Fixed source/destination addressing for the pixelflut-v6 encoder: only the /64 prefix of the
/// destination is configured, the low 64 bits are overwritten per pixel.
pub struct PixelflutV6Addresses {
    pub src_mac: [u8; 6],
    pub dst_mac: [u8; 6],
    pub src_addr: [u8; 16],
    pub dst_prefix: [u8; 8],
}

/// Fixed source/destination addressing for the pingxelflut encoder.
pub struct PingxelflutAddresses {
    pub src_mac: [u8; 6],
    pub dst_mac: [u8; 6],
    pub src_addr: [u8; 16],
    pub dst_addr: [u8; 16],
}

/// Writes a pixelflut-v6 frame (Ethernet + IPv6 + zeroed UDP) for `(x, y, rgba)` into `buf`,
/// zero-padded to [`MIN_ETHERNET_FRAME_LEN`]. Returns the frame length.
///
/// # Panics
/// Panics if `buf` is shorter than [`MIN_ETHERNET_FRAME_LEN`].
pub fn encode_pixelflut_v6(buf: &mut [u8], addrs: &PixelflutV6Addresses, x: u16, y: u16, rgba: u32) -> usize {
    let len = PIXELFLUT_V6_FRAME_LEN.max(MIN_ETHERNET_FRAME_LEN);
    buf[..len].fill(0);

    buf[0..6].copy_from_slice(&addrs.dst_mac);
    buf[6..12].copy_from_slice(&addrs.src_mac);
    buf[12..14].copy_from_slice(&ETHERTYPE_IPV6.to_be_bytes());

    let ipv6 = ETH_HDR_LEN;
    buf[ipv6] = 0x60; // version 6, top nibble of traffic class/flow label zero
    buf[ipv6 + 4..ipv6 + 6].copy_from_slice(&(UDP_HDR_LEN as u16).to_be_bytes());
    buf[ipv6 + 6] = IPPROTO_UDP;
    buf[ipv6 + 7] = 0xff; // hop_limit
    buf[ipv6 + 8..ipv6 + 24].copy_from_slice(&addrs.src_addr);
    buf[ipv6 + 24..ipv6 + 32].copy_from_slice(&addrs.dst_prefix);

    let dst = ipv6 + 24;
    buf[dst + 8..dst + 10].copy_from_slice(&x.to_be_bytes());
    buf[dst + 10..dst + 12].copy_from_slice(&y.to_be_bytes());
    buf[dst + 12] = (rgba & 0xff) as u8;
    buf[dst + 13] = ((rgba >> 8) & 0xff) as u8;
    buf[dst + 14] = ((rgba >> 16) & 0xff) as u8;
    // buf[dst + 15] (alpha) left zero.

    // UDP header (8 zero bytes) already zeroed by the initial fill.

    len
}

/// Writes a pingxelflut-v6 frame (Ethernet + IPv6 + ICMPv6 + SET_PIXEL payload) for `(x, y,
/// rgba)` into `buf`, zero-padded to [`MIN_ETHERNET_FRAME_LEN`]. Returns the frame length.
///
/// # Panics
/// Panics if `buf` is shorter than [`MIN_ETHERNET_FRAME_LEN`].
pub fn encode_pingxelflut_v6(buf: &mut [u8], addrs: &PingxelflutAddresses, x: u16, y: u16, rgba: u32) -> usize {
    let len = PINGXELFLUT_V6_FRAME_LEN.max(MIN_ETHERNET_FRAME_LEN);
    buf[..len].fill(0);

    buf[0..6].copy_from_slice(&addrs.dst_mac);
    buf[6..12].copy_from_slice(&addrs.src_mac);
    buf[12..14].copy_from_slice(&ETHERTYPE_IPV6.to_be_bytes());

    let ipv6 = ETH_HDR_LEN;
    buf[ipv6] = 0x60;
    let icmp_payload_len = (ICMP_HDR_LEN + PINGXELFLUT_PAYLOAD_LEN) as u16;
    buf[ipv6 + 4..ipv6 + 6].copy_from_slice(&icmp_payload_len.to_be_bytes());
    buf[ipv6 + 6] = IPPROTO_ICMPV6;
    buf[ipv6 + 7] = 0xff;
    buf[ipv6 + 8..ipv6 + 24].copy_from_slice(&addrs.src_addr);
    buf[ipv6 + 24..ipv6 + 40].copy_from_slice(&addrs.dst_addr);

    let icmp = ipv6 + IPV6_HDR_LEN;
    buf[icmp] = ICMPV6_ECHO_REQUEST;
    buf[icmp + 1] = 0;
    // checksum (icmp+2..icmp+4), identifier and sequence number left zero.

    let msg_kind_offset = icmp + ICMP_HDR_LEN;
    buf[msg_kind_offset] = MSG_SET_PIXEL;
    buf[msg_kind_offset + 1..msg_kind_offset + 3].copy_from_slice(&x.to_be_bytes());
    buf[msg_kind_offset + 3..msg_kind_offset + 5].copy_from_slice(&y.to_be_bytes());
    buf[msg_kind_offset + 5] = (rgba & 0xff) as u8;
    buf[msg_kind_offset + 6] = ((rgba >> 8) & 0xff) as u8;
    buf[msg_kind_offset + 7] = ((rgba >> 16) & 0xff) as u8;

    len
}

/// Row-major walk over `[0, width) x [0, height)`, wrapping forever.
#[derive(Debug, Clone, Copy)]
pub struct PacketCursor {
    width: u16,
    height: u16,
    x: u16,
    y: u16,
}

impl PacketCursor {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            x: 0,
            y: 0,
        }
    }

    #[inline(always)]
    pub fn position(&self) -> (u16, u16) {
        (self.x, self.y)
    }

    /// Advances to the next pixel, wrapping rows and then the whole canvas.
    #[inline(always)]
    pub fn advance(&mut self) {
        self.x += 1;
        if self.x == self.width {
            self.x = 0;
            self.y += 1;
            if self.y == self.height {
                self.y = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn pixelflut_v6_frame(x: u16, y: u16, r: u8, g: u8, b: u8) -> Vec<u8> {
        let addrs = PixelflutV6Addresses {
            src_mac: [0; 6],
            dst_mac: [0; 6],
            src_addr: [0; 16],
            dst_prefix: *b"\xfe\x80\0\0\0\0\0\0",
        };
        let mut buf = vec![0u8; MIN_ETHERNET_FRAME_LEN];
        let rgba = r as u32 | (g as u32) << 8 | (b as u32) << 16;
        let len = encode_pixelflut_v6(&mut buf, &addrs, x, y, rgba);
        buf.truncate(len);
        buf
    }

    fn pingxelflut_v6_frame(x: u16, y: u16, r: u8, g: u8, b: u8) -> Vec<u8> {
        let addrs = PingxelflutAddresses {
            src_mac: [0; 6],
            dst_mac: [0; 6],
            src_addr: [0; 16],
            dst_addr: [0; 16],
        };
        let mut buf = vec![0u8; MIN_ETHERNET_FRAME_LEN];
        let rgba = r as u32 | (g as u32) << 8 | (b as u32) << 16;
        let len = encode_pingxelflut_v6(&mut buf, &addrs, x, y, rgba);
        buf.truncate(len);
        buf
    }

    #[test]
    fn pixelflut_v6_destination_address_sets_the_pixel() {
        let frame = pixelflut_v6_frame(5, 10, 0xff, 0x00, 0x7f);
        let (class, pixel) = decode(&frame);
        assert_eq!(class, Classification::PixelflutV6);
        assert_eq!(
            pixel,
            Some(DecodedPixel {
                x: 5,
                y: 10,
                rgba: 0x007f00ff
            })
        );
    }

    #[test]
    fn pingxelflut_v6_set_pixel_payload_sets_the_pixel() {
        // ether_type IPv6, ICMPv6 echo request, payload cc 00 03 00 04 12 34 56
        let frame = pingxelflut_v6_frame(3, 4, 0x12, 0x34, 0x56);
        let (class, pixel) = decode(&frame);
        assert_eq!(class, Classification::PingxelflutV6);
        assert_eq!(
            pixel,
            Some(DecodedPixel {
                x: 3,
                y: 4,
                rgba: 0x00563412
            })
        );
    }

    #[test]
    fn pingxelflut_set_pixel_takes_precedence_over_the_destination_address() {
        // Build a pingxelflut-v6 frame whose IPv6 destination (prefix zero, addrs zero) would
        // also decode as a valid-looking pixelflut-v6 coordinate if misread.
        let frame = pingxelflut_v6_frame(0, 0, 1, 2, 3);
        let (class, pixel) = decode(&frame);
        assert_eq!(class, Classification::PingxelflutV6);
        assert_eq!(pixel.unwrap().rgba, 0x00030201);
    }

    fn pingxelflut_v4_frame(x: u16, y: u16, r: u8, g: u8, b: u8) -> Vec<u8> {
        let mut buf = vec![0u8; MIN_ETHERNET_FRAME_LEN];
        buf[12..14].copy_from_slice(&ETHERTYPE_IPV4.to_be_bytes());

        let ipv4 = ETH_HDR_LEN;
        buf[ipv4] = 0x45; // version 4, IHL 5
        buf[ipv4 + 9] = IPPROTO_ICMP;

        let icmp = ipv4 + IPV4_HDR_LEN;
        buf[icmp] = ICMPV4_ECHO_REQUEST;
        buf[icmp + 1] = 0;

        let msg_kind_offset = icmp + ICMP_HDR_LEN;
        buf[msg_kind_offset] = MSG_SET_PIXEL;
        buf[msg_kind_offset + 1..msg_kind_offset + 3].copy_from_slice(&x.to_be_bytes());
        buf[msg_kind_offset + 3..msg_kind_offset + 5].copy_from_slice(&y.to_be_bytes());
        buf[msg_kind_offset + 5] = r;
        buf[msg_kind_offset + 6] = g;
        buf[msg_kind_offset + 7] = b;

        buf.truncate(msg_kind_offset + PINGXELFLUT_PAYLOAD_LEN);
        buf
    }

    #[test]
    fn pingxelflut_v4_set_pixel_payload_sets_the_pixel() {
        let frame = pingxelflut_v4_frame(3, 4, 0x12, 0x34, 0x56);
        let (class, pixel) = decode(&frame);
        assert_eq!(class, Classification::PingxelflutV4);
        assert_eq!(
            pixel,
            Some(DecodedPixel {
                x: 3,
                y: 4,
                rgba: 0x00563412
            })
        );
    }

    #[test]
    fn ipv4_non_icmp_traffic_is_ignored() {
        let mut frame = pingxelflut_v4_frame(0, 0, 0, 0, 0);
        let ipv4 = ETH_HDR_LEN;
        frame[ipv4 + 9] = IPPROTO_UDP;
        let (class, pixel) = decode(&frame);
        assert_eq!(class, Classification::Ignored);
        assert_eq!(pixel, None);
    }

    #[test]
    fn non_ip_ether_type_is_ignored() {
        let mut frame = vec![0u8; MIN_ETHERNET_FRAME_LEN];
        frame[12..14].copy_from_slice(&0x0806u16.to_be_bytes());
        let (class, pixel) = decode(&frame);
        assert_eq!(class, Classification::Ignored);
        assert_eq!(pixel, None);
    }

    #[test]
    fn pingxelflut_size_request_is_recognised_without_a_pixel() {
        let mut frame = pingxelflut_v6_frame(0, 0, 0, 0, 0);
        let msg_kind_offset = ETH_HDR_LEN + IPV6_HDR_LEN + ICMP_HDR_LEN;
        frame[msg_kind_offset] = MSG_SIZE_REQUEST;
        let (class, pixel) = decode(&frame);
        assert_eq!(class, Classification::PingxelflutV6);
        assert_eq!(pixel, None);
    }

    #[test]
    fn unrecognised_icmpv6_message_falls_back_to_pixelflut_v6() {
        let mut frame = pingxelflut_v6_frame(0, 0, 0, 0, 0);
        let msg_kind_offset = ETH_HDR_LEN + IPV6_HDR_LEN + ICMP_HDR_LEN;
        frame[msg_kind_offset] = 0x42;
        let (class, _) = decode(&frame);
        assert_eq!(class, Classification::PixelflutV6);
    }

    #[rstest]
    #[case(0, 0, 1, 2, 3)]
    #[case(1920, 1080, 0xff, 0xff, 0xff)]
    #[case(42, 7, 0, 0, 0)]
    fn roundtrip_pingxelflut(#[case] x: u16, #[case] y: u16, #[case] r: u8, #[case] g: u8, #[case] b: u8) {
        let frame = pingxelflut_v6_frame(x, y, r, g, b);
        let (_, pixel) = decode(&frame);
        let pixel = pixel.unwrap();
        assert_eq!((pixel.x, pixel.y), (x, y));
        assert_eq!(pixel.rgba & 0x00ff_ffff, pixel.rgba);
    }

    #[test]
    fn cursor_wraps_with_period_width_times_height() {
        let mut cursor = PacketCursor::new(2, 2);
        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(cursor.position());
            cursor.advance();
        }
        assert_eq!(
            seen,
            vec![(0, 0), (1, 0), (0, 1), (1, 1), (0, 0)]
        );
    }
}
