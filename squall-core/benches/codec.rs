use criterion::{criterion_group, criterion_main, Criterion};
use squall_core::codec::{self, PingxelflutAddresses, PixelflutV6Addresses};

const WIDTH: u16 = 1920;
const HEIGHT: u16 = 1080;

fn pixelflut_v6_frame(x: u16, y: u16) -> Vec<u8> {
    let addrs = PixelflutV6Addresses {
        src_mac: [0x14, 0xa0, 0xf8, 0x8b, 0x1e, 0xe3],
        dst_mac: [0x14, 0xa0, 0xf8, 0x8b, 0x1e, 0xe4],
        src_addr: [0xfe, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1],
        dst_prefix: [0xfe, 0x80, 0, 0, 0, 0, 0, 0],
    };
    let mut buf = vec![0u8; codec::MIN_ETHERNET_FRAME_LEN];
    let len = codec::encode_pixelflut_v6(&mut buf, &addrs, x, y, 0x00ff00ff);
    buf.truncate(len);
    buf
}

fn pingxelflut_v6_frame(x: u16, y: u16) -> Vec<u8> {
    let addrs = PingxelflutAddresses {
        src_mac: [0x14, 0xa0, 0xf8, 0x8b, 0x1e, 0xe3],
        dst_mac: [0x14, 0xa0, 0xf8, 0x8b, 0x1e, 0xe4],
        src_addr: [0xfe, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1],
        dst_addr: [0xfe, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2],
    };
    let mut buf = vec![0u8; codec::MIN_ETHERNET_FRAME_LEN];
    let len = codec::encode_pingxelflut_v6(&mut buf, &addrs, x, y, 0x00ff00ff);
    buf.truncate(len);
    buf
}

fn decode_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    let frames: Vec<_> = (0..WIDTH).map(|x| pixelflut_v6_frame(x, HEIGHT / 2)).collect();
    group.bench_function("pixelflut_v6", |b| {
        b.iter(|| {
            for frame in &frames {
                std::hint::black_box(codec::decode(frame));
            }
        })
    });

    let frames: Vec<_> = (0..WIDTH).map(|x| pingxelflut_v6_frame(x, HEIGHT / 2)).collect();
    group.bench_function("pingxelflut_v6", |b| {
        b.iter(|| {
            for frame in &frames {
                std::hint::black_box(codec::decode(frame));
            }
        })
    });

    group.finish();
}

fn encode_throughput(c: &mut Criterion) {
    let addrs = PixelflutV6Addresses {
        src_mac: [0x14, 0xa0, 0xf8, 0x8b, 0x1e, 0xe3],
        dst_mac: [0x14, 0xa0, 0xf8, 0x8b, 0x1e, 0xe4],
        src_addr: [0xfe, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1],
        dst_prefix: [0xfe, 0x80, 0, 0, 0, 0, 0, 0],
    };
    let mut buf = vec![0u8; codec::MIN_ETHERNET_FRAME_LEN];
    let mut cursor = codec::PacketCursor::new(WIDTH, HEIGHT);

    c.bench_function("encode_pixelflut_v6", |b| {
        b.iter(|| {
            let (x, y) = cursor.position();
            codec::encode_pixelflut_v6(&mut buf, &addrs, x, y, 0x00ff00ff);
            cursor.advance();
            std::hint::black_box(&buf);
        })
    });
}

criterion_group!(benches, decode_throughput, encode_throughput);
criterion_main!(benches);
