use std::sync::atomic::AtomicU32;

use super::{FrameBuffer, PIXEL_ORDERING};

/// Heap-backed framebuffer used by tests, benchmarks, and local runs without a shared-memory
/// segment (e.g. `--shared-memory-name` omitted).
pub struct SimpleFrameBuffer {
    width: u16,
    height: u16,
    pixels: Box<[AtomicU32]>,
}

impl SimpleFrameBuffer {
    pub fn new(width: u16, height: u16) -> Self {
        let num_pixels = width as usize * height as usize;
        let pixels = (0..num_pixels).map(|_| AtomicU32::new(0)).collect();

        Self {
            width,
            height,
            pixels,
        }
    }
}

impl FrameBuffer for SimpleFrameBuffer {
    #[inline(always)]
    fn width(&self) -> u16 {
        self.width
    }

    #[inline(always)]
    fn height(&self) -> u16 {
        self.height
    }

    #[inline(always)]
    fn set(&self, x: u16, y: u16, rgba: u32) {
        if x < self.width && y < self.height {
            let index = x as usize + y as usize * self.width as usize;
            // Safe: bounds checked above.
            unsafe { self.pixels.get_unchecked(index) }.store(rgba, PIXEL_ORDERING);
        }
    }

    #[inline(always)]
    unsafe fn get_unchecked(&self, x: u16, y: u16) -> u32 {
        let index = x as usize + y as usize * self.width as usize;
        unsafe { self.pixels.get_unchecked(index) }.load(PIXEL_ORDERING)
    }

    fn as_bytes(&self) -> &[u8] {
        let ptr = self.pixels.as_ptr() as *const u8;
        // AtomicU32 has the same layout/alignment as u32, so this reinterpretation is sound.
        unsafe { std::slice::from_raw_parts(ptr, self.pixels.len() * super::FB_BYTES_PER_PIXEL) }
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn fb() -> SimpleFrameBuffer {
        // Keep it small so tests can walk every pixel cheaply.
        SimpleFrameBuffer::new(640, 480)
    }

    #[rstest]
    #[case(0, 0, 0)]
    #[case(0, 0, 0xff0000)]
    #[case(0, 0, 0x0000ff)]
    #[case(639, 479, 0x12345678)]
    fn test_roundtrip(fb: SimpleFrameBuffer, #[case] x: u16, #[case] y: u16, #[case] rgba: u32) {
        fb.set(x, y, rgba);
        assert_eq!(fb.get(x, y), Some(rgba));
    }

    #[rstest]
    fn test_out_of_bounds_get(fb: SimpleFrameBuffer) {
        assert_eq!(fb.get(640, 0), None);
        assert_eq!(fb.get(0, 480), None);
        assert_eq!(fb.get(u16::MAX, u16::MAX), None);
    }

    #[rstest]
    fn test_out_of_bounds_set_is_a_noop(fb: SimpleFrameBuffer) {
        let before = fb.as_bytes().to_vec();
        fb.set(fb.width(), 0, 0xffffff);
        fb.set(0, fb.height(), 0xffffff);
        assert_eq!(fb.as_bytes(), before.as_slice());
    }

    #[rstest]
    fn test_last_writer_wins_is_idempotent(fb: SimpleFrameBuffer) {
        for _ in 0..3 {
            fb.set(5, 10, 0x00_7f_00_ff);
        }
        assert_eq!(fb.get(5, 10), Some(0x00_7f_00_ff));
    }
}
