use std::sync::atomic::AtomicU32;

use shared_memory::{Shmem, ShmemConf, ShmemError};
use tracing::{info, instrument, warn};

use super::{Error, FrameBuffer, PIXEL_ORDERING};
use crate::stats::PortStatsTable;

/// Width and height, both `u16`, padded out to an 8-byte boundary so the `PortStatsTable`
/// (all `AtomicU64` fields) that follows is correctly aligned.
const HEADER_BYTES: usize = 8;

/// Byte offset of the `PortStatsTable` within the segment.
const STATS_TABLE_OFFSET: usize = HEADER_BYTES;

/// Byte offset of the pixel plane within the segment. Renderers should only ever read from
/// this offset onward.
const PIXEL_PLANE_OFFSET: usize = STATS_TABLE_OFFSET + PortStatsTable::BYTE_SIZE;

unsafe impl Send for SharedMemoryFrameBuffer {}
unsafe impl Sync for SharedMemoryFrameBuffer {}

pub struct SharedMemoryFrameBuffer {
    width: u16,
    height: u16,
    /// Pixels actually reachable inside the mapping, which may be fewer than `width * height`
    /// when an existing, differently-sized segment was attached instead of created.
    capacity_pixels: usize,
    pixels: *const AtomicU32,
    stats: *const PortStatsTable,

    /// Kept alive so the mapping is not torn down; never read after construction.
    #[allow(unused)]
    shared_memory: Shmem,
}

impl SharedMemoryFrameBuffer {
    #[instrument(skip(name))]
    pub fn create_or_attach(width: u16, height: u16, name: &str) -> Result<Self, Error> {
        let pixel_bytes = width as usize * height as usize * super::FB_BYTES_PER_PIXEL;
        let target_size = PIXEL_PLANE_OFFSET + pixel_bytes;

        let shared_memory = match ShmemConf::new().os_id(name).size(target_size).create() {
            Ok(shmem) => shmem,
            Err(ShmemError::LinkExists | ShmemError::MappingIdExists) => {
                ShmemConf::new().os_id(name).open().map_err(|source| Error::Open {
                    name: name.to_owned(),
                    source,
                })?
            }
            Err(source) => {
                return Err(Error::Open {
                    name: name.to_owned(),
                    source,
                });
            }
        };

        let actual_size = shared_memory.len();
        // An existing segment of the wrong size is used as-is, never resized in place; the
        // operator must unlink it to change resolution. We still clamp what we touch to what is
        // actually mapped, so a too-small segment loses pixels rather than reading past the end.
        let capacity_pixels = actual_size.saturating_sub(PIXEL_PLANE_OFFSET) / super::FB_BYTES_PER_PIXEL;
        if actual_size != target_size {
            warn!(
                name,
                width,
                height,
                expected_bytes = target_size,
                actual_bytes = actual_size,
                capacity_pixels,
                "existing shared memory has the wrong size for this resolution; attaching anyway"
            );
        } else {
            info!(name, actual_size, "attached shared memory framebuffer");
        }

        let base = shared_memory.as_ptr();
        // Safety: `base` is valid for `actual_size` bytes for the lifetime of `shared_memory`,
        // which we keep alive inside `Self`. `stats`/the header are only written when the
        // segment is at least large enough to hold them; `pixels` is only ever indexed up to
        // `capacity_pixels`, which is derived from `actual_size` above.
        let stats = if actual_size >= PIXEL_PLANE_OFFSET {
            unsafe { base.add(STATS_TABLE_OFFSET) as *const PortStatsTable }
        } else {
            std::ptr::null()
        };
        let pixels = unsafe { base.add(PIXEL_PLANE_OFFSET.min(actual_size)) } as *const AtomicU32;

        if actual_size >= HEADER_BYTES {
            unsafe {
                let header = base as *mut u16;
                header.write_unaligned(width);
                header.add(1).write_unaligned(height);
            }
        }

        Ok(Self {
            width,
            height,
            capacity_pixels,
            pixels,
            stats,
            shared_memory,
        })
    }

    #[inline(always)]
    fn index(&self, x: u16, y: u16) -> Option<usize> {
        let index = x as usize + y as usize * self.width as usize;
        (index < self.capacity_pixels).then_some(index)
    }
}

impl FrameBuffer for SharedMemoryFrameBuffer {
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
            if let Some(index) = self.index(x, y) {
                // Safety: `index < capacity_pixels`, which is how many `AtomicU32` cells fit in
                // the mapped segment starting at `pixels`.
                unsafe { &*self.pixels.add(index) }.store(rgba, PIXEL_ORDERING);
            }
        }
    }

    #[inline(always)]
    unsafe fn get_unchecked(&self, x: u16, y: u16) -> u32 {
        match self.index(x, y) {
            // Safety: see `set`.
            Some(index) => unsafe { &*self.pixels.add(index) }.load(PIXEL_ORDERING),
            None => 0,
        }
    }

    fn as_bytes(&self) -> &[u8] {
        let len = self.capacity_pixels * super::FB_BYTES_PER_PIXEL;
        unsafe { std::slice::from_raw_parts(self.pixels as *const u8, len) }
    }

    /// The co-located `PortStats` table, if the mapped segment is large enough to hold one.
    fn stats(&self) -> Option<&PortStatsTable> {
        // Safety: non-null only when construction confirmed the mapping is at least
        // `PIXEL_PLANE_OFFSET` bytes, i.e. large enough for a full `PortStatsTable`.
        (!self.stats.is_null()).then(|| unsafe { &*self.stats })
    }
}
