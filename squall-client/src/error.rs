#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("failed to read image {path:?}")]
    Load {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("image {path:?} is {width}x{height}, too large to address as 16-bit pixel coordinates")]
    TooLarge { path: String, width: u32, height: u32 },
}
