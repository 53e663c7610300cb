//! Album-art palette derivation: download, decode, quantize, pick swatches.

use std::time::Duration;

use livesync_core::ComputeError;
use livesync_engine::Deriver;

use crate::client::map_reqwest_error;
use crate::palette::{ColorSwatch, Rgb, quantize};

/// Decoded images are shrunk to at most this edge before quantization.
const THUMBNAIL_EDGE: u32 = 128;

pub struct AlbumArtDeriver {
    http: reqwest::Client,
    timeout: Duration,
    max_colors: usize,
    ignore_limits: bool,
}

impl AlbumArtDeriver {
    pub fn new(timeout: Duration, max_colors: usize) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            timeout,
            max_colors,
            ignore_limits: true,
        })
    }

    #[must_use]
    pub fn with_ignore_limits(mut self, ignore_limits: bool) -> Self {
        self.ignore_limits = ignore_limits;
        self
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, ComputeError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ComputeError::from(map_reqwest_error(e, self.timeout)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ComputeError::Fetch(format!("{url}: {status}")));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ComputeError::from(map_reqwest_error(e, self.timeout)))?;
        Ok(bytes.to_vec())
    }
}

impl Deriver for AlbumArtDeriver {
    type Artifact = ColorSwatch;

    async fn derive(&self, url: &str) -> Result<ColorSwatch, ComputeError> {
        let bytes = self.fetch_image(url).await?;
        tracing::debug!(url, bytes = bytes.len(), "album art downloaded");

        let (max_colors, ignore_limits) = (self.max_colors, self.ignore_limits);
        tokio::task::spawn_blocking(move || {
            let pixels = decode_pixels(&bytes)?;
            let colors = quantize(&pixels, max_colors);
            Ok(ColorSwatch::from_colors(&colors, ignore_limits))
        })
        .await
        .map_err(|e| ComputeError::Worker(e.to_string()))?
    }
}

/// Decode an encoded image (png, jpeg, webp) into downscaled RGB pixels.
pub fn decode_pixels(bytes: &[u8]) -> Result<Vec<Rgb>, ComputeError> {
    let image = image::load_from_memory(bytes).map_err(|e| ComputeError::Decode(e.to_string()))?;
    let image = if image.width() > THUMBNAIL_EDGE || image.height() > THUMBNAIL_EDGE {
        image.thumbnail(THUMBNAIL_EDGE, THUMBNAIL_EDGE)
    } else {
        image
    };
    let rgb = image.to_rgb8();
    Ok(rgb.pixels().map(|p| Rgb::new(p[0], p[1], p[2])).collect())
}
