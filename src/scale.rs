//! Pixel-format and size conversion between decoder and encoder.
//!
//! The encoder's target format and dimensions are fixed by the first
//! frame, but each entry may decode to a different source format. The
//! converter is rebuilt only when the source parameters actually change;
//! the destination picture is allocated once and reused, made writable
//! before every scale because the encoder may still hold references to
//! the previous contents.

use ffmpeg_next::{
    format::Pixel,
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};

use crate::{decode::DecodedFrame, error::UgoiraError};

/// A bilinear converter cached on `(src_pixfmt, src_w, src_h)`.
pub(crate) struct ScalerCache {
    converter: Option<ScalingContext>,
    src_format: Pixel,
    src_width: u32,
    src_height: u32,
    dst_format: Pixel,
    dst_width: u32,
    dst_height: u32,
}

impl ScalerCache {
    /// Create a cache targeting the encoder's format and dimensions. The
    /// converter itself is built on first use.
    pub(crate) fn new(dst_format: Pixel, dst_width: u32, dst_height: u32) -> Self {
        Self {
            converter: None,
            src_format: Pixel::None,
            src_width: 0,
            src_height: 0,
            dst_format,
            dst_width,
            dst_height,
        }
    }

    /// Convert `decoded` into `output`, rebuilding the converter if the
    /// source parameters changed since the previous frame.
    ///
    /// # Errors
    ///
    /// - [`UgoiraError::UnableScale`] if a converter cannot be created.
    /// - [`UgoiraError::Ffmpeg`] if the scale itself fails.
    pub(crate) fn scale(
        &mut self,
        decoded: &DecodedFrame,
        output: &mut VideoFrame,
    ) -> Result<(), UgoiraError> {
        let changed = decoded.pixel_format != self.src_format
            || decoded.width != self.src_width
            || decoded.height != self.src_height;
        if self.converter.is_none() || changed {
            log::debug!(
                "Building scaler: {:?} {}x{} -> {:?} {}x{}",
                decoded.pixel_format,
                decoded.width,
                decoded.height,
                self.dst_format,
                self.dst_width,
                self.dst_height,
            );
            let converter = ScalingContext::get(
                decoded.pixel_format,
                decoded.width,
                decoded.height,
                self.dst_format,
                self.dst_width,
                self.dst_height,
                ScalingFlags::BILINEAR,
            )
            .map_err(|_| UgoiraError::UnableScale)?;
            self.converter = Some(converter);
            self.src_format = decoded.pixel_format;
            self.src_width = decoded.width;
            self.src_height = decoded.height;
        }

        // SAFETY: `output` wraps a valid AVFrame; making it writable
        // re-allocates the data buffers if the encoder still references
        // the old ones, so the scale below never mutates shared pixels.
        let err = unsafe { ffmpeg_sys_next::av_frame_make_writable(output.as_mut_ptr()) };
        if err < 0 {
            return Err(ffmpeg_next::Error::from(err).into());
        }

        match &mut self.converter {
            Some(converter) => Ok(converter.run(&decoded.picture, output)?),
            None => Err(UgoiraError::UnableScale),
        }
    }
}
