//! The H.264/MP4 encoder stage.
//!
//! One [`Mp4Encoder`] lives for the whole conversion: a single libx264
//! (or fallback H.264) encoder feeding a single video stream in an MP4
//! muxer. It is constructed lazily, once the first frame has been decoded
//! and the output dimensions and pixel format are known, and flushed
//! exactly once at end of input.

use std::{collections::HashMap, path::Path};

use ffmpeg_next::{
    codec::{context::Context as CodecContext, Codec, Id},
    encoder,
    format::{self, context::Output, Flags as FormatFlags, Pixel},
    frame::Video as VideoFrame,
    Dictionary, Packet, Rational,
};

use crate::{
    decode::DecodedFrame, error::UgoiraError, options::EncodeOptions, plan::FramePlan,
};

/// Encoder and stream time base: microsecond ticks (`1 / AV_TIME_BASE`).
const MICROSECOND_TIME_BASE: Rational = Rational(1, 1_000_000);

/// Locate the output codec: libx264 by name first, then any H.264
/// encoder.
fn find_h264_encoder() -> Option<Codec> {
    encoder::find_by_name("libx264").or_else(|| encoder::find(Id::H264))
}

/// Pick the output pixel format: forced 4:2:0 when requested, the
/// decoder's own format when the encoder supports it, 4:2:0 otherwise.
fn select_pixel_format(decoded: Pixel, codec: Codec, force_yuv420p: bool) -> Pixel {
    if force_yuv420p {
        return Pixel::YUV420P;
    }
    let supported = codec
        .video()
        .ok()
        .and_then(|video| video.formats().map(|formats| formats.collect::<Vec<_>>()))
        .unwrap_or_default();
    if supported.contains(&decoded) {
        decoded
    } else {
        Pixel::YUV420P
    }
}

/// A persistent H.264 encoder bound to one MP4 output.
pub(crate) struct Mp4Encoder {
    output: Output,
    encoder: encoder::Video,
    stream_index: usize,
    stream_time_base: Rational,
    dst_format: Pixel,
    dst_width: u32,
    dst_height: u32,
}

impl Mp4Encoder {
    /// Open the MP4 muxer and the H.264 encoder, configured from the
    /// first decoded frame and the planner's rate, and write the
    /// container header.
    ///
    /// # Errors
    ///
    /// - [`UgoiraError::NoAvailableEncoder`] if no H.264 encoder exists.
    /// - [`UgoiraError::OpenFile`] if the destination cannot be created.
    /// - [`UgoiraError::InvalidCrf`] for an out-of-range `crf` option.
    /// - [`UgoiraError::Ffmpeg`] for encoder/muxer failures.
    pub(crate) fn open(
        dest: &Path,
        plan: &FramePlan,
        first: &DecodedFrame,
        options: &EncodeOptions,
        metadata: &HashMap<String, String>,
    ) -> Result<Self, UgoiraError> {
        let codec = find_h264_encoder().ok_or(UgoiraError::NoAvailableEncoder)?;
        let dst_format = select_pixel_format(first.pixel_format, codec, options.force_yuv420p());

        let mut output =
            format::output_as(&dest, "mp4").map_err(|error| UgoiraError::OpenFile {
                path: dest.to_path_buf(),
                reason: error.to_string(),
            })?;

        if !metadata.is_empty() {
            let mut tags = Dictionary::new();
            for (key, value) in metadata {
                tags.set(key, value);
            }
            output.set_metadata(tags);
        }

        let global_header = output.format().flags().contains(FormatFlags::GLOBAL_HEADER);

        let mut stream = output.add_stream(codec)?;
        let stream_index = stream.index();

        let mut video = CodecContext::from_parameters(stream.parameters())?
            .encoder()
            .video()?;
        video.set_width(first.width);
        video.set_height(first.height);
        video.set_aspect_ratio(first.aspect_ratio);
        video.set_format(dst_format);
        video.set_frame_rate(Some(plan.fps()));
        video.set_time_base(MICROSECOND_TIME_BASE);

        if global_header {
            // SAFETY: setting a codec flag on the not-yet-opened encoder
            // context, as required by muxers that carry codec parameters
            // in the container header.
            unsafe {
                (*video.as_mut_ptr()).flags |=
                    ffmpeg_sys_next::AV_CODEC_FLAG_GLOBAL_HEADER as i32;
            }
        }

        let mut x264_options = Dictionary::new();
        if codec.name() == "libx264" {
            x264_options.set("preset", options.preset());
            x264_options.set("crf", &options.crf()?.to_string());
            if let Some(level) = options.level() {
                x264_options.set("level", level);
            }
            if let Some(profile) = options.profile() {
                x264_options.set("profile", profile);
            }
        }

        let encoder = video.open_as_with(codec, x264_options)?;
        stream.set_parameters(&encoder);
        stream.set_time_base(MICROSECOND_TIME_BASE);

        // SAFETY: plain field writes on the muxer's stream before the
        // header is written; the safe wrapper exposes no setters for the
        // frame-rate fields.
        unsafe {
            let raw = stream.as_mut_ptr();
            (*raw).avg_frame_rate = plan.fps().into();
            (*raw).r_frame_rate = plan.fps().into();
        }

        output.write_header()?;

        // The muxer may settle on a different stream time base at header
        // time; the timing driver must use what it actually chose.
        let stream_time_base = output
            .stream(stream_index)
            .map(|stream| stream.time_base())
            .unwrap_or(MICROSECOND_TIME_BASE);

        log::info!(
            "Encoding {}x{} {:?} at {}/{} fps to {}",
            first.width,
            first.height,
            dst_format,
            plan.fps().numerator(),
            plan.fps().denominator(),
            dest.display(),
        );

        Ok(Self {
            output,
            encoder,
            stream_index,
            stream_time_base,
            dst_format,
            dst_width: first.width,
            dst_height: first.height,
        })
    }

    /// The stream time base chosen by the muxer.
    pub(crate) fn stream_time_base(&self) -> Rational {
        self.stream_time_base
    }

    /// Output pixel format the scaler must target.
    pub(crate) fn pixel_format(&self) -> Pixel {
        self.dst_format
    }

    /// Output width in pixels.
    pub(crate) fn width(&self) -> u32 {
        self.dst_width
    }

    /// Output height in pixels.
    pub(crate) fn height(&self) -> u32 {
        self.dst_height
    }

    /// Send one stamped picture to the encoder and write whatever packets
    /// it has ready. `EAGAIN` from the encoder just means it wants more
    /// input and is not an error.
    pub(crate) fn send(&mut self, picture: &VideoFrame) -> Result<(), UgoiraError> {
        self.encoder.send_frame(picture)?;
        self.drain()
    }

    /// Flush the encoder and write the container trailer. Consumes the
    /// encoder so it cannot be fed afterwards.
    pub(crate) fn finish(mut self) -> Result<(), UgoiraError> {
        self.encoder.send_eof()?;
        self.drain()?;
        self.output.write_trailer()?;
        Ok(())
    }

    fn drain(&mut self) -> Result<(), UgoiraError> {
        let mut packet = Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            packet.rescale_ts(MICROSECOND_TIME_BASE, self.stream_time_base);
            packet.write_interleaved(&mut self.output)?;
        }
        Ok(())
    }
}
