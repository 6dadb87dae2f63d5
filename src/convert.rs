//! The ugoira → MP4 conversion pipeline.
//!
//! One pass over the frame list drives the whole pipeline: each archive
//! entry is demuxed through a pull-based byte callback, decoded with a
//! fresh per-entry decoder, rescaled into the encoder's format, and
//! emitted one or more times so its millisecond delay lands on the
//! planner's fixed output rate. A single H.264 encoder and MP4 muxer
//! persist across all frames.

use std::{collections::HashMap, fs, path::Path};

use ffmpeg_next::frame::Video as VideoFrame;

use crate::{
    archive::Archive,
    decode::{decode_first_frame, DecodedFrame},
    encode::Mp4Encoder,
    error::UgoiraError,
    frames::FrameList,
    options::EncodeOptions,
    plan::FramePlan,
    scale::ScalerCache,
    source::MediaSource,
    timing::TimingDriver,
};

/// Everything that outlives the per-frame loop: the encoder, the scaler
/// cache, the reusable destination picture, and the timing state. Built
/// lazily from the first decoded frame.
struct Pipeline {
    encoder: Mp4Encoder,
    scaler: ScalerCache,
    picture: VideoFrame,
    timing: TimingDriver,
}

impl Pipeline {
    /// Open the encoder against the first decoded frame and derive the
    /// long-lived scaler, destination picture, and timing state from it.
    fn build(
        dest: &Path,
        plan: &FramePlan,
        first: &DecodedFrame,
        options: &EncodeOptions,
        metadata: &HashMap<String, String>,
    ) -> Result<Self, UgoiraError> {
        let encoder = Mp4Encoder::open(dest, plan, first, options, metadata)?;
        let scaler = ScalerCache::new(encoder.pixel_format(), encoder.width(), encoder.height());
        let picture = VideoFrame::new(encoder.pixel_format(), encoder.width(), encoder.height());
        let timing = TimingDriver::new(plan.time_base(), encoder.stream_time_base());
        Ok(Self {
            encoder,
            scaler,
            picture,
            timing,
        })
    }
}

/// Convert the ugoira archive at `src` into an H.264/MP4 file at `dest`.
///
/// `frames` names each archive entry and its display duration in
/// milliseconds, in playback order. The output frame rate is
/// `min(1000 / gcd(delays), max_fps)`; pictures repeat as needed so every
/// delay is covered at that uniform rate. `options` tunes the encoder
/// (see [`EncodeOptions`]) and `metadata` is copied verbatim into the MP4
/// container.
///
/// A pre-existing `dest` is removed before conversion starts.
///
/// # Errors
///
/// Validation failures (`InvalidMaxFps`, `InvalidFrames`, `InvalidCrf`)
/// are reported before any resource is opened. Archive failures carry the
/// ZIP library's structured error; FFmpeg failures keep their negative
/// code. See [`UgoiraError`].
///
/// # Example
///
/// ```no_run
/// use std::collections::HashMap;
/// use ugoira::{convert_ugoira_to_mp4, EncodeOptions, FrameList};
///
/// let frames = FrameList::from_json_file("12345_frames.json")?;
/// let mut options = EncodeOptions::new();
/// options.set("crf", "23");
/// let metadata = HashMap::from([("title".to_string(), "ugoira".to_string())]);
/// convert_ugoira_to_mp4("12345_ugoira.zip", "12345.mp4", &frames, 60.0, &options, &metadata)?;
/// # Ok::<(), ugoira::UgoiraError>(())
/// ```
pub fn convert_ugoira_to_mp4<S: AsRef<Path>, D: AsRef<Path>>(
    src: S,
    dest: D,
    frames: &FrameList,
    max_fps: f32,
    options: &EncodeOptions,
    metadata: &HashMap<String, String>,
) -> Result<(), UgoiraError> {
    let src = src.as_ref();
    let dest = dest.as_ref();

    // All caller-fixable validation happens before any resource opens.
    let plan = FramePlan::new(frames, max_fps)?;
    options.crf()?;

    if dest.exists() {
        fs::remove_file(dest).map_err(UgoiraError::RemoveOutputFile)?;
    }

    ffmpeg_next::init()?;

    log::info!(
        "Converting {} ({} frames) to {} at {:.3} fps",
        src.display(),
        frames.len(),
        dest.display(),
        plan.fps_value(),
    );

    let mut archive = Archive::open(src)?;
    let mut pipeline: Option<Pipeline> = None;

    for frame in frames {
        log::debug!("Processing entry {} ({} ms)", frame.file(), frame.delay());

        // Per-frame state lives in this scope and unwinds in LIFO order:
        // decoder, demuxer, pull-callback source, then the entry handle.
        let mut entry = archive.entry(frame.file())?;
        let mut source = MediaSource::open(&mut entry)?;
        let decoded = decode_first_frame(&mut source)?;

        if pipeline.is_none() {
            pipeline = Some(Pipeline::build(dest, &plan, &decoded, options, metadata)?);
        }
        let stage = pipeline.as_mut().unwrap();

        stage.scaler.scale(&decoded, &mut stage.picture)?;

        stage.timing.begin_frame(frame.delay());
        while let Some(pts) = stage.timing.next_pts() {
            stage.picture.set_pts(Some(pts));
            stage.encoder.send(&stage.picture)?;
        }
    }

    match pipeline {
        Some(stage) => stage.encoder.finish()?,
        // Unreachable with a validated list, but a no-frame run must not
        // leave a half-written file behind.
        None => return Err(UgoiraError::InvalidFrames),
    }

    log::info!("Finished {}", dest.display());
    Ok(())
}
