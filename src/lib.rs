//! # ugoira
//!
//! Convert a pixiv "ugoira" — an animation shipped as a ZIP archive of
//! still images plus a JSON manifest of per-frame delays in milliseconds —
//! into a single H.264/MP4 video, powered by FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate.
//!
//! Stills are decoded straight out of the archive through a pull-based
//! byte callback (nothing is unpacked to disk), the output frame rate is
//! derived from the GCD of the frame delays bounded by a caller-supplied
//! ceiling, and one persistent encoder consumes every rescaled picture
//! with monotonically increasing timestamps — repeating a picture as many
//! times as its delay requires at the uniform output rate.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::collections::HashMap;
//!
//! use ugoira::{convert_ugoira_to_mp4, EncodeOptions, FrameList};
//!
//! let frames = FrameList::from_json_file("74841737_frames.json")?;
//!
//! let mut options = EncodeOptions::new();
//! options.set("crf", "18").set("preset", "slow");
//!
//! let mut metadata = HashMap::new();
//! metadata.insert("title".to_string(), "動く nachoneko :3".to_string());
//!
//! convert_ugoira_to_mp4(
//!     "74841737_ugoira600x600.zip",
//!     "74841737.mp4",
//!     &frames,
//!     60.0,
//!     &options,
//!     &metadata,
//! )?;
//! # Ok::<(), ugoira::UgoiraError>(())
//! ```
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system; H.264
//! output prefers libx264 and falls back to any available H.264 encoder.

mod archive;
mod convert;
mod decode;
mod encode;
pub mod error;
pub mod ffmpeg;
pub mod frames;
pub mod options;
pub mod plan;
mod scale;
mod source;
mod timing;

pub use convert::convert_ugoira_to_mp4;
pub use error::UgoiraError;
pub use ffmpeg::{get_ffmpeg_log_level, set_ffmpeg_log_level, FfmpegLogLevel};
pub use frames::{Frame, FrameList};
pub use options::{EncodeOptions, X264Profile};
pub use plan::FramePlan;
