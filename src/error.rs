//! Error types for the `ugoira` crate.
//!
//! This module defines [`UgoiraError`], the unified error type returned by
//! all fallible operations in the crate. Each variant corresponds to one of
//! the conversion failure kinds the CLI reports as its exit status; archive
//! failures carry the structured [`zip::result::ZipError`] and FFmpeg
//! failures keep their raw negative `AVERROR` code intact.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use thiserror::Error;
use zip::result::ZipError;

/// The unified error type for all `ugoira` operations.
///
/// Every public method that can fail returns `Result<T, UgoiraError>`.
/// [`code`](UgoiraError::code) maps a value onto the stable numeric code
/// used as the CLI's process exit status.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UgoiraError {
    /// The source archive could not be opened or read.
    ///
    /// Carries the archive library's structured error; callers own the
    /// payload and may match on it (e.g. [`ZipError::FileNotFound`]).
    #[error("Archive error: {0}")]
    Archive(#[from] ZipError),

    /// `max_fps` was zero, negative, or not a finite number.
    #[error("Invalid max fps: {0}")]
    InvalidMaxFps(f32),

    /// The frame list was empty, or a record had an empty file name or a
    /// non-positive delay.
    #[error("Invalid frames")]
    InvalidFrames,

    /// The `crf` option was not an integer in `[0, 51]`.
    #[error("Invalid crf: {0:?}")]
    InvalidCrf(String),

    /// A pre-existing output file could not be removed.
    #[error("Cannot remove output file: {0}")]
    RemoveOutputFile(#[source] IoError),

    /// A media-library allocation returned null.
    #[error("Out of memory")]
    OutOfMemory,

    /// An archive entry contained no video stream.
    #[error("No video stream available in the file")]
    NoVideoStream,

    /// No decoder is available for an entry's codec.
    #[error("No available decoder")]
    NoAvailableDecoder,

    /// No H.264 encoder is available.
    #[error("No available encoder")]
    NoAvailableEncoder,

    /// A file could not be opened.
    #[error("Failed to open file at {path}: {reason}")]
    OpenFile {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// A pixel-format converter could not be created.
    #[error("Unable to scale image")]
    UnableScale,

    /// The frame manifest was not valid JSON of the expected shape.
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// An error originating from the FFmpeg libraries, preserved as its
    /// negative `AVERROR` code.
    #[error("FFmpeg error: {0}")]
    Ffmpeg(#[from] FfmpegError),
}

impl UgoiraError {
    /// Stable numeric code for this error, used as the CLI exit status.
    ///
    /// Domain kinds use the codes `2..=13` (code `1` belonged to a
    /// null-pointer kind that cannot occur here and stays reserved);
    /// FFmpeg errors return their negative `AVERROR` value verbatim.
    pub fn code(&self) -> i32 {
        match self {
            UgoiraError::Archive(_) => 2,
            UgoiraError::InvalidMaxFps(_) => 3,
            UgoiraError::InvalidFrames => 4,
            UgoiraError::InvalidCrf(_) => 5,
            UgoiraError::RemoveOutputFile(_) => 6,
            UgoiraError::OutOfMemory => 7,
            UgoiraError::NoVideoStream => 8,
            UgoiraError::NoAvailableDecoder => 9,
            UgoiraError::NoAvailableEncoder => 10,
            UgoiraError::OpenFile { .. } => 11,
            UgoiraError::UnableScale => 12,
            UgoiraError::Json(_) => 13,
            UgoiraError::Ffmpeg(error) => (*error).into(),
        }
    }
}
