//! The frame list: ordered `(file, delay)` records describing an animation.
//!
//! A ugoira animation is a ZIP of still images plus a manifest that assigns
//! every still a display duration in milliseconds. [`FrameList`] carries
//! that manifest in insertion order; it is built once — either with
//! [`append`](FrameList::append) or straight from the JSON manifest — and
//! read-only afterwards.
//!
//! # Example
//!
//! ```
//! use ugoira::FrameList;
//!
//! let frames = FrameList::from_json_str(
//!     r#"[{"file": "000000.jpg", "delay": 70}, {"file": "000001.jpg", "delay": 70}]"#,
//! ).unwrap();
//! assert_eq!(frames.len(), 2);
//! ```

use std::{fs, path::Path};

use serde::Deserialize;

use crate::error::UgoiraError;

/// One animation frame: an archive entry name and its display duration.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    file: String,
    delay: f32,
}

impl Frame {
    /// Name of the archive entry holding this frame's still image.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Display duration in milliseconds. Always strictly positive.
    pub fn delay(&self) -> f32 {
        self.delay
    }
}

/// Shape of one manifest record: `{"file": string, "delay": number}`.
#[derive(Deserialize)]
struct ManifestFrame {
    file: String,
    delay: f32,
}

/// Ordered, owned sequence of animation frames.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameList {
    frames: Vec<Frame>,
}

impl FrameList {
    /// Create an empty frame list.
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Append a frame record.
    ///
    /// # Errors
    ///
    /// Returns [`UgoiraError::InvalidFrames`] if `file` is empty or `delay`
    /// is not strictly positive.
    pub fn append<S: Into<String>>(&mut self, file: S, delay: f32) -> Result<(), UgoiraError> {
        let file = file.into();
        if file.is_empty() || !(delay > 0.0) {
            return Err(UgoiraError::InvalidFrames);
        }
        self.frames.push(Frame { file, delay });
        Ok(())
    }

    /// Build a frame list from a JSON manifest string.
    ///
    /// The manifest is an array of `{"file": string, "delay": number}`
    /// objects, with `delay` in milliseconds.
    ///
    /// # Errors
    ///
    /// - [`UgoiraError::Json`] if the text is not JSON of that shape.
    /// - [`UgoiraError::InvalidFrames`] if a record fails validation.
    pub fn from_json_str(text: &str) -> Result<Self, UgoiraError> {
        let records: Vec<ManifestFrame> = serde_json::from_str(text)?;
        let mut list = Self::new();
        for record in records {
            list.append(record.file, record.delay)?;
        }
        Ok(list)
    }

    /// Build a frame list from a JSON manifest file.
    ///
    /// # Errors
    ///
    /// [`UgoiraError::OpenFile`] if the file cannot be read, plus the
    /// errors of [`from_json_str`](FrameList::from_json_str).
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, UgoiraError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|error| UgoiraError::OpenFile {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;
        Self::from_json_str(&text)
    }

    /// Number of frames in the list.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// `true` if the list holds no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Iterate the frames in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }

    /// `true` if every record has a non-empty file name and a positive
    /// delay. `append` enforces this on entry, so a list built through the
    /// public API always validates.
    pub fn is_valid(&self) -> bool {
        !self.frames.is_empty()
            && self
                .frames
                .iter()
                .all(|frame| !frame.file.is_empty() && frame.delay > 0.0)
    }
}

impl<'a> IntoIterator for &'a FrameList {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}
