//! Output frame-rate planning.
//!
//! Per-frame delays in a ugoira are arbitrary millisecond values, but the
//! output stream runs at one fixed rate. [`FramePlan`] derives that rate
//! from the GCD of the (integer-rounded) delays: when every delay is the
//! same the encoder emits one picture per source frame, and when delays
//! are unequal multiples of some common divisor the timing driver repeats
//! pictures proportionally at the uniform rate.

use ffmpeg_next::Rational;

use crate::{error::UgoiraError, frames::FrameList};

/// Microsecond resolution carried by the fps rational (`AV_TIME_BASE`).
const TIME_BASE_UNITS: i32 = ffmpeg_sys_next::AV_TIME_BASE as i32;

/// The output frame rate and its reciprocal time base, computed once
/// before encoding starts and immutable thereafter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramePlan {
    fps: Rational,
    time_base: Rational,
}

impl FramePlan {
    /// Derive the output rate for `frames`, bounded above by `max_fps`.
    ///
    /// The natural rate is `1000 / g` where `g` is the GCD of all delays
    /// rounded to the nearest integer millisecond; the chosen rate is the
    /// smaller of the natural rate and `max_fps`, represented as the
    /// rational `round(chosen * 1_000_000) / 1_000_000`.
    ///
    /// # Errors
    ///
    /// - [`UgoiraError::InvalidMaxFps`] if `max_fps` is not a positive
    ///   finite number.
    /// - [`UgoiraError::InvalidFrames`] if the list is empty or invalid.
    pub fn new(frames: &FrameList, max_fps: f32) -> Result<Self, UgoiraError> {
        if !max_fps.is_finite() || max_fps <= 0.0 {
            return Err(UgoiraError::InvalidMaxFps(max_fps));
        }
        if !frames.is_valid() {
            return Err(UgoiraError::InvalidFrames);
        }

        let chosen = natural_fps(frames).map_or(max_fps as f64, |natural| {
            natural.min(max_fps as f64)
        });

        // `as i32` saturates, which keeps absurd caps finite instead of UB.
        let num = (chosen * TIME_BASE_UNITS as f64 + 0.5) as i32;
        Ok(Self {
            fps: Rational::new(num, TIME_BASE_UNITS),
            time_base: Rational::new(TIME_BASE_UNITS, num),
        })
    }

    /// The chosen output frame rate as a rational.
    pub fn fps(&self) -> Rational {
        self.fps
    }

    /// Reciprocal of [`fps`](FramePlan::fps): the duration of one output
    /// tick.
    pub fn time_base(&self) -> Rational {
        self.time_base
    }

    /// The chosen rate as a float, for display.
    pub fn fps_value(&self) -> f64 {
        f64::from(self.fps)
    }
}

/// `1000 / gcd(delays)`, or `None` when every delay rounds to zero
/// milliseconds and the natural rate is unbounded.
fn natural_fps(frames: &FrameList) -> Option<f64> {
    let g = frames
        .iter()
        .map(|frame| frame.delay().round() as u64)
        .fold(0, gcd);
    (g != 0).then(|| 1000.0 / g as f64)
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}
