//! Presentation-timestamp scheduling.
//!
//! Source frames carry millisecond delays while the output stream runs at
//! the planner's fixed rate, so a single decoded picture may need to be
//! sent to the encoder several times to cover its delay. [`TimingDriver`]
//! keeps the running `pts` / `max_de` pair and yields the stamps for each
//! source frame; [`rescale_q_rnd`] is the rational rescale it is built on.

use ffmpeg_next::Rational;

/// Rescale `value` from time base `src` to time base `dst`, rounding half
/// away from zero. The `i64` sentinel extremes pass through unchanged, so
/// FFmpeg's "no timestamp" values survive the conversion.
pub(crate) fn rescale_q_rnd(value: i64, src: Rational, dst: Rational) -> i64 {
    if value == i64::MIN || value == i64::MAX {
        return value;
    }
    let num = i128::from(value) * i128::from(src.numerator()) * i128::from(dst.denominator());
    let den = i128::from(src.denominator()) * i128::from(dst.numerator());
    let quotient = (num.abs() + den.abs() / 2) / den.abs();
    let quotient = if (num < 0) != (den < 0) {
        -quotient
    } else {
        quotient
    };
    quotient as i64
}

/// Emits monotonically increasing presentation timestamps, repeating each
/// source picture as many times as its delay requires.
///
/// `pts` is the next stamp to hand out and `max_de` the cumulative target;
/// both start at zero and only grow. Per source frame the caller invokes
/// [`begin_frame`](TimingDriver::begin_frame) with the frame's delay and
/// then drains [`next_pts`](TimingDriver::next_pts), stamping and sending
/// the same rescaled picture once per returned value.
#[derive(Debug)]
pub(crate) struct TimingDriver {
    pts: i64,
    max_de: i64,
    /// One output tick (the planner's time base) expressed in the stream
    /// time base.
    step: i64,
    /// Millisecond time base → stream time base conversion, kept as
    /// rationals so each delay rescales exactly once.
    stream_time_base: Rational,
}

/// Delays arrive in milliseconds.
const MILLISECONDS: Rational = Rational(1, 1000);

impl TimingDriver {
    /// `plan_time_base` is the reciprocal of the chosen output rate;
    /// `stream_time_base` is the muxer's actual stream time base, read
    /// after the container header is written.
    pub(crate) fn new(plan_time_base: Rational, stream_time_base: Rational) -> Self {
        Self {
            pts: 0,
            max_de: 0,
            step: rescale_q_rnd(1, plan_time_base, stream_time_base),
            stream_time_base,
        }
    }

    /// Extend the target by one source frame's delay (nearest-integer
    /// milliseconds).
    pub(crate) fn begin_frame(&mut self, delay_ms: f32) {
        let delay = delay_ms.round() as i64;
        self.max_de += rescale_q_rnd(delay, MILLISECONDS, self.stream_time_base);
    }

    /// The next stamp for the current picture, or `None` once its delay
    /// interval is covered.
    pub(crate) fn next_pts(&mut self) -> Option<i64> {
        if self.pts < self.max_de {
            let pts = self.pts;
            self.pts += self.step;
            Some(pts)
        } else {
            None
        }
    }
}
