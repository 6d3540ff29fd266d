//! Progress estimation
//!
//! Pure functions of `(completed, total, elapsed)`. The runner owns the
//! counter and the clock and asks for a fresh [`Estimate`] on every
//! completion.

use std::fmt;
use std::time::Duration;

/// Default status line width; redraws pad to it so nothing of a longer
/// previous line survives a carriage return.
pub const STATUS_LINE_WIDTH: usize = 100;

/// Projected time remaining
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eta {
    /// Nothing has completed yet, so there is no rate to project from
    Unknown,
    Seconds(u64),
}

impl fmt::Display for Eta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Eta::Unknown => f.write_str("? s"),
            Eta::Seconds(secs) => f.write_str(&format_duration(*secs)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Estimate {
    /// Whole percent complete, 0..=100
    pub percent: u8,
    pub eta: Eta,
}

/// Estimate progress after `completed` of `total` tasks finished in `elapsed`.
///
/// The ETA assumes the remaining tasks complete at the average rate observed
/// so far: `remaining * elapsed / completed`.
pub fn estimate(completed: usize, total: usize, elapsed: Duration) -> Estimate {
    if total == 0 || completed >= total {
        return Estimate {
            percent: 100,
            eta: Eta::Seconds(0),
        };
    }

    let percent = (completed * 100 / total) as u8;
    if completed == 0 {
        return Estimate {
            percent,
            eta: Eta::Unknown,
        };
    }

    let remaining = (total - completed) as f64;
    let eta = (remaining * elapsed.as_secs_f64() / completed as f64).round();

    Estimate {
        percent,
        eta: Eta::Seconds(eta.max(0.0) as u64),
    }
}

impl Estimate {
    /// Status line padded to `width` columns, without the leading `\r`
    pub fn render(&self, width: usize) -> String {
        let line = format!("[{}%]   eta {}", self.percent, self.eta);
        format!("{line:<width$}")
    }
}

/// Format whole seconds as `1 h 2 min 5 s`.
///
/// Hours and minutes only show up when non-zero; seconds always do.
pub fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours} h "));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes} min "));
    }
    out.push_str(&format!("{seconds} s"));
    out
}

/// Elapsed wall-clock time rounded to whole seconds
pub fn rounded_secs(elapsed: Duration) -> u64 {
    elapsed.as_secs_f64().round() as u64
}
