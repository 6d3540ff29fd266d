use super::estimator::{Estimate, STATUS_LINE_WIDTH, estimate, format_duration, rounded_secs};
use crate::config::{PoolMode, ProgressDisplay};
use console::Term;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::Write;
use std::time::Duration;

/// What a run is about to do, shown once before the first task starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHeader {
    pub task_name: String,
    pub mode: PoolMode,
    pub workers: usize,
    pub total: usize,
}

/// Completion count and clock reading at one completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub completed: usize,
    pub total: usize,
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    pub fn estimate(&self) -> Estimate {
        estimate(self.completed, self.total, self.elapsed)
    }
}

/// Receives progress of a verbose run.
///
/// Sinks must not fail a run: write errors are swallowed.
pub trait ProgressSink {
    fn start(&mut self, header: &RunHeader);
    fn update(&mut self, snapshot: &ProgressSnapshot);
    fn finish(&mut self, elapsed: Duration);
}

/// Build the sink for a configured display style
pub fn sink_for(display: ProgressDisplay, width: usize) -> Box<dyn ProgressSink> {
    match display {
        ProgressDisplay::Line => Box::new(LineSink::stderr().with_width(width)),
        ProgressDisplay::Bar => Box::new(BarSink::new()),
        ProgressDisplay::None => Box::new(NullSink),
    }
}

/// Plain status line redrawn in place with `\r`
pub struct LineSink<W: Write> {
    out: W,
    width: usize,
}

impl LineSink<Term> {
    pub fn stderr() -> Self {
        Self::new(Term::stderr())
    }
}

impl<W: Write> LineSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            width: STATUS_LINE_WIDTH,
        }
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ProgressSink for LineSink<W> {
    fn start(&mut self, header: &RunHeader) {
        writeln!(
            self.out,
            "Running {} in parallel on {} cores.",
            header.task_name, header.workers
        )
        .ok();
        writeln!(self.out, "Number of tasks: {}", header.total).ok();
        self.out.flush().ok();
    }

    fn update(&mut self, snapshot: &ProgressSnapshot) {
        write!(self.out, "\r{}", snapshot.estimate().render(self.width)).ok();
        self.out.flush().ok();
    }

    fn finish(&mut self, elapsed: Duration) {
        // End the status line, then the summary and a blank line
        writeln!(self.out).ok();
        writeln!(
            self.out,
            "Time elapsed {}",
            format_duration(rounded_secs(elapsed))
        )
        .ok();
        writeln!(self.out).ok();
        self.out.flush().ok();
    }
}

/// indicatif progress bar on stderr
#[derive(Default)]
pub struct BarSink {
    bar: Option<ProgressBar>,
}

impl BarSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{prefix} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) eta {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
    }
}

impl ProgressSink for BarSink {
    fn start(&mut self, header: &RunHeader) {
        let term = Term::stderr();
        term.write_line(&format!(
            "Running {} in parallel on {} cores.",
            header.task_name, header.workers
        ))
        .ok();
        term.write_line(&format!("Number of tasks: {}", header.total))
            .ok();

        let bar =
            ProgressBar::with_draw_target(Some(header.total as u64), ProgressDrawTarget::stderr());
        bar.set_style(Self::style());
        bar.set_prefix(header.mode.to_string());
        self.bar = Some(bar);
    }

    fn update(&mut self, snapshot: &ProgressSnapshot) {
        if let Some(bar) = &self.bar {
            bar.set_position(snapshot.completed as u64);
            bar.set_message(snapshot.estimate().eta.to_string());
        }
    }

    fn finish(&mut self, elapsed: Duration) {
        if let Some(bar) = self.bar.take() {
            bar.finish();
        }
        let term = Term::stderr();
        term.write_line(&format!(
            "Time elapsed {}",
            format_duration(rounded_secs(elapsed))
        ))
        .ok();
        term.write_line("").ok();
    }
}

/// Discards all progress
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn start(&mut self, _header: &RunHeader) {}
    fn update(&mut self, _snapshot: &ProgressSnapshot) {}
    fn finish(&mut self, _elapsed: Duration) {}
}
