//! Terminal rendering of the CI watch.
//!
//! Every job gets one bar in a shared [`MultiProgress`] on stderr. Running
//! jobs spin; everything else is a plain message line. When stderr is not a
//! terminal, indicatif draws nothing, so finished lines and the summary are
//! printed as plain text instead.

use std::io::IsTerminal;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use shipper_ci::{AnimatedIndicator, DisplaySink, Outcome, StaticLine};

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const SPINNER_TICK: Duration = Duration::from_millis(80);

/// Icon shown in front of a finished line.
pub fn outcome_icon(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Positive => "✓",
        Outcome::Neutral => "-",
        Outcome::Negative => "✗",
    }
}

struct Styles {
    active: ProgressStyle,
    idle: ProgressStyle,
    positive: ProgressStyle,
    neutral: ProgressStyle,
    negative: ProgressStyle,
}

impl Styles {
    fn new() -> Result<Self> {
        let template = |t: &str| {
            ProgressStyle::with_template(t).with_context(|| format!("Invalid progress template {t}"))
        };
        Ok(Self {
            active: template("{spinner:.cyan} {msg}")?.tick_strings(SPINNER_FRAMES),
            idle: template("  {msg}")?,
            positive: template("{prefix:.green.bold} {msg}")?,
            neutral: template("{prefix:.dim} {msg:.dim}")?,
            negative: template("{prefix:.red.bold} {msg}")?,
        })
    }

    fn finished(&self, outcome: Outcome) -> ProgressStyle {
        match outcome {
            Outcome::Positive => self.positive.clone(),
            Outcome::Neutral => self.neutral.clone(),
            Outcome::Negative => self.negative.clone(),
        }
    }
}

struct Shared {
    multi: MultiProgress,
    styles: Styles,
    /// Print finished lines with `eprintln!` because nothing is drawn.
    plain: bool,
}

impl Shared {
    fn finish(&self, bar: &ProgressBar, printed: &AtomicBool, outcome: Outcome, text: &str) {
        bar.disable_steady_tick();
        bar.set_style(self.styles.finished(outcome));
        bar.set_prefix(outcome_icon(outcome));
        bar.finish_with_message(text.to_string());

        if self.plain && !printed.swap(true, Ordering::SeqCst) {
            eprintln!("{} {}", outcome_icon(outcome), text);
        }
    }
}

/// [`DisplaySink`] drawing on stderr.
#[derive(Clone)]
pub struct TerminalDisplay {
    shared: Arc<Shared>,
}

impl TerminalDisplay {
    pub fn new() -> Result<Self> {
        let plain = !std::io::stderr().is_terminal();
        Self::with_target(ProgressDrawTarget::stderr(), plain)
    }

    /// A display that draws nothing and prints nothing.
    pub fn hidden() -> Result<Self> {
        Self::with_target(ProgressDrawTarget::hidden(), false)
    }

    fn with_target(target: ProgressDrawTarget, plain: bool) -> Result<Self> {
        Ok(Self {
            shared: Arc::new(Shared {
                multi: MultiProgress::with_draw_target(target),
                styles: Styles::new()?,
                plain,
            }),
        })
    }

    /// Print a line above the job bars.
    pub fn println(&self, text: &str) {
        if self.shared.plain || self.shared.multi.println(text).is_err() {
            eprintln!("{text}");
        }
    }

    fn add_bar(&self, style: &ProgressStyle, text: &str) -> ProgressBar {
        let bar = self.shared.multi.add(ProgressBar::new_spinner());
        bar.set_style(style.clone());
        bar.set_message(text.to_string());
        bar
    }
}

impl DisplaySink for TerminalDisplay {
    fn static_line(&self, text: &str) -> Box<dyn StaticLine> {
        let bar = self.add_bar(&self.shared.styles.idle, text);
        Box::new(TerminalLine::new(self.shared.clone(), bar))
    }

    fn animated(&self, text: &str) -> Box<dyn AnimatedIndicator> {
        let bar = self.add_bar(&self.shared.styles.active, text);
        bar.enable_steady_tick(SPINNER_TICK);
        Box::new(TerminalSpinner {
            line: TerminalLine::new(self.shared.clone(), bar),
        })
    }

    fn summary(&self, outcome: Outcome, text: &str) {
        let bar = self.add_bar(&self.shared.styles.idle, text);
        self.shared.finish(&bar, &AtomicBool::new(false), outcome, text);
    }
}

struct TerminalLine {
    shared: Arc<Shared>,
    bar: ProgressBar,
    printed: AtomicBool,
}

impl TerminalLine {
    fn new(shared: Arc<Shared>, bar: ProgressBar) -> Self {
        Self {
            shared,
            bar,
            printed: AtomicBool::new(false),
        }
    }
}

impl StaticLine for TerminalLine {
    fn update(&self, text: &str) {
        self.bar.set_message(text.to_string());
    }

    fn finalize(&self, outcome: Outcome, text: &str) {
        self.shared.finish(&self.bar, &self.printed, outcome, text);
    }

    fn clear(&self) {
        self.bar.finish_and_clear();
        self.shared.multi.remove(&self.bar);
    }
}

struct TerminalSpinner {
    line: TerminalLine,
}

impl AnimatedIndicator for TerminalSpinner {
    fn update_text(&self, text: &str) {
        self.line.bar.set_message(text.to_string());
    }

    fn finalize(&self, outcome: Outcome, text: &str) {
        self.line.finalize(outcome, text);
    }

    fn stop(self: Box<Self>) {
        if !self.line.bar.is_finished() {
            self.line.clear();
        }
    }

    fn into_static(self: Box<Self>, text: &str) -> Box<dyn StaticLine> {
        let line = self.line;
        line.bar.disable_steady_tick();
        line.bar.set_style(line.shared.styles.idle.clone());
        line.bar.set_message(text.to_string());
        Box::new(line)
    }
}
