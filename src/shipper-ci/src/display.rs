//! Display sink capability consumed by the tracker.
//!
//! The watcher never draws anything itself. It binds at most one indicator
//! to each job id and drives it through these traits; the binary supplies a
//! terminal implementation.

/// How an indicator is finalized once its job completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Success decoration.
    Positive,
    /// Replace text without success or error decoration.
    Neutral,
    /// Error decoration.
    Negative,
}

/// A non-animated display line.
pub trait StaticLine: Send + Sync {
    /// Replace the line text.
    fn update(&self, text: &str);

    /// Render the terminal state. The line stays where it is.
    fn finalize(&self, outcome: Outcome, text: &str);

    /// Remove the line from the display.
    fn clear(&self);
}

/// An animated (spinning) display line.
pub trait AnimatedIndicator: Send + Sync {
    fn update_text(&self, text: &str);

    /// Render the terminal state and stop animating.
    fn finalize(&self, outcome: Outcome, text: &str);

    /// Release the indicator.
    fn stop(self: Box<Self>);

    /// Stop animating and turn this indicator into a static line in place.
    fn into_static(self: Box<Self>, text: &str) -> Box<dyn StaticLine>;
}

/// Factory for indicators plus the final summary line.
pub trait DisplaySink: Send + Sync {
    fn static_line(&self, text: &str) -> Box<dyn StaticLine>;

    fn animated(&self, text: &str) -> Box<dyn AnimatedIndicator>;

    /// Print the closing summary below every job line.
    fn summary(&self, outcome: Outcome, text: &str);
}
