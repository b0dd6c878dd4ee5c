//! Running model of every job seen during one watch call.
//!
//! The tracker owns all rendering decisions. Each job id is bound to at most
//! one indicator, either a static line or an animated spinner, and every
//! batch from the fetcher is diffed against the last-known state to decide
//! how that indicator changes.
//!
//! # Locking
//!
//! Job records and indicators live in one [`TrackerState`] behind a single
//! reader/writer lock. `update()` takes the write lock; the per-job label
//! refresh loops spawned for animated indicators take the read lock once per
//! tick. Refresh loops stop on their own as soon as the job is gone, is no
//! longer running, or its animated indicator was replaced.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::display::{AnimatedIndicator, DisplaySink, Outcome, StaticLine};
use crate::job::Job;
use crate::label::compose_label;

/// Default tick of the label refresh loops.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Tracker behaviour knobs.
#[derive(Debug, Clone)]
pub struct TrackerOptions {
    /// How often a running job's label is refreshed to keep its elapsed time current.
    pub refresh_interval: Duration,
    /// Finalize the indicator of a job missing for this many consecutive
    /// batches as lost. `None` leaves vanished jobs untouched.
    pub lost_after: Option<u32>,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            lost_after: None,
        }
    }
}

/// Kind of indicator currently bound to a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorKind {
    Static,
    Animated,
}

enum Indicator {
    Static(Box<dyn StaticLine>),
    Animated {
        spinner: Box<dyn AnimatedIndicator>,
        /// Identifies the refresh loop that belongs to this spinner.
        generation: u64,
    },
}

impl Indicator {
    fn kind(&self) -> IndicatorKind {
        match self {
            Indicator::Static(_) => IndicatorKind::Static,
            Indicator::Animated { .. } => IndicatorKind::Animated,
        }
    }
}

#[derive(Default)]
struct TrackerState {
    jobs: HashMap<u64, Job>,
    indicators: HashMap<u64, Indicator>,
    /// Consecutive batches each known job has been missing from.
    missed: HashMap<u64, u32>,
    /// Jobs whose indicator was finalized as lost.
    lost: HashSet<u64>,
    next_generation: u64,
}

impl TrackerState {
    fn next_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }
}

/// Tracks job state across poll cycles and drives the display sink.
pub struct StateTracker {
    state: Arc<RwLock<TrackerState>>,
    sink: Arc<dyn DisplaySink>,
    options: TrackerOptions,
}

impl StateTracker {
    pub fn new(sink: Arc<dyn DisplaySink>) -> Self {
        Self::with_options(sink, TrackerOptions::default())
    }

    pub fn with_options(sink: Arc<dyn DisplaySink>, options: TrackerOptions) -> Self {
        Self {
            state: Arc::new(RwLock::new(TrackerState::default())),
            sink,
            options,
        }
    }

    /// Feed one fetch batch and return human-readable transition descriptions.
    ///
    /// Entries with id `0` are discarded and only the first occurrence of a
    /// duplicated id is processed. Known jobs missing from the batch are
    /// reported as removed but keep their record and indicator. A job that
    /// comes back after being finalized as lost is bound to a fresh indicator.
    pub fn update(&self, batch: &[Job]) -> Vec<String> {
        let now = Utc::now();
        let mut transitions = Vec::new();
        let mut spawn = Vec::new();

        {
            let mut state = self.state.write();
            let mut seen = HashSet::new();

            for job in batch {
                if !job.is_valid() {
                    trace!(name = %job.name, "Discarding job without id");
                    continue;
                }
                if !seen.insert(job.id) {
                    trace!(job_id = job.id, "Ignoring duplicate job in batch");
                    continue;
                }
                state.missed.remove(&job.id);
                let reappeared = state.lost.remove(&job.id);
                if reappeared {
                    if let Some(Indicator::Static(line)) = state.indicators.remove(&job.id) {
                        line.clear();
                    }
                    transitions.push(format!("{} reappeared", job.id));
                }

                let label = compose_label(job, now);
                match state.jobs.get(&job.id).cloned() {
                    None => {
                        if let Some(generation) = self.bind_indicator(&mut state, job, &label) {
                            spawn.push((job.id, generation));
                        }
                        transitions.push(format!("{} started: {}", job.id, job.name));
                    }
                    Some(previous)
                        if previous.status != job.status
                            || previous.conclusion != job.conclusion =>
                    {
                        if let Some(generation) =
                            self.apply_transition(&mut state, &previous, job, &label)
                        {
                            spawn.push((job.id, generation));
                        }
                        transitions.push(format!(
                            "{}: {} -> {}",
                            job.id,
                            previous.state_word(),
                            job.state_word()
                        ));
                    }
                    Some(_) if reappeared => {
                        if let Some(generation) = self.bind_indicator(&mut state, job, &label) {
                            spawn.push((job.id, generation));
                        }
                    }
                    Some(_) => {
                        // Completed lines were finalized on their transition.
                        if !job.is_running()
                            && !job.is_completed()
                            && let Some(Indicator::Static(line)) = state.indicators.get(&job.id)
                        {
                            line.update(&label);
                        }
                    }
                }

                state.jobs.insert(job.id, job.clone());
            }

            let mut absent: Vec<u64> = state
                .jobs
                .keys()
                .filter(|id| !seen.contains(*id))
                .copied()
                .collect();
            absent.sort_unstable();

            for id in absent {
                transitions.push(format!("{} removed", id));
                let missed = state.missed.entry(id).or_insert(0);
                *missed += 1;
                if self.options.lost_after == Some(*missed) {
                    self.mark_lost(&mut state, id);
                }
            }
        }

        for (id, generation) in spawn {
            self.spawn_label_refresh(id, generation);
        }

        transitions
    }

    /// Last-known record of a job.
    pub fn job(&self, id: u64) -> Option<Job> {
        self.state.read().jobs.get(&id).cloned()
    }

    /// Kind of indicator currently bound to a job, if any.
    pub fn indicator_kind(&self, id: u64) -> Option<IndicatorKind> {
        self.state.read().indicators.get(&id).map(Indicator::kind)
    }

    /// Number of jobs recorded so far.
    pub fn len(&self) -> usize {
        self.state.read().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().jobs.is_empty()
    }

    /// Ids of jobs currently bound to an animated indicator.
    pub fn animated_ids(&self) -> Vec<u64> {
        let state = self.state.read();
        let mut ids: Vec<u64> = state
            .indicators
            .iter()
            .filter(|(_, indicator)| indicator.kind() == IndicatorKind::Animated)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Create the first indicator for a job. Returns the generation of a new
    /// animated indicator so the caller can start its refresh loop.
    fn bind_indicator(&self, state: &mut TrackerState, job: &Job, label: &str) -> Option<u64> {
        if job.is_running() {
            let generation = state.next_generation();
            state.indicators.insert(
                job.id,
                Indicator::Animated {
                    spinner: self.sink.animated(label),
                    generation,
                },
            );
            return Some(generation);
        }

        let line = self.sink.static_line(label);
        if job.is_completed() {
            line.finalize(job.outcome(), label);
        }
        state.indicators.insert(job.id, Indicator::Static(line));
        None
    }

    /// Display transition for a job whose status or conclusion changed.
    fn apply_transition(
        &self,
        state: &mut TrackerState,
        previous: &Job,
        job: &Job,
        label: &str,
    ) -> Option<u64> {
        let was_running = previous.is_running();
        let is_running = job.is_running();
        let current = state.indicators.remove(&job.id);

        if job.is_completed() {
            let outcome = job.outcome();
            match current {
                Some(Indicator::Animated { spinner, .. }) => {
                    spinner.finalize(outcome, label);
                    spinner.stop();
                }
                Some(Indicator::Static(line)) => {
                    line.finalize(outcome, label);
                    state.indicators.insert(job.id, Indicator::Static(line));
                }
                None => {
                    return self.bind_indicator(state, job, label);
                }
            }
            return None;
        }

        // Into running: a static line is swapped for a spinner. An existing
        // spinner is refreshed below.
        let current = match current {
            Some(Indicator::Static(line)) if is_running && !was_running => {
                line.clear();
                return self.bind_indicator(state, job, label);
            }
            other => other,
        };

        if !is_running && was_running {
            let line = match current {
                Some(Indicator::Animated { spinner, .. }) => spinner.into_static(label),
                Some(Indicator::Static(line)) => {
                    line.update(label);
                    line
                }
                None => self.sink.static_line(label),
            };
            state.indicators.insert(job.id, Indicator::Static(line));
            return None;
        }

        match current {
            Some(Indicator::Static(line)) => {
                line.update(label);
                state.indicators.insert(job.id, Indicator::Static(line));
                None
            }
            Some(Indicator::Animated {
                spinner,
                generation,
            }) => {
                spinner.update_text(label);
                state.indicators.insert(
                    job.id,
                    Indicator::Animated {
                        spinner,
                        generation,
                    },
                );
                None
            }
            None => self.bind_indicator(state, job, label),
        }
    }

    /// Finalize the indicator of a job that stopped appearing in batches.
    /// The job record itself is kept.
    fn mark_lost(&self, state: &mut TrackerState, id: u64) {
        let Some(job) = state.jobs.get(&id) else {
            return;
        };
        let label = format!("{} (lost)", job.display_name());
        debug!(job_id = id, "Job vanished from CI listing, finalizing as lost");

        match state.indicators.remove(&id) {
            Some(Indicator::Animated { spinner, .. }) => {
                spinner.finalize(Outcome::Neutral, &label);
                spinner.stop();
            }
            Some(Indicator::Static(line)) => {
                line.finalize(Outcome::Neutral, &label);
                state.indicators.insert(id, Indicator::Static(line));
            }
            None => return,
        }
        state.lost.insert(id);
    }

    fn spawn_label_refresh(&self, id: u64, generation: u64) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            trace!(job_id = id, "No async runtime, skipping label refresh");
            return;
        };

        let state = Arc::downgrade(&self.state);
        let period = self.options.refresh_interval;
        runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !refresh_label(&state, id, generation, Utc::now()) {
                    break;
                }
            }
            trace!(job_id = id, generation, "Label refresh finished");
        });
    }
}

/// One refresh tick. Returns false once the loop should end.
fn refresh_label(
    state: &Weak<RwLock<TrackerState>>,
    id: u64,
    generation: u64,
    now: DateTime<Utc>,
) -> bool {
    let Some(state) = state.upgrade() else {
        return false;
    };
    let state = state.read();

    let Some(job) = state.jobs.get(&id) else {
        return false;
    };
    if !job.is_running() {
        return false;
    }
    match state.indicators.get(&id) {
        Some(Indicator::Animated {
            spinner,
            generation: current,
        }) if *current == generation => {
            spinner.update_text(&compose_label(job, now));
            true
        }
        _ => false,
    }
}
