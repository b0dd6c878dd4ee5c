//! In-memory display sink and scripted CI provider for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::display::{AnimatedIndicator, DisplaySink, Outcome, StaticLine};
use crate::job::{Execution, Job};
use crate::provider::{CiProvider, JobPage, ProviderError};
use crate::tracker::IndicatorKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SinkEvent {
    StaticCreated { handle: usize, text: String },
    AnimatedCreated { handle: usize, text: String },
    Updated { handle: usize, text: String },
    Finalized {
        handle: usize,
        outcome: Outcome,
        text: String,
    },
    Cleared { handle: usize },
    Stopped { handle: usize },
    ConvertedToStatic { from: usize, to: usize, text: String },
    Summary { outcome: Outcome, text: String },
}

#[derive(Default)]
struct Recorder {
    events: Vec<SinkEvent>,
    next_handle: usize,
    live: HashMap<usize, IndicatorKind>,
}

impl Recorder {
    fn open(&mut self, kind: IndicatorKind) -> usize {
        self.next_handle += 1;
        self.live.insert(self.next_handle, kind);
        self.next_handle
    }
}

/// Records every sink call and tracks which handles are still on screen.
#[derive(Clone, Default)]
pub(crate) struct RecordingSink {
    inner: Arc<Mutex<Recorder>>,
}

impl RecordingSink {
    pub(crate) fn events(&self) -> Vec<SinkEvent> {
        self.inner.lock().events.clone()
    }

    pub(crate) fn live_count(&self) -> usize {
        self.inner.lock().live.len()
    }

    pub(crate) fn live_animated(&self) -> usize {
        self.inner
            .lock()
            .live
            .values()
            .filter(|kind| **kind == IndicatorKind::Animated)
            .count()
    }

    pub(crate) fn summaries(&self) -> Vec<(Outcome, String)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::Summary { outcome, text } => Some((outcome, text)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: SinkEvent) {
        self.inner.lock().events.push(event);
    }
}

impl DisplaySink for RecordingSink {
    fn static_line(&self, text: &str) -> Box<dyn StaticLine> {
        let mut recorder = self.inner.lock();
        let handle = recorder.open(IndicatorKind::Static);
        recorder.events.push(SinkEvent::StaticCreated {
            handle,
            text: text.to_string(),
        });
        Box::new(RecordingLine {
            handle,
            sink: self.clone(),
        })
    }

    fn animated(&self, text: &str) -> Box<dyn AnimatedIndicator> {
        let mut recorder = self.inner.lock();
        let handle = recorder.open(IndicatorKind::Animated);
        recorder.events.push(SinkEvent::AnimatedCreated {
            handle,
            text: text.to_string(),
        });
        Box::new(RecordingSpinner {
            handle,
            sink: self.clone(),
        })
    }

    fn summary(&self, outcome: Outcome, text: &str) {
        self.record(SinkEvent::Summary {
            outcome,
            text: text.to_string(),
        });
    }
}

struct RecordingLine {
    handle: usize,
    sink: RecordingSink,
}

impl StaticLine for RecordingLine {
    fn update(&self, text: &str) {
        self.sink.record(SinkEvent::Updated {
            handle: self.handle,
            text: text.to_string(),
        });
    }

    fn finalize(&self, outcome: Outcome, text: &str) {
        self.sink.record(SinkEvent::Finalized {
            handle: self.handle,
            outcome,
            text: text.to_string(),
        });
    }

    fn clear(&self) {
        let mut recorder = self.sink.inner.lock();
        recorder.live.remove(&self.handle);
        recorder.events.push(SinkEvent::Cleared {
            handle: self.handle,
        });
    }
}

struct RecordingSpinner {
    handle: usize,
    sink: RecordingSink,
}

impl AnimatedIndicator for RecordingSpinner {
    fn update_text(&self, text: &str) {
        self.sink.record(SinkEvent::Updated {
            handle: self.handle,
            text: text.to_string(),
        });
    }

    fn finalize(&self, outcome: Outcome, text: &str) {
        self.sink.record(SinkEvent::Finalized {
            handle: self.handle,
            outcome,
            text: text.to_string(),
        });
    }

    fn stop(self: Box<Self>) {
        let mut recorder = self.sink.inner.lock();
        recorder.live.remove(&self.handle);
        recorder.events.push(SinkEvent::Stopped {
            handle: self.handle,
        });
    }

    fn into_static(self: Box<Self>, text: &str) -> Box<dyn StaticLine> {
        let mut recorder = self.sink.inner.lock();
        recorder.live.remove(&self.handle);
        let to = recorder.open(IndicatorKind::Static);
        recorder.events.push(SinkEvent::ConvertedToStatic {
            from: self.handle,
            to,
            text: text.to_string(),
        });
        Box::new(RecordingLine {
            handle: to,
            sink: self.sink.clone(),
        })
    }
}

/// Scripted job listing for one execution.
pub(crate) enum JobScript {
    /// Fixed pages, returned on every cycle.
    Pages(Vec<Vec<Job>>),
    /// One single-page listing per call; the last entry repeats.
    Cycles(VecDeque<Vec<Job>>),
    Fail(String),
}

/// CI provider replaying canned responses.
pub(crate) struct ScriptedProvider {
    has_ci: Result<bool, String>,
    executions: Mutex<VecDeque<Result<Vec<Execution>, String>>>,
    jobs: Mutex<HashMap<u64, JobScript>>,
    delay: Duration,
    execution_calls: Mutex<usize>,
    job_calls: Mutex<Vec<(u64, u32)>>,
}

impl ScriptedProvider {
    pub(crate) fn new() -> Self {
        Self {
            has_ci: Ok(true),
            executions: Mutex::new(VecDeque::new()),
            jobs: Mutex::new(HashMap::new()),
            delay: Duration::ZERO,
            execution_calls: Mutex::new(0),
            job_calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_has_ci(mut self, has_ci: Result<bool, String>) -> Self {
        self.has_ci = has_ci;
        self
    }

    /// Queue the execution listing for the next cycle. The last one repeats.
    pub(crate) fn with_executions(self, executions: Vec<Execution>) -> Self {
        self.executions.lock().push_back(Ok(executions));
        self
    }

    pub(crate) fn with_execution_error(self, message: &str) -> Self {
        self.executions.lock().push_back(Err(message.to_string()));
        self
    }

    pub(crate) fn with_jobs(self, execution_id: u64, script: JobScript) -> Self {
        self.jobs.lock().insert(execution_id, script);
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn execution_calls(&self) -> usize {
        *self.execution_calls.lock()
    }

    pub(crate) fn job_calls(&self) -> Vec<(u64, u32)> {
        self.job_calls.lock().clone()
    }
}

#[async_trait]
impl CiProvider for ScriptedProvider {
    async fn has_ci(&self, _target: &str) -> Result<bool, ProviderError> {
        self.has_ci.clone().map_err(ProviderError::from)
    }

    async fn list_executions(&self, _target: &str) -> Result<Vec<Execution>, ProviderError> {
        *self.execution_calls.lock() += 1;
        let mut queue = self.executions.lock();
        let next = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        match next {
            Some(Ok(executions)) => Ok(executions),
            Some(Err(message)) => Err(message.into()),
            None => Ok(Vec::new()),
        }
    }

    async fn list_jobs(&self, execution_id: u64, page: u32) -> Result<JobPage, ProviderError> {
        self.job_calls.lock().push((execution_id, page));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut scripts = self.jobs.lock();
        match scripts.get_mut(&execution_id) {
            Some(JobScript::Pages(pages)) => {
                let index = page.saturating_sub(1) as usize;
                Ok(JobPage {
                    jobs: pages.get(index).cloned().unwrap_or_default(),
                    has_more: index + 1 < pages.len(),
                })
            }
            Some(JobScript::Cycles(cycles)) => {
                let jobs = if cycles.len() > 1 {
                    cycles.pop_front().unwrap_or_default()
                } else {
                    cycles.front().cloned().unwrap_or_default()
                };
                Ok(JobPage {
                    jobs,
                    has_more: false,
                })
            }
            Some(JobScript::Fail(message)) => Err(message.clone().into()),
            None => Ok(JobPage::default()),
        }
    }
}
