use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        mpsc::{self, Receiver, Sender, TryRecvError},
        Arc, Mutex,
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context, Result};

use crate::session::{Gateways, Job, JobOutcome, Lane, Session};

/// Background runner for session jobs.
///
/// Model:
/// - One worker thread per [`Lane`]. A lane runs its jobs one at a time, in the order
///   they were submitted, so repository mutations never overlap.
/// - Workers report back over a single channel.
/// - [`TaskRunner::drain_events`] runs on the UI thread once per tick, folds each
///   outcome into the [`Session`] and submits whatever follow-up jobs it returns.
///
/// A job that panics is reported as a failed outcome and its lane keeps running. A
/// worker whose channel closes simply stops producing events.
pub struct TaskRunner {
    repository: Sender<Job>,
    network: Sender<Job>,
    rx: Receiver<TaskEvent>,
    state: Arc<Mutex<TaskState>>,
    outstanding: usize,
}

/// State shared between UI thread and worker threads.
#[derive(Debug, Default)]
struct TaskState {
    repository: Option<RunningTask>,
    network: Option<RunningTask>,
}

impl TaskState {
    fn slot(&mut self, lane: Lane) -> &mut Option<RunningTask> {
        match lane {
            Lane::Repository => &mut self.repository,
            Lane::Network => &mut self.network,
        }
    }
}

/// Minimal info for the UI to render progress.
#[derive(Debug, Clone)]
pub struct RunningTask {
    pub label: String,
    pub started_at: Instant,
    pub spinner_index: usize,
}

#[derive(Debug)]
pub enum TaskEvent {
    Started {
        lane: Lane,
        label: String,
        started_at: Instant,
    },
    Completed {
        lane: Lane,
        outcome: JobOutcome,
    },
}

impl TaskRunner {
    pub fn new(gateways: Gateways) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<TaskEvent>();
        let state = Arc::new(Mutex::new(TaskState::default()));

        let repository = spawn_lane(Lane::Repository, gateways.clone(), tx.clone(), state.clone())?;
        let network = spawn_lane(Lane::Network, gateways, tx, state.clone())?;

        Ok(Self {
            repository,
            network,
            rx,
            state,
            outstanding: 0,
        })
    }

    /// Queue jobs on their lanes.
    pub fn submit(&mut self, jobs: Vec<Job>) {
        for job in jobs {
            let lane = job.lane();
            tracing::debug!(?lane, job = job.label(), "submit");
            let sender = match lane {
                Lane::Repository => &self.repository,
                Lane::Network => &self.network,
            };
            if sender.send(job).is_ok() {
                self.outstanding += 1;
            } else {
                tracing::warn!(?lane, "worker is gone; job dropped");
            }
        }
    }

    /// No job is queued or running on any lane.
    pub fn is_idle(&self) -> bool {
        self.outstanding == 0
    }

    /// Snapshot of the running tasks (for rendering), repository lane first.
    pub fn running(&self) -> Vec<RunningTask> {
        self.state
            .lock()
            .map(|s| {
                s.repository
                    .iter()
                    .chain(s.network.iter())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Advance spinner frames for every running task.
    pub fn tick_spinner(&self) {
        if let Ok(mut guard) = self.state.lock() {
            let s = &mut *guard;
            for t in s.repository.iter_mut().chain(s.network.iter_mut()) {
                t.spinner_index = t.spinner_index.wrapping_add(1);
            }
        }
    }

    /// Poll and apply all pending task events to the session.
    ///
    /// Call this once per UI tick. It is non-blocking.
    pub fn drain_events(&mut self, session: &mut Session) {
        loop {
            match self.rx.try_recv() {
                Ok(ev) => self.apply_event(session, ev),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    fn apply_event(&mut self, session: &mut Session, ev: TaskEvent) {
        match ev {
            TaskEvent::Started {
                lane,
                label,
                started_at,
            } => {
                tracing::debug!(?lane, %label, ?started_at, "job started");
            }
            TaskEvent::Completed { lane, outcome } => {
                self.outstanding = self.outstanding.saturating_sub(1);
                tracing::debug!(?lane, "job completed");
                let follow_ups = session.apply(outcome);
                self.submit(follow_ups);
            }
        }
    }
}

fn spawn_lane(
    lane: Lane,
    gateways: Gateways,
    tx: Sender<TaskEvent>,
    state: Arc<Mutex<TaskState>>,
) -> Result<Sender<Job>> {
    let (job_tx, job_rx) = mpsc::channel::<Job>();
    let name = match lane {
        Lane::Repository => "lazrgit-repository",
        Lane::Network => "lazrgit-network",
    };

    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            // Worker: take jobs in order, run each, emit completion.
            while let Ok(job) = job_rx.recv() {
                let label = job.label().to_string();
                let started_at = Instant::now();
                if let Ok(mut s) = state.lock() {
                    *s.slot(lane) = Some(RunningTask {
                        label: label.clone(),
                        started_at,
                        spinner_index: 0,
                    });
                }
                let _ = tx.send(TaskEvent::Started {
                    lane,
                    label,
                    started_at,
                });

                let fallback = job.clone();
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| job.run(&gateways)))
                    .unwrap_or_else(|_| {
                        tracing::error!(?lane, job = fallback.label(), "job panicked");
                        let label = fallback.label();
                        fallback.failed(anyhow!("{label} aborted unexpectedly"))
                    });

                if let Ok(mut s) = state.lock() {
                    *s.slot(lane) = None;
                }
                if tx.send(TaskEvent::Completed { lane, outcome }).is_err() {
                    break;
                }
            }
        })
        .with_context(|| format!("Failed to spawn {name} worker"))?;

    Ok(job_tx)
}

/// A simple unicode spinner sequence.
///
/// You can render `frames[spinner_index % frames.len()]`.
pub fn spinner_frames() -> &'static [&'static str] {
    &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]
}

/// Format elapsed time in a compact form for the status bar.
pub fn format_elapsed(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else {
        format!("{}m{}s", secs / 60, secs % 60)
    }
}
