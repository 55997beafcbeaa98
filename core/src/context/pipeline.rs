//! Parsing and handling workers.
//!
//! The parsing worker scans the existing log, handles those events inline
//! (catch-up), then tails the file and queues new events for the handling
//! worker. The session moves to the handling worker on the first EOF, so a
//! single task owns the tracking state at any time.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::config::{AppConfig, AppConfigExt};
use super::error::PipelineError;
use super::queue::{EventReceiver, EventSender, event_queue};
use super::session::TrackingSession;
use crate::client_log::{
    EventClassifier, LineSource, LineVerdict, NextLine, ReplayGuard, fingerprint,
};

/// Catch-up progress is published every this many history lines
const PROGRESS_EVERY: usize = 2_000;

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub poll_interval: Duration,
    pub checkpoint_interval: Duration,
    pub replay_cache_capacity: usize,
}

impl From<&AppConfig> for PipelineOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            checkpoint_interval: config.checkpoint_interval(),
            replay_cache_capacity: config.replay_cache_capacity,
        }
    }
}

/// Reader position, published by the parsing worker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub lines_read: u64,
    pub lines_total: u64,
    /// Catch-up finished
    pub live: bool,
}

impl Progress {
    pub fn percent(&self) -> f64 {
        if self.lines_total == 0 {
            return 100.0;
        }
        (self.lines_read as f64 / self.lines_total as f64 * 100.0).min(100.0)
    }
}

/// Handle to the running workers.
pub struct TrackingPipeline {
    shutdown: watch::Sender<bool>,
    progress: watch::Receiver<Progress>,
    worker: JoinHandle<Result<(), PipelineError>>,
}

impl TrackingPipeline {
    /// Start tracking `log_path`. Must be called inside a tokio runtime.
    pub fn spawn(
        log_path: impl Into<PathBuf>,
        session: TrackingSession,
        options: PipelineOptions,
    ) -> Result<Self, PipelineError> {
        let log_path = log_path.into();
        if !log_path.is_file() {
            return Err(PipelineError::MissingLogFile(log_path.display().to_string()));
        }
        let source = LineSource::open(log_path)?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (progress_tx, progress_rx) = watch::channel(Progress {
            lines_read: 0,
            lines_total: source.progress().1,
            live: false,
        });

        let worker = tokio::spawn(run_parser(source, session, options, shutdown_rx, progress_tx));
        Ok(Self {
            shutdown: shutdown_tx,
            progress: progress_rx,
            worker,
        })
    }

    pub fn progress(&self) -> Progress {
        *self.progress.borrow()
    }

    pub fn progress_receiver(&self) -> watch::Receiver<Progress> {
        self.progress.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.worker.is_finished()
    }

    /// Signal shutdown and wait for both workers. The handling worker drains
    /// the queue, finishes the current activity and writes the checkpoint.
    pub async fn stop(self) -> Result<(), PipelineError> {
        self.shutdown.send_replace(true);
        self.worker.await?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing worker
// ─────────────────────────────────────────────────────────────────────────────

async fn run_parser(
    mut source: LineSource,
    mut session: TrackingSession,
    options: PipelineOptions,
    mut shutdown: watch::Receiver<bool>,
    progress: watch::Sender<Progress>,
) -> Result<(), PipelineError> {
    let classifier = EventClassifier::new();
    let started = Instant::now();
    let mut guard = ReplayGuard::new(session.bookmark(), options.replay_cache_capacity);

    tracing::info!(
        path = %source.path().display(),
        bookmark = guard.bookmark(),
        "Catch-up started"
    );

    // ─── Catch-up: everything already in the file ────────────────────────────
    let (mut source, scan) = tokio::task::spawn_blocking(move || {
        let scan = source.scan_history(&classifier);
        (source, scan)
    })
    .await?;
    let scan = match scan {
        Ok(scan) => scan,
        Err(e) => {
            checkpoint_or_log(&session);
            return Err(e.into());
        }
    };

    let lines_total = source.progress().1;
    for (idx, line) in scan.lines.iter().enumerate() {
        if let Some(update) = catch_up_progress(idx, lines_total) {
            progress.send_replace(update);
        }
        if guard.check(line.fingerprint) == LineVerdict::Skip {
            continue;
        }
        if let Some(event) = &line.event {
            session.process_event(event);
            guard.commit(line.fingerprint);
        }
    }
    publish(&progress, &source, false);
    tracing::debug!(lines = scan.lines.len(), end_pos = scan.end_pos, "History scanned");

    // ─── Tail ────────────────────────────────────────────────────────────────
    let mut inline = Some(session);
    let mut queue: Option<EventSender> = None;
    let mut handler: Option<JoinHandle<()>> = None;

    let outcome = loop {
        if *shutdown.borrow() {
            break Ok(());
        }

        match source.next_line().await {
            Ok(NextLine::Line { line_number, text }) => {
                let fp = fingerprint(&text);
                if guard.check(fp) == LineVerdict::Skip {
                    continue;
                }
                let Some(event) = classifier.classify(line_number, fp, &text) else {
                    continue;
                };
                guard.commit(fp);

                if let Some(session) = inline.as_mut() {
                    session.process_event(&event);
                } else if let Some(tx) = queue.as_ref()
                    && tx.push(event).is_err()
                {
                    tracing::warn!("Handling worker gone, stopping parser");
                    break Ok(());
                }
            }
            Ok(NextLine::Eof) => {
                if let Some(mut session) = inline.take() {
                    guard.mark_eof();
                    session.mark_ready(started.elapsed(), source.progress().0);
                    let (tx, rx) = event_queue();
                    handler = Some(tokio::spawn(run_handler(
                        session,
                        rx,
                        options.checkpoint_interval,
                        shutdown.clone(),
                    )));
                    queue = Some(tx);
                }
                publish(&progress, &source, true);

                let handle_dropped = tokio::select! {
                    _ = tokio::time::sleep(options.poll_interval) => false,
                    changed = shutdown.changed() => changed.is_err(),
                };
                if handle_dropped {
                    break Ok(());
                }
            }
            Err(e) => break Err(PipelineError::from(e)),
        }
    };

    if let Err(e) = &outcome {
        tracing::error!(error = %e, "Log reader failed");
    }

    // Shutdown before catch-up finished: nothing live to finish
    if let Some(session) = inline.take() {
        checkpoint_or_log(&session);
    }
    // Closing the queue lets the handler drain and exit
    drop(queue);
    if let Some(handler) = handler {
        handler.await?;
    }
    outcome
}

fn publish(progress: &watch::Sender<Progress>, source: &LineSource, live: bool) {
    let (lines_read, lines_total) = source.progress();
    progress.send_replace(Progress {
        lines_read,
        lines_total,
        live,
    });
}

/// Progress to publish before handling history line `idx`, if any.
fn catch_up_progress(idx: usize, lines_total: u64) -> Option<Progress> {
    (idx % PROGRESS_EVERY == 0).then(|| Progress {
        lines_read: idx as u64,
        lines_total,
        live: false,
    })
}

fn checkpoint_or_log(session: &TrackingSession) {
    if let Err(e) = session.write_checkpoint() {
        tracing::error!(error = %e, "Failed to write checkpoint");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handling worker
// ─────────────────────────────────────────────────────────────────────────────

async fn run_handler(
    mut session: TrackingSession,
    mut queue: EventReceiver,
    checkpoint_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut checkpoint = tokio::time::interval_at(
        Instant::now() + checkpoint_interval,
        checkpoint_interval,
    );
    checkpoint.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            batch = queue.recv_batch() => {
                if batch.is_empty() {
                    break;
                }
                session.process_events(&batch);
            }
            _ = checkpoint.tick() => checkpoint_or_log(&session),
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    // The parser stops and closes the queue; take everything it sent
                    loop {
                        let batch = queue.recv_batch().await;
                        if batch.is_empty() {
                            break;
                        }
                        session.process_events(&batch);
                    }
                    break;
                }
            }
        }
    }

    session.finalize_session(Local::now().naive_local());
    tracing::info!(bookmark = session.bookmark(), "Tracking stopped");
}
