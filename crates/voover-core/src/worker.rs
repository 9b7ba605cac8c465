//! Background execution of an effect chain.
//!
//! Each run gets one dedicated thread. The thread owns the working image for
//! the duration of the run and reports back over a channel: any number of
//! [`WorkerEvent::Progress`] events followed by exactly one
//! [`WorkerEvent::Done`].

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};

use uuid::Uuid;

use crate::config::EngineConfig;
use crate::effects::EffectChain;
use crate::error::{CoreError, Result};
use crate::image::ImageBuffer;
use crate::pipeline::{self, CancelToken, Progress, RunContext};

/// Final result of a run, tagged with the run it belongs to.
#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub result: Result<ImageBuffer>,
}

/// Message sent from the worker thread to the caller.
#[derive(Debug)]
pub enum WorkerEvent {
    Progress(Progress),
    Done(RunOutcome),
}

/// Caller-side end of a background run.
#[derive(Debug)]
pub struct RunHandle {
    id: Uuid,
    cancel: CancelToken,
    events: Receiver<WorkerEvent>,
    thread: Option<JoinHandle<()>>,
    finished: bool,
}

impl RunHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Ask the worker to stop after the row it is working on. The run still
    /// ends with a `Done` event carrying `CoreError::Cancelled`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// True once the `Done` event has been handed out.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Next event if one is ready. Never blocks.
    pub fn try_next(&mut self) -> Option<WorkerEvent> {
        if self.finished {
            return None;
        }
        match self.events.try_recv() {
            Ok(event) => Some(self.observe(event)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(self.lost()),
        }
    }

    /// Block until the next event. Returns `None` after `Done`.
    pub fn next_event(&mut self) -> Option<WorkerEvent> {
        if self.finished {
            return None;
        }
        match self.events.recv() {
            Ok(event) => Some(self.observe(event)),
            Err(_) => Some(self.lost()),
        }
    }

    /// Drain events until completion, forwarding progress to `on_progress`.
    pub fn wait<F: FnMut(&Progress)>(mut self, mut on_progress: F) -> RunOutcome {
        while let Some(event) = self.next_event() {
            match event {
                WorkerEvent::Progress(progress) => on_progress(&progress),
                WorkerEvent::Done(outcome) => {
                    if let Some(thread) = self.thread.take() {
                        let _ = thread.join();
                    }
                    return outcome;
                }
            }
        }
        RunOutcome {
            run_id: self.id,
            result: Err(CoreError::WorkerLost),
        }
    }

    fn observe(&mut self, event: WorkerEvent) -> WorkerEvent {
        if matches!(event, WorkerEvent::Done(_)) {
            self.finished = true;
        }
        event
    }

    fn lost(&mut self) -> WorkerEvent {
        log::warn!("run {}: worker disconnected before completion", self.id);
        self.finished = true;
        WorkerEvent::Done(RunOutcome {
            run_id: self.id,
            result: Err(CoreError::WorkerLost),
        })
    }
}

/// Start a background run of `chain` over `image`.
///
/// `image` becomes the worker's working copy; the caller keeps its own
/// snapshot. The returned handle is the only way to receive the result.
pub fn spawn_run(image: ImageBuffer, chain: EffectChain, config: EngineConfig) -> Result<RunHandle> {
    let ctx = RunContext::new(config);
    let id = ctx.run_id;
    let cancel = ctx.cancel.clone();
    let (tx, rx) = mpsc::channel();

    log::info!(
        "run {id} starting: {}x{}, {} effects",
        image.width(),
        image.height(),
        chain.active().count()
    );

    let thread = thread::Builder::new()
        .name(format!("voover-run-{id}"))
        .spawn(move || {
            let mut image = image;
            let progress_tx = tx.clone();
            let result = pipeline::run_chain(&mut image, &chain, &ctx, |progress| {
                // A dropped handle means nobody is listening; keep computing so
                // the run still terminates normally.
                let _ = progress_tx.send(WorkerEvent::Progress(progress));
            })
            .map(|()| image);

            match &result {
                Ok(_) => log::info!("run {} finished", ctx.run_id),
                Err(CoreError::Cancelled) => log::warn!("run {} cancelled", ctx.run_id),
                Err(e) => log::warn!("run {} failed: {e}", ctx.run_id),
            }
            let _ = tx.send(WorkerEvent::Done(RunOutcome {
                run_id: ctx.run_id,
                result,
            }));
        })?;

    Ok(RunHandle {
        id,
        cancel,
        events: rx,
        thread: Some(thread),
        finished: false,
    })
}
