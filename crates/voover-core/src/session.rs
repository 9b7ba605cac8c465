use uuid::Uuid;

use crate::config::EngineConfig;
use crate::effects::{Effect, EffectChain};
use crate::error::{CoreError, Result};
use crate::image::ImageBuffer;
use crate::pipeline::{self, Progress};
use crate::worker::{self, RunHandle, RunOutcome};

/// The image being edited, its pristine origin, and the single-flight guard
/// for background runs.
///
/// While a run is active the session refuses anything that would read or
/// replace the working image; the displayed `current` image stays valid
/// because the worker operates on its own copy.
pub struct ImageSession {
    origin: ImageBuffer,
    current: ImageBuffer,
    config: EngineConfig,
    active: Option<Uuid>,
}

impl ImageSession {
    pub fn new(image: ImageBuffer, config: EngineConfig) -> Self {
        Self {
            current: image.clone(),
            origin: image,
            config,
            active: None,
        }
    }

    /// The image as loaded. Never modified by effects.
    pub fn origin(&self) -> &ImageBuffer {
        &self.origin
    }

    pub fn current(&self) -> &ImageBuffer {
        &self.current
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn active_run(&self) -> Option<Uuid> {
        self.active
    }

    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    /// Start a background run over a copy of the current image.
    pub fn start(&mut self, chain: EffectChain) -> Result<RunHandle> {
        self.ensure_idle()?;
        let handle = worker::spawn_run(self.current.clone(), chain, self.config.clone())?;
        self.active = Some(handle.id());
        Ok(handle)
    }

    /// Hand a finished run back to the session. On success the result
    /// replaces the current image; on failure the current image is kept.
    /// Either way the session is free for the next run.
    pub fn finish(&mut self, outcome: RunOutcome) -> Result<()> {
        if self.active != Some(outcome.run_id) {
            return Err(CoreError::ForeignRun {
                expected: self.active,
                got: outcome.run_id,
            });
        }
        self.active = None;
        let image = outcome.result?;
        image.check_dimensions(self.current.dimensions())?;
        self.current = image;
        Ok(())
    }

    /// Give up on a run without waiting for its outcome. The worker is told
    /// to stop, the current image is kept and the session is free again.
    /// A handle that is simply dropped leaves the session busy.
    pub fn abandon(&mut self, handle: RunHandle) -> Result<()> {
        if self.active != Some(handle.id()) {
            return Err(CoreError::ForeignRun {
                expected: self.active,
                got: handle.id(),
            });
        }
        handle.cancel();
        self.active = None;
        log::info!("run {} abandoned", handle.id());
        Ok(())
    }

    /// Start a run and block until it completes.
    pub fn run_blocking<F: FnMut(&Progress)>(&mut self, chain: EffectChain, on_progress: F) -> Result<()> {
        let handle = self.start(chain)?;
        let outcome = handle.wait(on_progress);
        self.finish(outcome)
    }

    /// Apply one effect synchronously on the caller's thread.
    pub fn apply_now(&mut self, effect: &Effect) -> Result<()> {
        self.ensure_idle()?;
        self.current = pipeline::apply_one(&self.current, effect, &self.config)?;
        Ok(())
    }

    /// Drop every applied effect and go back to the origin image.
    pub fn revert(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.current = self.origin.clone();
        Ok(())
    }

    /// Replace both origin and current with a newly loaded image.
    pub fn load(&mut self, image: ImageBuffer) -> Result<()> {
        self.ensure_idle()?;
        self.current = image.clone();
        self.origin = image;
        Ok(())
    }

    pub fn into_current(self) -> ImageBuffer {
        self.current
    }

    fn ensure_idle(&self) -> Result<()> {
        match self.active {
            Some(active) => {
                log::warn!("rejected request: run {active} still active");
                Err(CoreError::ConcurrentRun { active })
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ImageSession {
        let image = ImageBuffer::from_fn(4, 3, |x, y| [(x * 60) as u8, (y * 90) as u8, 30]);
        ImageSession::new(image, EngineConfig::with_seed(5))
    }

    #[test]
    fn test_second_start_is_rejected_while_active() {
        let mut session = session();
        let handle = session.start(EffectChain::from(Effect::Grey)).unwrap();
        let err = session.start(EffectChain::from(Effect::Invert)).unwrap_err();
        assert!(matches!(err, CoreError::ConcurrentRun { active } if active == handle.id()));
        assert!(session.revert().is_err());
        assert!(session.apply_now(&Effect::Invert).is_err());

        session.finish(handle.wait(|_| {})).unwrap();
        assert!(!session.is_busy());
        assert!(session.start(EffectChain::from(Effect::Invert)).is_ok());
    }

    #[test]
    fn test_finish_installs_result_and_keeps_origin() {
        let mut session = session();
        let origin = session.origin().clone();
        session
            .run_blocking(EffectChain::from(Effect::Invert), |_| {})
            .unwrap();
        assert_eq!(session.origin(), &origin);
        assert_eq!(session.current().rgb(0, 0), [255, 255, 225]);
    }

    #[test]
    fn test_failed_run_keeps_current_and_clears_guard() {
        let mut session = session();
        let before = session.current().clone();
        let err = session
            .run_blocking(EffectChain::from(Effect::Contrast { factor: 259 }), |_| {})
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidParameter { .. }));
        assert_eq!(session.current(), &before);
        assert!(!session.is_busy());
    }

    #[test]
    fn test_finish_rejects_foreign_outcome() {
        let mut session = session();
        let outcome = RunOutcome {
            run_id: Uuid::new_v4(),
            result: Ok(ImageBuffer::new(4, 3)),
        };
        assert!(matches!(
            session.finish(outcome),
            Err(CoreError::ForeignRun { expected: None, .. })
        ));
    }

    #[test]
    fn test_abandon_frees_session_and_keeps_current() {
        let mut session = session();
        let before = session.current().clone();
        let handle = session.start(EffectChain::from(Effect::Invert)).unwrap();
        session.abandon(handle).unwrap();
        assert!(!session.is_busy());
        assert_eq!(session.current(), &before);
        assert!(session.apply_now(&Effect::Grey).is_ok());
    }

    #[test]
    fn test_abandon_rejects_foreign_handle() {
        let mut session = session();
        let mine = session.start(EffectChain::from(Effect::Grey)).unwrap();
        let foreign = worker::spawn_run(ImageBuffer::new(1, 1), EffectChain::new(), EngineConfig::default()).unwrap();
        let foreign_id = foreign.id();
        assert!(matches!(
            session.abandon(foreign),
            Err(CoreError::ForeignRun { got, .. }) if got == foreign_id
        ));
        assert_eq!(session.active_run(), Some(mine.id()));
    }

    #[test]
    fn test_revert_restores_origin() {
        let mut session = session();
        session.apply_now(&Effect::Sepia { depth: 25 }).unwrap();
        assert_ne!(session.current(), session.origin());
        session.revert().unwrap();
        assert_eq!(session.current(), session.origin());
    }

    #[test]
    fn test_load_replaces_both_images() {
        let mut session = session();
        session.apply_now(&Effect::Invert).unwrap();
        let fresh = ImageBuffer::new(2, 2);
        session.load(fresh.clone()).unwrap();
        assert_eq!(session.origin(), &fresh);
        assert_eq!(session.into_current(), fresh);
    }
}
