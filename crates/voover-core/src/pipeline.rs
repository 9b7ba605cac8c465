use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::effects::{Effect, EffectChain, ProgressAxis};
use crate::error::{CoreError, Result};
use crate::image::ImageBuffer;
use crate::recolor;

// =============================================================================
// Progress and cancellation
// =============================================================================

/// One progress notification: a row (or, for floodfill, a column) of one
/// effect pass has been completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub run_id: Uuid,
    /// Position of the effect among the chain's active (non-placeholder) entries.
    pub effect_index: usize,
    pub label: &'static str,
    pub axis: ProgressAxis,
    /// Row or column just finished, in `0..total`.
    pub index: u32,
    pub total: u32,
}

impl Progress {
    /// Completed share of the current pass, in (0, 1].
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.index + 1) as f64 / self.total as f64
    }
}

/// Shared flag a caller flips to stop a run between rows.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(CoreError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Everything a chain run needs besides the image and the chain.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub config: EngineConfig,
    pub cancel: CancelToken,
}

impl RunContext {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            config,
            cancel: CancelToken::new(),
        }
    }
}

// =============================================================================
// Pipeline functions
// =============================================================================

/// Apply a per-pixel effect to one row of RGBA bytes.
fn apply_row<R: Rng>(effect: &Effect, row: &mut [u8], rng: &mut R) {
    for px in row.chunks_exact_mut(4) {
        let out = effect.apply_pixel([px[0], px[1], px[2]], rng);
        px[..3].copy_from_slice(&out);
        // alpha unchanged
    }
}

/// Run every active effect of `chain` over `image`, in order.
///
/// Per-pixel effects report once per finished row; floodfill reports once per
/// finished column. Each effect is validated right before it runs, and
/// cancellation is checked after every reported row or column. On error the
/// image may hold a partially processed state and should be discarded.
pub fn run_chain<F>(
    image: &mut ImageBuffer,
    chain: &EffectChain,
    ctx: &RunContext,
    mut on_progress: F,
) -> Result<()>
where
    F: FnMut(Progress),
{
    let expected = image.dimensions();
    let (width, height) = expected;
    let mut rng = ctx.config.rng();
    let log_every = ctx.config.progress_log_interval;

    for (effect_index, effect) in chain.active().enumerate() {
        effect.validate()?;
        image.check_dimensions(expected)?;

        let kind = effect.kind();
        let label = kind.progress_label();
        let axis = kind.progress_axis();
        let total = match axis {
            ProgressAxis::Row => height,
            ProgressAxis::Column => width,
        };
        log::debug!(
            "run {}: effect {} ({}) over {}x{}",
            ctx.run_id,
            effect_index,
            kind.name(),
            width,
            height
        );

        let mut report = |index: u32| -> Result<()> {
            on_progress(Progress {
                run_id: ctx.run_id,
                effect_index,
                label,
                axis,
                index,
                total,
            });
            if log_every > 0 && ((index + 1) % log_every == 0 || index + 1 == total) {
                log::debug!("{label}: line {}/{}", index + 1, total);
            }
            ctx.cancel.check()
        };

        match effect {
            Effect::Floodfill { palette } => {
                recolor::recolor(image, palette, &mut rng, &mut report)?;
            }
            _ if effect.is_identity() => {
                for y in 0..height {
                    report(y)?;
                }
            }
            _ => {
                for y in 0..height {
                    apply_row(effect, image.row_mut(y), &mut rng);
                    report(y)?;
                }
            }
        }
    }

    image.check_dimensions(expected)
}

/// Apply a single effect and return the result, leaving `image` untouched.
///
/// Equivalent to running a one-element chain, minus the notifications. When
/// `config.parallel_single_apply` is set, rows are processed on the rayon
/// pool; each row then draws from its own RNG stream.
pub fn apply_one(image: &ImageBuffer, effect: &Effect, config: &EngineConfig) -> Result<ImageBuffer> {
    effect.validate()?;
    let mut output = image.clone();

    match effect {
        Effect::Floodfill { palette } => {
            let mut rng = config.rng();
            recolor::recolor(&mut output, palette, &mut rng, |_| Ok(()))?;
        }
        _ if effect.is_identity() => {}
        _ if config.parallel_single_apply && output.width() > 0 => {
            let base_seed: u64 = config.rng().random();
            let row_bytes = output.stride();
            // In-place: row-based parallelism to avoid rayon micro-task overhead
            output
                .data_mut()
                .par_chunks_exact_mut(row_bytes)
                .enumerate()
                .for_each(|(y, row)| {
                    let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(y as u64));
                    apply_row(effect, row, &mut rng);
                });
        }
        _ => {
            let mut rng = config.rng();
            for y in 0..output.height() {
                apply_row(effect, output.row_mut(y), &mut rng);
            }
        }
    }

    Ok(output)
}
