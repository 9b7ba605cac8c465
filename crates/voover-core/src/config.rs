use std::fs;
use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::palette::Palette;

/// Engine settings shared by the pipeline, the worker and the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fixed RNG seed for noise and floodfill. `None` draws a fresh seed per run.
    pub seed: Option<u64>,
    /// Palette given to colorize/floodfill effects built from names.
    pub palette: Palette,
    /// Log a progress line every this many rows (or columns). 0 disables.
    pub progress_log_interval: u32,
    /// Let `apply_one` process rows on the rayon pool.
    pub parallel_single_apply: bool,
}

impl EngineConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// RNG for one run: seeded if configured, otherwise from the thread RNG.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.palette.validate()?;
        Ok(config)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            palette: Palette::default(),
            progress_log_interval: 100,
            parallel_single_apply: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.seed, None);
        assert_eq!(config.palette.len(), 10);
        assert_eq!(config.progress_log_interval, 100);
        assert!(config.parallel_single_apply);
    }

    #[test]
    fn test_seeded_rng_is_repeatable() {
        let config = EngineConfig::with_seed(42);
        let a: u64 = config.rng().random();
        let b: u64 = config.rng().random();
        assert_eq!(a, b);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"seed": 3}"#).unwrap();
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.progress_log_interval, 100);
    }

    #[test]
    fn test_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        let mut config = EngineConfig::with_seed(8);
        config.progress_log_interval = 0;
        config.save(&path).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_rejects_short_palette() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        fs::write(&path, r#"{"palette": [[0, 0, 0]]}"#).unwrap();
        assert!(EngineConfig::load(&path).is_err());
    }
}
