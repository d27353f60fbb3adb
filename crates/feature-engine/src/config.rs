//! Feature extraction configuration

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FeatureError;
use crate::scales::validate_sigma_bounds;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "FEATURES";

/// Number of worker threads used for the per-(channel, scale) tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Workers {
    /// One worker per available execution unit
    #[default]
    Auto,
    /// Exactly this many workers (1 = serial)
    Fixed(usize),
}

impl Workers {
    /// Resolve to a concrete thread count
    pub fn resolve(self) -> Result<usize, FeatureError> {
        match self {
            Workers::Auto => Ok(std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)),
            Workers::Fixed(0) => Err(FeatureError::InvalidParameter(
                "workers must be at least 1".to_string(),
            )),
            Workers::Fixed(n) => Ok(n),
        }
    }
}

/// Which descriptor families are emitted per (channel, scale)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Gaussian-smoothed intensity
    pub intensity: bool,
    /// Sobel gradient magnitude of the smoothed image
    pub edges: bool,
    /// Hessian eigenvalues of the smoothed image
    pub texture: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            intensity: true,
            edges: true,
            texture: true,
        }
    }
}

impl FeatureFlags {
    /// Whether at least one family is enabled
    pub fn any(&self) -> bool {
        self.intensity || self.edges || self.texture
    }

    /// Number of arrays emitted for one (channel, scale) pair of a
    /// `spatial_ndim`-dimensional image
    pub fn per_scale(&self, spatial_ndim: usize) -> usize {
        usize::from(self.intensity)
            + usize::from(self.edges)
            + if self.texture { spatial_ndim } else { 0 }
    }
}

/// Parameters of a feature stack computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Treat the trailing axis of a 3+-dimensional image as channels
    pub multichannel: bool,
    pub intensity: bool,
    pub edges: bool,
    pub texture: bool,
    /// Smallest Gaussian standard deviation
    pub sigma_min: f64,
    /// Largest Gaussian standard deviation
    pub sigma_max: f64,
    pub workers: Workers,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            multichannel: true,
            intensity: true,
            edges: true,
            texture: true,
            sigma_min: 0.5,
            sigma_max: 16.0,
            workers: Workers::Auto,
        }
    }
}

impl FeatureConfig {
    /// Fine-detail preset (small scales only)
    pub fn fine() -> Self {
        Self {
            sigma_min: 0.5,
            sigma_max: 4.0,
            ..Default::default()
        }
    }

    /// Coarse preset (large scales, no per-pixel texture)
    pub fn coarse() -> Self {
        Self {
            sigma_min: 2.0,
            sigma_max: 32.0,
            texture: false,
            ..Default::default()
        }
    }

    /// Load configuration from a file, with `FEATURES__*` environment overrides.
    /// Missing keys fall back to the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FeatureError> {
        let path = path.as_ref();
        debug!("Loading feature configuration from {}", path.display());

        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: FeatureConfig = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Descriptor families selected by this configuration
    pub fn flags(&self) -> FeatureFlags {
        FeatureFlags {
            intensity: self.intensity,
            edges: self.edges,
            texture: self.texture,
        }
    }

    /// Check sigma bounds, flags and worker count
    pub fn validate(&self) -> Result<(), FeatureError> {
        validate_sigma_bounds(self.sigma_min, self.sigma_max)?;
        if !self.flags().any() {
            return Err(FeatureError::InvalidParameter(
                "at least one of intensity, edges, texture must be enabled".to_string(),
            ));
        }
        self.workers.resolve()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = FeatureConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.sigma_min, 0.5);
        assert_eq!(cfg.sigma_max, 16.0);
        assert!(FeatureConfig::fine().validate().is_ok());
        assert!(FeatureConfig::coarse().validate().is_ok());
    }

    #[test]
    fn test_invalid_configs() {
        let no_flags = FeatureConfig {
            intensity: false,
            edges: false,
            texture: false,
            ..Default::default()
        };
        assert!(matches!(
            no_flags.validate(),
            Err(FeatureError::InvalidParameter(_))
        ));

        let inverted = FeatureConfig {
            sigma_min: 4.0,
            sigma_max: 1.0,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());

        let zero_workers = FeatureConfig {
            workers: Workers::Fixed(0),
            ..Default::default()
        };
        assert!(zero_workers.validate().is_err());
    }

    #[test]
    fn test_per_scale_count() {
        let all = FeatureFlags::default();
        assert_eq!(all.per_scale(2), 4);
        assert_eq!(all.per_scale(3), 5);

        let texture_only = FeatureFlags {
            intensity: false,
            edges: false,
            texture: true,
        };
        assert_eq!(texture_only.per_scale(3), 3);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: FeatureConfig =
            serde_json::from_str(r#"{"edges": false, "workers": {"fixed": 2}}"#).unwrap();
        assert!(!cfg.edges);
        assert_eq!(cfg.workers, Workers::Fixed(2));
        assert_eq!(cfg.sigma_max, 16.0);

        let auto: FeatureConfig = serde_json::from_str(r#"{"workers": "auto"}"#).unwrap();
        assert_eq!(auto.workers, Workers::Auto);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!(
            "feature-engine-config-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "sigma_min = 1.0\nsigma_max = 4.0\ntexture = false\n").unwrap();

        let cfg = FeatureConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(cfg.sigma_min, 1.0);
        assert_eq!(cfg.sigma_max, 4.0);
        assert!(!cfg.texture);
        // untouched keys keep their defaults
        assert!(cfg.intensity);
        assert_eq!(cfg.workers, Workers::Auto);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let path = std::env::temp_dir().join(format!(
            "feature-engine-bad-config-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "sigma_min = 8.0\nsigma_max = 2.0\n").unwrap();

        let result = FeatureConfig::load(&path);
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(FeatureError::InvalidParameter(_))));
    }
}
