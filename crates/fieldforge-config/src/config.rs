//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name of the persisted configuration inside the config directory.
pub const CONFIG_FILE_NAME: &str = "fieldforge.ron";

/// Environment variable naming the config directory. Falls back to the
/// current working directory when unset.
pub const CONFIG_DIR_ENV: &str = "FIELDFORGE_CONFIG_DIR";

/// Top-level FieldForge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Settings applied to newly created Bounds Controllers.
    pub defaults: BoundsSettings,
    /// Ground-truth regression harness settings.
    pub harness: HarnessConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Global settings owned by one Bounds Controller (hierarchy root).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BoundsSettings {
    /// Meshing resolution for explicit final rebuilds.
    pub final_resolution: u32,
    /// Meshing resolution for automatic viewport rebuilds.
    pub viewport_resolution: u32,
    /// Blend factor applied between the direct children of the root.
    pub global_blend_factor: f64,
    /// Inactivity time in seconds before an automatic rebuild may start.
    pub update_delay_s: f64,
    /// Minimum time in seconds between the end of one rebuild and the
    /// start of the next automatic one.
    pub min_update_interval_s: f64,
    /// Enable automatic viewport rebuilds on change.
    pub auto_update: bool,
    /// Create the result object when the root has none bound.
    pub create_result_object: bool,
    /// Smooth-shade the published result mesh.
    pub result_smooth_shade: bool,
}

/// Regression harness configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HarnessConfig {
    /// Root of the tests tree holding generated and ground-truth OBJ files.
    pub tests_dir: PathBuf,
    /// Maximum per-component vertex deviation for a passing comparison.
    pub tolerance: f64,
    /// Host command that rebuilds and exports one case, program first. The
    /// output path is appended as the last argument. Empty means the
    /// outputs already on disk are compared as they are.
    pub export_command: Vec<String>,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for BoundsSettings {
    fn default() -> Self {
        Self {
            final_resolution: 30,
            viewport_resolution: 10,
            global_blend_factor: 0.1,
            update_delay_s: 0.3,
            min_update_interval_s: 0.5,
            auto_update: true,
            create_result_object: true,
            result_smooth_shade: true,
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            tests_dir: PathBuf::from("tests"),
            tolerance: 1e-6,
            export_command: Vec::new(),
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Resolves the config directory from [`CONFIG_DIR_ENV`], or the current
    /// directory.
    pub fn config_dir() -> PathBuf {
        std::env::var_os(CONFIG_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            let config = Self::read(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Load config from the given directory, falling back to defaults when
    /// no file exists. Never writes to disk.
    pub fn load_or_default(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Self::read(&config_path)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to the given directory as [`CONFIG_FILE_NAME`].
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let write_err = |source| ConfigError::Write {
            path: config_path.clone(),
            source,
        };
        std::fs::create_dir_all(config_dir).map_err(write_err)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;

        std::fs::write(&config_path, serialized).map_err(write_err)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = Self::read(&config_dir.join(CONFIG_FILE_NAME))?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    /// Raise the log level to `debug` when verbose output was requested.
    pub fn apply_verbosity(&mut self, verbose: bool) {
        if verbose {
            self.debug.log_level = "debug".to_string();
        }
    }

    /// Resolve the tests directory against `base` when it is relative.
    pub fn tests_dir(&self, base: &Path) -> PathBuf {
        if self.harness.tests_dir.is_absolute() {
            self.harness.tests_dir.clone()
        } else {
            base.join(&self.harness.tests_dir)
        }
    }

    /// Rejects values the scheduler and harness cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.defaults.validate()?;
        if !(self.harness.tolerance.is_finite() && self.harness.tolerance >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "harness.tolerance",
                reason: "must be a finite non-negative number",
            });
        }
        Ok(())
    }

    fn read(config_path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
                path: config_path.to_path_buf(),
                source,
            })?;
        let config: Self = ron::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }
}

impl BoundsSettings {
    /// Resolutions must be positive; times and blend must be finite and
    /// non-negative.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = |value: f64| value.is_finite() && value >= 0.0;
        let checks = [
            (self.final_resolution > 0, "defaults.final_resolution"),
            (self.viewport_resolution > 0, "defaults.viewport_resolution"),
            (non_negative(self.global_blend_factor), "defaults.global_blend_factor"),
            (non_negative(self.update_delay_s), "defaults.update_delay_s"),
            (non_negative(self.min_update_interval_s), "defaults.min_update_interval_s"),
        ];
        match checks.into_iter().find(|(ok, _)| !ok) {
            Some((_, field)) => Err(ConfigError::Invalid {
                field,
                reason: "out of range",
            }),
            None => Ok(()),
        }
    }
}
