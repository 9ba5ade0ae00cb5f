// src/utils/config.rs
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use config::{Config as ConfigLib, ConfigError, Environment, File};
use crate::utils::error::{Result, IdGateError};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub verification: VerificationConfig,
    pub document: DocumentConfig,
    pub review: ReviewConfig,
    pub artifacts: ArtifactConfig,
    pub blacklist: BlacklistConfig,
    pub engines: EngineConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerificationConfig {
    /// Comparator distance at which the normalized score reaches zero.
    pub distance_threshold: f64,
    pub approval_cutoff: f64,
    pub engine_timeout_secs: u64,
    /// Budget for screening one selfie against the whole blacklist.
    pub screen_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentConfig {
    /// Minimum variance of the Laplacian accepted before OCR runs.
    pub min_sharpness: f64,
    pub ocr_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewConfig {
    pub ocr_min: f64,
    pub match_min: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactConfig {
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlacklistConfig {
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub face_url: String,
    pub ocr_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub dir: PathBuf,
    pub json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".into(),
                port: 5002,
                workers: 4,
                max_upload_bytes: 5 * 1024 * 1024,
            },
            verification: VerificationConfig {
                distance_threshold: 0.6,
                approval_cutoff: 0.8,
                engine_timeout_secs: 30,
                screen_timeout_secs: 120,
            },
            document: DocumentConfig {
                min_sharpness: 100.0,
                ocr_timeout_secs: 30,
            },
            review: ReviewConfig {
                ocr_min: 0.8,
                match_min: 0.8,
            },
            artifacts: ArtifactConfig {
                dir: default_artifact_dir(),
            },
            blacklist: BlacklistConfig {
                dir: PathBuf::from("/blacklist"),
            },
            engines: EngineConfig {
                face_url: "http://127.0.0.1:8502/verify".into(),
                ocr_url: "http://127.0.0.1:8501/ocr".into(),
            },
            logging: LoggingConfig {
                level: "info".into(),
                dir: PathBuf::from("logs"),
                json: false,
            },
        }
    }
}

fn default_artifact_dir() -> PathBuf {
    std::env::temp_dir().join("idgate")
}

impl Config {
    pub fn new() -> Result<Self> {
        let defaults = Config::default();
        let config = ConfigLib::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", 5002)?
            .set_default("server.workers", 4)?
            .set_default("server.max_upload_bytes", 5_242_880)?  // 5MB
            .set_default("verification.distance_threshold", 0.6)?
            .set_default("verification.approval_cutoff", 0.8)?
            .set_default("verification.engine_timeout_secs", 30)?
            .set_default("verification.screen_timeout_secs", 120)?
            .set_default("document.min_sharpness", 100.0)?
            .set_default("document.ocr_timeout_secs", 30)?
            .set_default("review.ocr_min", 0.8)?
            .set_default("review.match_min", 0.8)?
            .set_default(
                "artifacts.dir",
                defaults.artifacts.dir.to_string_lossy().into_owned(),
            )?
            .set_default("blacklist.dir", "/blacklist")?
            .set_default("engines.face_url", defaults.engines.face_url)?
            .set_default("engines.ocr_url", defaults.engines.ocr_url)?
            .set_default("logging.level", "info")?
            .set_default("logging.dir", "logs")?
            .set_default("logging.json", false)?

            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // e.g. IDGATE__SERVER__PORT=8080
            .add_source(
                Environment::with_prefix("IDGATE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )

            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(IdGateError::Config("Invalid port number".into()));
        }
        if self.server.workers == 0 {
            return Err(IdGateError::Config("workers must be greater than 0".into()));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(IdGateError::Config("max_upload_bytes must be greater than 0".into()));
        }

        if !(self.verification.distance_threshold > 0.0) {
            return Err(IdGateError::Config("distance_threshold must be positive".into()));
        }
        check_unit("verification.approval_cutoff", self.verification.approval_cutoff)?;
        if self.verification.engine_timeout_secs == 0 {
            return Err(IdGateError::Config("engine_timeout_secs must be greater than 0".into()));
        }
        if self.verification.screen_timeout_secs == 0 {
            return Err(IdGateError::Config("screen_timeout_secs must be greater than 0".into()));
        }

        if !(self.document.min_sharpness >= 0.0) {
            return Err(IdGateError::Config("min_sharpness must not be negative".into()));
        }
        if self.document.ocr_timeout_secs == 0 {
            return Err(IdGateError::Config("ocr_timeout_secs must be greater than 0".into()));
        }

        check_unit("review.ocr_min", self.review.ocr_min)?;
        check_unit("review.match_min", self.review.match_min)?;

        Ok(())
    }

    pub fn engine_timeout(&self) -> Duration {
        Duration::from_secs(self.verification.engine_timeout_secs)
    }

    pub fn screen_timeout(&self) -> Duration {
        Duration::from_secs(self.verification.screen_timeout_secs)
    }

    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_secs(self.document.ocr_timeout_secs)
    }
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(IdGateError::Config(format!("{} must be within [0, 1], got {}", name, value)))
    }
}

impl From<ConfigError> for IdGateError {
    fn from(error: ConfigError) -> Self {
        IdGateError::Config(error.to_string())
    }
}
