//! Configuration for termwire.
//!
//! Loaded from `~/.termwire/config.toml` unless another path is given.
//! Every key is optional:
//!
//! ```toml
//! listen = "127.0.0.1:2323"
//!
//! [input]
//! escape_timeout_ms = 50
//!
//! [geometry]
//! cols = 80
//! rows = 24
//!
//! [frame]
//! border_style = "rounded"   # rounded, sharp, double, heavy, ascii
//! padding = 1
//!
//! [log]
//! level = "info"
//! file = "/tmp/termwire.log"
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout::{BorderSpec, BorderStyle};
use crate::server::ServerConfig;
use crate::transport::Geometry;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not determine config path")]
    NoHome,
}

/// Longest accepted escape disambiguation window
pub const MAX_ESCAPE_TIMEOUT_MS: u64 = 10_000;

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the TCP adapter binds to
    pub listen: String,
    pub input: InputConfig,
    pub geometry: GeometryConfig,
    pub frame: FrameConfig,
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:2323".to_string(),
            input: InputConfig::default(),
            geometry: GeometryConfig::default(),
            frame: FrameConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// Key decoder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// How long a lone ESC waits for the rest of a sequence
    pub escape_timeout_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            escape_timeout_ms: crate::input::ESCAPE_TIMEOUT.as_millis() as u64,
        }
    }
}

/// Geometry used when the client never negotiates one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub cols: u16,
    pub rows: u16,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        let geometry = Geometry::default();
        Self {
            cols: geometry.cols,
            rows: geometry.rows,
        }
    }
}

/// Frame border settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    pub border_style: String,
    pub padding: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            border_style: BorderStyle::default().name().to_string(),
            padding: 1,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive, `RUST_LOG` takes precedence
    pub level: String,
    /// Log to this file instead of stderr
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from `path`. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from the default location
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Save configuration to `path`, creating its directory
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| ConfigError::Write {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save to the default location
    pub fn save_default(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or(ConfigError::NoHome)?;
        self.save(&path)
    }

    /// `~/.termwire/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        home_dir().map(|home| home.join(".termwire").join("config.toml"))
    }

    /// Capped at [`MAX_ESCAPE_TIMEOUT_MS`]
    pub fn escape_timeout(&self) -> Duration {
        Duration::from_millis(self.input.escape_timeout_ms.min(MAX_ESCAPE_TIMEOUT_MS))
    }

    pub fn default_geometry(&self) -> Geometry {
        Geometry::new(self.geometry.cols, self.geometry.rows)
    }

    pub fn border_style(&self) -> BorderStyle {
        BorderStyle::by_name(&self.frame.border_style)
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::new(self.default_geometry(), self.escape_timeout())
    }

    pub fn border_spec(&self) -> BorderSpec {
        BorderSpec::new(self.border_style()).with_padding(self.frame.padding)
    }
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("termwire-config-{}-{}", std::process::id(), name))
            .join("config.toml")
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.escape_timeout(), Duration::from_millis(50));
        assert_eq!(config.default_geometry(), Geometry::new(80, 24));
        assert_eq!(config.border_style(), BorderStyle::Rounded);
        assert_eq!(config.border_spec().padding, 1);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::parse(
            r#"
            listen = "0.0.0.0:4000"

            [frame]
            border_style = "double"
            "#,
        )
        .unwrap();

        assert_eq!(config.listen, "0.0.0.0:4000");
        assert_eq!(config.border_style(), BorderStyle::Double);
        assert_eq!(config.frame.padding, 1);
        assert_eq!(config.input, InputConfig::default());
    }

    #[test]
    fn test_server_config() {
        let config = Config::parse(
            r#"
            [input]
            escape_timeout_ms = 120

            [geometry]
            cols = 0
            rows = 50
            "#,
        )
        .unwrap();

        let server = config.server_config();
        assert_eq!(server.session.escape_timeout, Duration::from_millis(120));
        assert_eq!(server.session.default_geometry, Geometry::new(1, 50));
    }

    #[test]
    fn test_escape_timeout_capped() {
        let mut config = Config::default();
        config.input.escape_timeout_ms = u64::MAX;
        assert_eq!(config.escape_timeout(), Duration::from_millis(MAX_ESCAPE_TIMEOUT_MS));
        assert_eq!(
            config.server_config().session.escape_timeout,
            Duration::from_millis(MAX_ESCAPE_TIMEOUT_MS)
        );
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = Config::load(&temp_path("missing")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let path = temp_path("malformed");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "listen = [").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));

        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("save");
        let mut config = Config::default();
        config.frame.border_style = "ascii".to_string();
        config.log.file = Some(PathBuf::from("/tmp/termwire.log"));

        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);

        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }
}
