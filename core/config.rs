use crate::error::{AppError, Result};
use log;
use parse_duration::parse;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CONFIG_DIR: &str = "rendergit";
pub const DEFAULT_CONFIG_FILENAME: &str = "rendergit.toml";
pub const DEFAULT_MAX_BYTES: u64 = 50 * 1024;
pub const DEFAULT_THEME: &str = "InspiredGitHub";
pub const DEFAULT_CACHE_TTL: &str = "24h";
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub flatten: FlattenConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    /// Files larger than this are listed but never rendered.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
    /// Extra glob patterns (relative to the repository root) classified as ignored.
    #[serde(default)]
    pub ignore: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TreeConfig {
    #[serde(default = "default_true")]
    pub use_tree_command: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RenderConfig {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_true")]
    pub markdown: bool,
    #[serde(default = "default_true")]
    pub highlight: bool,
    #[serde(default = "default_true")]
    pub include_stats: bool,
    #[serde(default = "default_true")]
    pub include_flattened_view: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FlattenConfig {
    #[serde(default)]
    pub format: FlatFormat,
    #[serde(default = "default_false")]
    pub json_minify: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_cache_ttl")]
    pub ttl: String,
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FlatFormat {
    #[default]
    Cxml,
    Json,
    Yaml,
    Xml,
}

impl FlatFormat {
    pub fn extension(self) -> &'static str {
        match self {
            FlatFormat::Cxml => "txt",
            FlatFormat::Json => "json",
            FlatFormat::Yaml => "yaml",
            FlatFormat::Xml => "xml",
        }
    }
}

impl FromStr for FlatFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cxml" => Ok(FlatFormat::Cxml),
            "json" => Ok(FlatFormat::Json),
            "yaml" | "yml" => Ok(FlatFormat::Yaml),
            "xml" => Ok(FlatFormat::Xml),
            other => Err(AppError::InvalidArgument(format!(
                "Unknown flattened format '{}'. Use cxml, json, yaml or xml.",
                other
            ))),
        }
    }
}

impl fmt::Display for FlatFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlatFormat::Cxml => "cxml",
            FlatFormat::Json => "json",
            FlatFormat::Yaml => "yaml",
            FlatFormat::Xml => "xml",
        };
        f.write_str(name)
    }
}

fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_max_bytes() -> u64 {
    DEFAULT_MAX_BYTES
}
fn default_theme() -> String {
    DEFAULT_THEME.to_string()
}
fn default_cache_ttl() -> String {
    DEFAULT_CACHE_TTL.to_string()
}
fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
            ignore: Vec::new(),
        }
    }
}
impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            use_tree_command: default_true(),
        }
    }
}
impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            markdown: default_true(),
            highlight: default_true(),
            include_stats: default_true(),
            include_flattened_view: default_true(),
        }
    }
}
impl Default for FlattenConfig {
    fn default() -> Self {
        Self {
            format: FlatFormat::default(),
            json_minify: default_false(),
        }
    }
}
impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            ttl: default_cache_ttl(),
            capacity: default_cache_capacity(),
        }
    }
}

impl Config {
    /// `<user config dir>/rendergit/rendergit.toml`, if the platform has a config dir.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILENAME))
    }

    pub fn resolve_config_path(
        cli_config_file: Option<&String>,
        cli_disable_config: bool,
    ) -> Result<Option<PathBuf>> {
        if cli_disable_config {
            log::debug!("Config file loading disabled via CLI flag.");
            return Ok(None);
        }

        match cli_config_file {
            Some(p_str) => {
                let expanded_path_cow = shellexpand::tilde(p_str);
                let mut path = PathBuf::from(expanded_path_cow.as_ref());
                if !path.exists() && path.extension().is_none() {
                    path.set_extension("toml");
                }
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "Specified config file not found at path: {}",
                        path.display()
                    )));
                }
                log::debug!("Using specified config file path: {}", path.display());
                Ok(Some(path))
            }
            None => match Self::default_config_path() {
                Some(default_path) if default_path.exists() => {
                    log::debug!("Using default config file path: {}", default_path.display());
                    Ok(Some(default_path))
                }
                Some(default_path) => {
                    log::debug!(
                        "No config file specified and default not found at: {}",
                        default_path.display()
                    );
                    Ok(None)
                }
                None => {
                    log::debug!("No user config directory on this platform.");
                    Ok(None)
                }
            },
        }
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", config_path.display());
        let toml_content = fs::read_to_string(config_path).map_err(|e| AppError::FileRead {
            path: config_path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&toml_content).map_err(|e| match e {
            AppError::TomlParse(msg) => AppError::TomlParse(format!(
                "Error parsing config file '{}': {}",
                config_path.display(),
                msg
            )),
            other => other,
        })
    }

    pub fn from_toml_str(toml_content: &str) -> Result<Self> {
        let config = toml::from_str::<Config>(toml_content).map_err(|e| {
            AppError::TomlParse(format!("{}. Check TOML syntax and structure.", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache.capacity == 0 {
            return Err(AppError::Config(
                "[cache].capacity must be greater than 0".to_string(),
            ));
        }
        self.get_cache_ttl()?;
        Ok(())
    }

    pub fn get_cache_ttl(&self) -> Result<Duration> {
        let ttl = parse(&self.cache.ttl).inspect_err(|e| {
            log::error!(
                "Invalid cache ttl duration '{}': {}. Use format like '30m', '24h'.",
                self.cache.ttl,
                e
            )
        })?;
        Ok(ttl)
    }

    /// Configured cache directory, falling back to `<user cache dir>/rendergit`.
    pub fn get_cache_dir(&self) -> Result<PathBuf> {
        match &self.cache.dir {
            Some(dir) => Ok(PathBuf::from(
                shellexpand::tilde(&dir.to_string_lossy()).as_ref(),
            )),
            None => dirs::cache_dir()
                .map(|d| d.join(DEFAULT_CONFIG_DIR))
                .ok_or_else(|| {
                    AppError::Config(
                        "Could not determine a cache directory; set [cache].dir".to_string(),
                    )
                }),
        }
    }
}
