//! Application configuration for CourseLens.
//!
//! User config lives at `~/.courselens/courselens.toml`.
//! CLI flags override config file values, which override defaults.
//!
//! The library crates never read this file themselves: the application
//! resolves an [`AppConfig`] once and hands the derived [`GatewayConfig`]
//! and [`PageContract`] down by injection.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CourseLensError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "courselens.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".courselens";

/// Base URL of the course-data service.
pub const DEFAULT_HOST: &str = "https://courselens.fly.dev";

// ---------------------------------------------------------------------------
// Config structs (matching courselens.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Data service settings.
    #[serde(default)]
    pub gateway: GatewaySection,

    /// Catalog page structure markers.
    #[serde(default)]
    pub contract: ContractSection,
}

/// `[gateway]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySection {
    /// Base URL of the course-data service.
    #[serde(default = "default_host")]
    pub host: String,

    /// Per-request timeout in seconds. Absent means the transport default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            host: default_host(),
            timeout_secs: None,
        }
    }
}

fn default_host() -> String {
    DEFAULT_HOST.into()
}

/// `[contract]` section: the class names and sentinels the catalog page is
/// expected to carry. Kept in config so a page redesign can be absorbed
/// without a rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractSection {
    /// Class of the container watched for inserted sections.
    #[serde(default = "default_observe_root")]
    pub observe_root: String,

    /// Class of a course container; its `id` attribute is the course id.
    #[serde(default = "default_course")]
    pub course: String,

    /// Class of the course title element inside a course container.
    #[serde(default = "default_course_title")]
    pub course_title: String,

    /// Class of a freshly inserted block of section rows.
    #[serde(default = "default_sections_container")]
    pub sections_container: String,

    /// Class of the per-section wrapper inside a sections container.
    #[serde(default = "default_section_info")]
    pub section_info: String,

    /// Class of one section row inside the wrapper.
    #[serde(default = "default_section_row")]
    pub section_row: String,

    /// Class of an instructor name element inside a row.
    #[serde(default = "default_instructor")]
    pub instructor: String,

    /// Class of the row's instructor block, used as the annotation anchor.
    #[serde(default = "default_instructor_anchor")]
    pub instructor_anchor: String,

    /// Instructor text that means "not yet assigned"; never looked up.
    #[serde(default = "default_tba_sentinel")]
    pub tba_sentinel: String,

    /// Upper bound on upward DOM walks when locating an owning course.
    #[serde(default = "default_walk_limit")]
    pub ancestor_walk_limit: usize,
}

impl Default for ContractSection {
    fn default() -> Self {
        Self {
            observe_root: default_observe_root(),
            course: default_course(),
            course_title: default_course_title(),
            sections_container: default_sections_container(),
            section_info: default_section_info(),
            section_row: default_section_row(),
            instructor: default_instructor(),
            instructor_anchor: default_instructor_anchor(),
            tba_sentinel: default_tba_sentinel(),
            ancestor_walk_limit: default_walk_limit(),
        }
    }
}

fn default_observe_root() -> String {
    "course-prefix-container".into()
}
fn default_course() -> String {
    "course".into()
}
fn default_course_title() -> String {
    "course-title".into()
}
fn default_sections_container() -> String {
    "sections-container".into()
}
fn default_section_info() -> String {
    "section-info-container".into()
}
fn default_section_row() -> String {
    "row".into()
}
fn default_instructor() -> String {
    "section-instructor".into()
}
fn default_instructor_anchor() -> String {
    "section-instructors".into()
}
fn default_tba_sentinel() -> String {
    "Instructor: TBA".into()
}
fn default_walk_limit() -> usize {
    32
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config file + CLI flags, passed by injection)
// ---------------------------------------------------------------------------

/// Runtime gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the course-data service. Validated when the gateway
    /// client is built.
    pub base_url: String,
    /// Per-request timeout. `None` leaves the transport default in place.
    pub timeout: Option<Duration>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_HOST.into(),
            timeout: None,
        }
    }
}

impl From<&AppConfig> for GatewayConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_url: config.gateway.host.clone(),
            timeout: config.gateway.timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Runtime page contract: every structural assumption the pipeline makes
/// about the catalog page, in one injectable value.
#[derive(Debug, Clone)]
pub struct PageContract {
    pub observe_root: String,
    pub course: String,
    pub course_title: String,
    pub sections_container: String,
    pub section_info: String,
    pub section_row: String,
    pub instructor: String,
    pub instructor_anchor: String,
    pub tba_sentinel: String,
    pub ancestor_walk_limit: usize,
}

impl Default for PageContract {
    fn default() -> Self {
        Self::from(&ContractSection::default())
    }
}

impl From<&ContractSection> for PageContract {
    fn from(section: &ContractSection) -> Self {
        Self {
            observe_root: section.observe_root.clone(),
            course: section.course.clone(),
            course_title: section.course_title.clone(),
            sections_container: section.sections_container.clone(),
            section_info: section.section_info.clone(),
            section_row: section.section_row.clone(),
            instructor: section.instructor.clone(),
            instructor_anchor: section.instructor_anchor.clone(),
            tba_sentinel: section.tba_sentinel.clone(),
            ancestor_walk_limit: section.ancestor_walk_limit,
        }
    }
}

impl From<&AppConfig> for PageContract {
    fn from(config: &AppConfig) -> Self {
        Self::from(&config.contract)
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.courselens/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CourseLensError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.courselens/courselens.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CourseLensError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| CourseLensError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CourseLensError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CourseLensError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CourseLensError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("host"));
        assert!(toml_str.contains("course-prefix-container"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.gateway.host, DEFAULT_HOST);
        assert_eq!(parsed.contract.tba_sentinel, "Instructor: TBA");
        assert_eq!(parsed.gateway.timeout_secs, None);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[gateway]
host = "http://localhost:8000"
timeout_secs = 10

[contract]
course = "course-card"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.gateway.host, "http://localhost:8000");
        assert_eq!(config.gateway.timeout_secs, Some(10));
        assert_eq!(config.contract.course, "course-card");
        // Everything unset falls back to the page's shipping markup.
        assert_eq!(config.contract.course_title, "course-title");
        assert_eq!(config.contract.ancestor_walk_limit, 32);
    }

    #[test]
    fn gateway_config_from_app_config() {
        let toml_str = r#"
[gateway]
timeout_secs = 30
"#;
        let app: AppConfig = toml::from_str(toml_str).expect("parse");
        let gateway = GatewayConfig::from(&app);
        assert_eq!(gateway.base_url, DEFAULT_HOST);
        assert_eq!(gateway.timeout, Some(Duration::from_secs(30)));

        let default = GatewayConfig::default();
        assert_eq!(default.timeout, None);
    }

    #[test]
    fn contract_from_app_config() {
        let app = AppConfig::default();
        let contract = PageContract::from(&app);
        assert_eq!(contract.observe_root, "course-prefix-container");
        assert_eq!(contract.instructor_anchor, "section-instructors");
    }
}
