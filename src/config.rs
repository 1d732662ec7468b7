use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the data-selection service
    #[serde(default = "default_server_url")]
    pub server_url: String,

    #[serde(default = "default_generate_url_path")]
    pub generate_url_path: String,

    #[serde(default = "default_process_data_path")]
    pub process_data_path: String,

    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Per-request timeout; requests wait indefinitely when unset
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Log in before the first request when set (password from ACSFORM_PASSWORD)
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub form: FormDefaults,

    #[serde(default)]
    pub controls: Controls,
}

/// Initial values for the data-selection form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormDefaults {
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default = "default_acs_type")]
    pub acs_type: String,
    #[serde(default = "default_data_option")]
    pub data_option: String,
    #[serde(default)]
    pub selected_variables: String,
    #[serde(default = "default_geography")]
    pub geography: String,
    #[serde(default)]
    pub api_key: String,
}

/// Which confirmation controls the Confirmation view offers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Controls {
    #[serde(default = "enabled")]
    pub confirm: bool,
    #[serde(default = "enabled")]
    pub cancel: bool,
}

fn default_server_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_generate_url_path() -> String {
    "/api/generate_url".to_string()
}

fn default_process_data_path() -> String {
    "/process_data".to_string()
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_table() -> String {
    "DP05".to_string()
}

fn default_acs_type() -> String {
    "acs5".to_string()
}

fn default_data_option() -> String {
    "entire_table".to_string()
}

fn default_geography() -> String {
    "state:*".to_string()
}

fn enabled() -> bool {
    true
}

fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var("HOME").ok()?;
    Some(PathBuf::from(home).join(".acsform").join("config.toml"))
}

impl Config {
    /// Loads `path` if given, otherwise ~/.acsform/config.toml, falling back to defaults
    /// when no file exists. An explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::load_from(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            generate_url_path: default_generate_url_path(),
            process_data_path: default_process_data_path(),
            login_path: default_login_path(),
            request_timeout_secs: None,
            username: None,
            form: FormDefaults::default(),
            controls: Controls::default(),
        }
    }
}

impl Default for FormDefaults {
    fn default() -> Self {
        Self {
            table: default_table(),
            year: None,
            acs_type: default_acs_type(),
            data_option: default_data_option(),
            selected_variables: String::new(),
            geography: default_geography(),
            api_key: String::new(),
        }
    }
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            confirm: true,
            cancel: true,
        }
    }
}
