use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::cli::Args;

/// Default penguins CSV location (seaborn sample data).
pub const DEFAULT_PENGUINS_URL: &str =
    "https://github.com/seaborn/seaborn-data/raw/master/penguins.csv";

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to a specific config file or subdirectory
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Generate default configuration template as a string with comments
    /// All fields are commented out so defaults are used, but users can uncomment to override
    pub fn generate_default_config(&self) -> String {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config)
            .unwrap_or_else(|e| panic!("Failed to serialize default config: {}", e));

        let comments = Self::collect_all_comments();
        Self::comment_all_fields(toml_str, comments)
    }

    /// Collect all field comments from struct comment constants into a map
    fn collect_all_comments() -> HashMap<String, String> {
        let mut comments = HashMap::new();

        for (field, comment) in APP_COMMENTS {
            comments.insert(field.to_string(), comment.to_string());
        }
        let sections: [(&str, &[(&str, &str)]); 5] = [
            ("server", SERVER_COMMENTS),
            ("data", DATA_COMMENTS),
            ("api", API_COMMENTS),
            ("upload", UPLOAD_COMMENTS),
            ("logging", LOGGING_COMMENTS),
        ];
        for (section, fields) in sections {
            for (field, comment) in fields {
                comments.insert(format!("{}.{}", section, field), comment.to_string());
            }
        }

        comments
    }

    /// Comment out all fields in TOML and add comments
    /// Also adds missing Option fields as commented-out `# field = null`
    fn comment_all_fields(toml: String, comments: HashMap<String, String>) -> String {
        let mut result = String::new();
        result.push_str("# tabdash configuration file\n");
        result
            .push_str("# This file uses TOML format. See https://toml.io/ for syntax reference.\n");
        result.push('\n');

        let mut current_section = String::new();
        let mut seen_fields: HashSet<String> = HashSet::new();

        for line in toml.lines() {
            if let Some(section) = Self::extract_section_name(line) {
                current_section = section.clone();

                if let Some(header) = SECTION_HEADERS.iter().find(|(s, _)| s == &section) {
                    result.push_str(header.1);
                    result.push('\n');
                }

                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
                continue;
            }

            if let Some(field_path) = Self::extract_field_path(line, &current_section) {
                if let Some(comment) = comments.get(&field_path) {
                    for comment_line in comment.lines() {
                        result.push_str("# ");
                        result.push_str(comment_line);
                        result.push('\n');
                    }
                }
                seen_fields.insert(field_path);

                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
            } else {
                result.push_str(line);
                result.push('\n');
            }
        }

        Self::add_missing_option_fields(result, &comments, &seen_fields)
    }

    /// Add Option fields that weren't serialized (because they're None)
    fn add_missing_option_fields(
        mut result: String,
        comments: &HashMap<String, String>,
        seen_fields: &HashSet<String>,
    ) -> String {
        let option_fields = ["data.wine_source", "logging.level"];

        for field_path in option_fields {
            if seen_fields.contains(field_path) {
                continue;
            }
            let Some((section, field_name)) = field_path.split_once('.') else {
                continue;
            };
            let section_header = format!("[{}]", section);
            let Some(section_pos) = result.find(&section_header) else {
                continue;
            };
            let after_header_start = section_pos + section_header.len();
            let newline_pos = result[after_header_start..].find('\n').unwrap_or(0);
            let insert_pos = after_header_start + newline_pos + 1;

            let mut new_content = String::new();
            if let Some(comment) = comments.get(field_path) {
                for comment_line in comment.lines() {
                    new_content.push_str("# ");
                    new_content.push_str(comment_line);
                    new_content.push('\n');
                }
            }
            new_content.push_str(&format!("# {} = null\n", field_name));
            result.insert_str(insert_pos, &new_content);
        }

        result
    }

    /// Extract section name from TOML line like "[server]"
    fn extract_section_name(line: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            Some(trimmed[1..trimmed.len() - 1].to_string())
        } else {
            None
        }
    }

    fn extract_field_path(line: &str, current_section: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('[') {
            return None;
        }

        let (field_name, _) = trimmed.split_once('=')?;
        let field_name = field_name.trim();
        if current_section.is_empty() {
            Some(field_name.to_string())
        } else {
            Some(format!("{}.{}", current_section, field_name))
        }
    }

    /// Write default configuration to config file
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        std::fs::write(&config_path, self.generate_default_config())?;

        Ok(config_path)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub server: ServerConfig,
    pub data: DataConfig,
    pub api: ApiConfig,
    pub upload: UploadConfig,
    pub logging: LoggingConfig,
}

const APP_COMMENTS: &[(&str, &str)] = &[(
    "version",
    "Configuration format version (for future compatibility)",
)];

const SECTION_HEADERS: &[(&str, &str)] = &[
    (
        "server",
        "# ============================================================================\n# HTTP Server\n# ============================================================================",
    ),
    (
        "data",
        "# ============================================================================\n# Datasets (loaded once at startup; failure to load is fatal)\n# ============================================================================",
    ),
    (
        "api",
        "# ============================================================================\n# API-call tab\n# ============================================================================\n# The API-call tab fetches any URL a client supplies. There is no allow-list.",
    ),
    (
        "upload",
        "# ============================================================================\n# File Upload\n# ============================================================================",
    ),
    (
        "logging",
        "# ============================================================================\n# Logging\n# ============================================================================",
    ),
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub session_idle_secs: u64,
}

const SERVER_COMMENTS: &[(&str, &str)] = &[
    ("host", "Address to listen on. Use 0.0.0.0 to listen on all interfaces."),
    ("port", "Port to listen on"),
    (
        "session_idle_secs",
        "Sessions untouched for this many seconds are dropped",
    ),
];

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            session_idle_secs: 1800,
        }
    }
}

impl ServerConfig {
    pub fn merge(&mut self, other: Self) {
        let default = Self::default();
        if other.host != default.host {
            self.host = other.host;
        }
        if other.port != default.port {
            self.port = other.port;
        }
        if other.session_idle_secs != default.session_idle_secs {
            self.session_idle_secs = other.session_idle_secs;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    pub penguins_url: String,
    pub wine_source: Option<String>,
    pub fetch_timeout_secs: u64,
}

const DATA_COMMENTS: &[(&str, &str)] = &[
    (
        "penguins_url",
        "URL (http/https) or local path of the penguins CSV",
    ),
    (
        "wine_source",
        "URL (http/https) or local path of a wine dataset to use instead of the bundled one.\nAccepts the scikit-learn wine_data.csv layout or a headed CSV with a WineType column.",
    ),
    (
        "fetch_timeout_secs",
        "Timeout in seconds for downloading a dataset at startup",
    ),
];

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            penguins_url: DEFAULT_PENGUINS_URL.to_string(),
            wine_source: None,
            fetch_timeout_secs: 30,
        }
    }
}

impl DataConfig {
    pub fn merge(&mut self, other: Self) {
        let default = Self::default();
        if other.penguins_url != default.penguins_url {
            self.penguins_url = other.penguins_url;
        }
        if other.wine_source.is_some() {
            self.wine_source = other.wine_source;
        }
        if other.fetch_timeout_secs != default.fetch_timeout_secs {
            self.fetch_timeout_secs = other.fetch_timeout_secs;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub timeout_secs: u64,
}

const API_COMMENTS: &[(&str, &str)] = &[(
    "timeout_secs",
    "Timeout in seconds for a single API-call request",
)];

impl Default for ApiConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl ApiConfig {
    pub fn merge(&mut self, other: Self) {
        if other.timeout_secs != Self::default().timeout_secs {
            self.timeout_secs = other.timeout_secs;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UploadConfig {
    pub preview_rows: usize,
}

const UPLOAD_COMMENTS: &[(&str, &str)] = &[(
    "preview_rows",
    "Number of rows of an uploaded CSV shown in the preview table",
)];

impl Default for UploadConfig {
    fn default() -> Self {
        Self { preview_rows: 5 }
    }
}

impl UploadConfig {
    pub fn merge(&mut self, other: Self) {
        if other.preview_rows != Self::default().preview_rows {
            self.preview_rows = other.preview_rows;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// EnvFilter directive, e.g. "info" or "tabdash=debug". None = info.
    pub level: Option<String>,
}

const LOGGING_COMMENTS: &[(&str, &str)] = &[(
    "level",
    "Log filter (error, warn, info, debug, trace or an EnvFilter directive such as \"tabdash=debug\").\nRUST_LOG overrides this when set.",
)];

impl LoggingConfig {
    pub fn merge(&mut self, other: Self) {
        if other.level.is_some() {
            self.level = other.level;
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            server: ServerConfig::default(),
            data: DataConfig::default(),
            api: ApiConfig::default(),
            upload: UploadConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

// Configuration loading and merging
impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        let manager = ConfigManager::new(app_name)?;
        Self::load_from(&manager)
    }

    /// Load configuration using the given config directory
    pub fn load_from(manager: &ConfigManager) -> Result<Self> {
        let mut config = AppConfig::default();
        let config_path = manager.config_path("config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path).map_err(|e| {
                eyre!(
                    "Failed to read config file at {}: {}",
                    config_path.display(),
                    e
                )
            })?;
            let user_config: AppConfig = toml::from_str(&content).map_err(|e| {
                eyre!(
                    "Failed to parse config file at {}: {}",
                    config_path.display(),
                    e
                )
            })?;
            config.merge(user_config);
        }

        config.validate().map_err(|e| {
            eyre!("Invalid configuration in {}: {}", config_path.display(), e)
        })?;

        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }

        self.server.merge(other.server);
        self.data.merge(other.data);
        self.api.merge(other.api);
        self.upload.merge(other.upload);
        self.logging.merge(other.logging);
    }

    /// Command-line flags take precedence over the config file
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(host) = &args.host {
            self.server.host = host.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(url) = &args.penguins_url {
            self.data.penguins_url = url.clone();
        }
        if let Some(source) = &args.wine_source {
            self.data.wine_source = Some(source.clone());
        }
        if let Some(secs) = args.api_timeout {
            self.api.timeout_secs = secs;
        }
        if let Some(level) = args.log_level {
            self.logging.level = Some(level.as_str().to_string());
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }
        if self.server.port == 0 {
            return Err(eyre!("server.port must be greater than 0"));
        }
        if self.server.host.trim().is_empty() {
            return Err(eyre!("server.host must not be empty"));
        }
        if self.server.session_idle_secs == 0 {
            return Err(eyre!("server.session_idle_secs must be greater than 0"));
        }
        if self.data.penguins_url.trim().is_empty() {
            return Err(eyre!("data.penguins_url must be set"));
        }
        if matches!(&self.data.wine_source, Some(source) if source.trim().is_empty()) {
            return Err(eyre!("data.wine_source must not be empty when set"));
        }
        if self.data.fetch_timeout_secs == 0 {
            return Err(eyre!("data.fetch_timeout_secs must be greater than 0"));
        }
        if self.api.timeout_secs == 0 {
            return Err(eyre!("api.timeout_secs must be greater than 0"));
        }
        if self.upload.preview_rows == 0 {
            return Err(eyre!("upload.preview_rows must be greater than 0"));
        }
        Ok(())
    }

    /// Socket address string for the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
