//! Configuration management for regwise.
//!
//! Configuration is merged from several sources, lowest precedence first:
//! - Built-in defaults
//! - The config file (`.regwise/config.yaml` in the workspace, or `REGWISE_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! Secrets never live in the config file. Each service section names the
//! environment variable that holds its key.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Name of the per-workspace state directory.
pub const STATE_DIR: &str = ".regwise";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .regwise/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Search index connection
    pub search: SearchConfig,

    /// Blob container holding page images
    pub storage: StorageConfig,

    /// Chat completion and embedding service
    pub openai: OpenAiConfig,

    /// Vision vectorizer, required only for image vector fields
    pub vision: Option<VisionConfig>,

    /// Retrieve-then-read defaults
    pub approach: ApproachConfig,
}

/// Search index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchConfig {
    pub endpoint: String,
    pub index: String,
    pub api_key_env: String,
    pub api_version: String,
    pub query_language: String,
    pub query_speller: String,
    /// Index field holding the page reference used for citations
    pub sourcepage_field: String,
    /// Index field holding the passage text
    pub content_field: String,
    /// Whether the index defines `oids` and `groups` fields
    pub has_auth_fields: bool,
    /// Force both security filters on every query
    pub require_access_control: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            index: "gptkbindex".to_string(),
            api_key_env: "AZURE_SEARCH_KEY".to_string(),
            api_version: "2023-11-01".to_string(),
            query_language: "en-us".to_string(),
            query_speller: "lexicon".to_string(),
            sourcepage_field: "sourcepage".to_string(),
            content_field: "content".to_string(),
            has_auth_fields: false,
            require_access_control: false,
        }
    }
}

/// Blob storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    pub endpoint: String,
    pub container: String,
    /// Environment variable holding a SAS token (without the leading `?`)
    pub sas_token_env: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            container: "content".to_string(),
            sas_token_env: Some("AZURE_STORAGE_SAS".to_string()),
        }
    }
}

/// Chat completion and embedding service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OpenAiConfig {
    /// "azure" or "openai"
    pub provider: String,
    pub endpoint: String,
    pub api_key_env: String,
    /// Azure only
    pub api_version: String,
    pub chat_model: String,
    pub chat_deployment: Option<String>,
    pub embedding_model: String,
    pub embedding_deployment: Option<String>,
    pub embedding_dimensions: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            provider: "azure".to_string(),
            endpoint: String::new(),
            api_key_env: "AZURE_OPENAI_API_KEY".to_string(),
            api_version: "2024-02-01".to_string(),
            chat_model: "gpt-4o".to_string(),
            chat_deployment: None,
            embedding_model: "text-embedding-ada-002".to_string(),
            embedding_deployment: None,
            embedding_dimensions: 1536,
        }
    }
}

/// Vision vectorizer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionConfig {
    pub endpoint: String,
    /// Environment variable holding a bearer token
    #[serde(default = "default_vision_token_env")]
    pub token_env: String,
}

fn default_vision_token_env() -> String {
    "AZURE_VISION_TOKEN".to_string()
}

/// Defaults applied by the retrieve-then-read approach.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApproachConfig {
    /// Tokens reserved for the answer
    pub response_token_limit: u32,
    pub default_temperature: f32,
    pub default_top: u32,
    /// Prompt definition that replaces the built-in system prompt, if present
    pub prompt_id: String,
    /// Base URL used to turn citations into links
    pub citation_base_url: String,
}

impl Default for ApproachConfig {
    fn default() -> Self {
        Self {
            response_token_limit: 1024,
            default_temperature: 0.3,
            default_top: 3,
            prompt_id: "retrieve-then-read.vision".to_string(),
            citation_base_url: String::new(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    search: Option<SearchConfig>,
    storage: Option<StorageConfig>,
    openai: Option<OpenAiConfig>,
    vision: Option<VisionConfig>,
    approach: Option<ApproachConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            search: SearchConfig::default(),
            storage: StorageConfig::default(),
            openai: OpenAiConfig::default(),
            vision: None,
            approach: ApproachConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the environment, the config file and defaults.
    ///
    /// Environment variables:
    /// - `REGWISE_WORKSPACE`: Override workspace path
    /// - `REGWISE_CONFIG`: Path to config file
    /// - `AZURE_SEARCH_ENDPOINT`, `AZURE_SEARCH_INDEX`
    /// - `AZURE_STORAGE_ENDPOINT`, `AZURE_STORAGE_CONTAINER`
    /// - `AZURE_OPENAI_ENDPOINT`, `REGWISE_CHAT_MODEL`, `REGWISE_CHAT_DEPLOYMENT`
    /// - `AZURE_VISION_ENDPOINT`
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use regwise_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Index: {}", config.search.index);
    /// ```
    pub fn load() -> AppResult<Self> {
        let workspace = match std::env::var("REGWISE_WORKSPACE") {
            Ok(ws) => PathBuf::from(ws),
            Err(_) => AppConfig::default().workspace,
        };
        let config_file = std::env::var("REGWISE_CONFIG").ok().map(PathBuf::from);

        Self::load_from_workspace(&workspace, config_file)
    }

    /// Load configuration rooted at an explicit workspace.
    pub fn load_from_workspace(workspace: &Path, config_file: Option<PathBuf>) -> AppResult<Self> {
        if !workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                workspace
            )));
        }

        let mut config = Self {
            workspace: workspace.to_path_buf(),
            config_file,
            ..Self::default()
        };

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.regwise_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        config.apply_env();
        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(search) = config_file.search {
            result.search = search;
        }
        if let Some(storage) = config_file.storage {
            result.storage = storage;
        }
        if let Some(openai) = config_file.openai {
            result.openai = openai;
        }
        if config_file.vision.is_some() {
            result.vision = config_file.vision;
        }
        if let Some(approach) = config_file.approach {
            result.approach = approach;
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Environment variables override the config file.
    fn apply_env(&mut self) {
        if let Ok(endpoint) = std::env::var("AZURE_SEARCH_ENDPOINT") {
            self.search.endpoint = endpoint;
        }
        if let Ok(index) = std::env::var("AZURE_SEARCH_INDEX") {
            self.search.index = index;
        }
        if let Ok(endpoint) = std::env::var("AZURE_STORAGE_ENDPOINT") {
            self.storage.endpoint = endpoint;
        }
        if let Ok(container) = std::env::var("AZURE_STORAGE_CONTAINER") {
            self.storage.container = container;
        }
        if let Ok(endpoint) = std::env::var("AZURE_OPENAI_ENDPOINT") {
            self.openai.endpoint = endpoint;
        }
        if let Ok(model) = std::env::var("REGWISE_CHAT_MODEL") {
            self.openai.chat_model = model;
        }
        if let Ok(deployment) = std::env::var("REGWISE_CHAT_DEPLOYMENT") {
            self.openai.chat_deployment = Some(deployment);
        }
        if let Ok(endpoint) = std::env::var("AZURE_VISION_ENDPOINT") {
            match self.vision {
                Some(ref mut vision) => vision.endpoint = endpoint,
                None => {
                    self.vision = Some(VisionConfig {
                        endpoint,
                        token_env: default_vision_token_env(),
                    })
                }
            }
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.log_level = Some(level);
        }
        if std::env::var("NO_COLOR").is_ok() {
            self.no_color = true;
        }
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        model: Option<String>,
        deployment: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(model) = model {
            self.openai.chat_model = model;
        }

        if let Some(deployment) = deployment {
            self.openai.chat_deployment = Some(deployment);
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .regwise directory.
    pub fn regwise_dir(&self) -> PathBuf {
        self.workspace.join(STATE_DIR)
    }

    /// Read a secret from the named environment variable.
    pub fn resolve_secret(env_var: &str) -> AppResult<String> {
        std::env::var(env_var).map_err(|_| {
            AppError::Config(format!(
                "Secret not found in environment variable: {}",
                env_var
            ))
        })
    }

    /// Validate that every service the approach calls is reachable in principle.
    pub fn validate(&self) -> AppResult<()> {
        let required = [
            ("search.endpoint", &self.search.endpoint),
            ("search.index", &self.search.index),
            ("storage.endpoint", &self.storage.endpoint),
            ("storage.container", &self.storage.container),
            ("openai.endpoint", &self.openai.endpoint),
            ("openai.chatModel", &self.openai.chat_model),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(AppError::Config(format!("Missing required setting: {}", name)));
            }
        }

        let known_providers = ["azure", "openai"];
        if !known_providers.contains(&self.openai.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.openai.provider,
                known_providers.join(", ")
            )));
        }

        Self::resolve_secret(&self.search.api_key_env)?;
        Self::resolve_secret(&self.openai.api_key_env)?;

        if let Some(ref vision) = self.vision {
            if vision.endpoint.trim().is_empty() {
                return Err(AppError::Config(
                    "Missing required setting: vision.endpoint".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn configured() -> AppConfig {
        let mut config = AppConfig::default();
        config.search.endpoint = "https://search.example.net".to_string();
        config.storage.endpoint = "https://blob.example.net".to_string();
        config.openai.endpoint = "https://openai.example.net".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.search.index, "gptkbindex");
        assert_eq!(config.search.sourcepage_field, "sourcepage");
        assert_eq!(config.openai.provider, "azure");
        assert_eq!(config.approach.response_token_limit, 1024);
        assert_eq!(config.approach.default_top, 3);
        assert!(config.vision.is_none());
        assert!(!config.verbose);
    }

    #[test]
    fn test_regwise_dir() {
        let config = AppConfig::default();
        assert!(config.regwise_dir().ends_with(".regwise"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            None,
            None,
            Some("gpt-4".to_string()),
            Some("chat-deploy".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.openai.chat_model, "gpt-4");
        assert_eq!(overridden.openai.chat_deployment.as_deref(), Some("chat-deploy"));
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_load_from_workspace_merges_yaml() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(STATE_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("config.yaml"),
            r#"
search:
  endpoint: https://mysearch.search.windows.net
  index: regulations
  sourcepageField: page
openai:
  provider: openai
  endpoint: https://api.openai.com
  chatModel: gpt-4-turbo
vision:
  endpoint: https://vision.example.net/
approach:
  defaultTop: 5
logging:
  color: false
"#,
        )
        .unwrap();

        let config = AppConfig::load_from_workspace(temp.path(), None).unwrap();
        assert_eq!(config.search.index, "regulations");
        assert_eq!(config.search.sourcepage_field, "page");
        // Unset keys keep their defaults
        assert_eq!(config.search.content_field, "content");
        assert_eq!(config.openai.provider, "openai");
        assert_eq!(config.approach.default_top, 5);
        assert_eq!(config.approach.response_token_limit, 1024);
        let vision = config.vision.unwrap();
        assert_eq!(vision.token_env, "AZURE_VISION_TOKEN");
        assert!(config.no_color);
    }

    #[test]
    fn test_missing_explicit_config_file() {
        let temp = TempDir::new().unwrap();
        let result =
            AppConfig::load_from_workspace(temp.path(), Some(temp.path().join("nope.yaml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_workspace() {
        let result = AppConfig::load_from_workspace(Path::new("/definitely/not/here"), None);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_validate_missing_endpoint() {
        let config = AppConfig::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("search.endpoint"));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = configured();
        config.openai.provider = "unknown".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("Unknown provider"));
    }

    #[test]
    fn test_validate_missing_secret() {
        let mut config = configured();
        config.search.api_key_env = "REGWISE_TEST_SURELY_UNSET_KEY".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("REGWISE_TEST_SURELY_UNSET_KEY"));
    }
}
