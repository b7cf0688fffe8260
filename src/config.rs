use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Name of the per-directory config file
pub const CONFIG_FILE: &str = ".codepush-app.toml";

/// Configuration loaded from config file and environment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app: AppConfig,
    pub tools: ToolsConfig,
    pub packages: PackagesConfig,
    pub fixtures: FixturesConfig,
    pub link: LinkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub default_name: String,
}

/// Executables invoked by the generator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub code_push: String,
    pub react_native: String,
    pub npm: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagesConfig {
    pub react_native: String,
    pub code_push_module: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FixturesConfig {
    /// Relative paths resolve against the working directory
    pub dir: PathBuf,
    /// App name used inside the fixture sources
    pub placeholder: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Seconds to wait for each prompt, and for the exit after the last one
    pub timeout: u64,
    pub android_prompt: String,
    pub ios_prompt: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            tools: ToolsConfig::default(),
            packages: PackagesConfig::default(),
            fixtures: FixturesConfig::default(),
            link: LinkConfig::default(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_name: "CodePushDemoAppTest".to_string(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            code_push: "code-push".to_string(),
            react_native: "react-native".to_string(),
            npm: "npm".to_string(),
        }
    }
}

impl Default for PackagesConfig {
    fn default() -> Self {
        Self {
            react_native: "react-native".to_string(),
            code_push_module: "react-native-code-push".to_string(),
        }
    }
}

impl Default for FixturesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("CodePushDemoApp"),
            placeholder: "CodePushDemoApp".to_string(),
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            timeout: 120,
            android_prompt:
                "What is your CodePush deployment key for Android (hit <ENTER> to ignore)"
                    .to_string(),
            ios_prompt: "What is your CodePush deployment key for iOS (hit <ENTER> to ignore)"
                .to_string(),
        }
    }
}

impl Config {
    /// Load configuration for the given working directory.
    /// Precedence: environment, then `.codepush-app.toml`, then the user config file.
    pub fn load(work_dir: &Path) -> Result<Self> {
        let mut config = match Self::find_config_file(work_dir) {
            Some(path) => Self::from_file(&path)?,
            None => Config::default(),
        };

        config.apply_env_overrides();

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn find_config_file(work_dir: &Path) -> Option<PathBuf> {
        let local = work_dir.join(CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }

        dirs::config_dir()
            .map(|dir| dir.join("create-codepush-app").join("config.toml"))
            .filter(|path| path.exists())
    }

    /// Apply environment variable overrides (env vars take precedence)
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("CODEPUSH_APP_NAME") {
            self.app.default_name = val;
        }

        // Tools
        if let Ok(val) = env::var("CODEPUSH_CLI") {
            self.tools.code_push = val;
        }
        if let Ok(val) = env::var("CODEPUSH_REACT_NATIVE_CLI") {
            self.tools.react_native = val;
        }
        if let Ok(val) = env::var("CODEPUSH_NPM") {
            self.tools.npm = val;
        }

        // Fixtures
        if let Ok(val) = env::var("CODEPUSH_FIXTURES") {
            self.fixtures.dir = PathBuf::from(val);
        }
        if let Ok(val) = env::var("CODEPUSH_FIXTURE_PLACEHOLDER") {
            self.fixtures.placeholder = val;
        }

        // Link
        if let Ok(val) = env::var("CODEPUSH_LINK_TIMEOUT") {
            if let Ok(n) = val.parse() {
                self.link.timeout = n;
            }
        }
    }

    /// Fixture directory resolved against the working directory
    pub fn fixtures_dir(&self, work_dir: &Path) -> PathBuf {
        if self.fixtures.dir.is_absolute() {
            self.fixtures.dir.clone()
        } else {
            work_dir.join(&self.fixtures.dir)
        }
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config to TOML")
    }
}

/// Host platform, decides whether native files get patched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    Unix,
    Windows,
}

impl HostOs {
    pub fn current() -> Self {
        if cfg!(windows) {
            HostOs::Windows
        } else {
            HostOs::Unix
        }
    }
}
