//! Configuration management

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;
use crate::Result;
use crate::auth::{Credentials, DEFAULT_TOKEN_TTL_SECS};
use crate::error::Error;
use crate::headers::value;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Session cookie, clearance cookie and browser user agent
    #[serde(flatten)]
    pub credentials: Credentials,

    /// Provider base URL; both endpoints hang off it
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model to ask
    #[serde(default = "default_model")]
    pub model: String,

    /// How long an access token is reused before re-authenticating
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: i64,

    /// How long the CLI waits for a complete answer
    #[serde(default = "default_answer_timeout_secs")]
    pub answer_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://chat.openai.com".to_string()
}

fn default_model() -> String {
    "text-davinci-002-render".to_string()
}

fn default_token_ttl_secs() -> i64 {
    DEFAULT_TOKEN_TTL_SECS
}

fn default_answer_timeout_secs() -> u64 {
    120
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            base_url: default_base_url(),
            model: default_model(),
            token_ttl_secs: default_token_ttl_secs(),
            answer_timeout_secs: default_answer_timeout_secs(),
        }
    }
}

impl Config {
    pub fn credentials(&self) -> Credentials {
        self.credentials.clone()
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_complete()
    }

    /// Parsed base URL, always ending in `/` so relative joins append
    pub fn base_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("Invalid base_url {:?}: {}", self.base_url, e)))?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::seconds(self.token_ttl_secs.max(0))
    }

    pub fn answer_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.answer_timeout_secs)
    }
}

/// Get the config directory path
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".gpt-session")
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Load configuration from file, falling back to defaults when absent
pub fn load() -> Result<Config> {
    load_from(&config_path())
}

pub fn load_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!("No config at {:?}, using defaults", path);
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save(config: &Config) -> Result<()> {
    save_to(config, &config_path())
}

pub fn save_to(config: &Config, path: &Path) -> Result<()> {
    // Create parent directory
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;

    // The file holds session cookies
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)?;
    }

    Ok(())
}

/// Load the config, prompting for any missing credential, and persist it
///
/// With `clean` the stored credentials are ignored and asked for again.
pub fn ensure_credentials(clean: bool) -> Result<Config> {
    let mut config = if clean {
        // Keep non-secret settings even on a clean login.
        let mut config = load()?;
        config.credentials = Credentials::default();
        config
    } else {
        load()?
    };

    if !config.has_credentials() {
        config.credentials = prompt_credentials(&config.credentials)?;
    }

    save(&config)?;
    Ok(config)
}

/// Credential the user is asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialField {
    SessionToken,
    CfClearance,
    UserAgent,
}

impl CredentialField {
    fn label(self) -> &'static str {
        match self {
            CredentialField::SessionToken => "session token",
            CredentialField::CfClearance => "cf_clearance",
            CredentialField::UserAgent => "user agent",
        }
    }
}

/// Fill in missing credentials through `ask`
///
/// Stored secrets are kept and only empty ones are asked for. The user agent
/// is always asked, with the stored value passed along as the default.
/// Entered values must be usable as HTTP header text.
pub fn fill_credentials<F>(current: &Credentials, mut ask: F) -> Result<Credentials>
where
    F: FnMut(CredentialField, &str) -> Result<String>,
{
    let mut field = |kind: CredentialField, existing: &str, keep: bool| -> Result<String> {
        if keep && !existing.is_empty() {
            return Ok(existing.to_string());
        }
        let entered = ask(kind, existing)?.trim().to_string();
        if entered.is_empty() {
            return Err(Error::Config(format!("The {} is required", kind.label())));
        }
        if value(&entered, kind.label()).is_err() {
            return Err(Error::Config(format!(
                "The {} contains characters not allowed in an HTTP header",
                kind.label()
            )));
        }
        Ok(entered)
    };

    let session_token = field(CredentialField::SessionToken, &current.session_token, true)?;
    let cf_clearance = field(CredentialField::CfClearance, &current.cf_clearance, true)?;
    let user_agent = field(CredentialField::UserAgent, &current.user_agent, false)?;
    Ok(Credentials::new(session_token, cf_clearance, user_agent))
}

/// Ask the user for whichever session credentials are missing
pub fn prompt_credentials(current: &Credentials) -> Result<Credentials> {
    use crate::ui;
    use inquire::{Password, PasswordDisplayMode, Text};

    ui::print_step("Open the provider in your browser, then copy from its dev tools:");
    println!("    1. the __Secure-next-auth.session-token cookie");
    println!("    2. the cf_clearance cookie");
    println!("    3. the browser's User-Agent");
    println!();

    fill_credentials(current, |field, existing| {
        let answer = match field {
            CredentialField::SessionToken => Password::new("Session token:")
                .with_display_mode(PasswordDisplayMode::Masked)
                .without_confirmation()
                .prompt(),
            CredentialField::CfClearance => Password::new("cf_clearance:")
                .with_display_mode(PasswordDisplayMode::Masked)
                .without_confirmation()
                .prompt(),
            CredentialField::UserAgent => {
                let mut prompt = Text::new("User agent:");
                if !existing.is_empty() {
                    prompt = prompt.with_default(existing);
                }
                prompt.prompt()
            }
        };
        answer.map_err(prompt_failed)
    })
}

fn prompt_failed(e: inquire::InquireError) -> Error {
    Error::Config(format!("Prompt failed: {}", e))
}

/// Delete the stored configuration after confirmation
pub fn reset() -> Result<()> {
    use inquire::Confirm;
    use crate::ui;

    let confirmed = Confirm::new("Remove stored credentials and settings?")
        .with_default(false)
        .prompt()
        .map_err(prompt_failed)?;

    if !confirmed {
        ui::print_step("Logout cancelled.");
        return Ok(());
    }

    let path = config_path();
    if path.exists() {
        std::fs::remove_file(&path)?;
        ui::print_success("Logged out.");
    } else {
        ui::print_step("No configuration found.");
    }
    Ok(())
}
