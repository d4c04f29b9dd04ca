use config::{Config, File};
use secrecy::SecretString;
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;
use std::{env, error::Error, path::PathBuf};

/// Names a settings file whose values override the bundled defaults.
pub const SETTINGS_FILE_VAR: &str = "APP_SETTINGS_FILE";

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub email: EmailSettings,
}

#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub hmac_secret: SecretString,
    #[serde(default)]
    pub cookie_secure: bool,
    #[serde(default)]
    pub session_cookie_domain: Option<String>,
}

impl ApplicationSettings {
    /// Domain for cookies issued by the app. Blank values mean host-only cookies.
    pub fn cookie_domain(&self) -> Option<&str> {
        self.session_cookie_domain
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

#[derive(Deserialize, Clone)]
pub struct EmailSettings {
    pub enable_email: bool,
    pub smtp_url: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub smtp_port: u16,
    pub email_username: String,
    pub email_password: SecretString,
    pub from_addr: String,
    pub smtp_security: SmtpSecurity,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(from = "String")]
pub enum SmtpSecurity {
    /// Upgrade a plaintext connection with STARTTLS.
    Tls,
    /// Connect over implicit TLS.
    Ssl,
    Plain,
}

impl From<String> for SmtpSecurity {
    fn from(s: String) -> Self {
        match s.as_str() {
            "TLS" => Self::Tls,
            "SSL" => Self::Ssl,
            _ => Self::Plain,
        }
    }
}

pub fn get() -> Result<Settings, Box<dyn Error>> {
    let config_path = env::current_dir()?.join("config");

    let app_env: Environment = env::var("APP_ENV")
        .unwrap_or_else(|_| "local".into())
        .try_into()?;

    let mut builder = Config::builder()
        .add_source(File::from(config_path.join("Base.toml")))
        .add_source(File::from(config_path.join(app_env.file_name())));

    if let Ok(path) = env::var(SETTINGS_FILE_VAR) {
        builder = builder.add_source(File::from(PathBuf::from(path)).required(false));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize::<Settings>()?)
}

#[derive(Debug, PartialEq, Eq)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Production => "production",
        }
    }

    fn file_name(&self) -> &'static str {
        match self {
            Self::Local => "Local.toml",
            Self::Production => "Production.toml",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::try_from(s.as_str())
    }
}

impl TryFrom<&str> for Environment {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "local" => Ok(Self::Local),
            other => Err(format!(
                "{other} is not a supported environment. \
                Use either `local` or `production`.",
            )),
        }
    }
}
