//! Configuration manager for the relay.
//!
//! Non secret settings live in `config.yaml`. Email provider identifiers are
//! only ever read from the environment, see [`RelayConfiguration`].

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_ADDRESS: &str = "0.0.0.0:8888";
const DEFAULT_PROVIDER_URL: &str = "https://api.emailjs.com/api/v1.0/email/send";
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Label the contact messages are addressed to.
pub const DEFAULT_OWNER: &str = "Thushar D M";

/// Overrides [`Configuration::mode`].
pub const MODE_VAR: &str = "APP_ENV";
/// Overrides [`Configuration::address`].
pub const ADDRESS_VAR: &str = "LISTEN_ADDRESS";
pub const SERVICE_ID_VAR: &str = "EMAILJS_SERVICE_ID";
pub const TEMPLATE_ID_VAR: &str = "EMAILJS_TEMPLATE_ID";
pub const PUBLIC_KEY_VAR: &str = "EMAILJS_PUBLIC_KEY";

/// Runtime mode. Only development responses carry fault details.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Production,
    Development,
}

impl Mode {
    pub fn is_development(&self) -> bool {
        matches!(self, Mode::Development)
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Mode::Production),
            "development" | "dev" => Ok(Mode::Development),
            other => Err(format!("unknown mode `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Instance name.
    pub name: String,
    /// Socket address the HTTP server binds to.
    pub address: String,
    pub mode: Mode,
    /// Recipient label put in every relayed message.
    pub owner: String,
    /// Related to the email delivery provider.
    pub provider: Provider,
    /// Related to OTLP and Prometheus.
    pub telemetry: Telemetry,
    #[serde(skip_deserializing)]
    version: String,
    #[serde(skip)]
    path: PathBuf,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_owned(),
            address: DEFAULT_ADDRESS.to_owned(),
            mode: Mode::default(),
            owner: DEFAULT_OWNER.to_owned(),
            provider: Provider::default(),
            telemetry: Telemetry::default(),
            version: VERSION.to_owned(),
            path: PathBuf::new(),
        }
    }
}

/// Email delivery provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Provider {
    /// Endpoint accepting send requests.
    pub url: String,
}

impl Default for Provider {
    fn default() -> Self {
        Self {
            url: DEFAULT_PROVIDER_URL.to_owned(),
        }
    }
}

/// Telemetry settings.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Telemetry {
    /// gRPC OTLP collector receiving traces and logs.
    pub otlp_endpoint: Option<String>,
    /// Expose Prometheus metrics on `/metrics`.
    pub metrics: bool,
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Crate version serving requests.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Normalizes a URL string by ensuring it starts with a valid scheme
    /// (`http` or `https`).
    fn normalize_url(&self, url: &str) -> Result<String, url::ParseError> {
        let url_with_scheme =
            if url.starts_with("http://") || url.starts_with("https://") {
                url.to_string()
            } else {
                format!("https://{url}")
            };

        let parsed_url = Url::parse(&url_with_scheme)?;
        Ok(parsed_url.to_string())
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location.
    pub fn read(self) -> Result<Self, url::ParseError> {
        let file_path = if self.path.is_file() {
            self.path.as_path()
        } else {
            Path::new(DEFAULT_CONFIG_PATH)
        };

        match File::open(file_path) {
            Ok(file) => match serde_yaml::from_reader(file) {
                Ok(config) => self.finish(config),
                Err(err) => Ok(self.error(err)),
            },
            Err(err) => Ok(self.error(err)),
        }
    }

    /// Parse configuration from a YAML document.
    pub fn from_yaml(self, yaml: &str) -> Result<Self, serde_yaml::Error> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(self.finish(config).unwrap_or_else(|err| self.error(err)))
    }

    fn finish(&self, mut config: Configuration) -> Result<Self, url::ParseError> {
        // set app version.
        config.version = VERSION.to_owned();
        config.path = self.path.clone();
        config.provider.url = self.normalize_url(&config.provider.url)?;

        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(mode) = lookup(MODE_VAR) {
            match mode.parse() {
                Ok(mode) => self.mode = mode,
                Err(err) => tracing::warn!(%err, "ignoring `{MODE_VAR}`"),
            }
        }
        if let Some(address) = lookup(ADDRESS_VAR).filter(|a| !a.is_empty()) {
            self.address = address;
        }
        self
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(error = %err, "`config.yaml` file cannot be used, falling back to defaults");
        Self {
            path: self.path.clone(),
            ..Default::default()
        }
    }
}

/// Identifiers authorizing calls to the email provider.
///
/// Absence of any of them is a configuration fault; values never appear in
/// `Debug` output.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RelayConfiguration {
    service_id: Option<String>,
    template_id: Option<String>,
    public_key: Option<String>,
}

/// Complete set of provider identifiers.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Credentials<'a> {
    pub service_id: &'a str,
    pub template_id: &'a str,
    pub public_key: &'a str,
}

impl RelayConfiguration {
    /// Create a new [`RelayConfiguration`]. Empty values count as missing.
    pub fn new(
        service_id: Option<String>,
        template_id: Option<String>,
        public_key: Option<String>,
    ) -> Self {
        let keep = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        Self {
            service_id: keep(service_id),
            template_id: keep(template_id),
            public_key: keep(public_key),
        }
    }

    /// Read identifiers through `lookup`, typically the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self::new(
            lookup(SERVICE_ID_VAR),
            lookup(TEMPLATE_ID_VAR),
            lookup(PUBLIC_KEY_VAR),
        )
    }

    /// Read identifiers from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// All three identifiers, or `None` when any is missing.
    pub fn credentials(&self) -> Option<Credentials<'_>> {
        Some(Credentials {
            service_id: self.service_id.as_deref()?,
            template_id: self.template_id.as_deref()?,
            public_key: self.public_key.as_deref()?,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.credentials().is_some()
    }
}

fn redact(value: Option<&str>) -> &'static str {
    if value.is_some() { "<set>" } else { "<missing>" }
}

impl fmt::Debug for RelayConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfiguration")
            .field("service_id", &redact(self.service_id.as_deref()))
            .field("template_id", &redact(self.template_id.as_deref()))
            .field("public_key", &redact(self.public_key.as_deref()))
            .finish()
    }
}

impl fmt::Debug for Credentials<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}
