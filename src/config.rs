use crate::domain::config_types::{ByteLimit, Host, LogFormat, LogLevel, Port, TimeoutMillis};
use crate::domain::{
    PatternError, RegistryError, RoutePattern, ServiceDescriptor, ServiceName, ServiceRegistry,
    ServiceSecret, UpstreamUrl,
};
use crate::proxy::types::{HeaderBufferSize, ProxyConfig, ResponseSizeLimit};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::env;
use thiserror::Error;

pub use config::ConfigError;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub timeouts: TimeoutSettings,
    pub limits: LimitSettings,
    pub csrf: CsrfSettings,
    pub logging: LoggingSettings,
    #[serde(default)]
    pub security: SecuritySettings,
    #[serde(default)]
    pub services: Vec<ServiceSettings>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: Host,
    pub port: Port,
    pub environment: String,
    /// Raw `PORT` value that was not a port number and got ignored
    #[serde(skip)]
    pub ignored_port: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TimeoutSettings {
    pub authorization_ms: TimeoutMillis,
    pub upstream_ms: TimeoutMillis,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitSettings {
    pub max_response_bytes: ByteLimit,
    pub extended_header_buffer_bytes: ByteLimit,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CsrfSettings {
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: LogLevel,
    pub format: LogFormat,
}

/// Cipher key material and the key presented to the authorization service
#[derive(Deserialize, Clone, Default)]
pub struct SecuritySettings {
    pub secret_key: Option<String>,
    pub secret_iv: Option<String>,
    pub authorization_api_key: Option<String>,
}

impl std::fmt::Debug for SecuritySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "***");
        f.debug_struct("SecuritySettings")
            .field("secret_key", &redact(&self.secret_key))
            .field("secret_iv", &redact(&self.secret_iv))
            .field("authorization_api_key", &redact(&self.authorization_api_key))
            .finish()
    }
}

/// One entry of the `services` array
#[derive(Deserialize, Clone)]
pub struct ServiceSettings {
    pub name: String,
    pub path: String,
    pub url: String,
    pub secret: Option<String>,
    /// Environment variable holding the secret, used when `secret` is absent
    pub secret_env: Option<String>,
    #[serde(default)]
    pub require_authentication: bool,
    #[serde(default)]
    pub paths_require_extend_header_size: Vec<String>,
    pub unavailable_message: Option<String>,
}

impl std::fmt::Debug for ServiceSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceSettings")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("url", &self.url)
            .field("secret", &self.secret.as_ref().map(|_| "***"))
            .field("secret_env", &self.secret_env)
            .field("require_authentication", &self.require_authentication)
            .field(
                "paths_require_extend_header_size",
                &self.paths_require_extend_header_size,
            )
            .field("unavailable_message", &self.unavailable_message)
            .finish()
    }
}

/// Settings that parse but cannot be turned into gateway components
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid service name '{0}'")]
    InvalidServiceName(String),

    #[error("service {service}: invalid path pattern: {source}")]
    InvalidPattern {
        service: String,
        #[source]
        source: PatternError,
    },

    #[error("service {service}: invalid upstream url '{url}'")]
    InvalidUpstream { service: String, url: String },

    #[error("service {service}: no secret configured")]
    MissingSecret { service: String },

    #[error("service {service}: environment variable {variable} is not set")]
    SecretEnvUnset { service: String, variable: String },

    #[error("limits.extended_header_buffer_bytes must be at least 8192, got {0}")]
    HeaderBufferTooSmall(usize),

    #[error("limits.max_response_bytes must be positive")]
    InvalidResponseLimit,

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// A `PORT` value usable as the listening port
///
/// Anything else is ignored so the configured port stays in effect.
pub fn port_override(raw: &str) -> Option<i64> {
    raw.trim()
        .parse::<u16>()
        .ok()
        .filter(|port| *port > 0)
        .map(i64::from)
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let raw_port = env::var("PORT").ok();
        let port = raw_port.as_deref().and_then(port_override);

        let mut settings: Self = Self::defaults(&environment)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("API_GATEWAY").separator("__"))
            // Plain variables understood by existing deployments
            .set_override_option("application.port", port)?
            .set_override_option("security.secret_key", env::var("API_SECRET_KEY").ok())?
            .set_override_option("security.secret_iv", env::var("API_SECRET_IV_KEY").ok())?
            .set_override_option(
                "security.authorization_api_key",
                env::var("AUTHORIZATION_API_KEY").ok(),
            )?
            .build()?
            .try_deserialize()?;

        settings.application.ignored_port = raw_port.filter(|_| port.is_none());
        Ok(settings)
    }

    /// Builder holding the compiled-in defaults, ready for more sources
    pub fn defaults(environment: &str) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("application.host", "0.0.0.0")?
            .set_default("application.port", 4100)?
            .set_default("application.environment", environment)?
            .set_default("timeouts.authorization_ms", 5_000)?
            .set_default("timeouts.upstream_ms", 10_000)?
            .set_default("limits.max_response_bytes", 10 * 1024 * 1024)?
            .set_default("limits.extended_header_buffer_bytes", 64 * 1024)?
            .set_default("csrf.enabled", true)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")
    }

    pub fn proxy_config(&self) -> Result<ProxyConfig, SettingsError> {
        let buffer = *self.limits.extended_header_buffer_bytes.as_ref();
        let extended_header_buffer = HeaderBufferSize::try_new(buffer)
            .map_err(|_| SettingsError::HeaderBufferTooSmall(buffer))?;
        let max_response_size = ResponseSizeLimit::try_new(*self.limits.max_response_bytes.as_ref())
            .map_err(|_| SettingsError::InvalidResponseLimit)?;

        Ok(ProxyConfig {
            authorization_timeout: self.timeouts.authorization_ms.as_duration(),
            upstream_timeout: self.timeouts.upstream_ms.as_duration(),
            max_response_size,
            extended_header_buffer,
            csrf_enabled: self.csrf.enabled,
        })
    }

    /// Build and validate the registry, reading secrets from the process environment
    pub fn build_registry(&self) -> Result<ServiceRegistry, SettingsError> {
        self.build_registry_with(|variable| env::var(variable).ok())
    }

    /// Build and validate the registry with a custom secret lookup
    pub fn build_registry_with<F>(&self, lookup: F) -> Result<ServiceRegistry, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let descriptors = self
            .services
            .iter()
            .map(|service| service.to_descriptor(&lookup))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ServiceRegistry::new(descriptors)?)
    }
}

impl ServiceSettings {
    fn to_descriptor<F>(&self, lookup: &F) -> Result<ServiceDescriptor, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let name = ServiceName::try_new(self.name.clone())
            .map_err(|_| SettingsError::InvalidServiceName(self.name.clone()))?;
        let service = name.to_string();

        let pattern = RoutePattern::parse(&self.path).map_err(|source| {
            SettingsError::InvalidPattern {
                service: service.clone(),
                source,
            }
        })?;
        let upstream =
            UpstreamUrl::try_new(self.url.clone()).map_err(|_| SettingsError::InvalidUpstream {
                service: service.clone(),
                url: self.url.clone(),
            })?;

        let raw_secret = match (&self.secret, &self.secret_env) {
            (Some(secret), _) => secret.clone(),
            (None, Some(variable)) => {
                lookup(variable).ok_or_else(|| SettingsError::SecretEnvUnset {
                    service: service.clone(),
                    variable: variable.clone(),
                })?
            }
            (None, None) => {
                return Err(SettingsError::MissingSecret { service });
            }
        };
        let secret = ServiceSecret::try_new(raw_secret)
            .map_err(|_| SettingsError::MissingSecret { service: service.clone() })?;

        let descriptor = self
            .paths_require_extend_header_size
            .iter()
            .fold(
                ServiceDescriptor::new(name, pattern, upstream, secret)
                    .requiring_auth(self.require_authentication),
                |descriptor, path| descriptor.with_extended_header_path(path.clone()),
            );

        Ok(match &self.unavailable_message {
            Some(message) => descriptor.with_unavailable_message(message.clone()),
            None => descriptor,
        })
    }
}
