use crate::config::Settings;
use crate::domain::RegistryHandle;
use crate::infrastructure::log_messages::application as messages;
use crate::infrastructure::{AuthorizerFactory, HttpAuthorizerFactory, SecretCipher};
use crate::proxy::GatewayService;
use crate::Result;
use axum::Router;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Main application struct that coordinates all components
pub struct Application {
    settings: Settings,
    gateway: GatewayService,
}

impl Application {
    /// Load settings from files and environment, then build the gateway
    pub fn new() -> Result<Self> {
        Self::from_settings(Settings::new()?)
    }

    /// Build every component up front; any configuration problem aborts startup
    #[instrument(skip_all)]
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let proxy_config = settings.proxy_config()?;
        let cipher = Arc::new(SecretCipher::from_config(
            settings.security.secret_key.as_deref(),
            settings.security.secret_iv.as_deref(),
        )?);
        let registry = settings.build_registry()?;

        for service in registry.iter() {
            info!(
                service = %service.name,
                pattern = %service.pattern,
                upstream = %service.upstream,
                requires_auth = service.requires_auth,
                "{}",
                messages::SERVICE_REGISTERED
            );
        }

        let authorizers = HttpAuthorizerFactory::new(
            Arc::clone(&cipher),
            settings.security.authorization_api_key.clone(),
            proxy_config.authorization_timeout,
        );
        // Fail fast on a bad AUTH entry
        if let Some(auth_service) = registry.authorization_service() {
            authorizers.build(&auth_service)?;
        }

        let gateway = GatewayService::new(
            proxy_config,
            Arc::new(RegistryHandle::new(registry)),
            cipher,
            Arc::new(authorizers),
        );

        Ok(Self { settings, gateway })
    }

    #[instrument(skip(self))]
    pub async fn run(self) -> Result<()> {
        let address = format!(
            "{}:{}",
            self.settings.application.host, self.settings.application.port
        );
        let listener = tokio::net::TcpListener::bind(&address).await?;
        info!(address = %address, "{}", messages::LISTENING);

        axum::serve(listener, self.gateway.into_router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("{}", messages::SHUTTING_DOWN);
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn gateway(&self) -> &GatewayService {
        &self.gateway
    }

    pub fn into_router(self) -> Router {
        self.gateway.into_router()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::CipherError;
    use crate::Error;
    use config::{File, FileFormat};

    fn settings(toml: &str) -> Settings {
        Settings::defaults("test")
            .unwrap()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    const KEYS: &str = r#"
        [security]
        secret_key = "0123456789abcdef0123456789abcdef"
        secret_iv = "abcdef9876543210"
    "#;

    #[test]
    fn test_missing_key_material_aborts_startup() {
        let result = Application::from_settings(settings(""));
        assert!(matches!(result, Err(Error::Cipher(CipherError::MissingKey))));
    }

    #[test]
    fn test_application_builds_with_auth_service() {
        let toml = format!(
            r#"{KEYS}
            [[services]]
            name = "SHOP"
            path = "/api/*/shop/*"
            url = "http://localhost:4200"
            secret = "shop-secret"
            require_authentication = true

            [[services]]
            name = "AUTH"
            path = "/api/*/auth/*"
            url = "http://localhost:4300"
            secret = "auth-secret"
            "#
        );
        let app = Application::from_settings(settings(&toml)).unwrap();
        assert_eq!(app.gateway().registry().load().len(), 2);
    }

    #[test]
    fn test_ambiguous_patterns_abort_startup() {
        let toml = format!(
            r#"{KEYS}
            [[services]]
            name = "ONE"
            path = "/api/*/shop/*"
            url = "http://localhost:4200"
            secret = "a"

            [[services]]
            name = "TWO"
            path = "/api/v1/*/*"
            url = "http://localhost:4201"
            secret = "b"
            "#
        );
        assert!(matches!(
            Application::from_settings(settings(&toml)),
            Err(Error::Configuration(_))
        ));
    }
}
