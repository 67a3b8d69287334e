//! Client for the external authorization service
//!
//! The service contract is a bodiless `POST {AUTH}/api/v1.0/auth/authorize`
//! carrying the caller's `Authorization` header and the encrypted shared
//! API key. `200` means allowed; any other status is a rejection whose body
//! is passed back to the caller verbatim.
//!
//! Transport problems never escape as errors: they become a rejection with a
//! synthesized 5xx status so the gate can always reach a decision.

use crate::domain::{AuthorizationResult, ServiceDescriptor, UpstreamUrl};
use crate::infrastructure::cipher::SecretCipher;
use crate::infrastructure::log_messages::{authorization as messages, responses};
use crate::proxy::headers::API_KEY_HEADER;
use async_trait::async_trait;
use bytes::Bytes;
use http::{header, HeaderValue, Method, Request, StatusCode, Uri};
use http_body_util::{BodyExt, Empty};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Path of the authorization endpoint on the `AUTH` service
pub const AUTHORIZE_PATH: &str = "/api/v1.0/auth/authorize";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum AuthClientError {
    #[error("invalid authorization endpoint '{0}'")]
    InvalidEndpoint(String),

    #[error("encrypted API key is not a valid header value")]
    InvalidApiKey,
}

/// Verifies bearer credentials
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Ask whether `authorization` may proceed
    ///
    /// Cancelling `cancel` abandons the call; the result is then a rejection.
    async fn authorize(
        &self,
        authorization: &HeaderValue,
        cancel: CancellationToken,
    ) -> AuthorizationResult;
}

/// [`Authorizer`] backed by the `AUTH` service over HTTP
#[derive(Clone)]
pub struct HttpAuthorizationClient {
    client: Client<HttpConnector, Empty<Bytes>>,
    endpoint: Uri,
    api_key: HeaderValue,
    timeout: Duration,
}

impl HttpAuthorizationClient {
    pub fn new(
        base_url: &UpstreamUrl,
        encrypted_api_key: &str,
        timeout: Duration,
    ) -> Result<Self, AuthClientError> {
        let endpoint_str = format!("{}{AUTHORIZE_PATH}", base_url.as_ref());
        let endpoint = endpoint_str
            .parse::<Uri>()
            .map_err(|_| AuthClientError::InvalidEndpoint(endpoint_str.clone()))?;
        let api_key =
            HeaderValue::from_str(encrypted_api_key).map_err(|_| AuthClientError::InvalidApiKey)?;

        let client = Client::builder(TokioExecutor::new()).build_http();

        Ok(Self {
            client,
            endpoint,
            api_key,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &Uri {
        &self.endpoint
    }

    async fn call(&self, authorization: &HeaderValue) -> Result<AuthorizationResult, BoxError> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(self.endpoint.clone())
            .header(header::AUTHORIZATION, authorization.clone())
            .header(API_KEY_HEADER, self.api_key.clone())
            .body(Empty::<Bytes>::new())?;

        let response = self.client.request(request).await?;
        let (parts, body) = response.into_parts();
        let body = body.collect().await?.to_bytes();
        let content_type = parts.headers.get(header::CONTENT_TYPE).cloned();

        let result = if parts.status == StatusCode::OK {
            AuthorizationResult::allowed(parts.status, body)
        } else {
            AuthorizationResult::rejected(parts.status, body)
        };
        Ok(result.with_content_type(content_type))
    }
}

#[async_trait]
impl Authorizer for HttpAuthorizationClient {
    async fn authorize(
        &self,
        authorization: &HeaderValue,
        cancel: CancellationToken,
    ) -> AuthorizationResult {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(endpoint = %self.endpoint, "{}", messages::CANCELLED);
                AuthorizationResult::unreachable(
                    StatusCode::SERVICE_UNAVAILABLE,
                    responses::AUTHORIZATION_CANCELLED,
                )
            }
            outcome = tokio::time::timeout(self.timeout, self.call(authorization)) => match outcome {
                Ok(Ok(result)) => result,
                Ok(Err(error)) => {
                    warn!(endpoint = %self.endpoint, error = %error, "{}", messages::SERVICE_UNREACHABLE);
                    AuthorizationResult::unreachable(
                        StatusCode::SERVICE_UNAVAILABLE,
                        responses::AUTHORIZATION_UNAVAILABLE,
                    )
                }
                Err(_) => {
                    warn!(
                        endpoint = %self.endpoint,
                        timeout_ms = self.timeout.as_millis() as u64,
                        "{}",
                        messages::SERVICE_TIMEOUT
                    );
                    AuthorizationResult::unreachable(
                        StatusCode::GATEWAY_TIMEOUT,
                        responses::AUTHORIZATION_TIMEOUT,
                    )
                }
            },
        }
    }
}

/// Builds the [`Authorizer`] for the `AUTH` service of a registry
///
/// Consulted again whenever a reloaded registry carries a different `AUTH`
/// entry.
pub trait AuthorizerFactory: Send + Sync {
    fn build(
        &self,
        auth_service: &ServiceDescriptor,
    ) -> Result<Arc<dyn Authorizer>, AuthClientError>;
}

/// A fixed authorizer serves every registry
impl<A: Authorizer + 'static> AuthorizerFactory for Arc<A> {
    fn build(
        &self,
        _auth_service: &ServiceDescriptor,
    ) -> Result<Arc<dyn Authorizer>, AuthClientError> {
        Ok(Arc::clone(self) as Arc<dyn Authorizer>)
    }
}

/// Builds [`HttpAuthorizationClient`]s pointed at the registered `AUTH` service
pub struct HttpAuthorizerFactory {
    cipher: Arc<SecretCipher>,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpAuthorizerFactory {
    /// `api_key` is presented encrypted; without one the `AUTH` entry's own secret is used
    pub fn new(cipher: Arc<SecretCipher>, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            cipher,
            api_key,
            timeout,
        }
    }
}

impl AuthorizerFactory for HttpAuthorizerFactory {
    fn build(
        &self,
        auth_service: &ServiceDescriptor,
    ) -> Result<Arc<dyn Authorizer>, AuthClientError> {
        let api_key = match self.api_key.as_deref() {
            Some(api_key) => api_key,
            None => {
                warn!(service = %auth_service.name, "{}", messages::API_KEY_FALLBACK);
                auth_service.secret.as_ref()
            }
        };

        let client = HttpAuthorizationClient::new(
            &auth_service.upstream,
            &self.cipher.encrypt(api_key),
            self.timeout,
        )?;
        debug!(endpoint = %client.endpoint(), "{}", messages::CLIENT_BUILT);
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RoutePattern, ServiceName, ServiceSecret};
    use tokio::net::TcpListener;

    fn cipher() -> SecretCipher {
        SecretCipher::from_config(
            Some("0123456789abcdef0123456789abcdef"),
            Some("abcdef9876543210"),
        )
        .unwrap()
    }

    fn client_for(base: &str, timeout: Duration) -> HttpAuthorizationClient {
        let base = UpstreamUrl::try_new(base.to_string()).unwrap();
        HttpAuthorizationClient::new(&base, &cipher().encrypt("auth-shared-key"), timeout).unwrap()
    }

    fn bearer(value: &'static str) -> HeaderValue {
        HeaderValue::from_static(value)
    }

    #[tokio::test]
    async fn test_allowed_on_200() {
        let mut server = mockito::Server::new_async().await;
        let encrypted = cipher().encrypt("auth-shared-key");
        let mock = server
            .mock("POST", AUTHORIZE_PATH)
            .match_header("authorization", "Bearer abc")
            .match_header("api_key", encrypted.as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"userId":7}"#)
            .create_async()
            .await;

        let client = client_for(&server.url(), Duration::from_secs(5));
        let result = client
            .authorize(&bearer("Bearer abc"), CancellationToken::new())
            .await;

        mock.assert_async().await;
        assert!(result.allowed);
        assert_eq!(result.status, StatusCode::OK);
        assert_eq!(result.body, Bytes::from_static(br#"{"userId":7}"#));
    }

    #[tokio::test]
    async fn test_rejection_keeps_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", AUTHORIZE_PATH)
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":"expired"}"#)
            .create_async()
            .await;

        let client = client_for(&server.url(), Duration::from_secs(5));
        let result = client
            .authorize(&bearer("Bearer abc"), CancellationToken::new())
            .await;

        assert!(!result.allowed);
        assert_eq!(result.status, StatusCode::UNAUTHORIZED);
        assert_eq!(result.body, Bytes::from_static(br#"{"message":"expired"}"#));
        assert_eq!(
            result.content_type.unwrap().to_str().unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_other_success_codes_are_rejections() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", AUTHORIZE_PATH)
            .with_status(204)
            .create_async()
            .await;

        let client = client_for(&server.url(), Duration::from_secs(5));
        let result = client
            .authorize(&bearer("Bearer abc"), CancellationToken::new())
            .await;

        assert!(!result.allowed);
        assert_eq!(result.status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_connection_refused_becomes_503() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(&format!("http://{address}"), Duration::from_secs(5));
        let result = client
            .authorize(&bearer("Bearer abc"), CancellationToken::new())
            .await;

        assert!(!result.allowed);
        assert_eq!(result.status, StatusCode::SERVICE_UNAVAILABLE);
        let body: serde_json::Value = serde_json::from_slice(&result.body).unwrap();
        assert_eq!(body["message"], responses::AUTHORIZATION_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_hung_service_times_out() {
        // Accepts connections but never answers
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let _hold = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = client_for(&format!("http://{address}"), Duration::from_millis(100));
        let result = client
            .authorize(&bearer("Bearer abc"), CancellationToken::new())
            .await;

        assert!(!result.allowed);
        assert_eq!(result.status, StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn test_cancellation_abandons_call() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let _hold = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = client_for(&format!("http://{address}"), Duration::from_secs(30));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            client.authorize(&bearer("Bearer abc"), cancel),
        )
        .await
        .expect("cancellation should end the call promptly");

        assert!(!result.allowed);
        let body: serde_json::Value = serde_json::from_slice(&result.body).unwrap();
        assert_eq!(body["message"], responses::AUTHORIZATION_CANCELLED);
    }

    fn auth_descriptor(url: &str) -> ServiceDescriptor {
        ServiceDescriptor::new(
            ServiceName::try_new("AUTH").unwrap(),
            RoutePattern::parse("/api/*/auth/*").unwrap(),
            UpstreamUrl::try_new(url.to_string()).unwrap(),
            ServiceSecret::try_new("auth-own-secret").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_factory_presents_configured_api_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", AUTHORIZE_PATH)
            .match_header("api_key", cipher().encrypt("auth-shared-key").as_str())
            .with_status(200)
            .create_async()
            .await;

        let factory = HttpAuthorizerFactory::new(
            Arc::new(cipher()),
            Some("auth-shared-key".to_string()),
            Duration::from_secs(5),
        );
        let authorizer = factory.build(&auth_descriptor(&server.url())).unwrap();
        let result = authorizer
            .authorize(&bearer("Bearer abc"), CancellationToken::new())
            .await;

        mock.assert_async().await;
        assert!(result.allowed);
    }

    #[tokio::test]
    async fn test_factory_falls_back_to_auth_secret() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", AUTHORIZE_PATH)
            .match_header("api_key", cipher().encrypt("auth-own-secret").as_str())
            .with_status(200)
            .create_async()
            .await;

        let factory = HttpAuthorizerFactory::new(Arc::new(cipher()), None, Duration::from_secs(5));
        let authorizer = factory.build(&auth_descriptor(&server.url())).unwrap();
        authorizer
            .authorize(&bearer("Bearer abc"), CancellationToken::new())
            .await;

        mock.assert_async().await;
    }

    #[test]
    fn test_endpoint_is_built_from_auth_base_url() {
        let client = client_for("http://auth.internal:4300/", Duration::from_secs(1));
        assert_eq!(
            client.endpoint().to_string(),
            "http://auth.internal:4300/api/v1.0/auth/authorize"
        );
    }
}
