//! Authorization gate
//!
//! Decides per request, with no state carried between requests:
//!
//! - no (or empty) `Authorization` header → `RejectedNoHeader`
//! - header not starting with `Bearer` → `RejectedMalformedHeader`
//! - otherwise one call to the [`Authorizer`] → `Allowed` or
//!   `RejectedByAuthService`
//!
//! The gate is only consulted for services that require authentication.

use crate::domain::AuthDecision;
use crate::infrastructure::log_messages::authorization as messages;
use crate::infrastructure::Authorizer;
use crate::proxy::headers::{AUTHORIZATION, BEARER_PREFIX};
use crate::proxy::types::ProxyError;
use http::HeaderMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Clone)]
pub struct AuthorizationGate {
    authorizer: Arc<dyn Authorizer>,
}

impl AuthorizationGate {
    pub fn new(authorizer: Arc<dyn Authorizer>) -> Self {
        Self { authorizer }
    }

    pub async fn evaluate(&self, headers: &HeaderMap) -> AuthDecision {
        let Some(authorization) = headers.get(AUTHORIZATION).filter(|v| !v.is_empty()) else {
            debug!("{}", messages::HEADER_MISSING);
            return AuthDecision::RejectedNoHeader;
        };

        let is_bearer = authorization
            .to_str()
            .map(|value| value.starts_with(BEARER_PREFIX))
            .unwrap_or(false);
        if !is_bearer {
            debug!("{}", messages::HEADER_MALFORMED);
            return AuthDecision::RejectedMalformedHeader;
        }

        // Cancelled when this future is dropped, e.g. the client went away
        let cancel = CancellationToken::new();
        let _guard = cancel.clone().drop_guard();

        let result = self.authorizer.authorize(authorization, cancel).await;
        if result.allowed {
            debug!(status = result.status.as_u16(), "{}", messages::ALLOWED);
            AuthDecision::Allowed
        } else {
            info!(status = result.status.as_u16(), "{}", messages::REJECTED);
            AuthDecision::RejectedByAuthService(result)
        }
    }
}

impl From<AuthDecision> for Result<(), ProxyError> {
    fn from(decision: AuthDecision) -> Self {
        match decision {
            AuthDecision::Allowed => Ok(()),
            AuthDecision::RejectedNoHeader => Err(ProxyError::AuthorizationRequired),
            AuthDecision::RejectedMalformedHeader => Err(ProxyError::BadAuthorization),
            AuthDecision::RejectedByAuthService(result) => {
                Err(ProxyError::AuthorizationRejected(result))
            }
        }
    }
}
