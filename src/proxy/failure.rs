//! Translation of upstream connection failures
//!
//! Every failure to reach an upstream (refused, reset, DNS, timeout) becomes
//! the same 503 outcome; only the message varies. A descriptor's
//! `unavailable_message` wins. Without one, paths containing `/shop/` past
//! the first character get the shop message and everything else the
//! generic one.

use crate::domain::ServiceDescriptor;
use crate::infrastructure::log_messages::{request_processing as messages, responses};
use crate::proxy::types::ProxyError;
use tracing::warn;

pub struct FailureTranslator;

impl FailureTranslator {
    /// Build the uniform unavailable outcome for a failed upstream call
    pub fn unavailable(
        service: &ServiceDescriptor,
        original_path: &str,
        cause: &dyn std::fmt::Display,
    ) -> ProxyError {
        let message = Self::message_for(service, original_path);
        warn!(
            service = %service.name,
            upstream = %service.upstream,
            path = original_path,
            cause = %cause,
            "{}",
            messages::UPSTREAM_UNAVAILABLE
        );
        ProxyError::UpstreamUnavailable { message }
    }

    pub fn message_for(service: &ServiceDescriptor, original_path: &str) -> String {
        service
            .unavailable_message
            .clone()
            .unwrap_or_else(|| Self::classify_path(original_path).to_string())
    }

    /// Default message when the descriptor does not name one
    pub fn classify_path(original_path: &str) -> &'static str {
        let shop_segment = original_path
            .to_lowercase()
            .find("/shop/")
            .is_some_and(|index| index > 0);
        if shop_segment {
            responses::SHOP_SERVICE_UNAVAILABLE
        } else {
            responses::SERVICE_UNAVAILABLE
        }
    }
}
