//! Infrastructure layer
//!
//! Adapters to the world outside the request pipeline: the shared-secret
//! cipher, the authorization service client and log message constants.

pub mod auth_client;
pub mod cipher;
pub mod log_messages;

pub use auth_client::{
    AuthClientError, Authorizer, AuthorizerFactory, HttpAuthorizationClient, HttpAuthorizerFactory,
};
pub use cipher::{CipherError, SecretCipher};
