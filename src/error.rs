use thiserror::Error;
use crate::config::ConfigError;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// The user-info fetch after a successful login failed.
///
/// Not fatal: the login still completes and navigates, the user entry just stays unset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to fetch user info after login")]
pub struct SessionPopulationError(#[source] pub TransportError);
