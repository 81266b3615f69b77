//! Bearer token providers for services that authenticate with tokens.

use regwise_core::{AppConfig, AppResult};

/// Source of bearer tokens, asked once per request.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> AppResult<String>;
}

/// A fixed token.
#[cfg(test)]
pub struct StaticTokenProvider {
    token: String,
}

#[cfg(test)]
impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self) -> AppResult<String> {
        Ok(self.token.clone())
    }
}

/// Reads the token from an environment variable on every call, so an
/// external refresher can rotate it while the process runs.
pub struct EnvTokenProvider {
    env_var: String,
}

impl EnvTokenProvider {
    pub fn new(env_var: impl Into<String>) -> Self {
        Self {
            env_var: env_var.into(),
        }
    }
}

#[async_trait::async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn token(&self) -> AppResult<String> {
        AppConfig::resolve_secret(&self.env_var)
    }
}
