// Authentication options and configuration.

use std::time::Duration;

use brandhub_core::{ConfigError, HubConfigSnapshot};
use serde::{Deserialize, Serialize};

/// HMAC signing algorithms.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum JwtAlgorithm {
    /// HMAC using SHA-256
    #[default]
    HS256,
    /// HMAC using SHA-384
    HS384,
    /// HMAC using SHA-512
    HS512,
}

impl std::str::FromStr for JwtAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HS256" => Ok(Self::HS256),
            "HS384" => Ok(Self::HS384),
            "HS512" => Ok(Self::HS512),
            other => Err(format!("unsupported algorithm '{other}'")),
        }
    }
}

/// JWT-specific configuration options
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JwtOptions {
    pub algorithm: JwtAlgorithm,
    /// Process-wide signing secret
    #[serde(skip_serializing)]
    pub secret: String,
    #[serde(with = "humantime_serde")]
    pub access_token_expires_in: Duration,
    #[serde(with = "humantime_serde")]
    pub refresh_token_expires_in: Duration,
    /// Tolerance applied to `exp`, in seconds
    pub leeway_secs: u64,
}

impl JwtOptions {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            algorithm: JwtAlgorithm::default(),
            secret: secret.into(),
            access_token_expires_in: Duration::from_secs(15 * 60),
            refresh_token_expires_in: Duration::from_secs(7 * 24 * 3600),
            leeway_secs: 0,
        }
    }

    /// Validate JWT configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.secret.trim().is_empty() {
            return Err("HMAC algorithms require a secret".to_string());
        }
        if self.access_token_expires_in.as_secs() == 0 {
            return Err("Access token expiration must be greater than 0".to_string());
        }
        if self.refresh_token_expires_in < self.access_token_expires_in {
            return Err("Refresh tokens must not expire before access tokens".to_string());
        }
        Ok(())
    }
}

impl std::fmt::Debug for JwtOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtOptions")
            .field("algorithm", &self.algorithm)
            .field("secret", &"***")
            .field("access_token_expires_in", &self.access_token_expires_in)
            .field("refresh_token_expires_in", &self.refresh_token_expires_in)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthOptions {
    pub jwt: JwtOptions,
    /// bcrypt work factor
    pub hash_cost: u32,
}

impl AuthOptions {
    /// Read `auth.*` keys. `auth.secret` is required.
    pub fn from_config(config: &HubConfigSnapshot) -> Result<Self, ConfigError> {
        let mut jwt = JwtOptions::new(config.require("auth.secret")?);
        if let Some(alg) = config.parse::<JwtAlgorithm>("auth.algorithm")? {
            jwt.algorithm = alg;
        }
        if let Some(d) = config.get_duration("auth.access_ttl")? {
            jwt.access_token_expires_in = d;
        }
        if let Some(d) = config.get_duration("auth.refresh_ttl")? {
            jwt.refresh_token_expires_in = d;
        }
        if let Some(l) = config.parse::<u64>("auth.leeway_secs")? {
            jwt.leeway_secs = l;
        }
        jwt.validate().map_err(|reason| ConfigError::Invalid {
            key: "auth".to_string(),
            reason,
        })?;

        let hash_cost = config
            .parse::<u32>("auth.bcrypt_cost")?
            .unwrap_or(bcrypt::DEFAULT_COST);
        if !(4..=31).contains(&hash_cost) {
            return Err(ConfigError::Invalid {
                key: "auth.bcrypt_cost".to_string(),
                reason: "must be between 4 and 31".to_string(),
            });
        }

        Ok(Self { jwt, hash_cost })
    }
}
