//! Tenant-bound JWTs.
//!
//! Claims keep the legacy names (`user_id`, `brand_name`, `token_type`) so
//! tokens stay readable by the previous deployment.

use brandhub_core::{Principal, PrincipalKind, TenantName};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::options::{JwtAlgorithm, JwtOptions};

#[cfg(not(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto")))]
compile_error!("enable one of the JWT backends: jwt-aws-lc-rs, jwt-rust-crypto");

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub token_type: TokenType,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    pub user_id: u64,
    pub brand_name: TenantName,
    #[serde(default)]
    pub principal: PrincipalKind,
}

impl Claims {
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.user_id,
            tenant: self.brand_name.clone(),
            kind: self.principal,
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}

/// Every way a presented token can fail.
///
/// Deliberately a single variant: callers must not be able to tell an
/// expired token from a forged or malformed one.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid or expired token")]
pub struct InvalidToken;

#[derive(Debug, Error)]
#[error("failed to sign token: {0}")]
pub struct SigningError(String);

pub struct TokenIssuer {
    options: JwtOptions,
}

impl TokenIssuer {
    pub fn new(options: JwtOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &JwtOptions {
        &self.options
    }

    fn algorithm(alg: JwtAlgorithm) -> jsonwebtoken::Algorithm {
        match alg {
            JwtAlgorithm::HS256 => jsonwebtoken::Algorithm::HS256,
            JwtAlgorithm::HS384 => jsonwebtoken::Algorithm::HS384,
            JwtAlgorithm::HS512 => jsonwebtoken::Algorithm::HS512,
        }
    }

    /// Sign one token for `principal`.
    pub fn issue(&self, principal: &Principal, token_type: TokenType) -> Result<String, SigningError> {
        use jsonwebtoken::{encode, EncodingKey, Header};

        let ttl = match token_type {
            TokenType::Access => self.options.access_token_expires_in,
            TokenType::Refresh => self.options.refresh_token_expires_in,
        };
        let now = Utc::now().timestamp();
        let claims = Claims {
            token_type,
            exp: now + ttl.as_secs() as i64,
            iat: now,
            jti: Uuid::new_v4().simple().to_string(),
            user_id: principal.id,
            brand_name: principal.tenant.clone(),
            principal: principal.kind,
        };

        let header = Header::new(Self::algorithm(self.options.algorithm));
        encode(
            &header,
            &claims,
            &EncodingKey::from_secret(self.options.secret.as_bytes()),
        )
        .map_err(|e| SigningError(e.to_string()))
    }

    /// The access/refresh pair handed out at login.
    pub fn issue_pair(&self, principal: &Principal) -> Result<TokenPair, SigningError> {
        Ok(TokenPair {
            refresh: self.issue(principal, TokenType::Refresh)?,
            access: self.issue(principal, TokenType::Access)?,
        })
    }

    /// Check signature and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, InvalidToken> {
        use jsonwebtoken::{decode, DecodingKey, Validation};

        let mut validation = Validation::new(Self::algorithm(self.options.algorithm));
        validation.leeway = self.options.leeway_secs;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.options.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| {
            debug!(reason = %e, "token rejected");
            InvalidToken
        })
    }

    /// Like [`TokenIssuer::verify`], but refresh tokens are refused.
    pub fn verify_access(&self, token: &str) -> Result<Claims, InvalidToken> {
        self.verify(token)
            .and_then(|c| (c.token_type == TokenType::Access).then_some(c).ok_or(InvalidToken))
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, InvalidToken> {
        self.verify(token)
            .and_then(|c| (c.token_type == TokenType::Refresh).then_some(c).ok_or(InvalidToken))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(JwtOptions::new("test-secret"))
    }

    #[test]
    fn pair_round_trips_principal_and_tenant() {
        let iss = issuer();
        let pair = iss.issue_pair(&Principal::user(42, "BrandA")).unwrap();

        let access = iss.verify_access(&pair.access).unwrap();
        assert_eq!(access.user_id, 42);
        assert_eq!(access.brand_name, "branda");
        assert_eq!(access.principal, PrincipalKind::User);

        let refresh = iss.verify_refresh(&pair.refresh).unwrap();
        assert!(refresh.exp > access.exp);
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let iss = issuer();
        let pair = iss.issue_pair(&Principal::admin(1, "branda")).unwrap();
        assert_eq!(iss.verify_access(&pair.refresh), Err(InvalidToken));
        assert_eq!(iss.verify_refresh(&pair.access), Err(InvalidToken));
    }

    #[test]
    fn every_failure_is_the_same_outcome() {
        let iss = issuer();
        let token = iss.issue(&Principal::user(1, "branda"), TokenType::Access).unwrap();

        let other = TokenIssuer::new(JwtOptions::new("another-secret"));
        assert_eq!(other.verify(&token), Err(InvalidToken));
        assert_eq!(iss.verify("not.a.jwt"), Err(InvalidToken));
        assert_eq!(iss.verify(""), Err(InvalidToken));

        let mut tampered = token.clone();
        tampered.push('x');
        assert_eq!(iss.verify(&tampered), Err(InvalidToken));
    }

    #[test]
    fn expired_tokens_are_invalid() {
        let iss = issuer();
        let mut claims = iss
            .verify(&iss.issue(&Principal::user(1, "branda"), TokenType::Access).unwrap())
            .unwrap();
        claims.exp = Utc::now().timestamp() - 120;
        let stale = jsonwebtoken::encode(
            &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        assert_eq!(iss.verify(&stale), Err(InvalidToken));
    }

    #[test]
    fn legacy_tokens_without_principal_are_users() {
        let json = serde_json::json!({
            "token_type": "access", "exp": 1, "iat": 0, "jti": "x",
            "user_id": 3, "brand_name": "brandb"
        });
        let claims: Claims = serde_json::from_value(json).unwrap();
        assert_eq!(claims.principal(), Principal::user(3, "brandb"));
    }
}
