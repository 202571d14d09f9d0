//! Authorization checks that run after a token has been verified.

use anyhow::Result;
use brandhub_core::{context, HubError, Principal, PrincipalKind};
use brandhub_store::{BrandAdmin, Session};
use tracing::warn;

use crate::jwt::{Claims, TokenIssuer};

/// Verify an access token and bind it to the current tenant.
///
/// Missing, malformed, expired and forged tokens all answer the same
/// NotAuthenticated error.
pub fn authenticate(issuer: &TokenIssuer, token: Option<&str>) -> Result<Principal> {
    let token = token.ok_or_else(|| {
        HubError::not_authenticated("Authentication credentials were not provided").into_anyhow()
    })?;
    let claims = issuer
        .verify_access(token)
        .map_err(|e| HubError::not_authenticated(e.to_string()).into_anyhow())?;
    authorize_tenant(&claims)
}

/// A token is only good for the tenant it was issued for.
pub fn authorize_tenant(claims: &Claims) -> Result<Principal> {
    let current = context::current()?;
    if claims.brand_name != current {
        warn!(
            token_tenant = %claims.brand_name,
            context_tenant = %current,
            "cross-tenant token rejected"
        );
        return Err(HubError::forbidden("Access denied").into_anyhow());
    }
    Ok(claims.principal())
}

/// Resolve an administrator principal to its active BrandAdmin row.
pub async fn require_admin(session: &mut Session, principal: &Principal) -> Result<BrandAdmin> {
    if principal.kind != PrincipalKind::Admin {
        return Err(HubError::forbidden("Access denied").into_anyhow());
    }
    let (id, tenant) = (principal.id, principal.tenant.clone());
    session
        .find_one::<BrandAdmin, _>(|a| a.id == id && a.brand_name == tenant && a.is_active)
        .await?
        .ok_or_else(|| HubError::forbidden("Access denied").into_anyhow())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::TokenType;
    use crate::options::JwtOptions;
    use brandhub_core::{ErrorKind, StoreCoordinates, Tenant, TenantContext, TenantName};
    use brandhub_store::TenantGateway;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(JwtOptions::new("guard-secret"))
    }

    #[tokio::test]
    async fn token_for_one_tenant_is_refused_in_another() {
        let iss = issuer();
        let token = iss.issue(&Principal::user(5, "branda"), TokenType::Access).unwrap();

        let ok = context::scope(TenantContext::new("branda"), async {
            authenticate(&iss, Some(&token))
        })
        .await
        .unwrap();
        assert_eq!(ok, Principal::user(5, "branda"));

        let err = context::scope(TenantContext::new("brandb"), async {
            authenticate(&iss, Some(&token))
        })
        .await
        .unwrap_err();
        assert_eq!(HubError::kind_of(&err), Some(ErrorKind::Forbidden));
    }

    #[tokio::test]
    async fn missing_and_bad_tokens_are_not_authenticated() {
        let iss = issuer();
        context::scope(TenantContext::new("branda"), async {
            for token in [None, Some("garbage")] {
                let err = authenticate(&iss, token).unwrap_err();
                assert_eq!(HubError::kind_of(&err), Some(ErrorKind::NotAuthenticated));
            }
            let refresh = iss.issue(&Principal::user(5, "branda"), TokenType::Refresh).unwrap();
            let err = authenticate(&iss, Some(&refresh)).unwrap_err();
            assert_eq!(HubError::kind_of(&err), Some(ErrorKind::NotAuthenticated));
        })
        .await;
    }

    #[tokio::test]
    async fn admin_guard_needs_an_active_row_for_the_same_brand() {
        let gw = TenantGateway::new();
        gw.attach(&Tenant::new(1, "branda", StoreCoordinates::local("brand_a")));

        context::scope(TenantContext::new("branda"), async {
            let mut s = gw.begin(None).await.unwrap();
            let admin = s
                .insert(BrandAdmin {
                    id: 0,
                    firstname: "G".into(),
                    surname: "H".into(),
                    email: "g@x.com".into(),
                    password: "hash".into(),
                    brand_name: TenantName::new("branda"),
                    is_active: false,
                    created_at: None,
                    updated_at: None,
                })
                .await
                .unwrap();

            let principal = Principal::admin(admin.id, "branda");
            let err = require_admin(&mut s, &principal).await.unwrap_err();
            assert_eq!(HubError::kind_of(&err), Some(ErrorKind::Forbidden));

            let mut active = admin.clone();
            active.is_active = true;
            s.update(&mut active).await.unwrap();
            assert_eq!(require_admin(&mut s, &principal).await.unwrap().id, admin.id);

            // Same id, but a user token.
            let err = require_admin(&mut s, &Principal::user(admin.id, "branda"))
                .await
                .unwrap_err();
            assert_eq!(HubError::kind_of(&err), Some(ErrorKind::Forbidden));
            s.rollback();
        })
        .await;
    }
}
