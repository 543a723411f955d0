//! JWT identity gateway backed by an in-memory policy table

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashSet;
use moka::sync::Cache;
use tracing::debug;

use provis_common::ProvisError;

use crate::model::{
    ADMIN_PERMISSION, AuthorizeRequest, DOMAIN_TYPE, Identity, JwtPayload, ListObjectsRequest,
    PLATFORM_OBJECT, PLATFORM_TYPE, Policy,
};
use crate::service::token::{decode_jwt_token, encode_jwt_token, strip_bearer};
use crate::traits::IdentityGateway;

/// Validates HS256 caller tokens and answers permission checks from a policy table
///
/// Validated claims are cached per token until they expire. Holders of
/// `admin` on the platform object are authorized for everything; holders of
/// `admin` on a domain are authorized for every object scoped to it.
pub struct JwtIdentityGateway {
    secret_key: String,
    token_cache: Cache<String, JwtPayload>,
    policies: DashSet<Policy>,
}

impl std::fmt::Debug for JwtIdentityGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtIdentityGateway")
            .field("policies", &self.policies.len())
            .finish()
    }
}

impl JwtIdentityGateway {
    /// Create a gateway from a base64 encoded HMAC secret
    pub fn new(secret_key: &str) -> anyhow::Result<Self> {
        if secret_key.trim().is_empty() {
            return Err(ProvisError::IllegalArgument("token secret key is empty".to_string()).into());
        }

        Ok(Self {
            secret_key: secret_key.to_string(),
            token_cache: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(Duration::from_secs(300))
                .build(),
            policies: DashSet::new(),
        })
    }

    /// Issue a token for a user of a domain
    pub fn encode_token(
        &self,
        user_id: &str,
        domain_id: &str,
        expire_seconds: i64,
    ) -> anyhow::Result<String> {
        Ok(encode_jwt_token(user_id, domain_id, &self.secret_key, expire_seconds)?)
    }

    pub fn grant(&self, policy: Policy) {
        self.policies.insert(policy);
    }

    pub fn revoke(&self, policy: &Policy) {
        self.policies.remove(policy);
    }

    /// Make a user platform administrator
    pub fn grant_platform_admin(&self, user_id: &str) {
        self.grant(Policy::new(
            user_id,
            ADMIN_PERMISSION,
            PLATFORM_TYPE,
            PLATFORM_OBJECT,
        ));
    }

    /// Drop a token from the cache
    pub fn invalidate_token(&self, token: &str) {
        self.token_cache.invalidate(strip_bearer(token));
    }

    fn claims(&self, token: &str) -> anyhow::Result<JwtPayload> {
        if let Some(cached) = self.token_cache.get(token) {
            if cached.exp > chrono::Utc::now().timestamp() {
                return Ok(cached);
            }
            self.token_cache.invalidate(token);
        }

        let claims = decode_jwt_token(token, &self.secret_key)
            .map_err(|e| {
                debug!(error = %e, "Token validation failed");
                ProvisError::Authentication
            })?
            .claims;

        self.token_cache.insert(token.to_string(), claims.clone());
        Ok(claims)
    }

    fn holds(&self, subject: &str, permission: &str, object_type: &str, object: &str) -> bool {
        self.policies
            .contains(&Policy::new(subject, permission, object_type, object))
    }
}

#[async_trait]
impl IdentityGateway for JwtIdentityGateway {
    async fn identify(&self, token: &str) -> anyhow::Result<Identity> {
        let claims = self.claims(strip_bearer(token))?;
        let identity = Identity::new(claims.sub, claims.domain);
        if !identity.is_complete() {
            return Err(ProvisError::Authentication.into());
        }
        Ok(identity)
    }

    async fn authorize(&self, request: &AuthorizeRequest) -> anyhow::Result<bool> {
        let subject = request.subject.as_str();

        if self.holds(subject, ADMIN_PERMISSION, PLATFORM_TYPE, PLATFORM_OBJECT) {
            return Ok(true);
        }
        if !request.domain.is_empty()
            && self.holds(subject, ADMIN_PERMISSION, DOMAIN_TYPE, &request.domain)
        {
            return Ok(true);
        }

        Ok(self.holds(
            subject,
            &request.permission,
            &request.object_type,
            &request.object,
        ))
    }

    async fn list_all_objects(&self, request: &ListObjectsRequest) -> anyhow::Result<Vec<String>> {
        let mut objects: Vec<String> = self
            .policies
            .iter()
            .filter(|policy| {
                policy.subject == request.subject
                    && policy.permission == request.permission
                    && policy.object_type == request.object_type
            })
            .map(|policy| policy.object.clone())
            .collect();
        objects.sort();
        Ok(objects)
    }
}

#[cfg(test)]
mod tests {
    use provis_common::error::{ErrorKind, kind_of};

    use super::*;
    use crate::model::{EDIT_PERMISSION, MEMBERSHIP_PERMISSION, THING_TYPE, VIEW_PERMISSION};

    const SECRET: &str = "U2VjcmV0S2V5MDEyMzQ1Njc4OTAxMjM0NTY3ODkwMTIzNDU2Nzg5";

    fn gateway() -> JwtIdentityGateway {
        JwtIdentityGateway::new(SECRET).unwrap()
    }

    #[tokio::test]
    async fn test_identify() {
        let gateway = gateway();
        let token = gateway.encode_token("u1", "d1", 60).unwrap();

        let identity = gateway.identify(&token).await.unwrap();
        assert_eq!(identity, Identity::new("u1", "d1"));

        // Served from cache the second time, with or without the prefix
        let identity = gateway.identify(&format!("Bearer {}", token)).await.unwrap();
        assert_eq!(identity.domain_id, "d1");
    }

    #[tokio::test]
    async fn test_identify_rejects_bad_tokens() {
        let gateway = gateway();

        let err = gateway.identify("garbage").await.unwrap_err();
        assert_eq!(kind_of(&err), Some(ErrorKind::Authentication));

        let expired = gateway.encode_token("u1", "d1", -3600).unwrap();
        let err = gateway.identify(&expired).await.unwrap_err();
        assert_eq!(kind_of(&err), Some(ErrorKind::Authentication));

        let no_domain = gateway.encode_token("u1", "", 60).unwrap();
        let err = gateway.identify(&no_domain).await.unwrap_err();
        assert_eq!(kind_of(&err), Some(ErrorKind::Authentication));
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(JwtIdentityGateway::new("  ").is_err());
    }

    #[tokio::test]
    async fn test_authorize_from_policies() {
        let gateway = gateway();
        let identity = Identity::new("u1", "d1");
        gateway.grant(Policy::new("u1", MEMBERSHIP_PERMISSION, DOMAIN_TYPE, "d1"));
        gateway.grant(Policy::new("u1", EDIT_PERMISSION, THING_TYPE, "t1"));

        let membership = AuthorizeRequest::domain_membership(&identity);
        assert!(gateway.authorize(&membership).await.unwrap());

        let edit = AuthorizeRequest::thing(&identity, EDIT_PERMISSION, "t1");
        assert!(gateway.authorize(&edit).await.unwrap());

        let other = AuthorizeRequest::thing(&identity, EDIT_PERMISSION, "t2");
        assert!(!gateway.authorize(&other).await.unwrap());

        gateway.revoke(&Policy::new("u1", EDIT_PERMISSION, THING_TYPE, "t1"));
        assert!(!gateway.authorize(&edit).await.unwrap());
    }

    #[tokio::test]
    async fn test_admins() {
        let gateway = gateway();
        let domain_admin = Identity::new("u1", "d1");
        gateway.grant(Policy::new("u1", ADMIN_PERMISSION, DOMAIN_TYPE, "d1"));

        let edit = AuthorizeRequest::thing(&domain_admin, EDIT_PERMISSION, "any");
        assert!(gateway.authorize(&edit).await.unwrap());
        assert!(!gateway.authorize(&AuthorizeRequest::platform_admin(&domain_admin)).await.unwrap());

        let root = Identity::new("root", "d9");
        gateway.grant_platform_admin("root");
        let request = AuthorizeRequest::thing(&root, EDIT_PERMISSION, "t-in-other-domain");
        assert!(gateway.authorize(&request).await.unwrap());
        assert!(gateway.authorize(&AuthorizeRequest::platform_admin(&root)).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_all_objects() {
        let gateway = gateway();
        gateway.grant(Policy::new("u1", VIEW_PERMISSION, THING_TYPE, "t2"));
        gateway.grant(Policy::new("u1", VIEW_PERMISSION, THING_TYPE, "t1"));
        gateway.grant(Policy::new("u1", EDIT_PERMISSION, THING_TYPE, "t3"));
        gateway.grant(Policy::new("u2", VIEW_PERMISSION, THING_TYPE, "t4"));

        let objects = gateway
            .list_all_objects(&ListObjectsRequest::viewable_things("u1"))
            .await
            .unwrap();
        assert_eq!(objects, vec!["t1", "t2"]);
    }
}
