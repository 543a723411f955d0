// Identity gateway with a fixed token table

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use provis_auth::{
    ADMIN_PERMISSION, AuthorizeRequest, DOMAIN_TYPE, Identity, IdentityGateway,
    ListObjectsRequest, PLATFORM_TYPE,
};
use provis_common::ProvisError;

/// Grants every permission unless told otherwise
#[derive(Default)]
pub struct StaticIdentityGateway {
    identities: Mutex<HashMap<String, Identity>>,
    denied: Mutex<HashSet<(String, String)>>,
    platform_admins: Mutex<HashSet<String>>,
    domain_admins: Mutex<HashSet<String>>,
    viewable: Mutex<HashMap<String, Vec<String>>>,
    deny_all: AtomicBool,
    delay: Mutex<Option<Duration>>,
    pub authorize_calls: AtomicUsize,
}

impl StaticIdentityGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_token(&self, token: &str, user_id: &str, domain_id: &str) {
        self.identities
            .lock()
            .insert(token.to_string(), Identity::new(user_id, domain_id));
    }

    /// Deny `permission` on `object`
    pub fn deny(&self, permission: &str, object: &str) {
        self.denied
            .lock()
            .insert((permission.to_string(), object.to_string()));
    }

    pub fn deny_all(&self) {
        self.deny_all.store(true, Ordering::SeqCst);
    }

    pub fn make_platform_admin(&self, user_id: &str) {
        self.platform_admins
            .lock()
            .insert(user_id.to_string());
    }

    pub fn make_domain_admin(&self, user_id: &str) {
        self.domain_admins
            .lock()
            .insert(user_id.to_string());
    }

    pub fn set_viewable(&self, user_id: &str, thing_ids: &[&str]) {
        self.viewable.lock().insert(
            user_id.to_string(),
            thing_ids.iter().map(|id| id.to_string()).collect(),
        );
    }

    /// Delay every identify call
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }
}

#[async_trait]
impl IdentityGateway for StaticIdentityGateway {
    async fn identify(&self, token: &str) -> anyhow::Result<Identity> {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.identities
            .lock()
            .get(token)
            .cloned()
            .ok_or_else(|| ProvisError::Authentication.into())
    }

    async fn authorize(&self, request: &AuthorizeRequest) -> anyhow::Result<bool> {
        self.authorize_calls.fetch_add(1, Ordering::SeqCst);

        if request.permission == ADMIN_PERMISSION && request.object_type == PLATFORM_TYPE {
            return Ok(self.platform_admins.lock().contains(&request.subject));
        }
        if request.permission == ADMIN_PERMISSION && request.object_type == DOMAIN_TYPE {
            return Ok(self.domain_admins.lock().contains(&request.subject));
        }
        if self.deny_all.load(Ordering::SeqCst) {
            return Ok(false);
        }

        let denied = self
            .denied
            .lock()
            .contains(&(request.permission.clone(), request.object.clone()));
        Ok(!denied)
    }

    async fn list_all_objects(&self, request: &ListObjectsRequest) -> anyhow::Result<Vec<String>> {
        Ok(self
            .viewable
            .lock()
            .get(&request.subject)
            .cloned()
            .unwrap_or_default())
    }
}
