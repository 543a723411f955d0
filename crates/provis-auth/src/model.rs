//! Authentication and authorization models
//!
//! This file defines identities, authorization requests, policies and JWT claims

use serde::{Deserialize, Serialize};

// Auth configuration keys
pub const TOKEN_SECRET_KEY: &str = "provis.auth.token.secret.key";
pub const DEFAULT_TOKEN_SECRET_KEY: &str = "";
pub const TOKEN_EXPIRE_SECONDS: &str = "provis.auth.token.expire.seconds";
pub const DEFAULT_TOKEN_EXPIRE_SECONDS: i64 = 18000;
pub const IDENTIFY_TIMEOUT_MS: &str = "provis.auth.identify.timeout.ms";
pub const DEFAULT_IDENTIFY_TIMEOUT_MS: u64 = 1000;

pub const AUTHORIZATION_HEADER: &str = "Authorization";
pub const TOKEN_PREFIX: &str = "Bearer ";

// Subjects
pub const USER_TYPE: &str = "user";
pub const USERS_KIND: &str = "users";

// Permissions
pub const MEMBERSHIP_PERMISSION: &str = "membership";
pub const VIEW_PERMISSION: &str = "view";
pub const EDIT_PERMISSION: &str = "edit";
pub const DELETE_PERMISSION: &str = "delete";
pub const ADMIN_PERMISSION: &str = "admin";

// Object types
pub const DOMAIN_TYPE: &str = "domain";
pub const THING_TYPE: &str = "thing";
pub const PLATFORM_TYPE: &str = "platform";

/// The single platform-wide object administrators hold `admin` on
pub const PLATFORM_OBJECT: &str = "provis";

/// Resolved caller identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub domain_id: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, domain_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            domain_id: domain_id.into(),
        }
    }

    /// Both the user and the domain are known
    pub fn is_complete(&self) -> bool {
        !self.id.is_empty() && !self.domain_id.is_empty()
    }
}

/// Authorization question: may `subject` hold `permission` on `object`?
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthorizeRequest {
    /// Domain scope of the check, empty for cross-domain checks
    pub domain: String,
    pub subject_type: String,
    pub subject_kind: String,
    pub subject: String,
    pub permission: String,
    pub object_type: String,
    pub object: String,
}

impl AuthorizeRequest {
    /// A user-subject request
    pub fn user(
        domain: &str,
        subject: &str,
        permission: &str,
        object_type: &str,
        object: &str,
    ) -> Self {
        Self {
            domain: domain.to_string(),
            subject_type: USER_TYPE.to_string(),
            subject_kind: USERS_KIND.to_string(),
            subject: subject.to_string(),
            permission: permission.to_string(),
            object_type: object_type.to_string(),
            object: object.to_string(),
        }
    }

    /// Membership of a user in its domain
    pub fn domain_membership(identity: &Identity) -> Self {
        Self::user(
            "",
            &identity.id,
            MEMBERSHIP_PERMISSION,
            DOMAIN_TYPE,
            &identity.domain_id,
        )
    }

    /// Administration of a user's domain
    pub fn domain_admin(identity: &Identity) -> Self {
        Self::user("", &identity.id, ADMIN_PERMISSION, DOMAIN_TYPE, &identity.domain_id)
    }

    /// Platform-wide administration
    pub fn platform_admin(identity: &Identity) -> Self {
        Self::user("", &identity.id, ADMIN_PERMISSION, PLATFORM_TYPE, PLATFORM_OBJECT)
    }

    /// A permission on a thing within the user's domain
    pub fn thing(identity: &Identity, permission: &str, thing_id: &str) -> Self {
        Self::user(
            &identity.domain_id,
            &identity.id,
            permission,
            THING_TYPE,
            thing_id,
        )
    }
}

/// Request for every object of a type a subject holds a permission on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListObjectsRequest {
    pub subject_type: String,
    pub subject: String,
    pub permission: String,
    pub object_type: String,
}

impl ListObjectsRequest {
    /// Things a user may view
    pub fn viewable_things(user_id: &str) -> Self {
        Self {
            subject_type: USER_TYPE.to_string(),
            subject: user_id.to_string(),
            permission: VIEW_PERMISSION.to_string(),
            object_type: THING_TYPE.to_string(),
        }
    }
}

/// Policy tuple granting `subject` the `permission` on `object`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Policy {
    pub subject: String,
    pub permission: String,
    pub object_type: String,
    pub object: String,
}

impl Policy {
    pub fn new(subject: &str, permission: &str, object_type: &str, object: &str) -> Self {
        Self {
            subject: subject.to_string(),
            permission: permission.to_string(),
            object_type: object_type.to_string(),
            object: object.to_string(),
        }
    }
}

/// JWT claims carried by caller tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtPayload {
    /// User id
    pub sub: String,
    /// Domain id
    #[serde(default)]
    pub domain: String,
    pub exp: i64,
}
