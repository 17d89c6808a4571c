//! Permission requirements and their evaluation.
//!
//! Generated routes carry an [`Access`] rule. A declared permission on a
//! service method becomes a [`PermissionRequirement`] keyed
//! `"Permission:<name>"`; deciding whether a caller holds it is the job of a
//! [`PermissionEvaluator`].

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::auth::Claims;
use crate::middleware::BoxFuture;

const PERMISSION_KEY_PREFIX: &str = "Permission:";

/// A named permission a caller must hold to reach a route.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PermissionRequirement {
    name: String,
}

impl PermissionRequirement {
    /// Builds a requirement from a declared permission name.
    ///
    /// Blank names carry no requirement.
    pub fn from_declared(name: Option<&str>) -> Option<Self> {
        let name = name?.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The authorization policy key, e.g. `Permission:Products.Delete`.
    pub fn key(&self) -> String {
        format!("{}{}", PERMISSION_KEY_PREFIX, self.name)
    }
}

impl fmt::Display for PermissionRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Who may reach a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// No credentials needed.
    Public,
    /// Any authenticated caller.
    Authenticated,
    /// An authenticated caller holding the given permission.
    Permission(PermissionRequirement),
}

impl Access {
    /// Access rule for a generated endpoint: the group-wide authentication
    /// requirement, narrowed by the declared permission if there is one.
    pub fn for_declared(permission: Option<&str>) -> Self {
        match PermissionRequirement::from_declared(permission) {
            Some(requirement) => Access::Permission(requirement),
            None => Access::Authenticated,
        }
    }

    pub fn requirement(&self) -> Option<&PermissionRequirement> {
        match self {
            Access::Permission(requirement) => Some(requirement),
            _ => None,
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self, Access::Public)
    }
}

/// Decides whether an authenticated caller satisfies a permission.
pub trait PermissionEvaluator: Send + Sync + 'static {
    fn has_permission<'a>(&'a self, claims: &'a Claims, permission: &'a str) -> BoxFuture<'a, bool>;
}

/// Grants a permission when it appears in the token's `permissions` claim.
/// Names compare case-insensitively.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClaimsPermissionEvaluator;

impl PermissionEvaluator for ClaimsPermissionEvaluator {
    fn has_permission<'a>(&'a self, claims: &'a Claims, permission: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(std::future::ready(claims_grant(claims, permission)))
    }
}

fn claims_grant(claims: &Claims, permission: &str) -> bool {
    claims
        .permissions
        .iter()
        .any(|granted| granted.eq_ignore_ascii_case(permission))
}

/// Permission grants held outside the token.
///
/// Checks, in order: the token's `permissions` claim, permissions granted to
/// the subject directly, and permissions granted to any of the subject's
/// roles (the `roles` claim).
#[derive(Debug, Default, Clone)]
pub struct GrantTable {
    users: HashMap<String, HashSet<String>>,
    roles: HashMap<String, HashSet<String>>,
}

impl GrantTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant_user(mut self, subject: impl Into<String>, permission: impl Into<String>) -> Self {
        self.users
            .entry(subject.into())
            .or_default()
            .insert(permission.into());
        self
    }

    pub fn grant_role(mut self, role: impl Into<String>, permission: impl Into<String>) -> Self {
        self.roles
            .entry(role.into())
            .or_default()
            .insert(permission.into());
        self
    }

    fn user_grant(&self, subject: &str, permission: &str) -> bool {
        self.users
            .get(subject)
            .is_some_and(|granted| granted.contains(permission))
    }

    fn role_grant(&self, roles: &[String], permission: &str) -> bool {
        roles.iter().any(|role| {
            self.roles
                .get(role)
                .is_some_and(|granted| granted.contains(permission))
        })
    }
}

impl PermissionEvaluator for GrantTable {
    fn has_permission<'a>(&'a self, claims: &'a Claims, permission: &'a str) -> BoxFuture<'a, bool> {
        let allowed = claims_grant(claims, permission)
            || self.user_grant(&claims.sub, permission)
            || self.role_grant(&claims.roles, permission);
        Box::pin(std::future::ready(allowed))
    }
}
