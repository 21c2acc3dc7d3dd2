//! Authentication context and authorization policies
//!
//! Provides context-based authorization with multiple auth types:
//! - User authentication
//! - Service-to-service
//! - Admin access
//!
//! An [`AuthProvider`] resolves the [`AuthContext`] of a request; an
//! [`AuthPolicy`] decides whether a context may run an operation. Policies
//! are turned into pipeline predicates by
//! [`Security::from_policy`](crate::core::security::Security::from_policy).

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use axum::http::HeaderMap;
use std::sync::Arc;
use uuid::Uuid;

/// Authorization context extracted from a request
#[derive(Debug, Clone, Default)]
pub enum AuthContext {
    /// Authenticated user
    User {
        user_id: Uuid,
        tenant_id: Uuid,
        roles: Vec<String>,
    },

    /// Service-to-service communication
    Service {
        service_name: String,
        tenant_id: Option<Uuid>,
    },

    /// System administrator
    Admin { admin_id: Uuid },

    /// No authentication (public access)
    #[default]
    Anonymous,
}

impl AuthContext {
    /// Get tenant_id from context if available
    pub fn tenant_id(&self) -> Option<Uuid> {
        match self {
            AuthContext::User { tenant_id, .. } => Some(*tenant_id),
            AuthContext::Service { tenant_id, .. } => *tenant_id,
            AuthContext::Admin { .. } => None,
            AuthContext::Anonymous => None,
        }
    }

    /// Get user_id if available
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            AuthContext::User { user_id, .. } => Some(*user_id),
            _ => None,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, AuthContext::Anonymous)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, AuthContext::Admin { .. })
    }

    pub fn is_service(&self) -> bool {
        matches!(self, AuthContext::Service { .. })
    }
}

/// Authorization policy for an operation
#[derive(Debug, Clone)]
pub enum AuthPolicy {
    /// Public access (no auth required)
    Public,

    /// Any authenticated caller
    Authenticated,

    /// User must have one of these roles
    HasRole(Vec<String>),

    /// Service-to-service only
    ServiceOnly,

    /// Admin only
    AdminOnly,

    /// Combination of policies (AND)
    And(Vec<AuthPolicy>),

    /// Combination of policies (OR)
    Or(Vec<AuthPolicy>),

    /// Custom policy function
    Custom(fn(&AuthContext) -> bool),
}

impl AuthPolicy {
    /// Check if auth context satisfies this policy
    pub fn check(&self, context: &AuthContext) -> bool {
        match self {
            AuthPolicy::Public => true,

            AuthPolicy::Authenticated => !context.is_anonymous(),

            AuthPolicy::HasRole(required_roles) => match context {
                AuthContext::User { roles, .. } => required_roles.iter().any(|r| roles.contains(r)),
                _ => false,
            },

            AuthPolicy::ServiceOnly => context.is_service(),

            AuthPolicy::AdminOnly => context.is_admin(),

            AuthPolicy::And(policies) => policies.iter().all(|p| p.check(context)),

            AuthPolicy::Or(policies) => policies.iter().any(|p| p.check(context)),

            AuthPolicy::Custom(f) => f(context),
        }
    }

    /// Whether the policy lets anonymous callers through
    pub fn is_public(&self) -> bool {
        matches!(self, AuthPolicy::Public)
    }

    /// Parse policy from string (for YAML config)
    pub fn parse_policy(s: &str) -> Self {
        if let Some(role) = s.strip_prefix("role:") {
            return AuthPolicy::HasRole(vec![role.to_string()]);
        }

        match s {
            "public" => AuthPolicy::Public,
            "authenticated" => AuthPolicy::Authenticated,
            "service_only" => AuthPolicy::ServiceOnly,
            "admin_only" => AuthPolicy::AdminOnly,
            _ => AuthPolicy::Authenticated, // Default
        }
    }
}

/// Trait for auth providers
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Extract auth context from request headers
    async fn extract_context(&self, headers: &HeaderMap) -> Result<AuthContext>;
}

/// Shared handle installed as a request extension by the server builder
pub type SharedAuthProvider = Arc<dyn AuthProvider>;

/// Default no-auth provider (for development)
pub struct NoAuthProvider;

#[async_trait]
impl AuthProvider for NoAuthProvider {
    async fn extract_context(&self, _headers: &HeaderMap) -> Result<AuthContext> {
        Ok(AuthContext::Anonymous)
    }
}

/// Provider trusting identity headers set by an upstream gateway
///
/// | Header          | Context                                   |
/// |-----------------|-------------------------------------------|
/// | `x-admin-id`    | `Admin`                                   |
/// | `x-service-name`| `Service` (tenant from `x-tenant-id`)     |
/// | `x-user-id`     | `User` (needs `x-tenant-id`, `x-user-roles` comma-separated) |
///
/// No identity header yields `Anonymous`.
pub struct HeaderAuthProvider;

impl HeaderAuthProvider {
    fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>> {
        match headers.get(name) {
            Some(value) => {
                let value = value
                    .to_str()
                    .with_context(|| format!("header '{}' is not valid text", name))?;
                Ok(Some(value.trim()))
            }
            None => Ok(None),
        }
    }

    fn uuid(headers: &HeaderMap, name: &str) -> Result<Option<Uuid>> {
        Self::header(headers, name)?
            .map(|v| Uuid::parse_str(v).with_context(|| format!("header '{}' is not a UUID", name)))
            .transpose()
    }
}

#[async_trait]
impl AuthProvider for HeaderAuthProvider {
    async fn extract_context(&self, headers: &HeaderMap) -> Result<AuthContext> {
        if let Some(admin_id) = Self::uuid(headers, "x-admin-id")? {
            return Ok(AuthContext::Admin { admin_id });
        }

        if let Some(service_name) = Self::header(headers, "x-service-name")? {
            return Ok(AuthContext::Service {
                service_name: service_name.to_string(),
                tenant_id: Self::uuid(headers, "x-tenant-id")?,
            });
        }

        if let Some(user_id) = Self::uuid(headers, "x-user-id")? {
            let tenant_id = Self::uuid(headers, "x-tenant-id")?
                .ok_or_else(|| anyhow!("header 'x-tenant-id' is required with 'x-user-id'"))?;
            let roles = Self::header(headers, "x-user-roles")?
                .map(|roles| {
                    roles
                        .split(',')
                        .map(str::trim)
                        .filter(|r| !r.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default();

            return Ok(AuthContext::User {
                user_id,
                tenant_id,
                roles,
            });
        }

        Ok(AuthContext::Anonymous)
    }
}
