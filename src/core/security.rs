//! Authentication and authorization gate
//!
//! [`Security`] holds two optional predicates evaluated in order before any
//! other stage. A missing predicate always passes; a predicate that returns
//! `false` or an error denies the request. The gate owns no policy of its
//! own and keeps no state between requests.

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use super::auth::AuthPolicy;
use super::context::RequestContext;
use super::error::PipelineError;

/// Predicate over a request
#[async_trait]
pub trait Guard: Send + Sync {
    async fn check(&self, ctx: &RequestContext) -> Result<bool>;
}

#[async_trait]
impl<F> Guard for F
where
    F: Fn(&RequestContext) -> Result<bool> + Send + Sync,
{
    async fn check(&self, ctx: &RequestContext) -> Result<bool> {
        self(ctx)
    }
}

/// Guard accepting any non-anonymous caller
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireIdentity;

#[async_trait]
impl Guard for RequireIdentity {
    async fn check(&self, ctx: &RequestContext) -> Result<bool> {
        Ok(!ctx.auth().is_anonymous())
    }
}

/// Guard checking the caller against an [`AuthPolicy`]
#[derive(Debug, Clone)]
pub struct PolicyGuard(pub AuthPolicy);

#[async_trait]
impl Guard for PolicyGuard {
    async fn check(&self, ctx: &RequestContext) -> Result<bool> {
        Ok(self.0.check(ctx.auth()))
    }
}

/// Pair of optional predicates run before every operation
#[derive(Clone, Default)]
pub struct Security {
    pub authenticator: Option<Arc<dyn Guard>>,
    pub authorizer: Option<Arc<dyn Guard>>,
}

impl Security {
    /// No predicates: every request passes
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_authenticator(mut self, guard: impl Guard + 'static) -> Self {
        self.authenticator = Some(Arc::new(guard));
        self
    }

    pub fn with_authorizer(mut self, guard: impl Guard + 'static) -> Self {
        self.authorizer = Some(Arc::new(guard));
        self
    }

    /// Predicates enforcing `policy`
    ///
    /// Public policies need neither predicate. Any other policy requires an
    /// identity first (401 when missing) and then the policy itself (403).
    pub fn from_policy(policy: AuthPolicy) -> Self {
        if policy.is_public() {
            return Self::none();
        }

        Self::none()
            .with_authenticator(RequireIdentity)
            .with_authorizer(PolicyGuard(policy))
    }

    /// Run the authenticator, if any
    pub async fn authenticate(&self, ctx: &RequestContext) -> Result<(), PipelineError> {
        match evaluate(self.authenticator.as_deref(), ctx).await {
            Ok(()) => Ok(()),
            Err(cause) => Err(PipelineError::AuthenticationFailed { cause }),
        }
    }

    /// Run the authorizer, if any
    pub async fn authorize(&self, ctx: &RequestContext) -> Result<(), PipelineError> {
        match evaluate(self.authorizer.as_deref(), ctx).await {
            Ok(()) => Ok(()),
            Err(cause) => Err(PipelineError::AuthorizationFailed { cause }),
        }
    }

    /// Authenticate, then authorize
    pub async fn gate(&self, ctx: &RequestContext) -> Result<(), PipelineError> {
        self.authenticate(ctx).await?;
        self.authorize(ctx).await
    }
}

/// `Err(None)` is a plain denial, `Err(Some(_))` a failing predicate
async fn evaluate(
    guard: Option<&dyn Guard>,
    ctx: &RequestContext,
) -> Result<(), Option<anyhow::Error>> {
    let Some(guard) = guard else {
        return Ok(());
    };

    match guard.check(ctx).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(None),
        Err(e) => Err(Some(e)),
    }
}

impl fmt::Debug for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Security")
            .field("authenticator", &self.authenticator.is_some())
            .field("authorizer", &self.authorizer.is_some())
            .finish()
    }
}
