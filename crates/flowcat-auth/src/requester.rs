//! Requester resolution
//!
//! Provides [`RequesterService`], the pluggable policy that turns a request
//! context into caller identities, and [`ContextRequesterService`], which reads
//! the principal the transport layer already authenticated.

use flowcat_spec::{PrincipalType, ServiceRequester};
use std::collections::HashSet;

/// Transport-agnostic description of an incoming request
///
/// The transport fills in whatever principal it authenticated; the catalog
/// never inspects it directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Authenticated principal name, if any
    pub principal: Option<String>,
    /// Principal type reported by the authenticator
    pub principal_type: Option<PrincipalType>,
    /// Origin of the request (host, service, ...)
    pub origin: String,
}

impl RequestContext {
    /// Context without an authenticated principal
    #[inline]
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Context for a user principal
    #[inline]
    #[must_use]
    pub fn user(name: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            principal: Some(name.into()),
            principal_type: Some(PrincipalType::User),
            origin: origin.into(),
        }
    }

    /// Context carrying an existing requester identity
    #[inline]
    #[must_use]
    pub fn for_requester(requester: &ServiceRequester) -> Self {
        Self {
            principal: Some(requester.name.clone()),
            principal_type: Some(requester.principal_type.clone()),
            origin: requester.from.clone(),
        }
    }
}

/// Identity policy
///
/// Implementations are swapped freely; tests install fixed identities.
pub trait RequesterService: Send + Sync {
    /// Resolve caller identities; empty for unauthenticated calls
    fn find_requesters(&self, ctx: &RequestContext) -> Vec<ServiceRequester>;

    /// Check whether `current` may act on a flow recorded with `original`
    ///
    /// Default: the lists share at least one identity.
    fn is_requester_allowed(
        &self,
        original: &[ServiceRequester],
        current: &[ServiceRequester],
    ) -> bool {
        current.iter().any(|r| original.contains(r))
    }

    /// Check whether `current` bypasses ownership checks
    fn is_requester_whitelisted(&self, _current: &[ServiceRequester]) -> bool {
        false
    }
}

/// Reads the principal carried by the [`RequestContext`]
///
/// Names listed as admins are whitelisted for every write.
#[derive(Debug, Clone, Default)]
pub struct ContextRequesterService {
    admins: HashSet<String>,
}

impl ContextRequesterService {
    /// Create service without admins
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With admin principal names
    #[must_use]
    pub fn with_admins<I, S>(mut self, admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.admins.extend(admins.into_iter().map(Into::into));
        self
    }
}

impl RequesterService for ContextRequesterService {
    fn find_requesters(&self, ctx: &RequestContext) -> Vec<ServiceRequester> {
        match &ctx.principal {
            Some(name) if !name.is_empty() => vec![ServiceRequester::new(
                name.clone(),
                ctx.principal_type.clone().unwrap_or(PrincipalType::Unknown),
                ctx.origin.clone(),
            )],
            _ => Vec::new(),
        }
    }

    fn is_requester_whitelisted(&self, current: &[ServiceRequester]) -> bool {
        current.iter().any(|r| self.admins.contains(&r.name))
    }
}
