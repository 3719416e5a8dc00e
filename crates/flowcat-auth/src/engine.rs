//! Write authorization
//!
//! Provides [`AuthorizationEngine`], the pure decision logic that gates every
//! catalog mutation. Identity and group lookups are delegated to the
//! [`RequesterService`] and [`GroupOwnershipService`] it holds.

use crate::group::GroupOwnershipService;
use crate::requester::RequesterService;
use flowcat_spec::{FlowSpec, ServiceRequester};
use std::fmt;
use std::sync::Arc;

/// Kind of mutation being authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// New flow
    Create,
    /// Full update, partial update or run-now of an existing flow
    Update,
    /// Removal of an existing flow
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

/// Everything the engine needs to decide one mutation
#[derive(Debug, Clone, Copy)]
pub struct AuthorizationRequest<'a> {
    /// Requested action
    pub action: Action,
    /// Stored spec for update and delete
    pub existing: Option<&'a FlowSpec>,
    /// Owning group carried by the candidate
    pub candidate_owning_group: Option<&'a str>,
    /// Requester list carried by the candidate
    pub candidate_requesters: Option<&'a [ServiceRequester]>,
}

impl<'a> AuthorizationRequest<'a> {
    /// Request to create a flow, optionally owned by `owning_group`
    #[inline]
    #[must_use]
    pub fn create(owning_group: Option<&'a str>) -> Self {
        Self {
            action: Action::Create,
            existing: None,
            candidate_owning_group: owning_group,
            candidate_requesters: None,
        }
    }

    /// Request to update `existing`
    #[inline]
    #[must_use]
    pub fn update(existing: &'a FlowSpec) -> Self {
        Self {
            action: Action::Update,
            existing: Some(existing),
            candidate_owning_group: None,
            candidate_requesters: None,
        }
    }

    /// Request to delete `existing`
    #[inline]
    #[must_use]
    pub fn delete(existing: &'a FlowSpec) -> Self {
        Self {
            action: Action::Delete,
            existing: Some(existing),
            candidate_owning_group: None,
            candidate_requesters: None,
        }
    }

    /// With candidate owning group
    #[inline]
    #[must_use]
    pub fn with_owning_group(mut self, group: Option<&'a str>) -> Self {
        self.candidate_owning_group = group;
        self
    }

    /// With candidate requester list
    #[inline]
    #[must_use]
    pub fn with_requesters(mut self, requesters: Option<&'a [ServiceRequester]>) -> Self {
        self.candidate_requesters = requesters;
        self
    }
}

/// Why a mutation was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DenyReason {
    /// Caller could not be identified
    #[error("requester not identified")]
    NoIdentity,

    /// Caller is not a member of a group it tried to act on
    #[error("requester is not a member of group {group}")]
    NotGroupMember {
        /// Group the caller is missing from
        group: String,
    },

    /// Caller is neither a listed requester nor an owning-group member
    #[error("requester not allowed to make this request")]
    NotARequester,

    /// New requester list would lock the caller out
    #[error("new requester list does not include the requester")]
    RequesterListExcludesCaller,

    /// Update or delete without a stored spec
    #[error("no existing flow to authorize {action} against")]
    MissingExisting {
        /// Action that needed the stored spec
        action: Action,
    },
}

/// Outcome of an authorization check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Mutation may proceed
    Allow,
    /// Mutation refused
    Deny(DenyReason),
}

impl Decision {
    /// Check if allowed
    #[inline]
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Convert to a result
    ///
    /// # Errors
    /// Returns the deny reason
    #[inline]
    pub fn into_result(self) -> Result<(), DenyReason> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny(reason) => Err(reason),
        }
    }
}

/// Decides whether a caller may mutate a flow
#[derive(Clone)]
pub struct AuthorizationEngine {
    groups: Arc<dyn GroupOwnershipService>,
    requesters: Arc<dyn RequesterService>,
}

impl fmt::Debug for AuthorizationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationEngine").finish_non_exhaustive()
    }
}

impl AuthorizationEngine {
    /// Create engine
    #[inline]
    #[must_use]
    pub fn new(
        groups: Arc<dyn GroupOwnershipService>,
        requesters: Arc<dyn RequesterService>,
    ) -> Self {
        Self { groups, requesters }
    }

    /// Identity policy in use
    #[inline]
    #[must_use]
    pub fn requester_service(&self) -> &Arc<dyn RequesterService> {
        &self.requesters
    }

    /// Group policy in use
    #[inline]
    #[must_use]
    pub fn group_service(&self) -> &Arc<dyn GroupOwnershipService> {
        &self.groups
    }

    /// Decide whether `caller` may perform `request`
    #[must_use]
    pub fn authorize(&self, request: &AuthorizationRequest<'_>, caller: &[ServiceRequester]) -> Decision {
        let decision = self.decide(request, caller);
        if let Decision::Deny(reason) = &decision {
            tracing::debug!(action = %request.action, "Authorization denied: {reason}");
        }
        decision
    }

    fn decide(&self, request: &AuthorizationRequest<'_>, caller: &[ServiceRequester]) -> Decision {
        if caller.is_empty() {
            return Decision::Deny(DenyReason::NoIdentity);
        }
        if self.requesters.is_requester_whitelisted(caller) {
            return Decision::Allow;
        }

        match request.action {
            Action::Create => match non_empty(request.candidate_owning_group) {
                Some(group) if !self.groups.is_member_of_group(caller, group) => {
                    Decision::Deny(DenyReason::NotGroupMember {
                        group: group.to_string(),
                    })
                }
                _ => Decision::Allow,
            },
            Action::Update | Action::Delete => {
                let Some(existing) = request.existing else {
                    return Decision::Deny(DenyReason::MissingExisting {
                        action: request.action,
                    });
                };
                // Unparseable stored lists grant nothing
                let stored = existing.requesters().ok().flatten().unwrap_or_default();

                if !self.may_modify(existing, &stored, caller) {
                    return Decision::Deny(DenyReason::NotARequester);
                }
                if request.action == Action::Delete {
                    return Decision::Allow;
                }
                self.check_transfer(existing, &stored, request, caller)
            }
        }
    }

    fn may_modify(
        &self,
        existing: &FlowSpec,
        stored: &[ServiceRequester],
        caller: &[ServiceRequester],
    ) -> bool {
        self.requesters.is_requester_allowed(stored, caller)
            || non_empty(existing.owning_group.as_deref())
                .is_some_and(|group| self.groups.is_member_of_group(caller, group))
    }

    fn check_transfer(
        &self,
        existing: &FlowSpec,
        stored: &[ServiceRequester],
        request: &AuthorizationRequest<'_>,
        caller: &[ServiceRequester],
    ) -> Decision {
        if let Some(group) = non_empty(request.candidate_owning_group) {
            let changed = existing.owning_group.as_deref() != Some(group);
            if changed && !self.groups.is_member_of_group(caller, group) {
                return Decision::Deny(DenyReason::NotGroupMember {
                    group: group.to_string(),
                });
            }
        }

        if let Some(new_list) = request.candidate_requesters {
            if new_list != stored && !caller.iter().any(|c| new_list.contains(c)) {
                return Decision::Deny(DenyReason::RequesterListExcludesCaller);
            }
        }

        Decision::Allow
    }
}

fn non_empty(group: Option<&str>) -> Option<&str> {
    group.filter(|g| !g.is_empty())
}
