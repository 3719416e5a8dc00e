//! Transport-facing facade
//!
//! [`FlowConfigApi`] speaks in the shapes a REST or RPC layer needs: flow ids
//! split into group and name, patches as raw JSON, errors as status codes.

use crate::catalog::{FlowCatalog, FlowCommit};
use crate::error::{CatalogError, ErrorClass, ValidationError};
use flowcat_auth::RequestContext;
use flowcat_patch::PatchDocument;
use flowcat_spec::{FlowId, FlowSpec};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identity of a flow plus the run a request started
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowStatusId {
    /// Flow group
    pub flow_group: String,
    /// Flow name
    pub flow_name: String,
    /// Execution id, `-1` if nothing ran
    pub flow_execution_id: i64,
}

impl From<&FlowCommit> for FlowStatusId {
    fn from(commit: &FlowCommit) -> Self {
        Self {
            flow_group: commit.spec.id.group().to_string(),
            flow_name: commit.spec.id.name().to_string(),
            flow_execution_id: commit.execution_id.get(),
        }
    }
}

/// Error as a transport sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    /// Status code
    pub status: u16,
    /// Human-readable message
    pub message: String,
    /// Whether retrying could succeed
    pub retryable: bool,
}

impl ApiError {
    /// Failure class recovered from the status code
    #[must_use]
    pub fn class(&self) -> Option<ErrorClass> {
        [
            ErrorClass::Unprocessable,
            ErrorClass::Unauthorized,
            ErrorClass::BadRequest,
            ErrorClass::NotFound,
            ErrorClass::Conflict,
            ErrorClass::Unavailable,
            ErrorClass::Internal,
        ]
        .into_iter()
        .find(|c| c.http_status() == self.status)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        Self {
            status: err.http_status(),
            retryable: err.is_retryable(),
            message: err.to_string(),
        }
    }
}

/// Result type of the API
pub type ApiResult<T> = Result<T, ApiError>;

/// Flow configuration endpoints
#[derive(Debug, Clone)]
pub struct FlowConfigApi {
    catalog: Arc<FlowCatalog>,
}

impl FlowConfigApi {
    /// Wrap a catalog
    #[inline]
    #[must_use]
    pub fn new(catalog: Arc<FlowCatalog>) -> Self {
        Self { catalog }
    }

    /// Underlying catalog
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &Arc<FlowCatalog> {
        &self.catalog
    }

    /// Register a flow
    ///
    /// # Errors
    /// See [`FlowCatalog::create`]
    pub async fn create_flow(&self, spec: FlowSpec, ctx: &RequestContext) -> ApiResult<FlowStatusId> {
        let commit = self.catalog.create(spec, ctx).await?;
        Ok(FlowStatusId::from(&commit))
    }

    /// Load a flow
    ///
    /// # Errors
    /// See [`FlowCatalog::get`]
    pub async fn get_flow(&self, group: &str, name: &str) -> ApiResult<FlowSpec> {
        Ok(self.catalog.get(&FlowId::new(group, name)).await?)
    }

    /// Replace a flow
    ///
    /// # Errors
    /// See [`FlowCatalog::update`]
    pub async fn update_flow(&self, spec: FlowSpec, ctx: &RequestContext) -> ApiResult<FlowStatusId> {
        let commit = self.catalog.update(spec, ctx).await?;
        Ok(FlowStatusId::from(&commit))
    }

    /// Patch a flow with a JSON patch document
    ///
    /// # Errors
    /// Unprocessable if the document is malformed; otherwise see
    /// [`FlowCatalog::partial_update`]
    pub async fn partial_update_flow(
        &self,
        group: &str,
        name: &str,
        patch_json: &str,
        ctx: &RequestContext,
    ) -> ApiResult<FlowStatusId> {
        let patch: PatchDocument = patch_json
            .parse()
            .map_err(|e| CatalogError::from(ValidationError::MalformedPatch(e)))?;
        let commit = self
            .catalog
            .partial_update(&FlowId::new(group, name), &patch, ctx)
            .await?;
        Ok(FlowStatusId::from(&commit))
    }

    /// Delete a flow
    ///
    /// # Errors
    /// See [`FlowCatalog::delete`]
    pub async fn delete_flow(&self, group: &str, name: &str, ctx: &RequestContext) -> ApiResult<()> {
        self.catalog.delete(&FlowId::new(group, name), ctx).await?;
        Ok(())
    }

    /// Trigger a run now
    ///
    /// # Errors
    /// See [`FlowCatalog::run_immediately`]
    pub async fn run_immediately(&self, group: &str, name: &str, ctx: &RequestContext) -> ApiResult<FlowStatusId> {
        let commit = self
            .catalog
            .run_immediately(&FlowId::new(group, name), ctx)
            .await?;
        Ok(FlowStatusId::from(&commit))
    }

    /// Every flow, sorted by id
    ///
    /// # Errors
    /// See [`FlowCatalog::list`]
    pub async fn list_flows(&self) -> ApiResult<Vec<FlowSpec>> {
        Ok(self.catalog.list().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowcat_spec::ExecutionId;

    #[test]
    fn status_id_serializes_camel_case() {
        let commit = FlowCommit {
            spec: FlowSpec::new(FlowId::new("g", "n"), "FS:///t.template"),
            execution_id: ExecutionId::NOT_RUN,
        };
        let json = serde_json::to_value(FlowStatusId::from(&commit)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"flowGroup": "g", "flowName": "n", "flowExecutionId": -1})
        );
    }

    #[test]
    fn api_error_keeps_class() {
        let err = ApiError::from(CatalogError::NotFound(FlowId::new("g", "n")));
        assert_eq!(err.status, 404);
        assert_eq!(err.class(), Some(ErrorClass::NotFound));
        assert!(!err.retryable);
    }
}
