//! Manual pod list and delete handlers

use crate::api::rest::auth::AuthenticatedInstance;
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use stopping_types::PodSummary;

/// Query for instance-scoped calls
#[derive(Debug, Deserialize)]
pub struct InstanceQuery {
    #[serde(default)]
    pub instance_id: String,
}

/// Query for namespaced deletes
#[derive(Debug, Deserialize)]
pub struct NamespacedInstanceQuery {
    #[serde(default)]
    pub instance_id: String,
    #[serde(default)]
    pub namespace: String,
}

/// List pods for an instance
pub async fn list_pods(
    State(state): State<AppState>,
    Query(query): Query<InstanceQuery>,
) -> ApiResult<Json<Vec<PodSummary>>> {
    let pods = state.control.list_pods(&query.instance_id).await?;
    Ok(Json(pods))
}

/// Delete an instance's pod, looking up its namespace
pub async fn delete_instance(
    State(state): State<AppState>,
    Extension(AuthenticatedInstance(caller)): Extension<AuthenticatedInstance>,
    Query(query): Query<InstanceQuery>,
) -> ApiResult<()> {
    state
        .control
        .delete_instance(&caller, &query.instance_id)
        .await
}

/// Delete an instance's pod in the given namespace
pub async fn delete_instance_in_namespace(
    State(state): State<AppState>,
    Extension(AuthenticatedInstance(caller)): Extension<AuthenticatedInstance>,
    Query(query): Query<NamespacedInstanceQuery>,
) -> ApiResult<()> {
    state
        .control
        .delete_instance_in_namespace(&caller, &query.instance_id, &query.namespace)
        .await
}
