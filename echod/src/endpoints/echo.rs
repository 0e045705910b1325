use axum::extract::{Path, Query, State};
use axum::http::{Method, Uri};
use axum::Json;
use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::endpoints::AppState;

const NONE: &str = "none";
const PATH_PARAM: &str = "pathParam";

// parameters are reported in the order the request carried them
type Params = IndexMap<String, String>;

/// Diagnostic description of a single request and the host that served it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub instance_id: String,
    pub machine_id: String,
    #[serde(rename = "type")]
    pub platform: String,
    pub deployment: String,
    pub path_params: Params,
    pub query_params: Params,
    pub method: String,
    pub path: String,
    pub start_time: String,
    pub message: String,
}

pub async fn root(State(state): State<AppState>, method: Method, uri: Uri) -> Json<Envelope> {
    Json(envelope(&state, method, uri, Params::new(), Params::new(), None).await)
}

/// Echoes the path parameter and the `message` query parameter
pub async fn path_param(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    Path(path_params): Path<Params>,
    Query(query_params): Query<Params>,
) -> Json<Envelope> {
    Json(envelope(&state, method, uri, path_params, query_params, Some("message")).await)
}

/// Echoes the path parameter and the `queryParam` query parameter
pub async fn path_param_query(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    Path(path_params): Path<Params>,
    Query(query_params): Query<Params>,
) -> Json<Envelope> {
    Json(envelope(&state, method, uri, path_params, query_params, Some("queryParam")).await)
}

async fn envelope(
    state: &AppState,
    method: Method,
    uri: Uri,
    path_params: Params,
    query_params: Params,
    echoed_query_param: Option<&str>,
) -> Envelope {
    let machine_address = state.resolver.fetch_machine_address().await;
    let now = Utc::now();

    let message = message(
        path_params.get(PATH_PARAM).map(String::as_str),
        echoed_query_param
            .and_then(|key| query_params.get(key))
            .map(String::as_str),
    );

    Envelope {
        instance_id: instance_id(now),
        machine_id: machine_address.to_string(),
        platform: state.tags.platform.clone(),
        deployment: state.tags.deployment.clone(),
        path_params,
        query_params,
        method: method.as_str().to_string(),
        path: uri.path().to_string(),
        start_time: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        message,
    }
}

/// Request-scoped identifier. Only requests handled within the same millisecond share one.
fn instance_id(now: DateTime<Utc>) -> String {
    format!("inst-{}", now.timestamp_millis())
}

fn message(path_param: Option<&str>, query_param: Option<&str>) -> String {
    format!(
        "Hello World, Pathparam: {}, Queryparam: {}",
        path_param.unwrap_or(NONE),
        query_param.unwrap_or(NONE)
    )
}
