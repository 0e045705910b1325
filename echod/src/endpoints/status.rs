use axum::http::StatusCode;
use axum::routing::{get, MethodRouter};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::endpoints::AppState;

#[derive(Serialize, Deserialize)]
pub struct Status {
    pub ok: bool,
}

pub fn create_endpoint() -> MethodRouter<AppState> {
    get(status)
}

async fn status() -> (StatusCode, Json<Status>) {
    (StatusCode::OK, Json(Status { ok: true }))
}
