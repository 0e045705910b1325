use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use error_stack::Report;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::{self, Item, ItemId, ItemStore};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub message: String,
}

/// Every failed lookup, including one with a malformed id, is reported as a missing item
#[derive(Debug)]
pub struct ItemNotFound;

impl IntoResponse for ItemNotFound {
    fn into_response(self) -> Response {
        (
            StatusCode::NOT_FOUND,
            Json(Message {
                message: "Item not found".to_string(),
            }),
        )
            .into_response()
    }
}

impl From<Report<store::Error>> for ItemNotFound {
    fn from(report: Report<store::Error>) -> Self {
        match report.current_context() {
            store::Error::ItemNotFound(id) => debug!(%id, "item not found"),
        }

        ItemNotFound
    }
}

fn parse_id(id: &str) -> Result<ItemId, ItemNotFound> {
    id.parse().map_err(|err| {
        debug!(id, %err, "malformed item id");
        ItemNotFound
    })
}

pub async fn create(
    State(store): State<Arc<ItemStore>>,
    Json(item): Json<Item>,
) -> (StatusCode, Json<Item>) {
    (StatusCode::CREATED, Json(store.create(item)))
}

pub async fn list(State(store): State<Arc<ItemStore>>) -> Json<Vec<Item>> {
    Json(store.list_all())
}

pub async fn get(
    State(store): State<Arc<ItemStore>>,
    Path(id): Path<String>,
) -> Result<Json<Item>, ItemNotFound> {
    Ok(Json(store.get(parse_id(&id)?)?))
}

pub async fn update(
    State(store): State<Arc<ItemStore>>,
    Path(id): Path<String>,
    Json(patch): Json<Item>,
) -> Result<Json<Item>, ItemNotFound> {
    Ok(Json(store.update(parse_id(&id)?, patch)?))
}

pub async fn delete(
    State(store): State<Arc<ItemStore>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ItemNotFound> {
    store.delete(parse_id(&id)?)?;

    Ok(StatusCode::NO_CONTENT)
}
