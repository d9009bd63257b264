use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chatterbox_sqlite::model::{Message, MessageUpdate};
use eyre::Report;
use serde::Deserialize;
use serde_json::{json, Value};

pub use self::error::MessagesError;

use crate::state::AppState;

mod error;

#[derive(Deserialize)]
pub struct CreateMessageBody {
    body: Option<String>,
    username: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateMessageBody {
    body: Option<String>,
}

pub async fn get_messages(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Message>>, (StatusCode, Json<Value>)> {
    match state.db.select_messages().await {
        Ok(messages) => Ok(Json(messages)),
        Err(err) => Err(error_reply(MessagesError::Storage(err))),
    }
}

pub async fn create_message(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateMessageBody>,
) -> Result<(StatusCode, Json<Message>), (StatusCode, Json<Value>)> {
    match create(&state, payload).await {
        Ok(message) => Ok((StatusCode::CREATED, Json(message))),
        Err(err) => Err(error_reply(err)),
    }
}

async fn create(state: &AppState, payload: CreateMessageBody) -> Result<Message, MessagesError> {
    let CreateMessageBody { body, username } = payload;

    // Empty strings count as missing.
    let (Some(body), Some(username)) = (non_empty(body), non_empty(username)) else {
        return Err(MessagesError::MissingFields);
    };

    Ok(state.db.insert_message(&body, &username).await?)
}

pub async fn update_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateMessageBody>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match update(&state, &id, payload).await {
        Ok(update) => Ok(Json(json!({
            "message": "Message updated successfully",
            "id": update.id,
            "body": update.body,
        }))),
        Err(err) => Err(error_reply(err)),
    }
}

async fn update(
    state: &AppState,
    id: &str,
    payload: UpdateMessageBody,
) -> Result<MessageUpdate, MessagesError> {
    let id = parse_id(id)?;
    let new_body = non_empty(payload.body);

    state
        .db
        .update_message_body(id, new_body.as_deref())
        .await?
        .ok_or(MessagesError::UnknownId)
}

pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match delete(&state, &id).await {
        Ok(()) => Ok(Json(json!({ "message": "Message deleted successfully" }))),
        Err(err) => Err(error_reply(err)),
    }
}

async fn delete(state: &AppState, id: &str) -> Result<(), MessagesError> {
    state
        .db
        .delete_message_by_id(parse_id(id)?)
        .await?
        .then_some(())
        .ok_or(MessagesError::UnknownId)
}

/// Treats both absent and empty values as missing.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

/// Non-numeric ids belong to no message.
fn parse_id(id: &str) -> Result<i64, MessagesError> {
    id.parse().map_err(|_| MessagesError::UnknownId)
}

fn error_reply(err: MessagesError) -> (StatusCode, Json<Value>) {
    let (status_code, msg) = err.response();

    match err {
        MessagesError::Storage(source) => error!("{:?}", source.wrap_err("request failed")),
        err => warn!("{:?}", Report::new(err)),
    }

    (status_code, Json(json!({ "error": msg })))
}
