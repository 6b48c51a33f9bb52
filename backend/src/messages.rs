use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{Message, NewMessage};
use crate::store::{MessagePatch, Storage};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageInput {
    pub receiver_id: Option<String>,
    pub product_id: Option<String>,
    pub content: Option<String>,
}

/// Messages where the given user is either side, newest first.
pub fn messages_for(store: &dyn Storage, user_id: &str) -> Vec<Message> {
    let mut messages: Vec<Message> = store
        .list_messages()
        .into_iter()
        .filter(|m| m.sender_id == user_id || m.receiver_id == user_id)
        .collect();
    messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    messages
}

/// Both directions between two users, oldest first. Conversations are
/// derived; there is no thread entity.
pub fn conversation_between(store: &dyn Storage, a: &str, b: &str) -> Vec<Message> {
    let mut messages: Vec<Message> = store
        .list_messages()
        .into_iter()
        .filter(|m| {
            (m.sender_id == a && m.receiver_id == b) || (m.sender_id == b && m.receiver_id == a)
        })
        .collect();
    messages.sort_by(|x, y| x.created_at.cmp(&y.created_at));
    messages
}

pub fn send_message(
    store: &dyn Storage,
    sender_id: &str,
    input: MessageInput,
) -> Result<Message, ApiError> {
    let mut invalid = Vec::new();
    let receiver_id = match input.receiver_id {
        Some(id) if !id.trim().is_empty() => id,
        _ => {
            invalid.push("receiverId".to_string());
            String::new()
        }
    };
    let content = match input.content {
        Some(content) if !content.trim().is_empty() => content,
        _ => {
            invalid.push("content".to_string());
            String::new()
        }
    };
    if !invalid.is_empty() {
        return Err(ApiError::Validation(invalid));
    }
    Ok(store.insert_message(NewMessage {
        sender_id: sender_id.to_string(),
        receiver_id,
        product_id: input.product_id.filter(|p| !p.trim().is_empty()),
        content,
    }))
}

/// Only the receiver may flip a message to read; anyone else gets the same
/// signal as a missing message.
pub fn mark_message_read(
    store: &dyn Storage,
    caller_id: &str,
    message_id: &str,
) -> Result<Message, ApiError> {
    let message = store.get_message(message_id).ok_or(ApiError::NotFound)?;
    if message.receiver_id != caller_id {
        return Err(ApiError::NotFound);
    }
    store
        .update_message(message_id, MessagePatch { read: Some(true) })
        .ok_or(ApiError::NotFound)
}

pub async fn list(State(state): State<AppState>, caller: AuthUser) -> Json<Vec<Message>> {
    Json(messages_for(state.store.as_ref(), &caller.id))
}

pub async fn create(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(input): Json<MessageInput>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let message = send_message(state.store.as_ref(), &caller.id, input)?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn conversation(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(user_id): Path<String>,
) -> Json<Vec<Message>> {
    Json(conversation_between(
        state.store.as_ref(),
        &caller.id,
        &user_id,
    ))
}

pub async fn mark_read(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Message>, ApiError> {
    let message = mark_message_read(state.store.as_ref(), &caller.id, &id)?;
    Ok(Json(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;

    fn input(receiver: &str, content: &str) -> MessageInput {
        MessageInput {
            receiver_id: Some(receiver.to_string()),
            product_id: None,
            content: Some(content.to_string()),
        }
    }

    #[test]
    fn sender_is_always_the_caller() {
        let store = MemStore::new();
        let message = send_message(&store, "buyer-1", input("farmer-1", "Still available?")).unwrap();
        assert_eq!(message.sender_id, "buyer-1");
        assert!(!message.read);
    }

    #[test]
    fn missing_fields_are_reported_together() {
        let store = MemStore::new();
        let err = send_message(&store, "buyer-1", MessageInput::default()).unwrap_err();
        assert_eq!(
            err,
            ApiError::Validation(vec!["receiverId".to_string(), "content".to_string()])
        );
    }

    #[test]
    fn listing_covers_both_directions() {
        let store = MemStore::new();
        send_message(&store, "buyer-1", input("farmer-1", "Hi")).unwrap();
        send_message(&store, "farmer-1", input("buyer-1", "Hello")).unwrap();
        send_message(&store, "buyer-2", input("farmer-1", "Price?")).unwrap();

        assert_eq!(messages_for(&store, "buyer-1").len(), 2);
        assert_eq!(messages_for(&store, "farmer-1").len(), 3);
        assert_eq!(messages_for(&store, "buyer-2").len(), 1);
    }

    #[test]
    fn conversation_is_symmetric_and_oldest_first() {
        let store = MemStore::new();
        let first = send_message(&store, "buyer-1", input("farmer-1", "Hi")).unwrap();
        let second = send_message(&store, "farmer-1", input("buyer-1", "Hello")).unwrap();
        send_message(&store, "buyer-1", input("farmer-2", "Other thread")).unwrap();

        let forward = conversation_between(&store, "buyer-1", "farmer-1");
        let backward = conversation_between(&store, "farmer-1", "buyer-1");
        let ids: Vec<&str> = forward.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec![&first.id, &second.id]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn only_the_receiver_marks_read() {
        let store = MemStore::new();
        let message = send_message(&store, "buyer-1", input("farmer-1", "Hi")).unwrap();

        assert_eq!(
            mark_message_read(&store, "buyer-1", &message.id).unwrap_err(),
            ApiError::NotFound
        );
        assert!(!store.get_message(&message.id).unwrap().read);

        let updated = mark_message_read(&store, "farmer-1", &message.id).unwrap();
        assert!(updated.read);
        // Re-marking is harmless.
        assert!(mark_message_read(&store, "farmer-1", &message.id).unwrap().read);
    }
}
