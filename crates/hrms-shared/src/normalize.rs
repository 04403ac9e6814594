//! Parse-or-reject boundary for untrusted backend JSON.
//!
//! The REST backend and the push channel both hand us loosely shaped JSON
//! (`_id` vs `id`, participants as bare ids or embedded profiles, timestamps
//! as RFC 3339 strings or epoch millis). Every ingestion point goes through
//! the functions in this module and receives an [`Ingest`]: either a fully
//! validated model or the reason it was dropped. Invalid items never fail a
//! whole batch.

use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::error::DropReason;
use crate::models::{Conversation, Employee, MessageSnapshot, Participant};
use crate::types::{ConversationId, ConversationKind, MessageId, UserId};

/// Outcome of normalizing one untrusted item.
#[derive(Debug, Clone, PartialEq)]
pub enum Ingest<T> {
    Valid(T),
    Dropped(DropReason),
}

impl<T> Ingest<T> {
    pub fn valid(self) -> Option<T> {
        match self {
            Self::Valid(v) => Some(v),
            Self::Dropped(_) => None,
        }
    }

    pub fn into_result(self) -> Result<T, DropReason> {
        match self {
            Self::Valid(v) => Ok(v),
            Self::Dropped(reason) => Err(reason),
        }
    }
}

impl<T> From<Result<T, DropReason>> for Ingest<T> {
    fn from(result: Result<T, DropReason>) -> Self {
        match result {
            Ok(v) => Self::Valid(v),
            Err(reason) => Self::Dropped(reason),
        }
    }
}

/// Valid items of a batch plus the number of rejected ones.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T> {
    pub items: Vec<T>,
    pub dropped: usize,
}

/// Normalize every element of `values`, keeping the valid ones.
pub fn batch<T>(values: &[Value], normalize: impl Fn(&Value) -> Ingest<T>) -> Batch<T> {
    let mut items = Vec::with_capacity(values.len());
    let mut dropped = 0;
    for value in values {
        match normalize(value) {
            Ingest::Valid(item) => items.push(item),
            Ingest::Dropped(_) => dropped += 1,
        }
    }
    Batch { items, dropped }
}

/// Extract the item array from a response body that is either a bare array
/// or an object wrapping it under one of `keys`.
pub fn collection(body: Value, keys: &[&str]) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        Value::Object(mut obj) => keys
            .iter()
            .find_map(|key| match obj.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Conversations
// ---------------------------------------------------------------------------

pub fn conversation(value: &Value) -> Ingest<Conversation> {
    parse_conversation(value).into()
}

fn parse_conversation(value: &Value) -> Result<Conversation, DropReason> {
    let obj = value.as_object().ok_or(DropReason::NotAnObject)?;
    let id = identity(obj, &["_id", "id"]).ok_or(DropReason::MissingField("id"))?;

    let kind = match obj.get("type").and_then(Value::as_str) {
        Some(t) if t.eq_ignore_ascii_case("group") => ConversationKind::Group,
        Some(_) => ConversationKind::Direct,
        None if obj.get("isGroup").and_then(Value::as_bool) == Some(true) => {
            ConversationKind::Group
        }
        None => ConversationKind::Direct,
    };

    let mut seen = HashSet::new();
    let participants = obj
        .get("participants")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(participant)
                .filter(|p| seen.insert(p.user_id.clone()))
                .collect()
        })
        .unwrap_or_default();

    let last_message = obj
        .get("lastMessage")
        .filter(|v| v.is_object())
        .and_then(|v| parse_message(v, None).ok());

    let unread_count = obj
        .get("unreadCount")
        .and_then(Value::as_u64)
        .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
        .unwrap_or(0);

    Ok(Conversation {
        id: ConversationId(id),
        kind,
        title: text(obj, &["title", "name"]),
        participants,
        last_message,
        unread_count,
        updated_at: obj.get("updatedAt").and_then(timestamp),
    })
}

fn participant(value: &Value) -> Option<Participant> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(Participant::new(UserId(s.clone()))),
        Value::Object(obj) => {
            let id = identity(obj, &["_id", "id", "userId"])?;
            Some(Participant {
                user_id: UserId(id),
                first_name: text(obj, &["firstName", "first_name"]),
                last_name: text(obj, &["lastName", "last_name"]),
                avatar_url: text(obj, &["avatar", "avatarUrl", "profileImage"]),
            })
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Normalize a message payload. `received_at` stands in for a missing or
/// unparsable `createdAt`.
pub fn message(value: &Value, received_at: DateTime<Utc>) -> Ingest<MessageSnapshot> {
    parse_message(value, Some(received_at)).into()
}

fn parse_message(
    value: &Value,
    received_at: Option<DateTime<Utc>>,
) -> Result<MessageSnapshot, DropReason> {
    let obj = value.as_object().ok_or(DropReason::NotAnObject)?;

    let sender_id = match obj.get("sender") {
        Some(Value::Object(sender)) => identity(sender, &["_id", "id", "userId"]),
        Some(other) => scalar_id(other),
        None => None,
    }
    .or_else(|| identity(obj, &["senderId"]))
    .ok_or(DropReason::MissingField("sender"))?;

    let created_at = obj
        .get("createdAt")
        .and_then(timestamp)
        .or(received_at)
        .ok_or(DropReason::MissingField("createdAt"))?;

    let attachments = obj
        .get("attachments")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|a| match a {
                    Value::String(s) => Some(s.clone()),
                    Value::Object(o) => text(o, &["url", "fileUrl", "path"]),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(MessageSnapshot {
        id: identity(obj, &["_id", "id"]).map(MessageId),
        sender_id: UserId(sender_id),
        text: text(obj, &["text", "content"]).unwrap_or_default(),
        created_at,
        attachments,
    })
}

// ---------------------------------------------------------------------------
// Employees
// ---------------------------------------------------------------------------

pub fn employee(value: &Value) -> Ingest<Employee> {
    parse_employee(value).into()
}

fn parse_employee(value: &Value) -> Result<Employee, DropReason> {
    let obj = value.as_object().ok_or(DropReason::NotAnObject)?;
    // Directory rows carry the login identity separately from the record id.
    let id = identity(obj, &["userId", "_id", "id"]).ok_or(DropReason::MissingField("userId"))?;
    Ok(Employee {
        user_id: UserId(id),
        first_name: text(obj, &["firstName", "first_name"]),
        last_name: text(obj, &["lastName", "last_name"]),
        avatar_url: text(obj, &["avatar", "avatarUrl", "profileImage"]),
    })
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// First non-empty identity found under `keys`; numbers are accepted.
pub(crate) fn identity(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| obj.get(*key).and_then(scalar_id))
}

fn scalar_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        obj.get(*key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
    })
}

/// RFC 3339 string or epoch milliseconds.
pub(crate) fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}
