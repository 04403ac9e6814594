use serde::Serialize;
use tokio::sync::broadcast;

pub const EVENT_LOAD_FAILED: &str = "load-failed";
pub const EVENT_DIRECTORY_FAILED: &str = "directory-failed";
pub const EVENT_PUSH_CONNECTED: &str = "push-connected";
pub const EVENT_PUSH_DISCONNECTED: &str = "push-disconnected";
pub const EVENT_READ_FAILED: &str = "read-failed";
pub const EVENT_CLOSED: &str = "session-closed";

/// Notable things that happen to a session, besides state changes.
///
/// State itself is published through snapshots; these exist so a UI can show
/// a toast or a reconnect banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum SessionEvent {
    LoadFailed { message: String },
    DirectoryFailed { message: String },
    PushConnected,
    PushDisconnected,
    ReadFailed { conversation_id: String, message: String },
    SessionClosed,
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoadFailed { .. } => EVENT_LOAD_FAILED,
            Self::DirectoryFailed { .. } => EVENT_DIRECTORY_FAILED,
            Self::PushConnected => EVENT_PUSH_CONNECTED,
            Self::PushDisconnected => EVENT_PUSH_DISCONNECTED,
            Self::ReadFailed { .. } => EVENT_READ_FAILED,
            Self::SessionClosed => EVENT_CLOSED,
        }
    }
}

pub fn emit_event(events: &broadcast::Sender<SessionEvent>, event: SessionEvent) {
    let name = event.name();
    if events.send(event).is_err() {
        tracing::trace!(event = name, "No listeners for session event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_tag() {
        let json = serde_json::to_value(SessionEvent::LoadFailed {
            message: "boom".into(),
        })
        .unwrap();
        assert_eq!(json["event"], EVENT_LOAD_FAILED);
        assert_eq!(json["data"]["message"], "boom");

        let json = serde_json::to_value(SessionEvent::PushConnected).unwrap();
        assert_eq!(json["event"], EVENT_PUSH_CONNECTED);
    }

    #[test]
    fn emitting_without_listeners_is_harmless() {
        let (tx, rx) = broadcast::channel(4);
        drop(rx);
        emit_event(&tx, SessionEvent::SessionClosed);

        let mut rx = tx.subscribe();
        emit_event(&tx, SessionEvent::PushDisconnected);
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::PushDisconnected);
    }
}
