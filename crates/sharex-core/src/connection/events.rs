//! Lifecycle notifications delivered to the application.

use serde_json::Value;
use std::sync::Arc;

/// Connection lifecycle changes and host push notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// First successful connection.
    Open,
    /// Connection re-established after a close.
    Reconnect,
    /// Connection lost; a reconnect is scheduled.
    Close,
    /// The transport reported a failure.
    Error(String),
    /// Another user joined; carries the frame's `user` field.
    UserArrive(Value),
    /// Another user left; carries the whole frame.
    UserLeft(Value),
    /// A direct message arrived; carries the frame's `message` field.
    MsgArrive(Value),
}

impl LifecycleEvent {
    /// Event name as the host and application know it.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Reconnect => "reconnect",
            Self::Close => "close",
            Self::Error(_) => "error",
            Self::UserArrive(_) => "user_arrive",
            Self::UserLeft(_) => "user_left",
            Self::MsgArrive(_) => "msg_arrive",
        }
    }

    /// Event payload, `Null` for pure lifecycle changes.
    pub fn payload(&self) -> Value {
        match self {
            Self::Open | Self::Reconnect | Self::Close => Value::Null,
            Self::Error(reason) => Value::String(reason.clone()),
            Self::UserArrive(value) | Self::UserLeft(value) | Self::MsgArrive(value) => {
                value.clone()
            }
        }
    }
}

/// Application callback for [`LifecycleEvent`]s.
pub type LifecycleHandler = Arc<dyn Fn(LifecycleEvent) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tags_and_payloads() {
        assert_eq!(LifecycleEvent::Reconnect.tag(), "reconnect");
        assert_eq!(LifecycleEvent::Open.payload(), Value::Null);
        assert_eq!(LifecycleEvent::Error("refused".into()).payload(), json!("refused"));

        let event = LifecycleEvent::MsgArrive(json!({"text": "hi"}));
        assert_eq!(event.tag(), "msg_arrive");
        assert_eq!(event.payload(), json!({"text": "hi"}));
    }
}
