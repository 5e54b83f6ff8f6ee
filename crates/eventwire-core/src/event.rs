//! Outbound event model
//!
//! Events are typed internally but all share one open-map wire form: a JSON
//! object with string keys. Heartbeats carry `{type, ts, user}`, interactive
//! events add `text`, and [`Event::Custom`] carries any other map unchanged.

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::profile::Profile;

// ----------------------------------------------------------------------------
// Event Classification
// ----------------------------------------------------------------------------

/// Classification label attached to every generated event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Login,
    Logout,
    Request,
    Response,
    KeepAlive,
    Error,
}

impl EventKind {
    /// Number of outcomes the generator draws from
    pub const OUTCOMES: u32 = 6;

    /// Map a draw in `0..OUTCOMES` to a label; anything past `KeepAlive` is `Error`
    pub fn from_draw(draw: u32) -> Self {
        match draw {
            0 => EventKind::Login,
            1 => EventKind::Logout,
            2 => EventKind::Request,
            3 => EventKind::Response,
            4 => EventKind::KeepAlive,
            _ => EventKind::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Login => "Login",
            EventKind::Logout => "Logout",
            EventKind::Request => "Request",
            EventKind::Response => "Response",
            EventKind::KeepAlive => "KeepAlive",
            EventKind::Error => "Error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ----------------------------------------------------------------------------
// Event
// ----------------------------------------------------------------------------

/// One outbound message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Event {
    /// Periodic heartbeat
    Heartbeat {
        #[serde(rename = "type")]
        kind: EventKind,
        ts: String,
        user: Profile,
    },
    /// One line of interactive input
    Interactive {
        text: String,
        #[serde(rename = "type")]
        kind: EventKind,
        ts: String,
        user: Profile,
    },
    /// Arbitrary key/value payload
    Custom(Map<String, Value>),
}

impl Event {
    pub fn heartbeat(kind: EventKind, fired_at: DateTime<Local>, user: Profile) -> Self {
        Event::Heartbeat {
            kind,
            ts: format_timestamp(&fired_at),
            user,
        }
    }

    pub fn interactive(
        text: impl Into<String>,
        kind: EventKind,
        received_at: DateTime<Local>,
        user: Profile,
    ) -> Self {
        Event::Interactive {
            text: text.into(),
            kind,
            ts: format_timestamp(&received_at),
            user,
        }
    }

    /// Classification label, if the event carries a typed one
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            Event::Heartbeat { kind, .. } | Event::Interactive { kind, .. } => Some(*kind),
            Event::Custom(_) => None,
        }
    }

    /// Short variant name for logs and spans
    pub fn label(&self) -> &'static str {
        match self {
            Event::Heartbeat { .. } => "heartbeat",
            Event::Interactive { .. } => "interactive",
            Event::Custom(_) => "custom",
        }
    }

    /// Serialize into the single text message sent over the connection
    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Render a wall-clock time the way events carry it in `ts`
pub fn format_timestamp(time: &DateTime<Local>) -> String {
    time.format("%Y-%m-%d %H:%M:%S%.9f %:z").to_string()
}
