//! Inbound event protocol
//!
//! The host page posts JSON messages of the form
//! `{"event": "onStateChange", "data": 1}`. [`PlayerEvent::decode`] is the only
//! place raw event names are looked at; everything past it works with the
//! closed [`PlayerEvent`] type.

use crate::{state::PlayerState, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw message as posted by the embedded page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Case-sensitive event name
    pub event: String,
    /// Untyped payload; absent for `onReady`
    #[serde(default)]
    pub data: Value,
}

impl InboundMessage {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Parse a JSON text message
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Decoded inbound event
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    Ready,
    StateChange(PlayerState),
    PlaybackQualityChange(String),
    PlaybackRateChange(String),
    Error(String),
    CurrentSecond(f64),
    VideoDuration(f64),
    VideoLoadedFraction(f64),
    VideoId(String),
}

impl PlayerEvent {
    /// Wire name of this event
    pub fn name(&self) -> &'static str {
        match self {
            PlayerEvent::Ready => "onReady",
            PlayerEvent::StateChange(_) => "onStateChange",
            PlayerEvent::PlaybackQualityChange(_) => "onPlaybackQualityChange",
            PlayerEvent::PlaybackRateChange(_) => "onPlaybackRateChange",
            PlayerEvent::Error(_) => "onError",
            PlayerEvent::CurrentSecond(_) => "onCurrentSecond",
            PlayerEvent::VideoDuration(_) => "onVideoDuration",
            PlayerEvent::VideoLoadedFraction(_) => "onVideoLoadedFraction",
            PlayerEvent::VideoId(_) => "onVideoId",
        }
    }

    /// Decode a raw message into a typed event.
    ///
    /// Unknown names and payloads of the wrong shape are rejected; the caller
    /// decides whether to log and drop.
    pub fn decode(message: &InboundMessage) -> Result<Self> {
        let name = message.event.as_str();
        let data = &message.data;

        let event = match name {
            "onReady" => PlayerEvent::Ready,
            "onStateChange" => {
                let code = number(name, data)?;
                let state = if code.fract() == 0.0 {
                    PlayerState::from_code(code as i64)
                } else {
                    PlayerState::Unknown
                };
                PlayerEvent::StateChange(state)
            }
            "onPlaybackQualityChange" => PlayerEvent::PlaybackQualityChange(text(name, data)?),
            "onPlaybackRateChange" => PlayerEvent::PlaybackRateChange(text(name, data)?),
            "onError" => PlayerEvent::Error(text(name, data)?),
            "onCurrentSecond" => PlayerEvent::CurrentSecond(number(name, data)?),
            "onVideoDuration" => PlayerEvent::VideoDuration(number(name, data)?),
            "onVideoLoadedFraction" => PlayerEvent::VideoLoadedFraction(number(name, data)?),
            "onVideoId" => match data {
                Value::String(id) => PlayerEvent::VideoId(id.clone()),
                _ => return Err(Error::malformed(name, "expected a video id string")),
            },
            other => return Err(Error::UnknownEvent(other.to_string())),
        };

        Ok(event)
    }

    /// Parse and decode a JSON text message in one step
    pub fn from_json(raw: &str) -> Result<Self> {
        Self::decode(&InboundMessage::parse(raw)?)
    }

    /// Encode back to the wire form
    pub fn to_message(&self) -> InboundMessage {
        let data = match self {
            PlayerEvent::Ready => Value::Null,
            PlayerEvent::StateChange(state) => state.code().map(Value::from).unwrap_or(Value::Null),
            PlayerEvent::PlaybackQualityChange(s)
            | PlayerEvent::PlaybackRateChange(s)
            | PlayerEvent::Error(s)
            | PlayerEvent::VideoId(s) => Value::from(s.clone()),
            PlayerEvent::CurrentSecond(n)
            | PlayerEvent::VideoDuration(n)
            | PlayerEvent::VideoLoadedFraction(n) => Value::from(*n),
        };
        InboundMessage::new(self.name(), data)
    }
}

impl std::fmt::Display for PlayerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerEvent::Ready => write!(f, "onReady()"),
            PlayerEvent::StateChange(state) => write!(f, "onStateChange({})", state),
            PlayerEvent::PlaybackQualityChange(s)
            | PlayerEvent::PlaybackRateChange(s)
            | PlayerEvent::Error(s)
            | PlayerEvent::VideoId(s) => write!(f, "{}({})", self.name(), s),
            PlayerEvent::CurrentSecond(n)
            | PlayerEvent::VideoDuration(n)
            | PlayerEvent::VideoLoadedFraction(n) => write!(f, "{}({})", self.name(), n),
        }
    }
}

/// Numbers arrive as JSON numbers or numeric strings depending on the bridge
fn number(event: &str, data: &Value) -> Result<f64> {
    let value = match data {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match value {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(Error::malformed(event, format!("expected a number, got {}", data))),
    }
}

/// Strings are also accepted as numbers (rates and error codes are numeric in the IFrame API)
fn text(event: &str, data: &Value) -> Result<String> {
    match data {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(Error::malformed(event, format!("expected a string, got {}", data))),
    }
}
