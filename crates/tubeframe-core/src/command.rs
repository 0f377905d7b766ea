//! Outbound command protocol
//!
//! Each facade operation becomes exactly one [`Command`], sent to the page as a
//! named invocation with positional arguments:
//!
//! | command | invocation |
//! |---------|------------|
//! | `LoadVideo` | `loadVideo(id, startSeconds)` |
//! | `CueVideo` | `cueVideo(id, startSeconds)` |
//! | `Play` / `Pause` / `Stop` | `play()` / `pause()` / `stop()` |
//! | `SeekTo` | `seekTo(seconds)` |
//! | `SetVolume` | `setVolume(percent)` |
//!
//! Arguments are JSON encoded, so video ids can never break out of the
//! generated script.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the page-side object that receives invocations
pub const BRIDGE_OBJECT: &str = "tubeframe";

/// A single request to the remote player
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    LoadVideo { video_id: String, start_seconds: f64 },
    CueVideo { video_id: String, start_seconds: f64 },
    Play,
    Pause,
    Stop,
    SeekTo { seconds: f64 },
    /// Volume in percent, 0..=100
    SetVolume { percent: u8 },
    /// Page-side shutdown: cancel polling and destroy the player
    Teardown,
}

/// Wire form of a command: a function name plus positional arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteInvocation {
    pub name: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl Command {
    /// Build a volume command from a 0.0..=1.0 level.
    ///
    /// The level is clamped, then rescaled to the integer percent the IFrame
    /// API expects. NaN maps to 0.
    pub fn set_volume(volume: f64) -> Self {
        let level = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        Command::SetVolume {
            percent: (level * 100.0).round() as u8,
        }
    }

    /// Remote function name
    pub fn name(&self) -> &'static str {
        match self {
            Command::LoadVideo { .. } => "loadVideo",
            Command::CueVideo { .. } => "cueVideo",
            Command::Play => "play",
            Command::Pause => "pause",
            Command::Stop => "stop",
            Command::SeekTo { .. } => "seekTo",
            Command::SetVolume { .. } => "setVolume",
            Command::Teardown => "teardown",
        }
    }

    /// Positional arguments
    pub fn args(&self) -> Vec<Value> {
        match self {
            Command::LoadVideo { video_id, start_seconds }
            | Command::CueVideo { video_id, start_seconds } => {
                vec![Value::from(video_id.clone()), Value::from(*start_seconds)]
            }
            Command::SeekTo { seconds } => vec![Value::from(*seconds)],
            Command::SetVolume { percent } => vec![Value::from(*percent)],
            Command::Play | Command::Pause | Command::Stop | Command::Teardown => Vec::new(),
        }
    }

    pub fn invocation(&self) -> RemoteInvocation {
        RemoteInvocation {
            name: self.name().to_string(),
            args: self.args(),
        }
    }

    /// Script evaluated in the page to run this command
    pub fn to_script(&self) -> Result<String> {
        let payload = serde_json::to_string(&self.invocation())?;
        Ok(format!("{}.invoke({});", BRIDGE_OBJECT, payload))
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let args: Vec<String> = self.args().iter().map(|a| a.to_string()).collect();
        write!(f, "{}({})", self.name(), args.join(", "))
    }
}

impl TryFrom<RemoteInvocation> for Command {
    type Error = Error;

    fn try_from(invocation: RemoteInvocation) -> Result<Self> {
        let name = invocation.name.as_str();
        let args = &invocation.args;

        let arg_f64 = |index: usize| -> Result<f64> {
            args.get(index)
                .and_then(Value::as_f64)
                .ok_or_else(|| Error::malformed(name, format!("argument {} must be a number", index)))
        };
        let arg_str = |index: usize| -> Result<String> {
            args.get(index)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| Error::malformed(name, format!("argument {} must be a string", index)))
        };

        let command = match name {
            "loadVideo" => Command::LoadVideo {
                video_id: arg_str(0)?,
                start_seconds: arg_f64(1)?,
            },
            "cueVideo" => Command::CueVideo {
                video_id: arg_str(0)?,
                start_seconds: arg_f64(1)?,
            },
            "play" => Command::Play,
            "pause" => Command::Pause,
            "stop" => Command::Stop,
            "seekTo" => Command::SeekTo { seconds: arg_f64(0)? },
            "setVolume" => Command::SetVolume {
                percent: arg_f64(0)?.clamp(0.0, 100.0).round() as u8,
            },
            "teardown" => Command::Teardown,
            other => return Err(Error::UnknownCommand(other.to_string())),
        };

        Ok(command)
    }
}

/// Recover the invocation from a script produced by [`Command::to_script`]
pub fn parse_script(script: &str) -> Result<RemoteInvocation> {
    let prefix = format!("{}.invoke(", BRIDGE_OBJECT);
    let body = script
        .trim()
        .strip_prefix(prefix.as_str())
        .and_then(|rest| rest.strip_suffix(");"))
        .ok_or_else(|| Error::UnknownCommand(script.to_string()))?;

    Ok(serde_json::from_str(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_volume_rescaled_to_percent() {
        assert_eq!(Command::set_volume(0.5), Command::SetVolume { percent: 50 });
        assert_eq!(Command::set_volume(0.5).args(), vec![json!(50)]);
        assert_eq!(Command::set_volume(1.0), Command::SetVolume { percent: 100 });
        assert_eq!(Command::set_volume(0.333), Command::SetVolume { percent: 33 });
    }

    #[test]
    fn test_volume_clamped() {
        assert_eq!(Command::set_volume(-0.2), Command::SetVolume { percent: 0 });
        assert_eq!(Command::set_volume(3.0), Command::SetVolume { percent: 100 });
        assert_eq!(Command::set_volume(f64::NAN), Command::SetVolume { percent: 0 });
    }

    #[test]
    fn test_load_video_invocation() {
        let command = Command::LoadVideo {
            video_id: "abc123".into(),
            start_seconds: 0.0,
        };
        let invocation = command.invocation();
        assert_eq!(invocation.name, "loadVideo");
        assert_eq!(invocation.args, vec![json!("abc123"), json!(0.0)]);
    }

    #[test]
    fn test_script_escapes_arguments() {
        let command = Command::CueVideo {
            video_id: "x'); alert(1); ('".into(),
            start_seconds: 3.0,
        };
        let script = command.to_script().unwrap();
        assert!(script.starts_with("tubeframe.invoke({"));
        assert!(script.ends_with(");"));

        let parsed = parse_script(&script).unwrap();
        assert_eq!(Command::try_from(parsed).unwrap(), command);
    }

    #[test]
    fn test_argumentless_commands() {
        for command in [Command::Play, Command::Pause, Command::Stop] {
            assert!(command.args().is_empty());
        }
        assert_eq!(Command::SeekTo { seconds: 42.0 }.to_string(), "seekTo(42.0)");
    }

    #[test]
    fn test_unknown_invocation_rejected() {
        let invocation = RemoteInvocation {
            name: "mute".into(),
            args: vec![],
        };
        assert!(matches!(Command::try_from(invocation), Err(Error::UnknownCommand(_))));
        assert!(parse_script("player.playVideo()").is_err());
    }
}
