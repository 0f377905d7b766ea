//! Player and bridge settings from the command line

use anyhow::Context;
use clap::Args;
use std::path::{Path, PathBuf};
use tubeframe_core::{BridgeConfig, PlayerOptions};
use url::Url;

/// Flags shared by every command that builds a player
#[derive(Args, Debug, Clone, Default)]
pub struct PlayerArgs {
    /// JSON file with player options; missing fields take defaults
    #[arg(long = "options", value_name = "FILE")]
    pub options_file: Option<PathBuf>,

    /// Start playback as soon as a video loads (0/1)
    #[arg(long)]
    pub autoplay: Option<i32>,

    /// Show player controls (0/1)
    #[arg(long)]
    pub controls: Option<i32>,

    /// Show related videos from other channels (0/1)
    #[arg(long)]
    pub rel: Option<i32>,

    /// Allow fullscreen (0/1)
    #[arg(long)]
    pub fullscreen: Option<i32>,

    /// Origin of the embedding page
    #[arg(long)]
    pub origin: Option<String>,

    /// Progress polling interval in milliseconds
    #[arg(long)]
    pub poll_ms: Option<u64>,

    /// Base URL the page is loaded under
    #[arg(long)]
    pub base_url: Option<Url>,
}

impl PlayerArgs {
    /// Options file first, then per-flag overrides
    pub fn player_options(&self) -> anyhow::Result<PlayerOptions> {
        let mut options = match &self.options_file {
            Some(path) => load_options(path)?,
            None => PlayerOptions::default(),
        };

        if let Some(value) = self.autoplay {
            options = options.with_autoplay(value);
        }
        if let Some(value) = self.controls {
            options = options.with_controls(value);
        }
        if let Some(value) = self.rel {
            options = options.with_rel(value);
        }
        if let Some(value) = self.fullscreen {
            options = options.with_fullscreen(value).with_fs(value);
        }
        if let Some(origin) = &self.origin {
            options = options.with_origin(origin.clone());
        }

        Ok(options)
    }

    pub fn bridge_config(&self) -> BridgeConfig {
        let mut config = BridgeConfig::default();
        if let Some(poll_ms) = self.poll_ms {
            config.poll_interval_ms = poll_ms;
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        config
    }
}

fn load_options(path: &Path) -> anyhow::Result<PlayerOptions> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading options file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing options file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let args = PlayerArgs {
            autoplay: Some(1),
            rel: Some(0),
            origin: Some("https://example.com".into()),
            ..Default::default()
        };
        let options = args.player_options().unwrap();
        assert_eq!(options.autoplay, 1);
        assert_eq!(options.origin, "https://example.com");
        assert_eq!(options.controls, 1);
    }

    #[test]
    fn test_options_file_with_override() {
        let path = std::env::temp_dir().join(format!("tubeframe-options-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"controls":0,"iv_load_policy":1}"#).unwrap();

        let args = PlayerArgs {
            options_file: Some(path.clone()),
            autoplay: Some(1),
            ..Default::default()
        };
        let options = args.player_options().unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(options.controls, 0);
        assert_eq!(options.iv_load_policy, 1);
        assert_eq!(options.autoplay, 1);
        assert_eq!(options.playsinline, 1);
    }

    #[test]
    fn test_missing_options_file_is_an_error() {
        let args = PlayerArgs {
            options_file: Some(PathBuf::from("/nonexistent/tubeframe.json")),
            ..Default::default()
        };
        assert!(args.player_options().is_err());
    }

    #[test]
    fn test_bridge_config_overrides() {
        let args = PlayerArgs {
            poll_ms: Some(250),
            ..Default::default()
        };
        let config = args.bridge_config();
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.base_url.as_str(), "https://www.youtube.com/");
    }
}
