//! Host page for the embedded runtime
//!
//! The page loads the IFrame API, creates one player with the configured
//! `playerVars`, forwards player events to the native side as JSON messages,
//! polls time/duration/loaded fraction on a fixed interval and exposes
//! `tubeframe.invoke(...)` for outbound commands.

use crate::{command::BRIDGE_OBJECT, options::PlayerOptions};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Default base URL the page is loaded under
pub const DEFAULT_BASE_URL: &str = "https://www.youtube.com";

/// Default polling interval for time/duration/loaded fraction
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Bridge-level settings for the host page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Base URL the surface should load the page under
    pub base_url: Url,
    /// Milliseconds between progress samples
    pub poll_interval_ms: u64,
    /// JavaScript expression of the native message sink; must expose `postMessage(string)`
    pub ipc_object: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            ipc_object: "window.ipc".to_string(),
        }
    }
}

impl BridgeConfig {
    /// Polling interval, bounded to a sane range
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms).clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL)
    }
}

/// Render the complete HTML document loaded into the embedding surface
pub fn render_player_page(options: &PlayerOptions, config: &BridgeConfig) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <style>
        html, body {{ margin: 0; padding: 0; background-color: #000; overflow: hidden; }}
        #player {{ width: 100%; height: 100vh; }}
    </style>
</head>
<body>
    <div id="player"></div>
    <script>
{script}
    </script>
</body>
</html>
"#,
        script = bridge_script(options, config)
    )
}

/// The bridge script alone, for surfaces that inject scripts instead of loading HTML
pub fn bridge_script(options: &PlayerOptions, config: &BridgeConfig) -> String {
    format!(
        r#"(function () {{
    var tag = document.createElement('script');
    tag.src = "https://www.youtube.com/iframe_api";
    var first = document.getElementsByTagName('script')[0];
    first.parentNode.insertBefore(tag, first);

    var session = {{ player: null, poller: null, videoId: null }};

    function emit(event, data) {{
        {ipc}.postMessage(JSON.stringify({{ event: event, data: data }}));
    }}

    function startPolling() {{
        stopPolling();
        session.poller = setInterval(function () {{
            var player = session.player;
            if (!player || !player.getCurrentTime) {{ return; }}
            emit('onCurrentSecond', player.getCurrentTime());
            emit('onVideoDuration', player.getDuration());
            emit('onVideoLoadedFraction', player.getVideoLoadedFraction());
        }}, {poll_ms});
    }}

    function stopPolling() {{
        if (session.poller !== null) {{
            clearInterval(session.poller);
            session.poller = null;
        }}
    }}

    window.onYouTubeIframeAPIReady = function () {{
        session.player = new YT.Player('player', {{
            height: '100%',
            width: '100%',
            playerVars: {player_vars},
            events: {{
                'onReady': function () {{
                    emit('onReady', null);
                    startPolling();
                }},
                'onStateChange': function (event) {{
                    emit('onStateChange', event.data);
                    if (event.data === YT.PlayerState.PLAYING) {{
                        var data = session.player.getVideoData();
                        if (data && data.video_id) {{
                            emit('onVideoId', data.video_id);
                        }}
                    }}
                }},
                'onPlaybackQualityChange': function (event) {{
                    emit('onPlaybackQualityChange', event.data);
                }},
                'onPlaybackRateChange': function (event) {{
                    emit('onPlaybackRateChange', String(event.data));
                }},
                'onError': function (event) {{
                    emit('onError', String(event.data));
                }}
            }}
        }});
    }};

    var commands = {{
        loadVideo: function (p, id, start) {{ p.loadVideoById(id, start); }},
        cueVideo: function (p, id, start) {{ p.cueVideoById(id, start); }},
        play: function (p) {{ p.playVideo(); }},
        pause: function (p) {{ p.pauseVideo(); }},
        stop: function (p) {{ p.stopVideo(); }},
        seekTo: function (p, seconds) {{ p.seekTo(seconds, true); }},
        setVolume: function (p, percent) {{ p.setVolume(percent); }}
    }};

    window.{bridge} = {{
        invoke: function (call) {{
            if (call.name === 'teardown') {{
                stopPolling();
                if (session.player && session.player.destroy) {{ session.player.destroy(); }}
                session.player = null;
                return;
            }}
            var handler = commands[call.name];
            if (!handler || !session.player) {{ return; }}
            handler.apply(null, [session.player].concat(call.args || []));
        }}
    }};
}})();"#,
        ipc = config.ipc_object,
        poll_ms = config.poll_interval().as_millis(),
        player_vars = script_json(&options.player_vars()),
        bridge = BRIDGE_OBJECT,
    )
}

/// JSON text safe to embed in an inline `<script>`: `<`, `>` and `&` are
/// written as unicode escapes so no value can close the element.
fn script_json(value: &Value) -> String {
    value
        .to_string()
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.base_url.as_str(), "https://www.youtube.com/");
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_poll_interval_bounded() {
        let fast = BridgeConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(fast.poll_interval(), MIN_POLL_INTERVAL);

        let slow = BridgeConfig {
            poll_interval_ms: 60_000,
            ..Default::default()
        };
        assert_eq!(slow.poll_interval(), MAX_POLL_INTERVAL);
    }

    #[test]
    fn test_page_embeds_options_and_bridge() {
        let options = PlayerOptions::default().with_autoplay(1);
        let page = render_player_page(&options, &BridgeConfig::default());

        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains(r#""autoplay":1"#));
        assert!(page.contains("window.tubeframe = {"));
        assert!(page.contains("}, 100);"));
        assert!(page.contains("window.ipc.postMessage"));
        assert!(page.contains("clearInterval(session.poller)"));
    }

    #[test]
    fn test_custom_ipc_object() {
        let config = BridgeConfig {
            ipc_object: "window.webkit.messageHandlers.tubeframe".into(),
            ..Default::default()
        };
        let script = bridge_script(&PlayerOptions::default(), &config);
        assert!(script.contains("window.webkit.messageHandlers.tubeframe.postMessage"));
    }

    #[test]
    fn test_origin_cannot_close_script() {
        let options = PlayerOptions::default().with_origin("</script><b>x&y");
        let page = render_player_page(&options, &BridgeConfig::default());

        assert_eq!(page.matches("</script>").count(), 1);
        assert!(page.contains(r#""origin":"\u003c/script\u003e\u003cb\u003ex\u0026y""#));

        let start = page.find("playerVars: ").unwrap() + "playerVars: ".len();
        let end = start + page[start..].find(",\n").unwrap();
        let vars: Value = serde_json::from_str(&page[start..end]).unwrap();
        assert_eq!(vars["origin"], "</script><b>x&y");
    }
}
