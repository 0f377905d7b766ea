//! IFrame player options
//!
//! [`PlayerOptions`] is an immutable value handed to [`crate::Player::initialize`].
//! Values are the raw IFrame `playerVars` integers and are passed through
//! uninterpreted: a `playsinline` of 7 is encoded as `playsinline=7`.
//!
//! ```rust
//! use tubeframe_core::PlayerOptions;
//!
//! let options = PlayerOptions::default().with_autoplay(1).with_rel(0);
//! assert!(options.encode().starts_with("autoplay=1&controls=1"));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Configuration flags for the embedded IFrame player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerOptions {
    /// 1 = start playback on load, 0 = wait for a play command
    pub autoplay: i32,
    /// 1 = show player controls, 0 = hide them
    pub controls: i32,
    /// 1 = enable the JavaScript API (required by the bridge)
    pub enablejsapi: i32,
    /// 1 = allow fullscreen, 0 = disallow
    pub fullscreen: i32,
    /// 1 = modest branding, 0 = full logo
    pub modestbranding: i32,
    /// 1 = show related videos at the end, 0 = restrict to the same channel
    pub rel: i32,
    /// 1 = show video info, 0 = hide
    pub showinfo: i32,
    /// 1 = show the fullscreen button, 0 = hide it
    pub fs: i32,
    /// 1 = show captions by default
    pub cc_load_policy: i32,
    /// 1 = show annotations, 3 = hide annotations
    pub iv_load_policy: i32,
    /// 1 = play inline, 0 = force fullscreen playback on mobile
    pub playsinline: i32,
    /// Origin of the embedding page; omitted from the encoding when empty
    pub origin: String,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            autoplay: 0,
            controls: 1,
            enablejsapi: 1,
            fullscreen: 1,
            modestbranding: 1,
            rel: 0,
            showinfo: 0,
            fs: 1,
            cc_load_policy: 0,
            iv_load_policy: 3,
            playsinline: 1,
            origin: String::new(),
        }
    }
}

macro_rules! with_flag {
    ($($(#[$doc:meta])* $method:ident => $field:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            #[must_use]
            pub fn $method(self, value: i32) -> Self {
                Self { $field: value, ..self }
            }
        )*
    };
}

impl PlayerOptions {
    with_flag! {
        /// Copy with `autoplay` replaced
        with_autoplay => autoplay,
        /// Copy with `controls` replaced
        with_controls => controls,
        /// Copy with `enablejsapi` replaced
        with_enablejsapi => enablejsapi,
        /// Copy with `fullscreen` replaced
        with_fullscreen => fullscreen,
        /// Copy with `modestbranding` replaced
        with_modestbranding => modestbranding,
        /// Copy with `rel` replaced
        with_rel => rel,
        /// Copy with `showinfo` replaced
        with_showinfo => showinfo,
        /// Copy with `fs` replaced
        with_fs => fs,
        /// Copy with `cc_load_policy` replaced
        with_cc_load_policy => cc_load_policy,
        /// Copy with `iv_load_policy` replaced
        with_iv_load_policy => iv_load_policy,
        /// Copy with `playsinline` replaced
        with_playsinline => playsinline,
    }

    /// Copy with `origin` replaced
    #[must_use]
    pub fn with_origin(self, origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            ..self
        }
    }

    /// Integer flags in encoding order
    fn flags(&self) -> [(&'static str, i32); 11] {
        [
            ("autoplay", self.autoplay),
            ("controls", self.controls),
            ("enablejsapi", self.enablejsapi),
            ("fullscreen", self.fullscreen),
            ("modestbranding", self.modestbranding),
            ("rel", self.rel),
            ("showinfo", self.showinfo),
            ("fs", self.fs),
            ("cc_load_policy", self.cc_load_policy),
            ("iv_load_policy", self.iv_load_policy),
            ("playsinline", self.playsinline),
        ]
    }

    /// Encode as an `&`-joined `key=value` parameter string.
    ///
    /// Order is fixed; `origin` comes last and is left out when empty.
    pub fn encode(&self) -> String {
        let mut params: Vec<String> = self
            .flags()
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();

        if !self.origin.is_empty() {
            params.push(format!("origin={}", self.origin));
        }

        params.join("&")
    }

    /// The same pairs as a `playerVars` object for the host page
    pub fn player_vars(&self) -> Value {
        let mut vars: Map<String, Value> = self
            .flags()
            .iter()
            .map(|(key, value)| (key.to_string(), Value::from(*value)))
            .collect();

        if !self.origin.is_empty() {
            vars.insert("origin".to_string(), Value::from(self.origin.clone()));
        }

        Value::Object(vars)
    }
}
