//! Bundled sample videos

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use tabled::Tabled;

/// Duration assumed for ids that are not in the catalog
pub const FALLBACK_DURATION_SECS: u32 = 180;

/// A video the demo host can play
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct CatalogVideo {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Title")]
    pub title: String,
    #[tabled(skip)]
    pub thumbnail_url: String,
    #[tabled(rename = "Published")]
    pub published_at: DateTime<Utc>,
    #[tabled(skip)]
    pub description: String,
    #[tabled(rename = "Duration", display_with = "format_duration")]
    pub duration_secs: u32,
}

impl CatalogVideo {
    fn new(id: &str, title: &str, published_at: DateTime<Utc>, description: &str, duration_secs: u32) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            thumbnail_url: thumbnail_url(id),
            published_at,
            description: description.to_string(),
            duration_secs,
        }
    }
}

/// Standard-definition thumbnail for a video id
pub fn thumbnail_url(video_id: &str) -> String {
    format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", video_id)
}

/// `m:ss`, or `h:mm:ss` past an hour
pub fn format_duration(secs: &u32) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// The bundled catalog, newest first
pub fn sample_videos() -> Vec<CatalogVideo> {
    vec![
        CatalogVideo::new(
            "uHq9km2E6rk",
            "Player demo clip",
            date(2017, 3, 14),
            "Loaded automatically when the demo player becomes ready.",
            212,
        ),
        CatalogVideo::new(
            "M7lc1UVf-VE",
            "IFrame API walkthrough",
            date(2011, 6, 2),
            "Reference clip used in IFrame player API examples.",
            79,
        ),
        CatalogVideo::new(
            "aqz-KE-bpKQ",
            "Open movie (4K)",
            date(2014, 11, 10),
            "Long-form clip; useful for seek and buffering behaviour.",
            635,
        ),
    ]
}

/// Look up a catalog entry by id
pub fn find(video_id: &str) -> Option<CatalogVideo> {
    sample_videos().into_iter().find(|video| video.id == video_id)
}

/// Duration in seconds for `video_id`, falling back for unknown ids
pub fn duration_of(video_id: &str) -> f64 {
    find(video_id)
        .map(|video| video.duration_secs)
        .unwrap_or(FALLBACK_DURATION_SECS) as f64
}
