//! CLI command implementations

use crate::catalog::{self, format_duration};
use crate::config::PlayerArgs;
use crate::output::{to_json, to_table, OutputFormat};
use crate::simulator::SimulatedPage;
use console::style;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tubeframe_core::{
    render_player_page, LifecycleEvent, LifecycleRegistry, Player, PlayerListener, PlayerState,
    ScriptTransport,
};

/// Print the encoded player options
pub fn options(args: &PlayerArgs, format: &str) -> anyhow::Result<()> {
    let options = args.player_options()?;

    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", to_json(&options)?),
        OutputFormat::Table | OutputFormat::Text => println!("{}", options.encode()),
    }

    Ok(())
}

/// Render the host page
pub fn page(args: &PlayerArgs, output: Option<PathBuf>) -> anyhow::Result<()> {
    let options = args.player_options()?;
    let config = args.bridge_config();
    let html = render_player_page(&options, &config);

    match output {
        Some(path) => {
            std::fs::write(&path, &html)?;
            info!(path = %path.display(), bytes = html.len(), "Host page written");
            println!("Wrote {}", path.display());
        }
        None => print!("{}", html),
    }

    Ok(())
}

/// List the bundled sample videos
pub fn catalog(format: &str) -> anyhow::Result<()> {
    let videos = catalog::sample_videos();

    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", to_json(&videos)?),
        OutputFormat::Table => println!("{}", to_table(&videos)),
        OutputFormat::Text => {
            println!("Sample videos:");
            for (i, video) in videos.iter().enumerate() {
                println!(
                    "  {}. {} [{}] {} ({})",
                    i + 1,
                    video.id,
                    format_duration(&video.duration_secs),
                    video.title,
                    video.published_at.format("%Y-%m-%d")
                );
                println!("     {}", video.description);
                println!("     {}", video.thumbnail_url);
            }
        }
    }

    Ok(())
}

/// Prints callbacks as they arrive; loads the requested video on ready
struct DemoListener {
    video_id: String,
    start_seconds: f64,
}

impl PlayerListener for DemoListener {
    fn on_ready(&self, player: &Player) {
        println!("{} player ready", style("●").green());
        player.load_video(self.video_id.clone(), self.start_seconds);
    }

    fn on_state_change(&self, _player: &Player, state: PlayerState) {
        let label = match state {
            PlayerState::Playing => style(state.to_string()).green(),
            PlayerState::Paused | PlayerState::Buffering => style(state.to_string()).yellow(),
            PlayerState::Ended => style(state.to_string()).cyan(),
            _ => style(state.to_string()).dim(),
        };
        println!("  state      {}", label);
    }

    fn on_playback_quality_change(&self, _player: &Player, quality: &str) {
        println!("  quality    {}", quality);
    }

    fn on_playback_rate_change(&self, _player: &Player, rate: &str) {
        println!("  rate       {}", rate);
    }

    fn on_error(&self, _player: &Player, error: &str) {
        println!("  {}      {}", style("error").red(), error);
    }

    fn on_current_second(&self, _player: &Player, second: f64) {
        debug!(second, "Current second");
    }

    fn on_video_duration(&self, _player: &Player, duration: f64) {
        debug!(duration, "Video duration");
    }

    fn on_video_id(&self, _player: &Player, video_id: &str) {
        println!("  video      {}", video_id);
    }
}

/// Run a headless session against the simulated runtime.
///
/// Half way through, the host is paused and resumed through the lifecycle
/// binding; at the end it is destroyed, which releases the player.
pub async fn demo(
    video_id: &str,
    start_seconds: f64,
    seconds: u64,
    args: &PlayerArgs,
    format: &str,
) -> anyhow::Result<()> {
    let options = args.player_options()?;
    let config = args.bridge_config();
    let poll_interval = config.poll_interval();

    println!("Demo session for {}", style(video_id).bold());
    println!("  Options: {}", options.encode());
    println!("  Polling: {}ms", poll_interval.as_millis());

    let transport = ScriptTransport::new(config, |inbound| SimulatedPage::start(inbound, poll_interval))?;
    let player = Player::new(transport);
    let lifecycle = Arc::new(LifecycleRegistry::new());
    let listener: Arc<dyn PlayerListener> = Arc::new(DemoListener {
        video_id: video_id.to_string(),
        start_seconds,
    });

    player.initialize(&listener, options)?;
    player.bind_lifecycle(lifecycle.clone())?;
    player.when_ready(|player| info!(session_id = %player.id(), "Ready continuation ran"));

    let half = Duration::from_millis(seconds.max(1) * 500);
    tokio::time::sleep(half).await;

    println!("{} host paused", style("◐").yellow());
    lifecycle.emit(LifecycleEvent::Pause);
    tokio::time::sleep(Duration::from_millis(300)).await;
    println!("{} host resumed", style("◑").green());
    lifecycle.emit(LifecycleEvent::Resume);

    tokio::time::sleep(half).await;

    let snapshot = player.snapshot();
    lifecycle.emit(LifecycleEvent::Destroy);
    println!("{} host destroyed", style("○").dim());

    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", to_json(&snapshot)?),
        OutputFormat::Table | OutputFormat::Text => {
            println!("\nFinal snapshot:");
            println!("  Session: {}", player.id());
            println!("  Phase: {}", snapshot.phase);
            println!("  State: {}", snapshot.state);
            println!("  Video: {}", snapshot.video_id.as_deref().unwrap_or("-"));
            println!(
                "  Position: {:.1}s / {:.1}s",
                snapshot.current_time, snapshot.duration
            );
            println!("  Loaded: {:.0}%", snapshot.loaded_fraction * 100.0);
            if let Some(error) = &snapshot.last_error {
                println!("  Last error: {}", error);
            }
        }
    }

    Ok(())
}
