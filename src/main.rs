//! Replays a recorded landmark stream through an exercise session.

use anyhow::{Context, Result};
use clap::Parser;
use form_coach::{
    config::Config,
    replay::{replay, Recording},
    rules::Exercise,
    session::Session,
};
use log::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Recorded landmark stream (YAML)
    #[arg(short, long)]
    input: String,

    /// Exercise to analyze (squat, pull_up); overrides the config file
    #[arg(short, long)]
    exercise: Option<String>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,

    /// Print voice cues for each rep
    #[arg(long)]
    voice: bool,

    /// Privacy mode: never produce the session summary
    #[arg(long)]
    private: bool,

    /// Print the example configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.print_config {
        print!("{}", form_coach::config::EXAMPLE_CONFIG);
        return Ok(());
    }

    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path);
        match Config::from_file(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Failed to load config file: {}. Using defaults.", e);
                Config::default()
            }
        }
    } else {
        Config::default()
    };

    if let Some(name) = &args.exercise {
        config.session.exercise = name.parse::<Exercise>()?;
    }
    config.session.voice_enabled |= args.voice;
    config.session.privacy_mode |= args.private;

    let recording =
        Recording::from_file(&args.input).with_context(|| format!("Failed to load recording {}", args.input))?;
    info!(
        "Replaying {} frames as {}",
        recording.frames.len(),
        config.session.exercise.display_name()
    );

    let mut session = Session::from_config(&config).context("Invalid configuration")?;
    let result = replay(&mut session, &recording);

    for report in &result.reports {
        for cue in session.voice_cues(report) {
            println!("{cue}");
        }
    }

    println!(
        "{}: {} reps over {} frames",
        session.exercise().display_name(),
        session.rep_count(),
        result.frames
    );
    if let Some(average) = session.average_score() {
        println!("Average score: {average:.1}");
    }
    if let Some(tempo) = session.detector().average_tempo() {
        println!("Average tempo: {:.2}s", tempo.as_secs_f64());
    }
    for item in session.feedback().entries() {
        println!("  rep {} [{}] {}", item.rep_number, item.kind, item.message);
    }

    if let Some(summary) = session.summary_request() {
        println!("Summary:\n{}", serde_yaml::to_string(&summary)?);
    }

    Ok(())
}
