use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use say::config::SayConfig;
use say::engines::polly::PollyBackend;
use say::{OutputWriter, Pipeline, SayError};

/// Build id baked in at compile time: `SAY_BUILD=$(git rev-parse --short=7 HEAD) cargo install`.
const BUILD: Option<&str> = option_env!("SAY_BUILD");

#[derive(Debug, Parser)]
#[command(name = "say")]
#[command(about = "Convert text to numbered mp3 files with Amazon Polly and play them")]
#[command(disable_version_flag = true)]
struct Cli {
    /// Text to speak when no input file is given
    text: Option<String>,
    /// Optional path to an input file (`~` expands to the home directory)
    #[arg(short = 'f', long = "file")]
    file: Option<PathBuf>,
    /// Number of concurrent synthesis workers
    #[arg(short = 't', long)]
    threads: Option<usize>,
    /// Print version
    #[arg(short = 'v', long)]
    version: bool,
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Maximum characters per request
    #[arg(long)]
    budget: Option<usize>,
    #[arg(long)]
    voice: Option<String>,
    /// Prosody rate, e.g. `130%` or `fast`
    #[arg(long)]
    rate: Option<String>,
    /// Profile to read from ~/.aws/config
    #[arg(long)]
    profile: Option<String>,
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// File name prefix, defaults to the input file name without extension
    #[arg(long)]
    prefix: Option<String>,
    #[arg(long)]
    player: Option<PathBuf>,
    /// Write the files without playing them
    #[arg(long)]
    no_play: bool,
    /// Play files left by an earlier run without synthesizing
    #[arg(long, conflicts_with = "no_play")]
    play_only: bool,
}

fn version_line() -> String {
    format!(
        "say v2 ({}) {}",
        BUILD.unwrap_or("dev"),
        std::env::consts::OS
    )
}

fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match directories::BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join(rest),
        None => path.to_path_buf(),
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn apply_overrides(cli: &Cli, config: &mut SayConfig) {
    if let Some(threads) = cli.threads {
        config.workers = threads;
    }
    if let Some(budget) = cli.budget {
        config.budget = budget;
    }
    if let Some(voice) = &cli.voice {
        config.polly.voice = voice.clone();
    }
    if let Some(rate) = &cli.rate {
        config.rate = rate.clone();
    }
    if let Some(profile) = &cli.profile {
        config.polly.profile = Some(profile.clone());
    }
    if let Some(out_dir) = &cli.out_dir {
        config.out_dir = out_dir.clone();
    }
    if let Some(player) = &cli.player {
        config.player.program = player.clone();
    }
}

fn run(cli: Cli) -> Result<(), SayError> {
    let mut config = match &cli.config {
        Some(path) => SayConfig::load(&expand_home(path))?,
        None => SayConfig::default(),
    };
    apply_overrides(&cli, &mut config);

    let input = cli.file.as_deref().map(expand_home);
    let prefix = match (&cli.prefix, &input) {
        (Some(prefix), _) => prefix.clone(),
        (None, Some(path)) => file_stem(path),
        (None, None) => String::new(),
    };
    let pipeline_config = config.pipeline(&prefix)?;

    if cli.play_only {
        let writer = OutputWriter::new(&pipeline_config.out_dir)
            .with_prefix(&prefix)
            .with_extension(&pipeline_config.extension);
        let files = writer.sequential_files();
        log::info!("Playing {} existing files", files.len());
        config.player.play_all(files.as_slice());
        return Ok(());
    }

    let backend = PollyBackend::new(config.polly.clone())?;
    let pipeline = Pipeline::new(pipeline_config, Arc::new(backend));

    let summary = match &input {
        Some(path) => {
            log::info!("input: {}", path.display());
            pipeline.run_file(path)?
        }
        None => pipeline.run(cli.text.as_deref().unwrap_or_default())?,
    };

    for failure in &summary.failures {
        log::warn!("Missing audio for chunk {}: {:?}", failure.index, failure.text);
    }

    if !cli.no_play {
        config.player.play_all(summary.paths().as_slice());
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if cli.version {
        println!("{}", version_line());
        return ExitCode::SUCCESS;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
