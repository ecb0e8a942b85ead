use anyhow::Result;
use clap::Parser;
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vidscribe::app::{self, App};
use vidscribe::cli::{Cli, Commands};
use vidscribe::config::Config;
use vidscribe::utils;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose { "vidscribe=debug" } else { "vidscribe=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(err) = run(cli).await {
        app::report_failure(&err);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref()).await?;
    let show_progress = !cli.quiet;

    match cli.command {
        Commands::Resolve { input } => {
            let app = App::from_config(config, show_progress)?;
            let submission = app.submit(&input).await?;
            let video = &submission.video;

            println!("Title: {}", video.title);
            println!("Author: {}", video.author);
            println!("Categorized under author: {}", video.author);
            println!("Identifier: {}", video.identifier);
            println!("Page: {}", video.canonical_url);
            if let Some(domain) = utils::extract_domain(&video.canonical_url) {
                println!("Site: {}", domain);
            }
            println!("Stream (MP4): {}", video.stream_url);
        }
        Commands::Captions {
            input,
            output,
            format,
            model,
            language,
        } => {
            if let Some(model) = model {
                config.captions.model = model;
            }
            let app = App::from_config(config, show_progress)?;

            let (submission, outcome) = app
                .generate_captions(&input, output, &format, language.as_deref())
                .await?;

            println!("Title: {}", submission.video.title);
            println!(
                "Detected language: {}{}",
                outcome.language.as_deref().unwrap_or("unknown"),
                if outcome.translated { " (translated)" } else { "" }
            );
            if let Some(last) = outcome.segments.last() {
                println!(
                    "{} captions covering {}",
                    outcome.segments.len(),
                    utils::format_duration(last.end_seconds)
                );
            }
            println!("Captions saved to: {}", outcome.output_path.display());
        }
        Commands::Transcode {
            input,
            output,
            container,
        } => {
            let app = App::from_config(config, show_progress)?;

            let (submission, outcome) = app
                .transcode(&input, output, container.as_deref())
                .await?;

            println!("Title: {}", submission.video.title);
            println!(
                "Saved {} ({}) to: {}",
                outcome.target.container.to_uppercase(),
                utils::format_file_size(outcome.size),
                outcome.output_path.display()
            );
        }
        Commands::Videos => {
            let app = App::from_config(config, show_progress)?;
            let videos = app.videos()?;

            if videos.is_empty() {
                println!("No videos stored yet.");
            }
            for video in videos {
                println!(
                    "{}  {}  {}  {}",
                    style(&video.identifier).bold(),
                    video.author,
                    video.source_url,
                    video.resolved_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
        Commands::Backups => {
            let app = App::from_config(config, show_progress)?;
            let backups = app.backups()?;

            if backups.is_empty() {
                println!("No inputs recorded yet.");
            }
            for entry in backups {
                println!(
                    "{}  {}",
                    entry.submitted_at.format("%Y-%m-%d %H:%M:%S"),
                    entry.raw_input
                );
            }
        }
        Commands::Config { show } => {
            println!("Configuration file: {}", Config::config_path(cli.config.as_deref())?.display());
            if show {
                config.display();
            } else {
                println!("Edit this file to change settings, or run `vidscribe config --show`.");
            }
        }
        Commands::Check => {
            let tools = [
                (config.resolver.yt_dlp_path.as_str(), "required to resolve and download videos"),
                (config.transcode.ffmpeg_path.as_str(), "required for captions and transcoding"),
                (config.captions.whisper_path.as_str(), "required for captions"),
            ];
            let missing = utils::check_dependencies(&tools).await;

            if missing.is_empty() {
                println!("{} All external tools found", style("✓").green());
            } else {
                println!("⚠️  Missing tools:");
                for dep in missing {
                    println!("   • {}", dep);
                }
            }
        }
    }

    Ok(())
}
