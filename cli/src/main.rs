use std::io::Write;

use clap::{Parser, Subcommand};
use waystone_cli::{CliContext, commands, logging, readline};
use waystone_core::{AppConfig, AppConfigExt};

#[tokio::main]
async fn main() -> Result<(), String> {
    let config = AppConfig::load();
    let _log_guard = logging::init(config.data_dir().ok().as_deref());
    let ctx = CliContext::new(config);

    // Ctrl-C: finish the current activity and checkpoint before leaving
    let interrupt_ctx = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, shutting down");
            if let Err(e) = commands::stop(&interrupt_ctx).await {
                tracing::error!(error = %e, "Shutdown failed");
            }
            std::process::exit(130);
        }
    });

    loop {
        let line = readline()?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match respond(line, &ctx).await {
            Ok(quit) => {
                if quit {
                    break;
                }
            }
            Err(err) => {
                write!(std::io::stdout(), "{err}").map_err(|e| e.to_string())?;
                std::io::stdout().flush().map_err(|e| e.to_string())?;
            }
        }
    }

    Ok(())
}

#[derive(Parser)]
#[command(version, about = "Path of Exile activity tracker")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start tracking the configured log, or the given one
    Track {
        #[arg(short, long)]
        path: Option<String>,
    },
    Stop,
    Status,
    Stats {
        #[arg(short, long)]
        filter: Option<String>,
    },
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    Tags,
    ResetStats,
    Config,
    SetLogFile {
        #[arg(short, long)]
        path: String,
    },
    Exit,
}

async fn respond(line: &str, ctx: &CliContext) -> Result<bool, String> {
    let mut args = shlex::split(line).ok_or("error: Invalid quoting")?;
    args.insert(0, "waystone".to_string());
    let cli = Cli::try_parse_from(args).map_err(|e| e.to_string())?;

    match &cli.command {
        Some(Commands::Track { path }) => commands::track(path.as_deref(), ctx).await?,
        Some(Commands::Stop) => commands::stop(ctx).await?,
        Some(Commands::Status) => commands::status(ctx).await?,
        Some(Commands::Stats { filter }) => commands::show_stats(filter.as_deref(), ctx).await?,
        Some(Commands::History { limit }) => commands::show_history(*limit, ctx).await?,
        Some(Commands::Tags) => commands::list_tags(ctx).await?,
        Some(Commands::ResetStats) => commands::reset_stats(ctx).await?,
        Some(Commands::Config) => commands::show_settings(ctx).await?,
        Some(Commands::SetLogFile { path }) => commands::set_log_file(path, ctx).await?,
        Some(Commands::Exit) => {
            commands::exit(ctx).await?;
            return Ok(true);
        }
        None => {}
    }
    Ok(false)
}
