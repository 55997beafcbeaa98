use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Local};
use waystone_core::{
    AppConfigExt, PipelineOptions, RosterStore, SqliteStore, TrackingPipeline, TrackingSession,
    stats,
};

use crate::context::CliContext;

pub async fn track(path: Option<&str>, ctx: &CliContext) -> Result<(), String> {
    let mut pipeline = ctx.pipeline.lock().await;
    if pipeline.as_ref().is_some_and(TrackingPipeline::is_running) {
        println!("Already tracking, run `stop` first");
        return Ok(());
    }
    // Worker exited on its own (reader error); collect its result
    if let Some(finished) = pipeline.take()
        && let Err(e) = finished.stop().await
    {
        println!("Previous tracking ended with error: {e}");
    }

    let config = ctx.config.read().await.clone();
    let log_path = path.map_or_else(|| config.log_path(), |p| Path::new(p).to_path_buf());

    let mut session = TrackingSession::open(&config).map_err(|e| e.to_string())?;
    session.add_signal_handler(Box::new(ctx.view_updater()));
    session.restore().map_err(|e| e.to_string())?;

    let started = TrackingPipeline::spawn(log_path.clone(), session, PipelineOptions::from(&config))
        .map_err(|e| e.to_string())?;
    *pipeline = Some(started);

    println!("Tracking {}", log_path.display());
    Ok(())
}

pub async fn stop(ctx: &CliContext) -> Result<(), String> {
    let Some(pipeline) = ctx.pipeline.lock().await.take() else {
        println!("Not tracking");
        return Ok(());
    };
    pipeline.stop().await.map_err(|e| e.to_string())?;
    println!("Tracking stopped");
    Ok(())
}

pub async fn status(ctx: &CliContext) -> Result<(), String> {
    let progress = ctx
        .pipeline
        .lock()
        .await
        .as_ref()
        .filter(|p| p.is_running())
        .map(TrackingPipeline::progress);

    let Some(progress) = progress else {
        println!("Not tracking");
        return Ok(());
    };
    if !progress.live {
        println!(
            "Reading history: {:.1}% ({}/{} lines)",
            progress.percent(),
            progress.lines_read,
            progress.lines_total
        );
        return Ok(());
    }

    ctx.with_view(|view| {
        if let Some(catch_up) = view.catch_up {
            println!("Live (history read in {}ms)", catch_up.as_millis());
        }
        match &view.current {
            Some(current) => {
                let state = if current.paused { " (paused)" } else { "" };
                println!(
                    "{} {} since {}{}",
                    current.kind,
                    current.area,
                    current.started_at.format("%H:%M:%S"),
                    state
                );
                if let Some(nested) = &current.nested {
                    println!("  inside: {nested}");
                }
                if !current.tags.is_empty() {
                    println!("  tags: {}", current.tags.join(", "));
                }
            }
            None => println!("No activity"),
        }
    })
}

pub async fn show_stats(filter: Option<&str>, ctx: &CliContext) -> Result<(), String> {
    let filter = filter.map(str::to_lowercase);
    ctx.with_view(|view| {
        let rows: Vec<_> = view
            .counters
            .iter()
            .filter(|(_, value)| **value != 0)
            .map(|(key, value)| (stats::long_name(key), *value))
            .filter(|(name, _)| {
                filter
                    .as_deref()
                    .is_none_or(|f| name.to_lowercase().contains(f))
            })
            .collect();

        if rows.is_empty() {
            println!("No statistics");
            return;
        }
        for (name, value) in rows {
            println!("{name:<50} {value:>8}");
        }
    })
}

pub async fn show_history(limit: usize, ctx: &CliContext) -> Result<(), String> {
    ctx.with_view(|view| {
        if view.history.is_empty() {
            println!("No finished activities");
            return;
        }

        println!(
            "{:<20} {:<12} {:<32} {:>5} {:>9} {:>6}  Tags",
            "Started", "Type", "Area", "Level", "Duration", "Deaths"
        );
        println!("{}", "-".repeat(100));
        for record in view.history.iter().take(limit) {
            let started = DateTime::from_timestamp(record.timestamp, 0)
                .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            let area = if record.is_zana {
                format!("  {}", record.area)
            } else {
                record.area.clone()
            };
            println!(
                "{:<20} {:<12} {:<32} {:>5} {:>9} {:>6}  {}",
                started,
                record.kind.to_string(),
                area,
                record.area_level,
                format_duration(record.duration_secs),
                record.death_counter,
                record.tags.join(",")
            );
        }
        println!("\nShowing {} of {}", limit.min(view.history.len()), view.history.len());
    })
}

pub async fn list_tags(ctx: &CliContext) -> Result<(), String> {
    let database = ctx
        .config
        .read()
        .await
        .database_path()
        .map_err(|e| e.to_string())?;
    let store = SqliteStore::open(&database).map_err(|e| e.to_string())?;
    let tags = store.load_tags().map_err(|e| e.to_string())?;

    for tag in tags {
        let origin = if tag.is_default { "default" } else { "custom" };
        println!("{:<20} {:<24} {}", tag.id, tag.display_name, origin);
    }
    Ok(())
}

pub async fn reset_stats(ctx: &CliContext) -> Result<(), String> {
    if ctx.is_tracking().await {
        return Err("Stop tracking before resetting statistics\n".to_string());
    }
    let config = ctx.config.read().await.clone();
    let mut session = TrackingSession::open(&config).map_err(|e| e.to_string())?;
    session.reset_stats().map_err(|e| e.to_string())?;
    ctx.clear_counters();
    println!("Statistics reset");
    Ok(())
}

pub async fn show_settings(ctx: &CliContext) -> Result<(), String> {
    let config = ctx.config.read().await;
    println!("log file:            {}", config.log_path().display());
    match config.data_dir() {
        Ok(dir) => println!("data directory:      {}", dir.display()),
        Err(e) => println!("data directory:      unavailable ({e})"),
    }
    println!("poll interval:       {}ms", config.poll_interval().as_millis());
    println!("checkpoint interval: {}s", config.checkpoint_interval().as_secs());
    println!("replay cache:        {}", config.replay_cache_capacity);
    println!("shaper kill lines:   {}", config.tracker.shaper_kill_lines);
    println!("discard open labs:   {}", config.tracker.discard_incomplete_labs);
    Ok(())
}

pub async fn set_log_file(path: &str, ctx: &CliContext) -> Result<(), String> {
    if !Path::new(path).is_file() {
        return Err(format!("No such file: {path}\n"));
    }
    let mut config = ctx.config.write().await;
    config.log_file = path.to_string();
    config.save().map_err(|e| e.to_string())?;
    println!("Log file set to {path}");
    if ctx.is_tracking().await {
        println!("Takes effect on the next `track`");
    }
    Ok(())
}

pub async fn exit(ctx: &CliContext) -> Result<(), String> {
    if ctx.is_tracking().await {
        stop(ctx).await?;
    }
    writeln!(std::io::stdout(), "quitting...").map_err(|e| e.to_string())?;
    std::io::stdout().flush().map_err(|e| e.to_string())
}

fn format_duration(secs: i64) -> String {
    let secs = secs.max(0);
    format!("{:02}:{:02}:{:02}", secs / 3600, secs % 3600 / 60, secs % 60)
}
