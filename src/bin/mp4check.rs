use clap::Parser;
use mp4sink::{DefaultSinkChecks, FileReport, TrackStatus, check_tracks, read_track_formats_from_path};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Check that MP4 output tracks use AVC video and AAC audio")]
struct Args {
    /// MP4 files to check
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Output as JSON instead of human-readable text
    #[arg(long)]
    json: bool,

    /// Log box parsing details
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = if args.verbose { "mp4sink=debug" } else { "mp4sink=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(args: &Args) -> anyhow::Result<bool> {
    let mut reports = Vec::with_capacity(args.paths.len());
    for path in &args.paths {
        let tracks = read_track_formats_from_path(path)?;
        reports.push(check_tracks(path.display().to_string(), &tracks, &DefaultSinkChecks));
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            print_human(report);
        }
    }

    Ok(reports.iter().all(FileReport::is_playable))
}

fn print_human(report: &FileReport) {
    println!("File: {}", report.file);
    if report.tracks.is_empty() {
        println!("Tracks: (none)");
        return;
    }

    println!("Tracks:");
    for t in &report.tracks {
        let status = match t.status {
            TrackStatus::Accepted => "ok",
            TrackStatus::Rejected => "REJECTED",
            TrackStatus::Skipped => "skipped",
        };
        println!("  Track {} [{}]: {}", t.index, t.handler_type, status);
        if let Some(mime) = &t.mime {
            println!("    mime: {}", mime);
        }
        if let Some(avc) = &t.avc {
            println!("    profile: {} (idc {}), level {}", avc.profile, avc.profile_idc, avc.level);
        }
        if let Some(msg) = &t.message {
            println!("    {}", msg);
        }
    }
    println!(
        "Result: {}",
        if report.is_playable() { "playable" } else { "unsupported output format" }
    );
}
