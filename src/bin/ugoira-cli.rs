//! Command-line front end: convert a pixiv ugoira ZIP to an MP4 file.
//!
//! Exit status is 0 on success, otherwise the numeric code of the error
//! ([`UgoiraError::code`]).

use std::{collections::HashMap, path::PathBuf, process::ExitCode};

use clap::Parser;
use ugoira::{convert_ugoira_to_mp4, EncodeOptions, FrameList, UgoiraError, X264Profile};

#[derive(Parser, Debug)]
#[command(
    name = "ugoira",
    version,
    about = "Convert pixiv ugoira zip to mp4 file."
)]
struct Cli {
    /// Source ugoira ZIP archive.
    input: PathBuf,

    /// Destination MP4 file. Replaced if it already exists.
    dest: PathBuf,

    /// JSON frame manifest: an array of {"file": ..., "delay": ...}
    /// objects with delays in milliseconds.
    json: PathBuf,

    /// Maximum output frame rate.
    #[arg(short = 'M', long = "max-fps", value_name = "FPS", default_value_t = 60.0)]
    max_fps: f32,

    /// Container metadata as KEY=VALUE. Repeatable.
    #[arg(short = 'm', long = "meta", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    meta: Vec<(String, String)>,

    /// Force yuv420p output regardless of the source pixel format.
    #[arg(short = 'f', long = "force-yuv420p")]
    force_yuv420p: bool,

    /// Constant Rate Factor, 0-51 (lower is better quality).
    #[arg(long, value_name = "CRF", default_value_t = 18)]
    crf: i32,

    /// x264 encoder preset.
    #[arg(short = 'p', long, value_name = "PRESET", default_value = "slow")]
    preset: String,

    /// H.264 profile level (e.g. "4.1").
    #[arg(short = 'l', long, value_name = "LEVEL")]
    level: Option<String>,

    /// H.264 profile.
    #[arg(short = 'P', long, value_name = "PROFILE")]
    profile: Option<X264Profile>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {raw:?}")),
    }
}

fn run(cli: &Cli) -> Result<(), UgoiraError> {
    let frames = FrameList::from_json_file(&cli.json)?;

    let mut options = EncodeOptions::new();
    options.set("crf", cli.crf.to_string());
    options.set("preset", cli.preset.as_str());
    if cli.force_yuv420p {
        options.set("force_yuv420p", "1");
    }
    if let Some(level) = &cli.level {
        options.set("level", level.as_str());
    }
    if let Some(profile) = &cli.profile {
        if !profile.is_auto() {
            options.set("profile", profile.as_str());
        }
    }

    let metadata: HashMap<String, String> = cli.meta.iter().cloned().collect();

    convert_ugoira_to_mp4(
        &cli.input,
        &cli.dest,
        &frames,
        cli.max_fps,
        &options,
        &metadata,
    )
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            // Negative FFmpeg codes fold into the u8 exit-status space the
            // same way the C front end's return value did.
            ExitCode::from(error.code() as u8)
        }
    }
}
