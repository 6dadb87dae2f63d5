//! End-to-end conversion tests over synthesized ugoira archives.
//!
//! Fixtures are generated on the fly: solid-color stills encoded with the
//! `image` crate and packed into a ZIP. Outputs are re-opened with
//! ffmpeg-next to check timing, stream properties, and metadata. Tests
//! skip gracefully when no H.264 encoder is available on the host.

use std::{
    collections::HashMap,
    fs::File,
    io::{Cursor, Write},
    path::{Path, PathBuf},
};

use ffmpeg_next::{codec::context::Context as CodecContext, format::Pixel, media::Type};
use ugoira::{convert_ugoira_to_mp4, EncodeOptions, FrameList, UgoiraError};
use zip::write::SimpleFileOptions;

/// Encode a solid-color still in the given container format.
fn still_bytes(width: u32, height: u32, rgb: [u8; 3], format: image::ImageFormat) -> Vec<u8> {
    let pixel = image::Rgb(rgb);
    let img = image::RgbImage::from_pixel(width, height, pixel);
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), format)
        .expect("encode still");
    bytes
}

/// Pack named stills into a ZIP at `path`.
fn write_zip(path: &Path, stills: &[(&str, Vec<u8>)]) {
    let file = File::create(path).expect("create zip");
    let mut writer = zip::ZipWriter::new(file);
    for (name, bytes) in stills {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("start entry");
        writer.write_all(bytes).expect("write entry");
    }
    writer.finish().expect("finish zip");
}

/// A ZIP of `count` PNG stills named `000000.png`, `000001.png`, ...
fn png_ugoira(dir: &Path, count: usize) -> PathBuf {
    let path = dir.join("ugoira.zip");
    let stills: Vec<(String, Vec<u8>)> = (0..count)
        .map(|index| {
            let shade = (index * 40 % 256) as u8;
            (
                format!("{index:06}.png"),
                still_bytes(64, 48, [shade, 128, 255 - shade], image::ImageFormat::Png),
            )
        })
        .collect();
    let named: Vec<(&str, Vec<u8>)> = stills
        .iter()
        .map(|(name, bytes)| (name.as_str(), bytes.clone()))
        .collect();
    write_zip(&path, &named);
    path
}

fn frame_list(delays: &[f32], extension: &str) -> FrameList {
    let mut frames = FrameList::new();
    for (index, delay) in delays.iter().enumerate() {
        frames
            .append(format!("{index:06}.{extension}"), *delay)
            .unwrap();
    }
    frames
}

fn h264_available() -> bool {
    ffmpeg_next::init().expect("ffmpeg init");
    ffmpeg_next::encoder::find_by_name("libx264")
        .or_else(|| ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::H264))
        .is_some()
}

/// Test encoder options: `ultrafast` disables B-frames so packet PTS come
/// out in presentation order.
fn fast_options() -> EncodeOptions {
    let mut options = EncodeOptions::new();
    options.set("preset", "ultrafast");
    options
}

struct OutputProbe {
    packet_pts: Vec<i64>,
    packet_dts: Vec<i64>,
    time_base: ffmpeg_next::Rational,
    avg_frame_rate: ffmpeg_next::Rational,
    pixel_format: Pixel,
    tags: HashMap<String, String>,
}

fn probe_output(path: &Path) -> OutputProbe {
    let mut input = ffmpeg_next::format::input(&path).expect("open output");

    let (stream_index, time_base, avg_frame_rate, parameters) = {
        let stream = input.streams().best(Type::Video).expect("video stream");
        (
            stream.index(),
            stream.time_base(),
            stream.avg_frame_rate(),
            stream.parameters(),
        )
    };

    let pixel_format = CodecContext::from_parameters(parameters)
        .expect("codec context")
        .decoder()
        .video()
        .expect("decoder")
        .format();

    let tags = input
        .metadata()
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();

    let mut packet_pts = Vec::new();
    let mut packet_dts = Vec::new();
    for (stream, packet) in input.packets() {
        if stream.index() != stream_index {
            continue;
        }
        packet_pts.push(packet.pts().expect("packet pts"));
        packet_dts.push(packet.dts().expect("packet dts"));
    }

    OutputProbe {
        packet_pts,
        packet_dts,
        time_base,
        avg_frame_rate,
        pixel_format,
        tags,
    }
}

/// Presentation stamps in stream-time-base units for a microsecond
/// schedule, as produced by the timing driver.
fn expected_stamps(probe: &OutputProbe, stamps_micros: &[i64]) -> Vec<i64> {
    let num = i64::from(probe.time_base.numerator());
    let den = i64::from(probe.time_base.denominator());
    stamps_micros
        .iter()
        .map(|stamp| (stamp * den) / (num * 1_000_000))
        .collect()
}

#[test]
fn uniform_delays_emit_one_picture_per_frame() {
    // Three 100 ms frames under a 60 fps ceiling: 10 fps, 3 pictures, 300 ms.
    if !h264_available() {
        eprintln!("Skipping: no H.264 encoder available");
        return;
    }
    let dir = tempfile::tempdir().expect("temp dir");
    let zip = png_ugoira(dir.path(), 3);
    let output = dir.path().join("out.mp4");

    convert_ugoira_to_mp4(
        &zip,
        &output,
        &frame_list(&[100.0, 100.0, 100.0], "png"),
        60.0,
        &fast_options(),
        &HashMap::new(),
    )
    .expect("convert");

    let probe = probe_output(&output);
    assert_eq!(probe.packet_pts.len(), 3);

    let mut sorted = probe.packet_pts.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, expected_stamps(&probe, &[0, 100_000, 200_000]));

    // avg_frame_rate carries the planner's chosen rate.
    let avg = f64::from(probe.avg_frame_rate);
    assert!((avg - 10.0).abs() < 0.01, "avg_frame_rate was {avg}");
}

#[test]
fn gcd_timing_repeats_pictures_proportionally() {
    // Delays 50/100/150 ms share a 50 ms divisor: 20 fps, 1 + 2 + 3 = 6 pictures.
    if !h264_available() {
        eprintln!("Skipping: no H.264 encoder available");
        return;
    }
    let dir = tempfile::tempdir().expect("temp dir");
    let zip = png_ugoira(dir.path(), 3);
    let output = dir.path().join("out.mp4");

    convert_ugoira_to_mp4(
        &zip,
        &output,
        &frame_list(&[50.0, 100.0, 150.0], "png"),
        60.0,
        &fast_options(),
        &HashMap::new(),
    )
    .expect("convert");

    let probe = probe_output(&output);
    assert_eq!(probe.packet_pts.len(), 6);

    let mut sorted = probe.packet_pts.clone();
    sorted.sort_unstable();
    assert_eq!(
        sorted,
        expected_stamps(
            &probe,
            &[0, 50_000, 100_000, 150_000, 200_000, 250_000],
        ),
    );

    // Decode order is monotone regardless of frame type.
    let mut dts_sorted = probe.packet_dts.clone();
    dts_sorted.sort_unstable();
    assert_eq!(dts_sorted, probe.packet_dts);
}

#[test]
fn fast_animations_are_capped_at_max_fps() {
    // Two 10 ms frames against a 60 fps ceiling come out to about one picture each.
    if !h264_available() {
        eprintln!("Skipping: no H.264 encoder available");
        return;
    }
    let dir = tempfile::tempdir().expect("temp dir");
    let zip = png_ugoira(dir.path(), 2);
    let output = dir.path().join("out.mp4");

    convert_ugoira_to_mp4(
        &zip,
        &output,
        &frame_list(&[10.0, 10.0], "png"),
        60.0,
        &fast_options(),
        &HashMap::new(),
    )
    .expect("convert");

    let probe = probe_output(&output);
    assert_eq!(probe.packet_pts.len(), 2);
    let mut sorted = probe.packet_pts.clone();
    sorted.sort_unstable();
    // 60 fps ticks are 16667 µs apart.
    assert_eq!(sorted, expected_stamps(&probe, &[0, 16_667]));
}

#[test]
fn missing_entry_is_an_archive_error_and_leaves_no_output() {
    // The manifest names an entry the archive does not contain.
    let dir = tempfile::tempdir().expect("temp dir");
    let zip = png_ugoira(dir.path(), 1);
    let output = dir.path().join("out.mp4");

    let error = convert_ugoira_to_mp4(
        &zip,
        &output,
        &frame_list(&[100.0], "jpg"),
        60.0,
        &EncodeOptions::new(),
        &HashMap::new(),
    )
    .unwrap_err();

    assert!(matches!(
        error,
        UgoiraError::Archive(zip::result::ZipError::FileNotFound)
    ));
    assert_eq!(error.code(), 2);
    assert!(!output.exists(), "failed conversion must not leave output");
}

#[test]
fn invalid_max_fps_short_circuits() {
    // Validation fires before the archive path is even touched.
    let error = convert_ugoira_to_mp4(
        "does-not-exist.zip",
        "unused.mp4",
        &frame_list(&[100.0], "png"),
        0.0,
        &EncodeOptions::new(),
        &HashMap::new(),
    )
    .unwrap_err();

    assert!(matches!(error, UgoiraError::InvalidMaxFps(_)));
    assert_eq!(error.code(), 3);
}

#[test]
fn invalid_crf_short_circuits() {
    let mut options = EncodeOptions::new();
    options.set("crf", "99");
    let error = convert_ugoira_to_mp4(
        "does-not-exist.zip",
        "unused.mp4",
        &frame_list(&[100.0], "png"),
        60.0,
        &options,
        &HashMap::new(),
    )
    .unwrap_err();

    assert!(matches!(error, UgoiraError::InvalidCrf(_)));
    assert_eq!(error.code(), 5);
}

#[test]
fn forced_yuv420p_and_metadata_pass_through() {
    // force_yuv420p pins the output pixel format; metadata lands in
    // the container verbatim.
    if !h264_available() {
        eprintln!("Skipping: no H.264 encoder available");
        return;
    }
    let dir = tempfile::tempdir().expect("temp dir");
    let zip = png_ugoira(dir.path(), 2);
    let output = dir.path().join("out.mp4");

    let mut options = EncodeOptions::new();
    options.set("force_yuv420p", "1");
    options.set("crf", "23");
    options.set("preset", "fast");

    let mut metadata = HashMap::new();
    metadata.insert("title".to_string(), "動くテスト".to_string());
    metadata.insert("artist".to_string(), "nobody".to_string());

    convert_ugoira_to_mp4(
        &zip,
        &output,
        &frame_list(&[100.0, 100.0], "png"),
        60.0,
        &options,
        &metadata,
    )
    .expect("convert");

    let probe = probe_output(&output);
    assert_eq!(probe.pixel_format, Pixel::YUV420P);
    assert_eq!(probe.tags.get("title").map(String::as_str), Some("動くテスト"));
    assert_eq!(probe.tags.get("artist").map(String::as_str), Some("nobody"));
}

#[test]
fn converting_twice_to_the_same_path_succeeds() {
    // A pre-existing output file is removed and rewritten.
    if !h264_available() {
        eprintln!("Skipping: no H.264 encoder available");
        return;
    }
    let dir = tempfile::tempdir().expect("temp dir");
    let zip = png_ugoira(dir.path(), 2);
    let output = dir.path().join("out.mp4");
    let frames = frame_list(&[100.0, 100.0], "png");

    for _ in 0..2 {
        convert_ugoira_to_mp4(
            &zip,
            &output,
            &frames,
            60.0,
            &fast_options(),
            &HashMap::new(),
        )
        .expect("convert");
    }

    assert!(output.exists());
    assert_eq!(probe_output(&output).packet_pts.len(), 2);
}

#[test]
fn mixed_still_formats_share_one_conversion() {
    // JPEG and PNG stills decode to different pixel formats, forcing a
    // scaler rebuild mid-stream.
    if !h264_available() {
        eprintln!("Skipping: no H.264 encoder available");
        return;
    }
    let dir = tempfile::tempdir().expect("temp dir");
    let zip_path = dir.path().join("mixed.zip");
    write_zip(
        &zip_path,
        &[
            (
                "000000.jpg",
                still_bytes(64, 48, [200, 40, 40], image::ImageFormat::Jpeg),
            ),
            (
                "000001.png",
                still_bytes(64, 48, [40, 200, 40], image::ImageFormat::Png),
            ),
        ],
    );
    let output = dir.path().join("out.mp4");

    let mut frames = FrameList::new();
    frames.append("000000.jpg", 100.0).unwrap();
    frames.append("000001.png", 100.0).unwrap();

    convert_ugoira_to_mp4(
        &zip_path,
        &output,
        &frames,
        60.0,
        &fast_options(),
        &HashMap::new(),
    )
    .expect("convert");

    assert_eq!(probe_output(&output).packet_pts.len(), 2);
}

#[test]
fn corrupted_archive_is_an_archive_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let zip = dir.path().join("broken.zip");
    std::fs::write(&zip, b"this is not a zip archive").unwrap();
    let output = dir.path().join("out.mp4");

    let error = convert_ugoira_to_mp4(
        &zip,
        &output,
        &frame_list(&[100.0], "png"),
        60.0,
        &EncodeOptions::new(),
        &HashMap::new(),
    )
    .unwrap_err();

    assert!(matches!(error, UgoiraError::Archive(_)));
    assert!(!output.exists());
}
