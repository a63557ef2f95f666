use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use screenreel_core::capture::domain::frame_source::FrameSource;
use screenreel_core::capture::infrastructure::image_sequence_source::ImageSequenceSource;
use screenreel_core::capture::infrastructure::system_clock::SystemClock;
use screenreel_core::capture::infrastructure::test_pattern_source::TestPatternSource;
use screenreel_core::container::domain::avi_layout::fourcc_str;
use screenreel_core::container::infrastructure::avi_reader::AviReader;
use screenreel_core::encoding::infrastructure::jpeg_frame_encoder::JpegFrameEncoder;
use screenreel_core::pipeline::capture_pacer::RecordingOutcome;
use screenreel_core::pipeline::record_screen_use_case::RecordScreenUseCase;
use screenreel_core::pipeline::recording_config::{EncodeFailurePolicy, RecordingConfig};
use screenreel_core::pipeline::recording_logger::LogRecordingLogger;
use screenreel_core::shared::constants::{
    DEFAULT_FPS, DEFAULT_JPEG_QUALITY, DEFAULT_PATTERN_HEIGHT, DEFAULT_PATTERN_WIDTH,
    DEFAULT_RECORD_SECONDS,
};

/// Paced screen recording to Motion-JPEG AVI.
#[derive(Parser)]
#[command(name = "screenreel")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record frames into an AVI file.
    Record(RecordArgs),
    /// Print the headers of an AVI file and check its structure.
    Inspect {
        /// AVI file to inspect.
        file: PathBuf,
    },
}

#[derive(Args)]
struct RecordArgs {
    /// Output AVI file.
    output: PathBuf,

    /// Frames per second.
    #[arg(long, default_value_t = DEFAULT_FPS)]
    fps: u32,

    /// Recording length in seconds (default 10 unless --max-frames is set).
    #[arg(long)]
    duration: Option<f64>,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<usize>,

    /// JPEG quality (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
    quality: u8,

    /// Frame source: "pattern" or a directory of images.
    #[arg(long, default_value = "pattern")]
    source: String,

    /// Test pattern width in pixels.
    #[arg(long, default_value_t = DEFAULT_PATTERN_WIDTH)]
    width: u32,

    /// Test pattern height in pixels.
    #[arg(long, default_value_t = DEFAULT_PATTERN_HEIGHT)]
    height: u32,

    /// What to do when a frame fails to encode: abort (no file is kept) or
    /// truncate (the frames written so far are kept and the exit status
    /// is 2).
    #[arg(long, default_value = "abort")]
    on_encode_error: String,
}

/// Exit status when a recording was kept but cut short by an encode failure.
const EXIT_TRUNCATED: i32 = 2;

fn main() {
    env_logger::init();

    match run() {
        Ok(true) => {}
        Ok(false) => process::exit(EXIT_TRUNCATED),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

/// Returns `false` when the output is incomplete.
fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Record(args) => {
            validate(&args)?;
            run_record(&args)
        }
        Command::Inspect { file } => run_inspect(&file).map(|()| true),
    }
}

/// Returns `false` if the recording was truncated.
fn run_record(args: &RecordArgs) -> Result<bool, Box<dyn std::error::Error>> {
    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
            log::info!("Created {}", parent.display());
        }
    }

    let source = build_source(args)?;
    let use_case = RecordScreenUseCase::new(
        source,
        Box::new(JpegFrameEncoder::new(args.quality)),
        Box::new(SystemClock::new()),
        Box::new(LogRecordingLogger::new(args.fps as usize)),
        build_config(args)?,
    )
    .with_stop_flag(interrupt_flag());
    install_signal_handlers();

    let report = use_case.execute(&args.output)?;
    log::info!(
        "Wrote {} frames ({} bytes) to {}",
        report.frames_written,
        report.container.file_len,
        args.output.display()
    );
    log::info!(
        "Elapsed {:.2}s, worst frame lag {:.1}ms",
        report.elapsed.as_secs_f64(),
        report.max_lag.as_secs_f64() * 1000.0
    );
    if let RecordingOutcome::Truncated { reason } = &report.outcome {
        log::warn!("Recording truncated: {reason}");
        return Ok(false);
    }
    Ok(true)
}

fn run_inspect(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut reader = AviReader::open(file)?;
    let main = *reader.main_header();
    let stream = *reader.stream_header();
    let format = *reader.format();

    println!("{}", file.display());
    println!("  file size:    {} bytes (RIFF {})", reader.file_len(), reader.riff_size());
    println!(
        "  video:        {}x{} {} @ {}/{} fps",
        format.width,
        format.height,
        fourcc_str(&stream.handler),
        stream.rate,
        stream.scale
    );
    println!("  frame time:   {} us", main.micros_per_frame);
    println!("  total frames: {} (stream length {})", main.total_frames, stream.length);
    println!("  movi:         {} bytes at {}", reader.movi_size(), reader.movi_list_start());

    let index = reader.index();
    if !index.is_empty() {
        let sizes: Vec<u32> = index.iter().map(|e| e.size).collect();
        let total: u64 = sizes.iter().map(|&s| s as u64).sum();
        println!(
            "  index:        {} entries, frame size min {} / avg {} / max {} bytes",
            index.len(),
            sizes.iter().min().copied().unwrap_or(0),
            total / index.len() as u64,
            sizes.iter().max().copied().unwrap_or(0)
        );
    } else {
        println!("  index:        empty");
    }

    let problems = reader.verify()?;
    if problems.is_empty() {
        println!("  structure:    ok");
        return Ok(());
    }
    for problem in &problems {
        println!("  problem:      {problem}");
    }
    Err(format!("{} structural problem(s) in {}", problems.len(), file.display()).into())
}

fn build_source(args: &RecordArgs) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    if args.source == "pattern" {
        log::info!("Source: test pattern {}x{}", args.width, args.height);
        return Ok(Box::new(TestPatternSource::new(args.width, args.height)));
    }
    let dir = Path::new(&args.source);
    let source = ImageSequenceSource::open(dir)?;
    log::info!("Source: {} images from {}", source.len(), dir.display());
    Ok(Box::new(source))
}

fn build_config(args: &RecordArgs) -> Result<RecordingConfig, Box<dyn std::error::Error>> {
    let mut config = RecordingConfig::default()
        .with_fps(args.fps)
        .with_encode_failure(parse_encode_failure(&args.on_encode_error));
    if let Some(frames) = args.max_frames {
        config = config.with_max_frames(frames);
    }
    match args.duration {
        Some(seconds) => config = config.with_max_duration(parse_duration(seconds)?),
        None if args.max_frames.is_none() => {
            config = config.with_max_duration(Duration::from_secs(DEFAULT_RECORD_SECONDS))
        }
        None => {}
    }
    Ok(config)
}

fn parse_duration(seconds: f64) -> Result<Duration, Box<dyn std::error::Error>> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(format!("Duration must be a positive number of seconds, got {seconds}").into());
    }
    Duration::try_from_secs_f64(seconds)
        .map_err(|_| format!("Duration is out of range, got {seconds}").into())
}

fn validate(args: &RecordArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.fps == 0 {
        return Err("FPS must be at least 1".into());
    }
    if let Some(seconds) = args.duration {
        parse_duration(seconds)?;
    }
    if !(1..=100).contains(&args.quality) {
        return Err(format!("Quality must be between 1 and 100, got {}", args.quality).into());
    }
    if args.on_encode_error != "abort" && args.on_encode_error != "truncate" {
        return Err(format!(
            "On-encode-error must be 'abort' or 'truncate', got '{}'",
            args.on_encode_error
        )
        .into());
    }
    if args.source == "pattern" {
        if args.width == 0 || args.height == 0 {
            return Err(format!(
                "Pattern size must be positive, got {}x{}",
                args.width, args.height
            )
            .into());
        }
    } else if !Path::new(&args.source).is_dir() {
        return Err(format!("Source directory not found: {}", args.source).into());
    }
    if args.output.is_dir() {
        return Err(format!("Output is a directory: {}", args.output.display()).into());
    }
    Ok(())
}

fn parse_encode_failure(policy: &str) -> EncodeFailurePolicy {
    if policy == "truncate" {
        EncodeFailurePolicy::FinalizeTruncated
    } else {
        EncodeFailurePolicy::Abort
    }
}

/// Stop flag shared by the running recording and the signal handler.
static INTERRUPT: OnceLock<Arc<AtomicBool>> = OnceLock::new();

fn interrupt_flag() -> Arc<AtomicBool> {
    INTERRUPT
        .get_or_init(|| Arc::new(AtomicBool::new(false)))
        .clone()
}

#[cfg(unix)]
extern "C" fn on_signal(_sig: libc::c_int) {
    if let Some(flag) = INTERRUPT.get() {
        flag.store(true, Ordering::SeqCst);
    }
}

/// SIGINT/SIGTERM stop the recording after the current frame so the file
/// still gets finalized.
#[cfg(unix)]
fn install_signal_handlers() {
    unsafe {
        libc::signal(libc::SIGINT, on_signal as libc::sighandler_t);
        libc::signal(libc::SIGTERM, on_signal as libc::sighandler_t);
    }
}

#[cfg(not(unix))]
fn install_signal_handlers() {}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_args(extra: &[&str]) -> RecordArgs {
        let mut argv = vec!["screenreel", "record", "out.avi"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Command::Record(args) => args,
            Command::Inspect { .. } => unreachable!(),
        }
    }

    #[test]
    fn test_defaults_record_ten_seconds() {
        let args = record_args(&[]);
        assert!(validate(&args).is_ok());
        let config = build_config(&args).unwrap();
        assert_eq!(config.fps, DEFAULT_FPS);
        assert_eq!(config.max_duration, Some(Duration::from_secs(DEFAULT_RECORD_SECONDS)));
        assert_eq!(config.max_frames, None);
        assert_eq!(config.encode_failure, EncodeFailurePolicy::Abort);
    }

    #[test]
    fn test_max_frames_alone_drops_default_duration() {
        let config = build_config(&record_args(&["--max-frames", "30"])).unwrap();
        assert_eq!(config.max_frames, Some(30));
        assert_eq!(config.max_duration, None);
    }

    #[test]
    fn test_truncate_policy() {
        let config = build_config(&record_args(&["--on-encode-error", "truncate"])).unwrap();
        assert_eq!(config.encode_failure, EncodeFailurePolicy::FinalizeTruncated);
    }

    #[test]
    fn test_invalid_arguments_are_rejected() {
        assert!(validate(&record_args(&["--fps", "0"])).is_err());
        assert!(validate(&record_args(&["--quality", "0"])).is_err());
        assert!(validate(&record_args(&["--duration", "0"])).is_err());
        assert!(validate(&record_args(&["--on-encode-error", "retry"])).is_err());
        assert!(validate(&record_args(&["--width", "0"])).is_err());
        assert!(validate(&record_args(&["--source", "/nonexistent/frames"])).is_err());
    }

    #[test]
    fn test_record_then_inspect() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("nested").join("clip.avi");
        let mut args = record_args(&["--fps", "50", "--max-frames", "4", "--width", "64", "--height", "48"]);
        args.output = output.clone();

        assert!(run_record(&args).unwrap());
        assert!(output.exists());
        assert!(run_inspect(&output).is_ok());
    }

    #[test]
    fn test_out_of_range_duration_is_an_error() {
        let args = record_args(&["--duration", "1e20"]);
        assert!(validate(&args).is_err());
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn test_fractional_duration() {
        let config = build_config(&record_args(&["--duration", "2.5"])).unwrap();
        assert_eq!(config.max_duration, Some(Duration::from_millis(2500)));
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_sets_shared_stop_flag() {
        let flag = interrupt_flag();
        assert!(Arc::ptr_eq(&flag, &interrupt_flag()));
        on_signal(libc::SIGINT);
        assert!(flag.swap(false, Ordering::SeqCst));
    }

    #[test]
    fn test_inspect_rejects_non_avi() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.avi");
        std::fs::write(&path, b"not an avi file at all").unwrap();
        assert!(run_inspect(&path).is_err());
    }
}
