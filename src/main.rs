#![warn(
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_qualifications
)]
#![allow(clippy::enum_variant_names, clippy::type_complexity)]

use std::process::ExitCode;

mod cli;
mod convert;
mod git;
mod make_meta;
mod params_file;
mod prcs;
mod term_out;
mod user_map;

use term_out::ProgressPrint;

type FHashMap<K, V> = std::collections::HashMap<K, V, foldhash::fast::RandomState>;

enum RunError {
    Generic,
    Usage,
}

fn main() -> ExitCode {
    match main_inner() {
        Ok(()) => ExitCode::SUCCESS,
        Err(RunError::Generic) => ExitCode::from(1),
        Err(RunError::Usage) => ExitCode::from(2),
    }
}

fn main_inner() -> Result<(), RunError> {
    let start = std::time::Instant::now();

    let args = match <cli::Cli as clap::Parser>::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // --help and --version are not errors
            let usage_error = e.use_stderr();
            let _ = e.print();
            return if usage_error {
                Err(RunError::Usage)
            } else {
                Ok(())
            };
        }
    };

    let term_out = term_out::init(start, !args.no_progress);
    let progress_print = term_out.get_progress_print();

    let r = run(&args, &progress_print);

    drop(progress_print);
    term_out.finish();

    r
}

fn run(args: &cli::Cli, progress_print: &ProgressPrint) -> Result<(), RunError> {
    if let Err(e) = init_logger(args, progress_print.clone()) {
        eprintln!("failed to initialize logging: {e}");
        return Err(RunError::Generic);
    }

    let params = match args.conv_params {
        None => params_file::ConvParams::default(),
        Some(ref conv_params) => {
            let params_raw = std::fs::read_to_string(conv_params).map_err(|e| {
                tracing::error!("failed to read {conv_params:?}: {e}");
                RunError::Generic
            })?;
            toml::from_str(&params_raw).map_err(|e| {
                tracing::error!("failed to parse {conv_params:?}: {e}");
                RunError::Generic
            })?
        }
    };

    let options = convert::Options::new(convert::InitOptions {
        trunk_branch: params.trunk_branch,
    });
    options.validate().map_err(|_| RunError::Generic)?;

    let user_map = match params.user_map_file {
        None => user_map::UserMap::new(),
        Some(user_map_path) => {
            let user_map_path = match args.conv_params {
                Some(ref conv_params) if user_map_path.is_relative() => {
                    let conv_params_path_parent = conv_params.parent().ok_or_else(|| {
                        tracing::error!("invalid parameters file path: {conv_params:?}");
                        RunError::Generic
                    })?;
                    conv_params_path_parent.join(user_map_path)
                }
                _ => user_map_path,
            };

            let user_map_file = std::fs::OpenOptions::new()
                .read(true)
                .open(&user_map_path)
                .map_err(|e| {
                    tracing::error!("failed to open user map {user_map_path:?}: {e}");
                    RunError::Generic
                })?;

            user_map::UserMap::parse(&mut std::io::BufReader::new(user_map_file)).map_err(|e| {
                tracing::error!("failed to read user map {user_map_path:?}: {e}");
                RunError::Generic
            })?
        }
    };

    let user_fallback_template = params
        .user_fallback_template
        .as_deref()
        .unwrap_or("{{ prcs_author }} <{{ prcs_author }}>");
    let commit_msg_template = params
        .commit_msg_template
        .as_deref()
        .unwrap_or("{{ prcs_log }}");

    let meta_maker =
        make_meta::GitMetaMaker::new(&user_map, user_fallback_template, commit_msg_template)
            .map_err(|e| {
                tracing::error!("{e}");
                RunError::Generic
            })?;

    convert::convert(
        progress_print,
        &options,
        &meta_maker,
        &args.project,
        &args.prcs,
        &args.dest,
    )
    .map_err(|_| RunError::Generic)
}

/// Stderr gets `--stderr-log-level` (warn, or info with `--verbose`) and
/// goes through the progress printer. The optional log file defaults to
/// debug.
fn init_logger(args: &cli::Cli, progress_print: ProgressPrint) -> Result<(), std::io::Error> {
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::layer::{Layer as _, SubscriberExt as _};
    use tracing_subscriber::util::SubscriberInitExt as _;

    let stderr_level = match args.stderr_log_level {
        Some(level) => level,
        None if args.verbose => cli::LogLevel::Info,
        None => cli::LogLevel::Warn,
    };
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .with_writer(move || LogLine::new(progress_print.clone()))
        .with_filter(LevelFilter::from_level(stderr_level.to_tracing_level()));

    let file_layer = match args.log_file {
        Some(ref path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            let level = args
                .file_log_level
                .map_or(tracing::Level::DEBUG, cli::LogLevel::to_tracing_level);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(file)
                    .with_filter(LevelFilter::from_level(level)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}

/// Collects one formatted event and sends it to the progress printer as a
/// single line when dropped.
struct LogLine {
    progress_print: ProgressPrint,
    buf: Vec<u8>,
}

impl LogLine {
    fn new(progress_print: ProgressPrint) -> Self {
        Self {
            progress_print,
            buf: Vec::new(),
        }
    }
}

impl Drop for LogLine {
    fn drop(&mut self) {
        if !self.buf.is_empty() {
            self.progress_print
                .print_raw_line(std::mem::take(&mut self.buf));
        }
    }
}

impl std::io::Write for LogLine {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
