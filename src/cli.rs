use std::path::PathBuf;

#[derive(clap::Parser)]
#[command(about = "Converts the history of a PRCS project into a git repository")]
pub(crate) struct Cli {
    #[arg(value_name = "PROJECT", help = "Name of the PRCS project to convert")]
    pub(crate) project: String,
    #[arg(
        long = "verbose",
        short = 'v',
        help = "Print progress information to stderr (same as --stderr-log-level info)"
    )]
    pub(crate) verbose: bool,
    #[arg(
        long = "stderr-log-level",
        value_name = "LEVEL",
        value_enum,
        conflicts_with = "verbose",
        help = "Maximum stderr log level (warn by default)"
    )]
    pub(crate) stderr_log_level: Option<LogLevel>,
    #[arg(
        long = "log-file",
        value_name = "PATH",
        help = "File to write logs (besides stderr)"
    )]
    pub(crate) log_file: Option<PathBuf>,
    #[arg(
        long = "file-log-level",
        value_name = "LEVEL",
        value_enum,
        help = "Maximum file log level (debug by default)"
    )]
    pub(crate) file_log_level: Option<LogLevel>,
    #[arg(long = "no-progress", help = "Do not print progress")]
    pub(crate) no_progress: bool,
    #[arg(
        long = "dest",
        short = 'd',
        value_name = "PATH",
        default_value = ".",
        help = "Git work tree to convert into, created if it does not exist"
    )]
    pub(crate) dest: PathBuf,
    #[arg(
        long = "prcs",
        value_name = "PATH",
        default_value = "prcs",
        help = "PRCS executable"
    )]
    pub(crate) prcs: PathBuf,
    #[arg(
        long = "conv-params",
        short = 'P',
        value_name = "FILE",
        help = "Conversion parameters"
    )]
    pub(crate) conv_params: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogLevel {
    #[value(name = "error")]
    Error,
    #[value(name = "warn")]
    Warn,
    #[value(name = "info")]
    Info,
    #[value(name = "debug")]
    Debug,
    #[value(name = "trace")]
    Trace,
}

impl LogLevel {
    pub(crate) fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Error => tracing::Level::ERROR,
            Self::Warn => tracing::Level::WARN,
            Self::Info => tracing::Level::INFO,
            Self::Debug => tracing::Level::DEBUG,
            Self::Trace => tracing::Level::TRACE,
        }
    }
}
