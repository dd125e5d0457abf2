//! chatdown - saved chat conversations to markdown transcripts

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, ValueEnum};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use chatdown::{Converter, RenderConfig, SignatureRules};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Labelled markdown transcript
    Markdown,
    /// Structured transcript as JSON
    Json,
}

#[derive(Parser)]
#[command(name = "chatdown")]
#[command(version, about = "Convert a saved chat conversation page to markdown", long_about = None)]
#[command(after_help = "EXAMPLES:
    chatdown chat.html                    Print the transcript
    chatdown chat.html -o chat.md         Write the transcript to a file
    chatdown chat.html --format json      Print blocks as JSON
    chatdown chat.html --rules mine.json  Use custom boundary markers")]
struct Cli {
    /// Saved HTML page
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Character encoding label, overriding the page's declaration
    #[arg(long, value_name = "LABEL")]
    encoding: Option<String>,

    /// JSON file with boundary and noise rules
    #[arg(long, value_name = "FILE")]
    rules: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Markdown)]
    format: Format,

    /// Label for user messages
    #[arg(long, value_name = "LABEL")]
    user_label: Option<String>,

    /// Label for assistant messages
    #[arg(long, value_name = "LABEL")]
    assistant_label: Option<String>,

    /// Prefix message lines with "> "
    #[arg(long)]
    quote: bool,

    /// Succeed with empty output when no turns are found
    #[arg(long)]
    allow_empty: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let default = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "warn,chatdown=debug",
        (false, _) => "warn,chatdown=trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn run(cli: &Cli) -> Result<(), String> {
    let bytes = fs::read(&cli.input).map_err(|e| format!("{}: {e}", cli.input.display()))?;

    let converter = Converter::new()
        .with_rules(load_rules(cli)?)
        .with_render_config(render_config(cli));

    let conversion = converter
        .convert(&bytes, cli.encoding.as_deref())
        .map_err(|e| e.to_string())?;
    if !cli.allow_empty {
        conversion.ensure_turns().map_err(|e| e.to_string())?;
    }
    tracing::info!(
        turns = conversion.transcript.len(),
        skipped = conversion.extraction.skipped_leading + conversion.extraction.skipped_outside,
        encoding = conversion.encoding,
        parse_errors = conversion.parse_errors,
        "converted {}",
        cli.input.display()
    );

    let mut output = match cli.format {
        Format::Markdown => conversion.text,
        Format::Json => {
            serde_json::to_string_pretty(&conversion.transcript).map_err(|e| e.to_string())?
        }
    };
    if !output.is_empty() {
        output.push('\n');
    }

    match &cli.output {
        Some(path) => {
            fs::write(path, output).map_err(|e| format!("{}: {e}", path.display()))?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(output.as_bytes())
                .and_then(|()| stdout.flush())
                .map_err(|e| e.to_string())?;
        }
    }

    Ok(())
}

fn load_rules(cli: &Cli) -> Result<SignatureRules, String> {
    let Some(path) = &cli.rules else {
        return Ok(SignatureRules::default());
    };
    let json = fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
    SignatureRules::from_json(&json).map_err(|e| format!("{}: {e}", path.display()))
}

fn render_config(cli: &Cli) -> RenderConfig {
    let mut config = RenderConfig::default();
    if let Some(label) = &cli.user_label {
        config = config.with_user_label(label);
    }
    if let Some(label) = &cli.assistant_label {
        config = config.with_assistant_label(label);
    }
    if cli.quote {
        config = config.quoted();
    }
    config
}
