//! CLI entry point for `tnefkit`.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use humansize::{format_size, BINARY};

use tnefkit::config::{self, Config};
use tnefkit::model::property::PR_MESSAGE_DELIVERY_TIME;
use tnefkit::model::{AttachMethod, Message};
use tnefkit::{export, inspect, Decoder, TnefError};

#[derive(Parser)]
#[command(
    name = "tnefkit",
    version,
    about = "Inspect and extract TNEF (winmail.dat) attachments"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to $TNEFKIT_CONFIG or the user config dir)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize the message, its bodies and attachments
    Show {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Write bodies and attachments to a directory
    Extract {
        path: PathBuf,
        /// Output directory (defaults to [export] output_dir, then ".")
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Leave cid: references in HTML bodies untouched
        #[arg(long)]
        keep_cid: bool,
    },
    /// Dump the raw record and property structure
    Inspect {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Print one message body to stdout
    Body {
        path: PathBuf,
        #[arg(short, long, value_enum, default_value_t = BodyFormat::Auto)]
        format: BodyFormat,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BodyFormat {
    /// Best available: HTML, then plain text, then RTF
    Auto,
    Text,
    Html,
    Rtf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match cli.config {
        Some(ref path) => config::load_config_from(path)?,
        None => config::load_config(),
    };

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    let decoder = Decoder::new(config.decoder.options());

    match cli.command {
        Commands::Show { path, json } => cmd_show(&decoder, &path, json),
        Commands::Extract {
            path,
            output,
            keep_cid,
        } => cmd_extract(&decoder, &config, &path, output, keep_cid),
        Commands::Inspect { path, json } => cmd_inspect(&path, json),
        Commands::Body { path, format } => cmd_body(&decoder, &path, format),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_path = config::log_file_path(config);
    let log_dir = log_path.parent().map(Path::to_path_buf).unwrap_or_default();
    let log_name = log_path.file_name().map(|n| n.to_os_string());
    if let (Some(log_name), Ok(())) = (log_name, std::fs::create_dir_all(&log_dir)) {
        let file_appender = tracing_appender::rolling::never(&log_dir, log_name);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Read `path` and reject anything without the TNEF signature.
fn read_tnef(path: &Path) -> anyhow::Result<Vec<u8>> {
    if !path.exists() {
        return Err(TnefError::FileNotFound(path.to_path_buf()).into());
    }
    let data = std::fs::read(path).map_err(|e| TnefError::io(path, e))?;
    if !tnefkit::is_tnef(&data) {
        anyhow::bail!("{}: not a TNEF file", path.display());
    }
    Ok(data)
}

fn decode_path(decoder: &Decoder, path: &Path) -> anyhow::Result<Message> {
    let data = read_tnef(path)?;
    Ok(decoder.decode(&data)?)
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "tnefkit", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::stdout().write_all(&buf)?;
    Ok(())
}

fn cmd_show(decoder: &Decoder, path: &Path, json: bool) -> anyhow::Result<()> {
    let msg = decode_path(decoder, path)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&message_json(&msg)?)?);
        return Ok(());
    }

    println!();
    println!("  {:<13}{}", "File:", path.display());
    println!("  {}", "-".repeat(60));
    print_message(&msg, "  ");
    println!();
    Ok(())
}

fn cmd_extract(
    decoder: &Decoder,
    config: &Config,
    path: &Path,
    output: Option<PathBuf>,
    keep_cid: bool,
) -> anyhow::Result<()> {
    let mut msg = decode_path(decoder, path)?;

    let output = output
        .or_else(|| config.export.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let mut options = config.export.options();
    if keep_cid {
        options.resolve_content_ids = false;
    }

    let files = export::collect_files(&mut msg, &options);
    if files.is_empty() {
        println!("  Nothing to extract.");
        return Ok(());
    }

    let paths = export::write_files(&files, &output)?;
    for (file, written) in files.iter().zip(&paths) {
        println!(
            "  {:>10}  {}",
            format_size(file.size(), BINARY),
            written.display()
        );
    }
    println!(
        "  Extracted {} file(s) to {}",
        paths.len(),
        output.display()
    );
    Ok(())
}

fn cmd_inspect(path: &Path, json: bool) -> anyhow::Result<()> {
    let data = read_tnef(path)?;
    let result = inspect::inspect(&data)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("TNEF file: {} ({} bytes)\n", path.display(), result.size);
        print!("{}", inspect::render(&result));
    }
    Ok(())
}

fn cmd_body(decoder: &Decoder, path: &Path, format: BodyFormat) -> anyhow::Result<()> {
    let msg = decode_path(decoder, path)?;
    let body: &[u8] = match format {
        BodyFormat::Text => &msg.body,
        BodyFormat::Html if !msg.body_html.is_empty() => &msg.body_html,
        BodyFormat::Html => &msg.body_rtf_html,
        BodyFormat::Rtf => &msg.body_rtf,
        BodyFormat::Auto => [&msg.body_html, &msg.body_rtf_html, &msg.body, &msg.body_rtf]
            .into_iter()
            .find(|b| !b.is_empty())
            .map(Vec::as_slice)
            .unwrap_or_default(),
    };
    if body.is_empty() {
        anyhow::bail!("{}: no matching body", path.display());
    }
    std::io::stdout().write_all(body)?;
    Ok(())
}

fn method_label(method: AttachMethod) -> String {
    match method {
        AttachMethod::ByValue => "file".to_string(),
        AttachMethod::EmbeddedMessage => "embedded message".to_string(),
        AttachMethod::Ole => "OLE object".to_string(),
        AttachMethod::None => "unspecified".to_string(),
        AttachMethod::Other(m) => format!("method={m}"),
    }
}

/// Print a message and its attachments, recursing into embedded messages.
fn print_message(msg: &Message, indent: &str) {
    let delivered = msg
        .property(PR_MESSAGE_DELIVERY_TIME)
        .and_then(|p| p.as_filetime())
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_default();

    let fields = [
        ("Subject", msg.subject()),
        ("From", msg.sender_name()),
        ("From Email", msg.sender_email()),
        ("To", msg.display_to()),
        ("CC", msg.display_cc()),
        ("Delivered", delivered),
    ];
    for (label, value) in &fields {
        if !value.is_empty() {
            println!("{indent}{:<13}{value}", format!("{label}:"));
        }
    }

    if !msg.body.is_empty() {
        println!(
            "{indent}{:<13}Plain text ({})",
            "Body:",
            format_size(msg.body.len(), BINARY)
        );
    }
    if !msg.body_html.is_empty() {
        println!(
            "{indent}{:<13}Yes ({})",
            "Body HTML:",
            format_size(msg.body_html.len(), BINARY)
        );
    }
    if !msg.body_rtf.is_empty() {
        let rtf = format_size(msg.body_rtf.len(), BINARY);
        if msg.body_rtf_html.is_empty() {
            println!("{indent}{:<13}Yes ({rtf})", "Body RTF:");
        } else {
            println!(
                "{indent}{:<13}Yes ({rtf}, encapsulated HTML: {})",
                "Body RTF:",
                format_size(msg.body_rtf_html.len(), BINARY)
            );
        }
    }

    if msg.attachments.is_empty() {
        println!("{indent}{:<13}None", "Attachments:");
        return;
    }
    println!("{indent}{:<13}{} item(s)", "Attachments:", msg.attachments.len());
    for (i, att) in msg.attachments.iter().enumerate() {
        let name: String = att.filename().chars().take(36).collect();
        println!(
            "{indent}  {:>2}. {:<36} {:>10}  [{}]",
            i + 1,
            name,
            format_size(att.size(), BINARY),
            method_label(att.method)
        );
        if let Some(inner) = att.embedded_message() {
            println!("{indent}      Embedded message:");
            print_message(inner, &format!("{indent}        "));
        }
    }
}

/// JSON summary of a message tree: the serialized model with headline
/// fields added at the top level.
fn message_json(msg: &Message) -> anyhow::Result<serde_json::Value> {
    let mut value = serde_json::to_value(msg)?;
    if let Some(obj) = value.as_object_mut() {
        let delivered = msg
            .property(PR_MESSAGE_DELIVERY_TIME)
            .and_then(|p| p.as_filetime())
            .map(|t| t.to_rfc3339());
        obj.insert("subject".into(), msg.subject().into());
        obj.insert("sender_name".into(), msg.sender_name().into());
        obj.insert("sender_email".into(), msg.sender_email().into());
        obj.insert("to".into(), msg.display_to().into());
        obj.insert("cc".into(), msg.display_cc().into());
        obj.insert("delivery_time".into(), delivered.into());
    }
    Ok(value)
}
