//! prettify-relay forwards text or code to a generative language model with a
//! fixed instructional prompt and returns the model's structured JSON output.
//!
//! The tool has three commands:
//! 1. `serve` - Runs the HTTP relay with blocking and streaming endpoints
//! 2. `prettify` - Prettifies a single file or stdin from the command line
//! 3. `extract` - Pulls the `output` field out of a (possibly truncated) model response

use std::io::Read;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use env_logger::Builder;
use log::{LevelFilter, debug, error, info};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

use prettify_relay::{
    ModelConfig, Prettifier, RelayConfig,
    constants::{
        API_KEY_ENV_NAME, BIND_ENV_NAME, DEFAULT_BIND_ADDRESS, DEFAULT_MODEL_URL, MODEL_ENV_NAME,
        PROMPT_FILE_ENV_NAME, RPM_ENV_NAME,
    },
    extract_output, server,
};

/// HTTP relay that prettifies text and code through a generative language model
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The command to execute (serve, prettify or extract)
    #[command(subcommand)]
    command: Command,

    #[arg(long, short, action = clap::ArgAction::Count, help = "Output v(v...)erbosity: error (0), warn (1), info (2), debug (3), trace (4)", global = true, default_value_t = 2)]
    verbose: u8,
}

/// Settings for reaching the model, shared by the commands that call it.
#[derive(Args)]
struct RelayArgs {
    /// API key of the model provider
    #[arg(long, env = API_KEY_ENV_NAME, hide_env_values = true)]
    api_key: Option<String>,
    /// Path to the prompt template file containing the {input} marker
    #[arg(long, short = 'p', env = PROMPT_FILE_ENV_NAME)]
    prompt_file: PathBuf,
    /// URL of the LLM model to use, e.g. google://gemini-2.0-flash
    #[arg(long, short, env = MODEL_ENV_NAME, default_value = DEFAULT_MODEL_URL)]
    model: String,
    /// Rate limit: upstream requests per minute (default: no limit)
    #[arg(long, short = 'r', env = RPM_ENV_NAME)]
    rpm: Option<u32>,
}

impl From<RelayArgs> for RelayConfig {
    fn from(args: RelayArgs) -> Self {
        RelayConfig {
            model: ModelConfig {
                model_url: args.model,
                api_key: args.api_key.unwrap_or_default(),
            },
            prompt_file: args.prompt_file,
            rpm: args.rpm,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP relay until interrupted
    Serve {
        #[command(flatten)]
        relay: RelayArgs,
        /// Address to listen on
        #[arg(long, short, env = BIND_ENV_NAME, default_value = DEFAULT_BIND_ADDRESS)]
        bind: SocketAddr,
    },
    /// Prettify a file (or stdin) once and print the model output
    Prettify {
        #[command(flatten)]
        relay: RelayArgs,
        /// File to prettify, stdin when omitted
        file: Option<PathBuf>,
        /// Print the output as it streams in
        #[arg(long, short)]
        stream: bool,
    },
    /// Print the output field of a model response read from a file (or stdin)
    Extract {
        /// File with the model response, stdin when omitted
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    Builder::new()
        .filter_level(match cli.verbose {
            0 => LevelFilter::Error,
            1 => LevelFilter::Warn,
            2 => LevelFilter::Info,
            3 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        })
        .init();

    match cli.command {
        Command::Serve { relay, bind } => handle_serve_command(relay, bind).await,
        Command::Prettify {
            relay,
            file,
            stream,
        } => handle_prettify_command(relay, file, stream).await,
        Command::Extract { file } => handle_extract_command(file),
    }
}

async fn handle_serve_command(relay: RelayArgs, bind: SocketAddr) -> Result<()> {
    let prettifier = RelayConfig::from(relay).build_prettifier()?;
    let listener = TcpListener::bind(bind)
        .await
        .context(format!("Failed to bind {bind}"))?;

    server::serve(listener, prettifier, shutdown_signal()).await
}

async fn handle_prettify_command(
    relay: RelayArgs,
    file: Option<PathBuf>,
    stream: bool,
) -> Result<()> {
    let prettifier = RelayConfig::from(relay).build_prettifier()?;
    let input = read_input(file)?;

    if stream {
        return print_stream(&prettifier, &input).await;
    }

    let output = prettifier.prettify(&input).await;
    println!("{output}");
    Ok(())
}

async fn print_stream(prettifier: &Prettifier, input: &str) -> Result<()> {
    let mut chunks = prettifier.prettify_stream(input);
    let mut stdout = tokio::io::stdout();
    let cancel = tokio::signal::ctrl_c();
    tokio::pin!(cancel);

    loop {
        tokio::select! {
            chunk = chunks.next_chunk() => match chunk {
                Some(chunk) => {
                    stdout.write_all(chunk.as_bytes()).await?;
                    stdout.flush().await?;
                }
                None => break,
            },
            _ = &mut cancel => {
                info!("Stream cancelled");
                break;
            }
        }
    }

    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}

fn handle_extract_command(file: Option<PathBuf>) -> Result<()> {
    let text = read_input(file)?;
    let output = extract_output(&text).context("No output field found in the response")?;
    println!("{output}");
    Ok(())
}

fn read_input(file: Option<PathBuf>) -> Result<String> {
    match file {
        Some(file) => std::fs::read_to_string(&file)
            .context(format!("Failed to read input file: {}", file.display())),
        None => {
            debug!("Reading input from stdin");
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read stdin")?;
            Ok(input)
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested, draining in-flight requests");
}
