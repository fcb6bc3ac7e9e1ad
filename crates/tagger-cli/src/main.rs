//! Tagger CLI - drives a stateful tagging sequence on a remote
//! inference server.
//!
//! Usage:
//!     tagger [OPTIONS] [FILE]
//!
//! Reads a conversation (one utterance per line) from FILE, from stdin,
//! or from the built-in demo, then runs it through one remote sequence:
//! start, one inference call per line, stop.
//!
//! Environment Variables:
//!     TRITON_HOST: Inference server host (default: localhost)
//!     TRITON_PORT: Inference server gRPC port (default: 9001)
//!     TAGGER_MODEL: Model name (default: sentence_tagger)

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tagger_client::{
    generate_sequence_id, process_lines, ClientConfig, LineResult, QuestionAnswerClient,
};
use tracing_subscriber::EnvFilter;

/// Sample conversation used with `--demo`.
const DEMO_CONVERSATION: &str = "\
Carlos Alberto: Buenos días Imprenta CSD. En qué le puedo ayudar
Miguel Colina: Hola Me puede comunicar con Enrique López
Carlos Alberto: El señor Lopez no está en su oficina Desea dejar un mensaje
Miguel Colina: Sí me llamo Miguel Colina llamo para confirmar el último pedido que le hice al señor Lopez en el mes de agosto
Carlos Alberto: Tiene el número de pedido
Miguel Colina: Sí es el 25142566598
Carlos Alberto: Cuál es el pedido
Miguel Colina: 500 calendarios para el año que viene con las fotos de los clientes
Carlos Alberto: Bien Enviamos el pedido lo recibirá en los próximos días laborables
Miguel Colina: Me puede dar su número de teléfono
Carlos Alberto: Desea algo más
Miguel Colina: Eso es todo Muchas gracias
";

/// Sentence Tagger - sequence-stateful inference over gRPC
#[derive(Parser, Debug)]
#[command(name = "tagger")]
#[command(about = "Sentence Tagger - sequence-stateful inference over gRPC")]
#[command(after_help = r#"Examples:
    # Tag the built-in demo conversation
    tagger --demo

    # Tag a conversation from a file
    tagger conversation.txt

    # Tag lines piped through stdin
    cat conversation.txt | tagger

    # Point at a different server and model
    tagger --host triton.internal --port 8001 --model qa_tagger --demo

    # Emit machine-readable results
    tagger --demo --json
"#)]
struct Cli {
    /// Inference server host
    #[arg(long, env = "TRITON_HOST", default_value = "localhost")]
    host: String,

    /// Inference server gRPC port
    #[arg(long, env = "TRITON_PORT", default_value = "9001")]
    port: u16,

    /// Model name
    #[arg(long, env = "TAGGER_MODEL", default_value = "sentence_tagger")]
    model: String,

    /// Maximum lines queued for inference at once
    #[arg(long, default_value = "4")]
    concurrency: usize,

    /// Per-call deadline in seconds (0 disables the timeout)
    #[arg(long, default_value = "30")]
    timeout_secs: u64,

    /// Use the built-in demo conversation instead of FILE/stdin
    #[arg(long)]
    demo: bool,

    /// Print results as JSON lines
    #[arg(long)]
    json: bool,

    /// Suppress the header printout
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Conversation file, one utterance per line (stdin if omitted)
    file: Option<PathBuf>,
}

#[derive(Serialize)]
struct JsonLine<'a> {
    line: &'a str,
    answer: Option<&'a str>,
    confidence: Option<f32>,
    error: Option<String>,
}

fn read_conversation(args: &Cli) -> Result<String> {
    if args.demo {
        return Ok(DEMO_CONVERSATION.to_string());
    }
    if let Some(path) = &args.file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("failed to read stdin")?;
    Ok(text)
}

fn print_header(args: &Cli, sequence_id: i64) {
    println!("{}", "=".repeat(50));
    println!("Sentence Tagger - sequence-stateful inference");
    println!("{}", "=".repeat(50));
    println!("Server: {}:{}", args.host, args.port);
    println!("Model: {}", args.model);
    println!("Sequence ID: {}", sequence_id);
    println!("Concurrency: {}", args.concurrency);
    println!("{}", "=".repeat(50));
}

fn print_results(results: &[LineResult], json: bool) {
    let mut failed = 0usize;
    for result in results {
        if json {
            let row = match &result.outcome {
                Ok(p) => JsonLine {
                    line: &result.line,
                    answer: Some(p.answer.as_str()),
                    confidence: Some(p.confidence),
                    error: None,
                },
                Err(e) => JsonLine {
                    line: &result.line,
                    answer: None,
                    confidence: None,
                    error: Some(e.to_string()),
                },
            };
            println!("{}", serde_json::to_string(&row).expect("serializable row"));
        } else {
            match &result.outcome {
                Ok(p) => println!("{}\n  -> {} ({:.2})", result.line, p.answer, p.confidence),
                Err(e) => println!("{}\n  -> failed: {e}", result.line),
            }
        }
        if result.outcome.is_err() {
            failed += 1;
        }
    }
    if !json {
        println!(
            "\nProcessed {} line(s), {} failed.",
            results.len(),
            failed
        );
    }
}

async fn run(client: &QuestionAnswerClient, args: &Cli, conversation: &str) -> Result<()> {
    let start_message = client.start().await?;
    if !args.quiet {
        println!("{start_message}\n");
    }

    let results = process_lines(client, conversation.lines(), args.concurrency).await;
    print_results(&results, args.json);

    let stop_message = client.stop().await?;
    if !args.quiet {
        println!("\n{stop_message}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Cli::parse();

    let conversation = read_conversation(&args)?;

    let timeout = match args.timeout_secs {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };
    let config =
        ClientConfig::new(&args.host, args.port, &args.model).with_request_timeout(timeout);

    let sequence_id = generate_sequence_id();
    if !args.quiet {
        print_header(&args, sequence_id);
    }

    let client = QuestionAnswerClient::connect(config, sequence_id)
        .await
        .with_context(|| format!("cannot reach {}:{}", args.host, args.port))?;

    let outcome = run(&client, &args, &conversation).await;
    client.close().await;
    outcome
}
