use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use agentic_rag::core::config::{AppPaths, ConfigService};
use agentic_rag::state::AppState;
use agentic_rag::{logging, server};

#[derive(Parser)]
#[command(name = "agentic-rag", version, about = "Research assistant for materials-science literature")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a PDF file or a directory of PDFs into the vector store.
    Ingest {
        /// PDF file or directory (defaults to the configured data/pdfs).
        path: Option<PathBuf>,
        /// Skip Composition-Process-Property extraction (much faster).
        #[arg(long)]
        no_cpp: bool,
        /// Clear the vector store before ingesting.
        #[arg(long)]
        recreate: bool,
    },
    /// Ask a single question and print the answer.
    Ask {
        question: String,
        /// Also print the tool calls the agent made.
        #[arg(long)]
        show_steps: bool,
    },
    /// Interactive chat session.
    Chat,
    /// Run the HTTP API server.
    Serve {
        /// Override the configured port.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the effective configuration with secrets redacted.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    match cli.command {
        Command::Ingest {
            path,
            no_cpp,
            recreate,
        } => {
            let state = AppState::initialize(paths.clone())
                .await
                .context("failed to initialize")?;
            let path = path.unwrap_or_else(|| paths.default_pdf_dir.clone());

            let pipeline = state.ingest_pipeline();
            let mut options = pipeline.default_options();
            if no_cpp {
                options.extract_cpp = false;
            }
            options.recreate = recreate;

            let report = pipeline
                .run(&path, &options)
                .await
                .with_context(|| format!("ingestion of {} failed", path.display()))?;

            println!(
                "Ingested {} pages into {} chunks ({} stored).",
                report.pages, report.chunks, report.stored
            );
            if report.extraction_failures > 0 {
                println!(
                    "Warning: C-P-P extraction fell back to defaults for {} chunks.",
                    report.extraction_failures
                );
            }
        }
        Command::Ask {
            question,
            show_steps,
        } => {
            let state = AppState::initialize(paths)
                .await
                .context("failed to initialize")?;
            let outcome = state.agent().run(&question).await.context("agent failed")?;

            if show_steps {
                print_steps(&outcome.steps);
            }
            println!("{}", outcome.output);
        }
        Command::Chat => {
            let state = AppState::initialize(paths)
                .await
                .context("failed to initialize")?;
            run_chat(state).await?;
        }
        Command::Serve { port } => {
            let state = AppState::initialize(paths)
                .await
                .context("failed to initialize")?;
            server::serve(state, port).await.context("server failed")?;
        }
        Command::Config => {
            let service = ConfigService::new(paths);
            let config = service.load_config().context("failed to load config")?;
            let redacted = service.redact_sensitive_values(&config);
            println!("{}", serde_yaml::to_string(&redacted)?);
        }
    }

    Ok(())
}

async fn run_chat(state: Arc<AppState>) -> anyhow::Result<()> {
    let chunk_count = state.store.count().await.unwrap_or(0);
    println!(
        "Materials research assistant (model: {}, {} chunks indexed).",
        state.model_name, chunk_count
    );
    println!("Type a question, or 'exit' to leave.");

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "exit" | "quit" | "q") {
            break;
        }

        match state.agent().run(input).await {
            Ok(outcome) => println!("\n{}\n", outcome.output),
            Err(err) => eprintln!("Error: {}", err),
        }
    }

    println!("Bye.");
    Ok(())
}

fn print_steps(steps: &[agentic_rag::agent::AgentStep]) {
    for (index, step) in steps.iter().enumerate() {
        println!("--- step {} ---", index + 1);
        if let Some(thought) = &step.thought {
            println!("Thought: {}", thought);
        }
        println!("Action: {}", step.tool);
        println!("Action Input: {}", step.input);
        println!("Observation: {}", step.observation);
    }
    if !steps.is_empty() {
        println!("---");
    }
}
