use clap::Parser;
use deep_research::{
    Chunk, Credentials, EmailSettings, Error, PipelineConfig, ResearchManager, Result,
};
use futures::StreamExt;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Research a topic on the web and email yourself a report.
#[derive(Parser, Debug)]
#[command(name = "deep-research", version)]
struct Cli {
    /// Topic to research (prompted for when omitted)
    query: Option<String>,

    /// Number of web searches to plan
    #[arg(long)]
    searches: Option<usize>,

    /// Model used by every stage
    #[arg(long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Values in .env take precedence over the inherited environment
    let _ = dotenvy::dotenv_override();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("deep_research=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let credentials = Credentials::from_env()?;
    let email = EmailSettings::from_env()?;

    let mut config = PipelineConfig::from_env()?;
    if let Some(n) = cli.searches {
        config = config.searches(n)?;
    }
    if let Some(model) = cli.model {
        config.model = model;
    }

    let query = match cli.query {
        Some(query) => query,
        None => prompt_query()?,
    };

    let manager = ResearchManager::from_credentials(&credentials, email, &config)?;
    let mut stream = manager.run(query);

    let mut reported = false;
    while let Some(chunk) = stream.next().await {
        match chunk? {
            Chunk::Status(status) => eprintln!("{}", status),
            Chunk::Report(report) => {
                println!("{}", report);
                reported = true;
            }
        }
    }

    if !reported {
        return Err(Error::EmptyResponse("research run".to_string()));
    }
    Ok(())
}

fn prompt_query() -> Result<String> {
    eprint!("What topic would you like to research? ");
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
