use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use codingbot_assistant::client::DEFAULT_BASE_URL;
use codingbot_assistant::config::{
    WorkflowConfig, DEFAULT_ASSISTANT_NAME, DEFAULT_INSTRUCTIONS, DEFAULT_MAX_POLLS, DEFAULT_MODEL,
    DEFAULT_POLL_INTERVAL_SECS,
};
use codingbot_assistant::workflow::Workflow;

/// Have a code-interpreter assistant work on a local file and download
/// whatever it generates.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Local file the assistant should work on.
    #[arg(long, env = "CODINGBOT_INPUT_FILE")]
    input_file: PathBuf,

    /// Query seeded as the first user message of the thread.
    #[arg(long, env = "CODINGBOT_QUERY")]
    query: String,

    /// Display name for the assistant.
    #[arg(long, env = "CODINGBOT_ASSISTANT_NAME", default_value = DEFAULT_ASSISTANT_NAME)]
    assistant_name: String,

    /// System instructions for the assistant.
    #[arg(long, env = "CODINGBOT_INSTRUCTIONS", default_value = DEFAULT_INSTRUCTIONS)]
    instructions: String,

    /// Model the assistant runs on.
    #[arg(long, env = "CODINGBOT_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Service base URL.
    #[arg(long, env = "CODINGBOT_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Where to write a generated image, if the run produces one.
    #[arg(long, env = "CODINGBOT_IMAGE_OUTPUT", default_value = "output.png")]
    image_output: PathBuf,

    /// Where to write a generated code file, if the run produces one.
    #[arg(long, env = "CODINGBOT_CODE_OUTPUT", default_value = "output.py")]
    code_output: PathBuf,

    /// Seconds to wait between run status checks.
    #[arg(long, env = "CODINGBOT_POLL_INTERVAL_SECS", default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    poll_interval_secs: u64,

    /// Status checks to allow before giving up on the run.
    #[arg(long, env = "CODINGBOT_MAX_POLLS", default_value_t = DEFAULT_MAX_POLLS)]
    max_polls: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| "OPENAI_API_KEY is not set")?;

    let config = WorkflowConfig {
        api_key,
        base_url: args.base_url,
        input_file: args.input_file,
        query: args.query,
        assistant_name: args.assistant_name,
        instructions: args.instructions,
        model: args.model,
        image_output: args.image_output,
        code_output: args.code_output,
        poll_interval: Duration::from_secs(args.poll_interval_secs),
        max_polls: args.max_polls,
    };
    config.validate()?;

    let report = Workflow::new(config).run().await?;
    if let Some(path) = &report.image {
        tracing::info!(path = %path.display(), "image artifact saved");
    }
    if let Some(path) = &report.code {
        tracing::info!(path = %path.display(), "code artifact saved");
    }
    Ok(())
}
