//! Ask command implementation.

use crate::agent::{Agent, ToolContext};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::embedding::OpenAIEmbedder;
use crate::retrieval::RetrievalEngine;
use anyhow::Result;
use std::sync::Arc;

/// Run the ask command.
pub async fn run_ask(question: &str, verbose: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        Output::info("Run 'podgist doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let store = super::build_store(&settings)?;
    let embedder = Arc::new(OpenAIEmbedder::from_settings(&settings.embedding));
    let engine = Arc::new(RetrievalEngine::new(
        embedder,
        Arc::clone(&store),
        settings.retrieval.clone(),
    ));
    let prompts = Prompts::load(None, None)?;

    let tools = ToolContext::new(engine, store, settings.transcripts_dir());
    let agent = Agent::new(tools, settings.agent.clone(), &prompts.agent.system);

    let spinner = Output::spinner("Searching the archive...");

    match agent.ask(question).await {
        Ok(response) => {
            spinner.finish_and_clear();

            println!("\n{}\n", response.content);

            if verbose && !response.tool_calls.is_empty() {
                Output::header("Tool calls");
                for call in &response.tool_calls {
                    Output::list_item(&call.to_string());
                }
                Output::kv("Iterations", &response.iterations.to_string());
            }
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
