//! Prompt listing command.

use clap::Args;
use regwise_core::{config::AppConfig, AppError, AppResult};
use regwise_prompt::{list_prompts, PromptDefinition, DEFAULT_PROMPT_ID};

/// List prompt definitions in the workspace
#[derive(Args, Debug)]
pub struct PromptsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl PromptsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let prompts = list_prompts(&config.workspace)?;
        tracing::debug!("Found {} workspace prompts", prompts.len());

        if self.json {
            let json = serde_json::to_string_pretty(&prompts)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
            return Ok(());
        }

        print!("{}", format_listing(&prompts, &config.approach.prompt_id));
        Ok(())
    }
}

fn format_listing(prompts: &[PromptDefinition], active_id: &str) -> String {
    let mut out = String::new();
    // The built-in prompt is used whenever the configured id has no file
    let builtin_marker = if prompts.iter().any(|p| p.id == active_id) {
        ""
    } else {
        " *"
    };
    out.push_str(&format!("{} (built-in){}\n", DEFAULT_PROMPT_ID, builtin_marker));

    for prompt in prompts {
        let marker = if prompt.id == active_id { " *" } else { "" };
        out.push_str(&format!("{}  {}{}\n", prompt.id, prompt.title, marker));
    }
    out
}
