//! Example questions command.

use clap::Args;
use regwise_core::AppResult;
use regwise_prompt::EXAMPLE_QUESTIONS;

/// Print example questions
#[derive(Args, Debug)]
pub struct ExamplesCommand {}

impl ExamplesCommand {
    pub fn execute(&self) -> AppResult<()> {
        for question in EXAMPLE_QUESTIONS {
            println!("{}", question);
        }
        Ok(())
    }
}
