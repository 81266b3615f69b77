//! Command implementations for the regwise CLI.

pub mod ask;
pub mod examples;
pub mod prompts;

pub use ask::AskCommand;
pub use examples::ExamplesCommand;
pub use prompts::PromptsCommand;
