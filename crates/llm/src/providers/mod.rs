//! Provider implementations.

pub mod openai;
pub mod vision;

pub use openai::{ApiFlavor, OpenAiClient, OpenAiEmbedder};
pub use vision::VisionVectorizer;
