//! Retrieve-then-read answering.
//!
//! Retrieves passages and page images for a question and has a multimodal
//! chat model answer from them with citations.

pub mod answer;
pub mod approach;
pub mod types;

pub use answer::{citation_file_path, parse_answer, strip_footnote_markers, AnswerFragment, ParsedAnswer};
pub use approach::{ApproachSettings, RetrieveThenReadVision};
pub use types::{
    ApproachEvent, ApproachResponse, ApproachStream, DataPoints, ResponseContext, ThoughtStep,
};
