//! Response types of the retrieve-then-read approach.

use futures::Stream;
use regwise_core::AppResult;
use regwise_llm::{ChatRole, ResponseMessage};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::pin::Pin;

/// Diagnostic record of one step the approach took.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThoughtStep {
    pub title: String,
    pub description: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<Map<String, Value>>,
}

impl ThoughtStep {
    pub fn new(title: impl Into<String>, description: impl Into<Value>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            props: None,
        }
    }

    pub fn with_props(mut self, props: Map<String, Value>) -> Self {
        self.props = Some(props);
        self
    }
}

/// Material that was put in front of the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataPoints {
    /// `citation: text` lines
    pub text: Vec<String>,

    /// Page image data URLs
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseContext {
    pub data_points: DataPoints,
    pub thoughts: Vec<ThoughtStep>,
}

/// Result of a non-streaming run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproachResponse {
    pub message: ResponseMessage,
    pub context: ResponseContext,

    /// Echoed unchanged from the request
    pub session_state: Option<Value>,
}

/// Event of a streaming run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApproachEvent {
    /// Sent once, before any answer text
    Context {
        context: ResponseContext,
        session_state: Option<Value>,
    },

    /// A piece of the answer
    Delta {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        role: Option<ChatRole>,
        content: String,
    },

    /// The model stopped generating
    Finished { finish_reason: String },
}

/// Stream of approach events.
pub type ApproachStream = Pin<Box<dyn Stream<Item = AppResult<ApproachEvent>> + Send>>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_thought_step_serialization() {
        let mut props = Map::new();
        props.insert("top".to_string(), json!(3));

        let step = ThoughtStep::new("Search using user query", "payfac").with_props(props);
        assert_eq!(
            serde_json::to_value(&step).unwrap(),
            json!({"title": "Search using user query", "description": "payfac", "props": {"top": 3}})
        );

        let bare = ThoughtStep::new("Search results", json!([]));
        assert!(serde_json::to_value(&bare).unwrap().get("props").is_none());
    }

    #[test]
    fn test_event_tags() {
        let delta = ApproachEvent::Delta {
            role: None,
            content: "Hi".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&delta).unwrap(),
            json!({"type": "delta", "content": "Hi"})
        );

        let finished = ApproachEvent::Finished {
            finish_reason: "stop".to_string(),
        };
        assert_eq!(serde_json::to_value(&finished).unwrap()["type"], "finished");
    }
}
