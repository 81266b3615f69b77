//! Core types for search results.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Names of the index fields that vary between deployments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFields {
    pub content: String,
    pub sourcepage: String,
}

impl Default for DocumentFields {
    fn default() -> Self {
        Self {
            content: "content".to_string(),
            sourcepage: "sourcepage".to_string(),
        }
    }
}

/// Extractive caption attached to a hit when semantic captions are on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryCaption {
    #[serde(default)]
    pub text: Option<String>,

    #[serde(default)]
    pub highlights: Option<String>,

    /// Any other keys the service returns
    #[serde(flatten)]
    pub additional_properties: Map<String, Value>,
}

/// One search hit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub id: Option<String>,
    pub content: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub image_embedding: Option<Vec<f32>>,
    pub category: Option<String>,
    pub sourcepage: Option<String>,
    pub sourcefile: Option<String>,
    pub oids: Option<Vec<String>>,
    pub groups: Option<Vec<String>>,
    pub captions: Vec<QueryCaption>,

    /// `@search.score`
    pub score: Option<f64>,

    /// `@search.rerankerScore`, present only with the semantic ranker
    pub reranker_score: Option<f64>,
}

fn string_field(hit: &Value, key: &str) -> Option<String> {
    hit.get(key).and_then(Value::as_str).map(str::to_string)
}

fn vector_field(hit: &Value, key: &str) -> Option<Vec<f32>> {
    hit.get(key)
        .and_then(Value::as_array)
        .map(|values| values.iter().filter_map(Value::as_f64).map(|v| v as f32).collect())
}

fn string_list_field(hit: &Value, key: &str) -> Option<Vec<String>> {
    hit.get(key).and_then(Value::as_array).map(|values| {
        values
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    })
}

impl Document {
    /// Build a document from one entry of a search response's `value` array.
    ///
    /// Missing or mistyped fields become `None`; nothing here fails.
    pub fn from_hit(hit: &Value, fields: &DocumentFields) -> Self {
        let captions = hit
            .get("@search.captions")
            .cloned()
            .and_then(|value| serde_json::from_value::<Vec<QueryCaption>>(value).ok())
            .unwrap_or_default();

        Self {
            id: string_field(hit, "id"),
            content: string_field(hit, &fields.content),
            embedding: vector_field(hit, "embedding"),
            image_embedding: vector_field(hit, "imageEmbedding"),
            category: string_field(hit, "category"),
            sourcepage: string_field(hit, &fields.sourcepage),
            sourcefile: string_field(hit, "sourcefile"),
            oids: string_list_field(hit, "oids"),
            groups: string_list_field(hit, "groups"),
            captions,
            score: hit.get("@search.score").and_then(Value::as_f64),
            reranker_score: hit.get("@search.rerankerScore").and_then(Value::as_f64),
        }
    }

    /// Display form used in thought steps, with embeddings shortened.
    pub fn serialize_for_results(&self) -> Value {
        let captions: Vec<Value> = self
            .captions
            .iter()
            .map(|caption| {
                json!({
                    "additional_properties": caption.additional_properties,
                    "text": caption.text,
                    "highlights": caption.highlights,
                })
            })
            .collect();

        json!({
            "id": self.id,
            "content": self.content,
            "embedding": trim_embedding(self.embedding.as_deref()),
            "imageEmbedding": trim_embedding(self.image_embedding.as_deref()),
            "category": self.category,
            "sourcepage": self.sourcepage,
            "sourcefile": self.sourcefile,
            "oids": self.oids,
            "groups": self.groups,
            "captions": captions,
            "score": self.score,
            "reranker_score": self.reranker_score,
        })
    }

    /// Whether the hit clears both score thresholds. Missing scores count as 0.
    pub fn qualifies(&self, minimum_search_score: f64, minimum_reranker_score: f64) -> bool {
        self.score.unwrap_or(0.0) >= minimum_search_score
            && self.reranker_score.unwrap_or(0.0) >= minimum_reranker_score
    }
}

/// Shorten an embedding to its first two values and a count of the rest.
pub fn trim_embedding(embedding: Option<&[f32]>) -> Option<String> {
    let embedding = embedding?;
    if embedding.len() > 2 {
        Some(format!(
            "[{}, {} ...+{} more]",
            embedding[0],
            embedding[1],
            embedding.len() - 2
        ))
    } else {
        let values: Vec<String> = embedding.iter().map(|v| v.to_string()).collect();
        Some(format!("[{}]", values.join(", ")))
    }
}

/// Identity claims of the caller, used for security filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthClaims {
    #[serde(default)]
    pub oid: Option<String>,

    #[serde(default)]
    pub groups: Vec<String>,
}
