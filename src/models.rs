use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Topic id assigned by the topic-model provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelTopicId(pub usize);

/// Row position of a topic in the visualization tool, i.e. the number a
/// human saw while naming topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayTopicId(pub usize);

impl fmt::Display for ModelTopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "model#{}", self.0)
    }
}

impl fmt::Display for DisplayTopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "display#{}", self.0)
    }
}

/// Names authored against the visualization's ordering.
pub type DisplayNameTable = BTreeMap<DisplayTopicId, String>;

/// Names keyed by the model's own topic ids. This is the table used for labeling.
pub type ModelNameTable = BTreeMap<ModelTopicId, String>;

/// Sparse term-frequency vector: `(vocabulary id, count)` sorted by id.
pub type BagOfWords = Vec<(usize, u32)>;

/// Pruned per-document topic distribution in the provider's order.
pub type TopicDistribution = Vec<(ModelTopicId, f64)>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDocument {
    pub id: usize,
    pub category: Option<String>,
    pub subject: String,
    pub date: Option<DateTime<Utc>>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopicAssignment {
    pub topic_id: ModelTopicId,
    pub topic_name: String,
    pub probability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentLabel {
    pub document: usize,
    pub topic_id: ModelTopicId,
    pub topic_name: String,
    pub probability: f64,
    pub category: Option<String>,
}

impl DocumentLabel {
    pub fn new(document: &RawDocument, assignment: TopicAssignment) -> Self {
        DocumentLabel {
            document: document.id,
            topic_id: assignment.topic_id,
            topic_name: assignment.topic_name,
            probability: assignment.probability,
            category: document.category.clone(),
        }
    }
}
