//! Error types shared by every pipeline stage.

use thiserror::Error;

use crate::models::{DisplayTopicId, ModelTopicId};

#[derive(Debug, Error)]
pub enum TopicsError {
    /// Two structures that describe the same fitted model disagree on how
    /// many topics it has.
    #[error("Inconsistent topic count: ordering has {ordering} topics, other side has {other}")]
    InconsistentTopicCount { ordering: usize, other: usize },

    /// A display position has no human-assigned name.
    #[error("No topic name for display topic {0}")]
    MissingTopicName(DisplayTopicId),

    /// The visualization ordering is not a total bijection over `0..num_topics`.
    #[error("Topic ordering is not a bijection: {0}")]
    OrderingNotBijective(String),

    /// The provider returned no topic above its pruning threshold.
    #[error("No topic assigned to document")]
    NoTopicAssigned,

    /// The dominant topic is not present in the model-space name table.
    #[error("Unknown topic id {0}")]
    UnknownTopicId(ModelTopicId),

    #[error("Invalid model export: {0}")]
    InvalidModel(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Corpus error: {0}")]
    Corpus(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TopicsError>;
