//! Topic labeling for newsgroup email corpora.
//!
//! Cleans and vectorizes a corpus, consumes a topic model fitted by an
//! external trainer, reconciles the visualization tool's topic ordering with
//! the model's own topic ids, and labels every document with a
//! human-assigned topic name.

pub mod config;
pub mod corpus;
pub mod error;
pub mod labeler;
pub mod models;
mod parallel;
pub mod pipeline;
pub mod preprocess;
pub mod provider;
pub mod reconcile;
pub mod report;
pub mod visualization;
pub mod vocabulary;

pub use error::{Result, TopicsError};
pub use labeler::{label_corpus, label_document};
pub use models::{DisplayNameTable, DisplayTopicId, ModelNameTable, ModelTopicId};
pub use reconcile::reconcile;
pub use visualization::TopicOrdering;
