use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TopicsError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyConfig {
    pub min_word_freq: usize,
    pub max_doc_fraction: f64, // Drop terms present in more than this share of documents
    pub max_vocab_size: usize,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        VocabularyConfig {
            min_word_freq: 3,
            max_doc_fraction: 0.5,
            max_vocab_size: 100_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub num_topics: usize,
    pub minimum_probability: f64, // Provider prunes topics below this
    pub min_token_len: usize,
    pub vocabulary: VocabularyConfig,
    pub workers: usize,
    pub top_terms: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            num_topics: 10,
            minimum_probability: 0.01,
            min_token_len: 3,
            vocabulary: VocabularyConfig::default(),
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            top_terms: 10,
        }
    }
}

impl PipelineConfig {
    /// Reads a JSON config file; missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_topics == 0 {
            return Err(TopicsError::InvalidConfig("num_topics must be positive".into()));
        }
        if !(0.0..1.0).contains(&self.minimum_probability) {
            return Err(TopicsError::InvalidConfig(format!(
                "minimum_probability must be in [0, 1), got {}",
                self.minimum_probability
            )));
        }
        if self.vocabulary.max_doc_fraction <= 0.0 || self.vocabulary.max_doc_fraction > 1.0 {
            return Err(TopicsError::InvalidConfig(format!(
                "max_doc_fraction must be in (0, 1], got {}",
                self.vocabulary.max_doc_fraction
            )));
        }
        if self.workers == 0 {
            return Err(TopicsError::InvalidConfig("workers must be positive".into()));
        }
        Ok(())
    }
}
