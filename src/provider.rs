//! Topic model provider seam.
//!
//! Fitting is done by an external trainer. This module defines what the rest
//! of the crate needs from a fitted model and ships a provider that loads the
//! trainer's exported topic-term weights.
//!
//! Pruning contract: `TopicModel::document_topics` omits every topic whose
//! probability falls below the model's `minimum_probability`. Callers must not
//! assume all `num_topics` entries are present, and may receive an empty list.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, TopicsError};
use crate::models::{BagOfWords, ModelTopicId, TopicDistribution};
use crate::vocabulary::Vocabulary;

pub trait TopicModel: Send + Sync {
    fn num_topics(&self) -> usize;

    /// Pruned `(topic, probability)` pairs for one document, in the
    /// provider's order.
    fn document_topics(&self, bow: &BagOfWords) -> TopicDistribution;

    /// Top `n` terms of a topic by descending weight.
    fn topic_terms(&self, topic: ModelTopicId, n: usize) -> Vec<(String, f64)>;
}

#[derive(Debug, Clone)]
pub struct FitParams {
    pub minimum_probability: f64,
    pub iterations: usize, // Upper bound on per-document fold-in updates
}

impl Default for FitParams {
    fn default() -> Self {
        FitParams {
            minimum_probability: 0.01,
            iterations: 50,
        }
    }
}

pub trait TopicModelProvider {
    type Model: TopicModel;

    fn fit(
        &self,
        corpus: &[BagOfWords],
        vocabulary: &Vocabulary,
        num_topics: usize,
        params: &FitParams,
    ) -> Result<Self::Model>;
}

/// On-disk form written by the external trainer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelExport {
    pub alpha: f64,
    pub vocabulary: Vocabulary,
    pub topic_term: Vec<Vec<f64>>, // Topics x Words
}

/// A fitted model restored from a [`ModelExport`].
#[derive(Debug, Clone)]
pub struct ExportedModel {
    alpha: f64,
    vocabulary: Vocabulary,
    topic_term: Vec<Vec<f64>>, // Row-normalized
    params: FitParams,
}

const CONVERGENCE_THRESHOLD: f64 = 1e-4;

impl ExportedModel {
    pub fn from_export(export: ModelExport, params: FitParams) -> Result<Self> {
        if export.topic_term.is_empty() {
            return Err(TopicsError::InvalidModel("model has no topics".into()));
        }
        if !(export.alpha > 0.0 && export.alpha.is_finite()) {
            return Err(TopicsError::InvalidModel(format!("alpha must be positive, got {}", export.alpha)));
        }

        let mut topic_term = export.topic_term;
        for (topic, row) in topic_term.iter_mut().enumerate() {
            if row.len() != export.vocabulary.len() {
                return Err(TopicsError::InvalidModel(format!(
                    "topic {} has {} weights for a vocabulary of {} terms",
                    topic,
                    row.len(),
                    export.vocabulary.len()
                )));
            }
            if row.iter().any(|w| !w.is_finite() || *w < 0.0) {
                return Err(TopicsError::InvalidModel(format!("topic {} has invalid weights", topic)));
            }
            let total: f64 = row.iter().sum();
            if total <= 0.0 {
                return Err(TopicsError::InvalidModel(format!("topic {} has no mass", topic)));
            }
            row.iter_mut().for_each(|w| *w /= total);
        }

        Ok(ExportedModel {
            alpha: export.alpha,
            vocabulary: export.vocabulary,
            topic_term,
            params,
        })
    }

    pub fn load(path: &Path, params: FitParams) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let export: ModelExport = serde_json::from_str(&text)?;
        let model = Self::from_export(export, params)?;
        info!(
            path = %path.display(),
            topics = model.num_topics(),
            terms = model.vocabulary.len(),
            "Loaded fitted topic model"
        );
        Ok(model)
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Unpruned document-topic proportions, folding the document into the
    /// frozen topics.
    fn infer(&self, bow: &BagOfWords) -> Vec<f64> {
        let k = self.num_topics();
        let total: f64 = bow.iter().map(|(_, c)| f64::from(*c)).sum();
        let mut gamma = vec![self.alpha + total / k as f64; k];

        for iteration in 0..self.params.iterations {
            let mut next = vec![self.alpha; k];
            for &(word, count) in bow {
                if word >= self.vocabulary.len() {
                    continue;
                }
                let norm: f64 = (0..k).map(|t| self.topic_term[t][word] * gamma[t]).sum();
                if norm <= 0.0 {
                    continue;
                }
                for (t, slot) in next.iter_mut().enumerate() {
                    *slot += f64::from(count) * self.topic_term[t][word] * gamma[t] / norm;
                }
            }

            let change = next
                .iter()
                .zip(&gamma)
                .map(|(a, b)| (a - b).abs())
                .sum::<f64>()
                / k as f64;
            gamma = next;
            if change < CONVERGENCE_THRESHOLD {
                debug!(iteration, "Fold-in converged");
                break;
            }
        }

        let sum: f64 = gamma.iter().sum();
        gamma.into_iter().map(|g| g / sum).collect()
    }
}

impl TopicModel for ExportedModel {
    fn num_topics(&self) -> usize {
        self.topic_term.len()
    }

    fn document_topics(&self, bow: &BagOfWords) -> TopicDistribution {
        self.infer(bow)
            .into_iter()
            .enumerate()
            .filter(|(_, p)| *p >= self.params.minimum_probability)
            .map(|(t, p)| (ModelTopicId(t), p))
            .collect()
    }

    fn topic_terms(&self, topic: ModelTopicId, n: usize) -> Vec<(String, f64)> {
        let Some(row) = self.topic_term.get(topic.0) else {
            return Vec::new();
        };
        let mut ranked: Vec<(usize, f64)> = row.iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
            .into_iter()
            .take(n)
            .filter_map(|(id, w)| self.vocabulary.term(id).map(|term| (term.to_string(), w)))
            .collect()
    }
}

/// Provider backed by a model file the external trainer wrote for this corpus.
pub struct ExportProvider {
    path: PathBuf,
}

/// The part of a [`ModelExport`] needed to vectorize a corpus for the model.
#[derive(Deserialize)]
struct ExportVocabulary {
    vocabulary: Vocabulary,
}

impl ExportProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ExportProvider { path: path.into() }
    }

    /// Vocabulary the model was trained with, in term-id order.
    pub fn trained_vocabulary(&self) -> Result<Vocabulary> {
        let text = std::fs::read_to_string(&self.path)?;
        let export: ExportVocabulary = serde_json::from_str(&text)?;
        Ok(export.vocabulary)
    }
}

impl TopicModelProvider for ExportProvider {
    type Model = ExportedModel;

    fn fit(
        &self,
        corpus: &[BagOfWords],
        vocabulary: &Vocabulary,
        num_topics: usize,
        params: &FitParams,
    ) -> Result<ExportedModel> {
        let model = ExportedModel::load(&self.path, params.clone())?;
        if model.num_topics() != num_topics {
            return Err(TopicsError::InvalidModel(format!(
                "export has {} topics, expected {}",
                model.num_topics(),
                num_topics
            )));
        }
        if model.vocabulary != *vocabulary {
            return Err(TopicsError::InvalidModel(format!(
                "export vocabulary ({} terms) does not match the corpus vocabulary ({} terms)",
                model.vocabulary.len(),
                vocabulary.len()
            )));
        }
        debug!(documents = corpus.len(), "Export matches corpus");
        Ok(model)
    }
}
