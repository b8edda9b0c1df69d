//! The visualization tool's topic ordering.
//!
//! The tool lists topics by descending prevalence, so its row positions
//! (display ids) generally differ from the model's topic ids. A
//! [`TopicOrdering`] can only be built as a total bijection over
//! `0..num_topics`.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, TopicsError};
use crate::models::{BagOfWords, DisplayTopicId, ModelTopicId};
use crate::provider::TopicModel;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicOrdering {
    display_to_model: Vec<ModelTopicId>,
}

/// One row of the visualization's topic coordinate table, in display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinateRow {
    pub topic: ModelTopicId,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub freq: f64,
}

impl TopicOrdering {
    /// `display_to_model[i]` is the model topic shown at display position `i`.
    pub fn new(display_to_model: Vec<ModelTopicId>) -> Result<Self> {
        let n = display_to_model.len();
        let mut seen = vec![false; n];
        for (position, model_id) in display_to_model.iter().enumerate() {
            if model_id.0 >= n {
                return Err(TopicsError::OrderingNotBijective(format!(
                    "display position {} maps to {} outside 0..{}",
                    position, model_id, n
                )));
            }
            if std::mem::replace(&mut seen[model_id.0], true) {
                return Err(TopicsError::OrderingNotBijective(format!(
                    "{} appears at more than one display position",
                    model_id
                )));
            }
        }
        Ok(TopicOrdering { display_to_model })
    }

    /// Builds the ordering from an explicit position map. Positions must be
    /// exactly `0..map.len()`.
    pub fn from_map(map: &BTreeMap<DisplayTopicId, ModelTopicId>) -> Result<Self> {
        let mut display_to_model = Vec::with_capacity(map.len());
        for (expected, (position, model_id)) in map.iter().enumerate() {
            if position.0 != expected {
                return Err(TopicsError::OrderingNotBijective(format!(
                    "display positions are not dense: expected {}, found {}",
                    DisplayTopicId(expected),
                    position
                )));
            }
            display_to_model.push(*model_id);
        }
        Self::new(display_to_model)
    }

    pub fn identity(num_topics: usize) -> Self {
        TopicOrdering {
            display_to_model: (0..num_topics).map(ModelTopicId).collect(),
        }
    }

    /// Orders topics the way the visualization tool does: by aggregate
    /// prevalence `sum(doc_len * p(topic | doc))`, descending, ties by model id.
    pub fn by_prevalence(model: &dyn TopicModel, corpus: &[BagOfWords]) -> Self {
        let freq = topic_prevalence(model, corpus);
        let mut display_to_model: Vec<ModelTopicId> = (0..model.num_topics()).map(ModelTopicId).collect();
        display_to_model.sort_by(|a, b| freq[b.0].total_cmp(&freq[a.0]));
        TopicOrdering { display_to_model }
    }

    pub fn from_export(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let rows: Vec<CoordinateRow> = serde_json::from_str(&text)?;
        let ordering = Self::new(rows.into_iter().map(|row| row.topic).collect())?;
        info!(path = %path.display(), topics = ordering.num_topics(), "Loaded topic ordering");
        Ok(ordering)
    }

    /// Writes the ordering as coordinate rows, with each topic's share of the corpus.
    pub fn write_export(&self, path: &Path, model: &dyn TopicModel, corpus: &[BagOfWords]) -> Result<()> {
        let freq = topic_prevalence(model, corpus);
        let total: f64 = freq.iter().sum();
        let rows: Vec<CoordinateRow> = self
            .display_to_model
            .iter()
            .map(|model_id| CoordinateRow {
                topic: *model_id,
                x: 0.0,
                y: 0.0,
                freq: if total > 0.0 {
                    freq.get(model_id.0).copied().unwrap_or(0.0) / total * 100.0
                } else {
                    0.0
                },
            })
            .collect();
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &rows)?;
        writer.flush()?;
        Ok(())
    }

    pub fn num_topics(&self) -> usize {
        self.display_to_model.len()
    }

    pub fn model_id(&self, display: DisplayTopicId) -> Option<ModelTopicId> {
        self.display_to_model.get(display.0).copied()
    }

    /// Model id to display position, indexed by model id.
    pub fn invert(&self) -> Vec<DisplayTopicId> {
        let mut model_to_display = vec![DisplayTopicId(0); self.display_to_model.len()];
        for (position, model_id) in self.display_to_model.iter().enumerate() {
            model_to_display[model_id.0] = DisplayTopicId(position);
        }
        model_to_display
    }

    pub fn iter(&self) -> impl Iterator<Item = (DisplayTopicId, ModelTopicId)> + '_ {
        self.display_to_model
            .iter()
            .enumerate()
            .map(|(position, model_id)| (DisplayTopicId(position), *model_id))
    }
}

fn topic_prevalence(model: &dyn TopicModel, corpus: &[BagOfWords]) -> Vec<f64> {
    let mut freq = vec![0.0; model.num_topics()];
    for bow in corpus {
        let doc_len: f64 = bow.iter().map(|(_, c)| f64::from(*c)).sum();
        for (topic, p) in model.document_topics(bow) {
            if let Some(slot) = freq.get_mut(topic.0) {
                *slot += doc_len * p;
            }
        }
    }
    freq
}
