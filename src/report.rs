use std::collections::BTreeMap;

use counter::Counter;

use crate::models::{DisplayNameTable, DisplayTopicId, DocumentLabel, ModelTopicId};
use crate::provider::TopicModel;
use crate::visualization::TopicOrdering;

#[derive(Debug, Clone)]
pub struct TopicSummary {
    pub display_id: DisplayTopicId,
    pub model_id: ModelTopicId,
    pub name: Option<String>,
    pub terms: Vec<(String, f64)>,
}

/// Topics in the order the visualization shows them, which is the order a
/// human names them in.
pub fn topic_summaries(
    model: &dyn TopicModel,
    ordering: &TopicOrdering,
    display_names: Option<&DisplayNameTable>,
    top_terms: usize,
) -> Vec<TopicSummary> {
    ordering
        .iter()
        .map(|(display_id, model_id)| TopicSummary {
            display_id,
            model_id,
            name: display_names.and_then(|names| names.get(&display_id).cloned()),
            terms: model.topic_terms(model_id, top_terms),
        })
        .collect()
}

pub fn print_topic_summaries(summaries: &[TopicSummary]) {
    println!("\n=== TOPICS (display order) ===");
    for summary in summaries {
        let name = summary.name.as_deref().unwrap_or("<unnamed>");
        println!(
            "[{}] {} ({}):",
            summary.display_id.0, name, summary.model_id
        );
        let terms: Vec<String> = summary
            .terms
            .iter()
            .map(|(term, weight)| format!("{}:{:.3}", term, weight))
            .collect();
        println!("    {}", terms.join(", "));
    }
}

/// Assigned topic name against ground-truth category.
#[derive(Debug, Default)]
pub struct CategoryCrosstab {
    pub counts: BTreeMap<String, Counter<String>>, // topic name -> category counts
    pub unlabeled: usize,
}

impl CategoryCrosstab {
    pub fn build(labels: &[DocumentLabel], failed: usize) -> Self {
        let mut counts: BTreeMap<String, Counter<String>> = BTreeMap::new();
        for label in labels {
            let category = label.category.clone().unwrap_or_else(|| "<none>".to_string());
            counts.entry(label.topic_name.clone()).or_default()[&category] += 1;
        }
        CategoryCrosstab {
            counts,
            unlabeled: failed,
        }
    }

    /// Share of a topic's documents that belong to its most common category.
    pub fn purity(&self, topic_name: &str) -> Option<f64> {
        let counter = self.counts.get(topic_name)?;
        let total: usize = counter.values().sum();
        let top = counter.most_common_ordered().first().map(|(_, n)| *n)?;
        Some(top as f64 / total as f64)
    }

    pub fn print(&self) {
        println!("\n=== TOPIC vs CATEGORY ===");
        for (topic, counter) in &self.counts {
            let total: usize = counter.values().sum();
            println!(
                "{} ({} documents, purity {:.2}):",
                topic,
                total,
                self.purity(topic).unwrap_or(0.0)
            );
            for (category, count) in counter.most_common_ordered().into_iter().take(5) {
                println!("    {:<30} {}", category, count);
            }
        }
        if self.unlabeled > 0 {
            println!("Unlabeled documents: {}", self.unlabeled);
        }
    }
}
