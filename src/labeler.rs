//! Assigns each document its dominant topic and the topic's name.

use rayon::prelude::*;
use tracing::debug;

use crate::error::{Result, TopicsError};
use crate::models::{BagOfWords, ModelNameTable, ModelTopicId, TopicAssignment};
use crate::parallel::with_workers;
use crate::provider::TopicModel;

/// Highest-probability entry; ties go to the first entry in provider order.
/// Non-finite probabilities are never selected.
pub fn dominant_topic(distribution: &[(ModelTopicId, f64)]) -> Option<(ModelTopicId, f64)> {
    distribution
        .iter()
        .copied()
        .filter(|(_, p)| p.is_finite())
        .fold(None, |best, (topic, p)| match best {
            Some((_, best_p)) if best_p >= p => best,
            _ => Some((topic, p)),
        })
}

/// Labels one document. Never falls back to a default topic: an empty pruned
/// distribution is `NoTopicAssigned`, and a topic without a name is
/// `UnknownTopicId`.
pub fn label_document(model: &dyn TopicModel, bow: &BagOfWords, names: &ModelNameTable) -> Result<TopicAssignment> {
    let distribution = model.document_topics(bow);
    let (topic_id, probability) = dominant_topic(&distribution).ok_or(TopicsError::NoTopicAssigned)?;
    let topic_name = names
        .get(&topic_id)
        .ok_or(TopicsError::UnknownTopicId(topic_id))?
        .clone();

    Ok(TopicAssignment {
        topic_id,
        topic_name,
        probability,
    })
}

/// Labels every document on a pool of `workers` threads. The result for
/// document `i` is at index `i`; failures are left for the caller to handle.
pub fn label_corpus(
    model: &dyn TopicModel,
    corpus: &[BagOfWords],
    names: &ModelNameTable,
    workers: usize,
) -> Vec<Result<TopicAssignment>> {
    let results: Vec<Result<TopicAssignment>> = with_workers(workers, || {
        corpus
            .par_iter()
            .map(|bow| label_document(model, bow, names))
            .collect()
    });

    debug!(
        documents = results.len(),
        failed = results.iter().filter(|r| r.is_err()).count(),
        "Labeling finished"
    );
    results
}
