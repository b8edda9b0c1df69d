//! Moves human-assigned topic names from display positions onto model topic ids.

use tracing::debug;

use crate::error::{Result, TopicsError};
use crate::models::{DisplayNameTable, DisplayTopicId, ModelNameTable, ModelTopicId};
use crate::provider::TopicModel;
use crate::visualization::TopicOrdering;

/// Builds the model-space name table:
/// `names[m] = display_names[display_position_of(m)]`.
///
/// Fails with `InconsistentTopicCount` when the name table and the ordering
/// disagree on the number of topics, and with `MissingTopicName` when a
/// display position has no name.
pub fn reconcile(ordering: &TopicOrdering, display_names: &DisplayNameTable) -> Result<ModelNameTable> {
    let num_topics = ordering.num_topics();
    if display_names.len() != num_topics {
        return Err(TopicsError::InconsistentTopicCount {
            ordering: num_topics,
            other: display_names.len(),
        });
    }

    if let Some(missing) = unnamed_positions(num_topics, display_names).first() {
        return Err(TopicsError::MissingTopicName(*missing));
    }

    let model_to_display = ordering.invert();
    let mut names = ModelNameTable::new();
    for (model, display) in model_to_display.into_iter().enumerate() {
        let name = display_names
            .get(&display)
            .ok_or(TopicsError::MissingTopicName(display))?;
        names.insert(ModelTopicId(model), name.clone());
    }

    debug!(topics = names.len(), "Reconciled topic names");
    Ok(names)
}

/// Like [`reconcile`], but also checks the ordering against the fitted model.
pub fn reconcile_against(
    model: &dyn TopicModel,
    ordering: &TopicOrdering,
    display_names: &DisplayNameTable,
) -> Result<ModelNameTable> {
    if model.num_topics() != ordering.num_topics() {
        return Err(TopicsError::InconsistentTopicCount {
            ordering: ordering.num_topics(),
            other: model.num_topics(),
        });
    }
    reconcile(ordering, display_names)
}

/// Display positions in `0..num_topics` that have no name.
fn unnamed_positions(num_topics: usize, display_names: &DisplayNameTable) -> Vec<DisplayTopicId> {
    (0..num_topics)
        .map(DisplayTopicId)
        .filter(|id| !display_names.contains_key(id))
        .collect()
}
