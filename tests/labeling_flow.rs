use std::fs;
use std::path::Path;

use newsgroup_topics::config::PipelineConfig;
use newsgroup_topics::corpus::{Corpus, CorpusFilter};
use newsgroup_topics::models::{BagOfWords, TopicDistribution};
use newsgroup_topics::pipeline::{label_prepared, LabelPolicy, PreparedCorpus};
use newsgroup_topics::provider::{ExportProvider, FitParams, ModelExport, TopicModel, TopicModelProvider};
use newsgroup_topics::reconcile::reconcile_against;
use newsgroup_topics::vocabulary::Vocabulary;
use newsgroup_topics::{
    label_document, reconcile, DisplayNameTable, DisplayTopicId, ModelTopicId, TopicOrdering, TopicsError,
};

/// Always returns the same distribution.
struct FixedModel(TopicDistribution);

impl TopicModel for FixedModel {
    fn num_topics(&self) -> usize {
        2
    }

    fn document_topics(&self, _bow: &BagOfWords) -> TopicDistribution {
        self.0.clone()
    }

    fn topic_terms(&self, _topic: ModelTopicId, _n: usize) -> Vec<(String, f64)> {
        Vec::new()
    }
}

fn space_politics_names() -> DisplayNameTable {
    [
        (DisplayTopicId(0), "space".to_string()),
        (DisplayTopicId(1), "politics".to_string()),
    ]
    .into_iter()
    .collect()
}

#[test]
fn two_topic_example_end_to_end() {
    // Display position 0 shows model topic 1, position 1 shows model topic 0.
    let ordering = TopicOrdering::new(vec![ModelTopicId(1), ModelTopicId(0)]).unwrap();
    let names = reconcile(&ordering, &space_politics_names()).unwrap();

    assert_eq!(names.len(), 2);
    assert_eq!(names[&ModelTopicId(0)], "politics");
    assert_eq!(names[&ModelTopicId(1)], "space");

    let model = FixedModel(vec![(ModelTopicId(0), 0.9), (ModelTopicId(1), 0.1)]);
    let assignment = label_document(&model, &vec![(0, 1)], &names).unwrap();
    assert_eq!(assignment.topic_id, ModelTopicId(0));
    assert_eq!(assignment.topic_name, "politics");
}

#[test]
fn missing_name_fails_reconciliation() {
    let ordering = TopicOrdering::new(vec![ModelTopicId(1), ModelTopicId(0)]).unwrap();
    let mut names = space_politics_names();
    names.remove(&DisplayTopicId(1));
    names.insert(DisplayTopicId(7), "hockey".to_string());

    assert!(matches!(
        reconcile(&ordering, &names),
        Err(TopicsError::MissingTopicName(DisplayTopicId(1)))
    ));
}

fn write_post(root: &Path, category: &str, name: &str, body: &str) {
    let dir = root.join(category);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join(name),
        format!("From: poster@example.com\nSubject: post\n\n{body}\n"),
    )
    .unwrap();
}

fn write_tree(root: &Path) {
    write_post(root, "sci.space", "1", "orbit launch orbit rocket");
    write_post(root, "sci.space", "2", "rocket launch orbit");
    write_post(root, "talk.politics.misc", "1", "senate vote senate ballot");
    write_post(root, "talk.politics.misc", "2", "ballot vote senate");
}

fn tree_config() -> PipelineConfig {
    let mut config = PipelineConfig {
        num_topics: 2,
        workers: 2,
        ..PipelineConfig::default()
    };
    config.vocabulary.min_word_freq = 2;
    config.vocabulary.max_doc_fraction = 1.0;
    config
}

/// Stand-in for the external trainer: model topic 0 is politics, 1 is space.
fn write_model(path: &Path, vocabulary: &Vocabulary) {
    let weight = |term: &str, topic: usize| -> f64 {
        let space = ["orbit", "launch", "rocket"].contains(&term);
        let politics = ["senate", "vote", "ballot"].contains(&term);
        match (topic, space, politics) {
            (0, _, true) | (1, true, _) => 1.0,
            _ => 0.01,
        }
    };
    let export = ModelExport {
        alpha: 0.1,
        vocabulary: vocabulary.clone(),
        topic_term: (0..2)
            .map(|topic| vocabulary.terms().iter().map(|term| weight(term.as_str(), topic)).collect())
            .collect(),
    };
    fs::write(path, serde_json::to_string(&export).unwrap()).unwrap();
}

#[test]
fn newsgroup_tree_is_labeled_through_exported_model() {
    let tmp = tempfile::TempDir::new().unwrap();
    let root = tmp.path().join("corpus");
    write_tree(&root);
    let config = tree_config();

    let corpus = Corpus::from_newsgroup_dir(&root, &CorpusFilter::default()).unwrap();
    let prepared = PreparedCorpus::prepare(corpus, &config);
    let model_path = tmp.path().join("model.json");
    write_model(&model_path, &prepared.vocabulary);

    let model = ExportProvider::new(&model_path)
        .fit(&prepared.bows, &prepared.vocabulary, 2, &FitParams::default())
        .unwrap();

    // The visualization lists space (model 1) first.
    let ordering = TopicOrdering::new(vec![ModelTopicId(1), ModelTopicId(0)]).unwrap();
    let names = reconcile_against(&model, &ordering, &space_politics_names()).unwrap();
    let outcome = label_prepared(&model, &prepared, &names, 2, LabelPolicy::Abort).unwrap();

    assert_eq!(outcome.labels.len(), 4);
    for label in &outcome.labels {
        let expected = match label.category.as_deref() {
            Some("sci.space") => "space",
            Some("talk.politics.misc") => "politics",
            other => panic!("unexpected category {:?}", other),
        };
        assert_eq!(label.topic_name, expected, "document {}", label.document);
    }
}

#[test]
fn subset_is_labeled_against_trained_vocabulary() {
    let tmp = tempfile::TempDir::new().unwrap();
    let root = tmp.path().join("corpus");
    write_tree(&root);
    let config = tree_config();

    let full = Corpus::from_newsgroup_dir(&root, &CorpusFilter::default()).unwrap();
    let trained = PreparedCorpus::prepare(full, &config);
    let model_path = tmp.path().join("model.json");
    write_model(&model_path, &trained.vocabulary);

    let filter = CorpusFilter {
        categories: Some(vec!["talk.politics.misc".to_string()]),
        ..CorpusFilter::default()
    };
    let subset = Corpus::from_newsgroup_dir(&root, &filter).unwrap();
    let provider = ExportProvider::new(&model_path);

    // A vocabulary rebuilt from the subset no longer matches the export.
    let rebuilt = PreparedCorpus::prepare(subset.clone(), &config);
    assert!(provider
        .fit(&rebuilt.bows, &rebuilt.vocabulary, 2, &FitParams::default())
        .is_err());

    let prepared = PreparedCorpus::with_vocabulary(subset, provider.trained_vocabulary().unwrap(), &config);
    let model = provider
        .fit(&prepared.bows, &prepared.vocabulary, 2, &FitParams::default())
        .unwrap();
    let ordering = TopicOrdering::new(vec![ModelTopicId(1), ModelTopicId(0)]).unwrap();
    let names = reconcile_against(&model, &ordering, &space_politics_names()).unwrap();
    let outcome = label_prepared(&model, &prepared, &names, 2, LabelPolicy::Abort).unwrap();

    let assigned: Vec<&str> = outcome.labels.iter().map(|l| l.topic_name.as_str()).collect();
    assert_eq!(assigned, vec!["politics", "politics"]);
}
