use std::collections::{HashMap, HashSet};

use counter::Counter;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::VocabularyConfig;
use crate::models::BagOfWords;

/// Fixed id-to-term table for one corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
    id2term: Vec<String>,
    term2id: HashMap<String, usize>,
}

impl From<Vec<String>> for Vocabulary {
    fn from(id2term: Vec<String>) -> Self {
        let term2id = id2term
            .iter()
            .enumerate()
            .map(|(i, term)| (term.clone(), i))
            .collect();
        Vocabulary { id2term, term2id }
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(vocabulary: Vocabulary) -> Self {
        vocabulary.id2term
    }
}

impl Vocabulary {
    /// Builds the vocabulary from tokenized documents. Terms are filtered by
    /// total frequency and document share, then ids are assigned by
    /// descending frequency with ties broken alphabetically.
    pub fn build(documents: &[Vec<String>], config: &VocabularyConfig) -> Vocabulary {
        let mut term_counts: Counter<String> = Counter::new();
        let mut doc_counts: Counter<String> = Counter::new();

        for doc in documents {
            for word in doc {
                term_counts[word] += 1;
            }
            let unique: HashSet<&String> = doc.iter().collect();
            for word in unique {
                doc_counts[word] += 1;
            }
        }

        let max_docs = (config.max_doc_fraction * documents.len() as f64).floor() as usize;
        let mut vocab: Vec<(String, usize)> = term_counts
            .into_iter()
            .filter(|(_, count)| *count >= config.min_word_freq)
            .filter(|(word, _)| doc_counts[word] <= max_docs.max(1))
            .collect();

        vocab.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        vocab.truncate(config.max_vocab_size);

        info!(terms = vocab.len(), documents = documents.len(), "Vocabulary built");
        Vocabulary::from(vocab.into_iter().map(|(word, _)| word).collect::<Vec<_>>())
    }

    pub fn len(&self) -> usize {
        self.id2term.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id2term.is_empty()
    }

    pub fn term(&self, id: usize) -> Option<&str> {
        self.id2term.get(id).map(String::as_str)
    }

    pub fn id(&self, term: &str) -> Option<usize> {
        self.term2id.get(term).copied()
    }

    pub fn terms(&self) -> &[String] {
        &self.id2term
    }

    /// Sparse count vector for one document; unknown terms are ignored.
    pub fn doc2bow(&self, tokens: &[String]) -> BagOfWords {
        let counts: Counter<usize> = tokens.iter().filter_map(|t| self.id(t)).collect();
        let mut bow: BagOfWords = counts
            .into_iter()
            .map(|(id, count)| (id, count as u32))
            .collect();
        bow.sort_unstable_by_key(|(id, _)| *id);
        bow
    }

    pub fn corpus(&self, documents: &[Vec<String>]) -> Vec<BagOfWords> {
        documents.iter().map(|doc| self.doc2bow(doc)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(raw: &[&str]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|d| d.split_whitespace().map(String::from).collect())
            .collect()
    }

    fn loose() -> VocabularyConfig {
        VocabularyConfig {
            min_word_freq: 1,
            max_doc_fraction: 1.0,
            max_vocab_size: 100,
        }
    }

    #[test]
    fn ids_follow_frequency_then_term() {
        let documents = docs(&["orbit orbit launch", "launch orbit nasa", "nasa"]);
        let vocab = Vocabulary::build(&documents, &loose());

        assert_eq!(vocab.terms(), &["orbit", "launch", "nasa"]);
        assert_eq!(vocab.id("launch"), Some(1));
        assert_eq!(vocab.term(2), Some("nasa"));
    }

    #[test]
    fn filters_rare_and_ubiquitous_terms() {
        let documents = docs(&["common rare", "common space", "common space"]);
        let config = VocabularyConfig {
            min_word_freq: 2,
            max_doc_fraction: 0.7,
            max_vocab_size: 100,
        };
        let vocab = Vocabulary::build(&documents, &config);

        assert_eq!(vocab.terms(), &["space"]);
    }

    #[test]
    fn truncates_to_max_size() {
        let documents = docs(&["alpha alpha alpha beta beta gamma"]);
        let config = VocabularyConfig {
            max_vocab_size: 2,
            ..loose()
        };
        let vocab = Vocabulary::build(&documents, &config);
        assert_eq!(vocab.terms(), &["alpha", "beta"]);
    }

    #[test]
    fn doc2bow_counts_known_terms_sorted_by_id() {
        let vocab = Vocabulary::from(vec!["orbit".to_string(), "launch".to_string()]);
        let tokens: Vec<String> = ["launch", "unknown", "orbit", "launch"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        assert_eq!(vocab.doc2bow(&tokens), vec![(0, 1), (1, 2)]);
        assert!(vocab.doc2bow(&[]).is_empty());
    }

    #[test]
    fn serializes_as_plain_term_list() {
        let vocab = Vocabulary::from(vec!["orbit".to_string(), "launch".to_string()]);
        let json = serde_json::to_string(&vocab).unwrap();
        assert_eq!(json, r#"["orbit","launch"]"#);
        let back: Vocabulary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vocab);
    }
}
