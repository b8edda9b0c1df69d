//! Wires the stages together with explicit values passed between them.

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::corpus::Corpus;
use crate::error::Result;
use crate::labeler::label_corpus;
use crate::models::{BagOfWords, DocumentLabel, ModelNameTable};
use crate::preprocess::{preprocess_corpus, RegexTokenizer, TextCleaner};
use crate::provider::TopicModel;
use crate::vocabulary::Vocabulary;

/// What the external trainer reads to fit a model over this corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusExport {
    pub vocabulary: Vocabulary,
    pub documents: Vec<BagOfWords>,
}

/// Corpus after cleaning, tokenizing and vectorizing.
#[derive(Debug, Clone)]
pub struct PreparedCorpus {
    pub corpus: Corpus,
    pub tokens: Vec<Vec<String>>,
    pub vocabulary: Vocabulary,
    pub bows: Vec<BagOfWords>,
}

impl PreparedCorpus {
    /// Builds a fresh vocabulary from the corpus.
    pub fn prepare(corpus: Corpus, config: &PipelineConfig) -> PreparedCorpus {
        let tokens = tokenize(&corpus, config);
        let vocabulary = Vocabulary::build(&tokens, &config.vocabulary);
        let bows = vocabulary.corpus(&tokens);
        PreparedCorpus {
            corpus,
            tokens,
            vocabulary,
            bows,
        }
    }

    /// Vectorizes the corpus against an existing vocabulary, e.g. the one a
    /// fitted model was trained with.
    pub fn with_vocabulary(corpus: Corpus, vocabulary: Vocabulary, config: &PipelineConfig) -> PreparedCorpus {
        let tokens = tokenize(&corpus, config);
        let bows = vocabulary.corpus(&tokens);
        PreparedCorpus {
            corpus,
            tokens,
            vocabulary,
            bows,
        }
    }

    pub fn write_export(&self, path: &Path) -> Result<()> {
        let export = CorpusExport {
            vocabulary: self.vocabulary.clone(),
            documents: self.bows.clone(),
        };
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        serde_json::to_writer(&mut writer, &export)?;
        writer.flush()?;
        info!(path = %path.display(), documents = export.documents.len(), "Wrote corpus export");
        Ok(())
    }
}

fn tokenize(corpus: &Corpus, config: &PipelineConfig) -> Vec<Vec<String>> {
    let cleaner = TextCleaner::new();
    let tokenizer = RegexTokenizer::new(config.min_token_len);
    preprocess_corpus(&corpus.documents, &cleaner, &tokenizer, config.workers)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelPolicy {
    /// Stop at the first document that cannot be labeled.
    Abort,
    /// Log and leave failing documents out of the output.
    Skip,
}

#[derive(Debug, Default)]
pub struct LabelOutcome {
    pub labels: Vec<DocumentLabel>,
    pub skipped: usize,
}

pub fn label_prepared(
    model: &dyn TopicModel,
    prepared: &PreparedCorpus,
    names: &ModelNameTable,
    workers: usize,
    policy: LabelPolicy,
) -> Result<LabelOutcome> {
    let results = label_corpus(model, &prepared.bows, names, workers);
    let mut outcome = LabelOutcome::default();

    for (document, result) in prepared.corpus.documents.iter().zip(results) {
        match result {
            Ok(assignment) => outcome.labels.push(DocumentLabel::new(document, assignment)),
            Err(e) if policy == LabelPolicy::Skip => {
                warn!(document = document.id, error = %e, "Skipping document");
                outcome.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        labeled = outcome.labels.len(),
        skipped = outcome.skipped,
        "Labeled corpus"
    );
    Ok(outcome)
}
