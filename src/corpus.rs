//! Corpus loading from an mbox archive or a `<category>/<message>` newsgroup tree.

use std::path::Path;

use chrono::{DateTime, Utc};
use mail_parser::MessageParser;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{Result, TopicsError};
use crate::models::RawDocument;

/// Selects the subset of the corpus to work on.
#[derive(Debug, Clone)]
pub struct CorpusFilter {
    pub categories: Option<Vec<String>>,
    pub sample_every: usize, // Keep every n-th accepted message
    pub limit: Option<usize>,
}

impl Default for CorpusFilter {
    fn default() -> Self {
        CorpusFilter {
            categories: None,
            sample_every: 1,
            limit: None,
        }
    }
}

impl CorpusFilter {
    fn accepts_category(&self, category: Option<&str>) -> bool {
        match (&self.categories, category) {
            (None, _) => true,
            (Some(allowed), Some(category)) => allowed.iter().any(|c| c == category),
            (Some(_), None) => false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub documents: Vec<RawDocument>,
}

/// Fields pulled out of one parsed message before filtering.
struct ParsedMessage {
    category: Option<String>,
    subject: String,
    date: Option<DateTime<Utc>>,
    body: String,
}

impl Corpus {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn from_mbox(path: &Path, filter: &CorpusFilter) -> Result<Corpus> {
        let mbox = mbox_reader::MboxFile::from_file(path)?;
        let parser = MessageParser::new();
        let mut builder = CorpusBuilder::new(filter)?;

        info!(path = %path.display(), "Reading mbox corpus");
        for (i, entry) in mbox.iter().enumerate() {
            if i % 1000 == 0 {
                debug!(message = i, "Processing message");
            }
            let Some(message_bytes) = entry.message() else {
                warn!(start = entry.start().as_str(), "No message body in mbox entry");
                continue;
            };
            let Some(parsed) = parse_message(&parser, message_bytes, None) else {
                warn!(start = entry.start().as_str(), "Failed to parse message");
                continue;
            };
            if !builder.offer(parsed) {
                break;
            }
        }

        Ok(builder.finish())
    }

    /// Loads a newsgroup tree where each message lives at `<root>/<category>/<file>`.
    pub fn from_newsgroup_dir(root: &Path, filter: &CorpusFilter) -> Result<Corpus> {
        if !root.is_dir() {
            return Err(TopicsError::Corpus(format!("{} is not a directory", root.display())));
        }
        let parser = MessageParser::new();
        let mut builder = CorpusBuilder::new(filter)?;

        info!(path = %root.display(), "Reading newsgroup directory");
        for entry in WalkDir::new(root).min_depth(2).max_depth(2).sort_by_file_name() {
            let entry = entry.map_err(|e| TopicsError::Corpus(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let category = entry
                .path()
                .parent()
                .and_then(|p| p.file_name())
                .map(|name| name.to_string_lossy().into_owned());
            if !filter.accepts_category(category.as_deref()) {
                continue;
            }
            let bytes = std::fs::read(entry.path())?;
            let parsed = parse_message(&parser, &bytes, category.clone()).unwrap_or_else(|| {
                debug!(path = %entry.path().display(), "Not a parseable message, using raw text");
                ParsedMessage {
                    category,
                    subject: String::new(),
                    date: None,
                    body: String::from_utf8_lossy(&bytes).into_owned(),
                }
            });
            if !builder.offer(parsed) {
                break;
            }
        }

        Ok(builder.finish())
    }
}

fn parse_message(parser: &MessageParser, bytes: &[u8], category: Option<String>) -> Option<ParsedMessage> {
    let message = parser.parse(bytes)?;

    // The first group of the Newsgroups header stands in for the category of mbox input.
    let category = category.or_else(|| {
        message
            .headers()
            .iter()
            .find(|h| h.name.as_str().eq_ignore_ascii_case("newsgroups"))
            .and_then(|h| h.value.as_text())
            .and_then(|groups| groups.split(',').next())
            .map(|group| group.trim().to_string())
            .filter(|group| !group.is_empty())
    });

    let date = message
        .date()
        .and_then(|d| DateTime::<Utc>::from_timestamp(d.to_timestamp(), 0));

    Some(ParsedMessage {
        category,
        subject: message.subject().unwrap_or("").to_string(),
        date,
        body: message.body_text(0).map(|b| b.into_owned()).unwrap_or_default(),
    })
}

struct CorpusBuilder<'a> {
    filter: &'a CorpusFilter,
    accepted: usize,
    documents: Vec<RawDocument>,
}

impl<'a> CorpusBuilder<'a> {
    fn new(filter: &'a CorpusFilter) -> Result<Self> {
        if filter.sample_every == 0 {
            return Err(TopicsError::InvalidConfig("sample_every must be at least 1".into()));
        }
        Ok(CorpusBuilder {
            filter,
            accepted: 0,
            documents: Vec::new(),
        })
    }

    /// Returns `false` once the limit is reached and no more input is needed.
    fn offer(&mut self, parsed: ParsedMessage) -> bool {
        if let Some(limit) = self.filter.limit {
            if self.documents.len() >= limit {
                return false;
            }
        }
        if !self.filter.accepts_category(parsed.category.as_deref()) {
            return true;
        }
        let position = self.accepted;
        self.accepted += 1;
        if position % self.filter.sample_every != 0 {
            return true;
        }

        self.documents.push(RawDocument {
            id: self.documents.len(),
            category: parsed.category,
            subject: parsed.subject,
            date: parsed.date,
            body: parsed.body,
        });
        self.filter.limit.map_or(true, |limit| self.documents.len() < limit)
    }

    fn finish(self) -> Corpus {
        info!(
            documents = self.documents.len(),
            seen = self.accepted,
            "Corpus loaded"
        );
        Corpus {
            documents: self.documents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use std::fs;
    use std::io::Write;

    fn write_post(root: &Path, category: &str, name: &str, subject: &str, body: &str) {
        let dir = root.join(category);
        fs::create_dir_all(&dir).unwrap();
        let text = format!(
            "From: someone@example.com\nSubject: {subject}\nNewsgroups: {category}\n\n{body}\n"
        );
        fs::write(dir.join(name), text).unwrap();
    }

    fn fixture() -> tempfile::TempDir {
        let tmp = tempfile::TempDir::new().unwrap();
        write_post(tmp.path(), "sci.space", "1", "Shuttle", "The shuttle launch was delayed.");
        write_post(tmp.path(), "sci.space", "2", "Orbit", "Orbital mechanics are fun.");
        write_post(tmp.path(), "talk.politics.misc", "1", "Taxes", "Congress voted on taxes.");
        tmp
    }

    #[test]
    fn directory_categories_come_from_parent_folder() {
        let tmp = fixture();
        let corpus = Corpus::from_newsgroup_dir(tmp.path(), &CorpusFilter::default()).unwrap();

        assert_eq!(corpus.len(), 3);
        assert_eq!(corpus.documents[0].category.as_deref(), Some("sci.space"));
        assert_eq!(corpus.documents[0].subject, "Shuttle");
        assert!(corpus.documents[0].body.contains("shuttle launch"));
        assert_eq!(corpus.documents[2].category.as_deref(), Some("talk.politics.misc"));
        let ids: Vec<usize> = corpus.documents.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn category_allow_list_selects_subset() {
        let tmp = fixture();
        let filter = CorpusFilter {
            categories: Some(vec!["talk.politics.misc".to_string()]),
            ..CorpusFilter::default()
        };
        let corpus = Corpus::from_newsgroup_dir(tmp.path(), &filter).unwrap();

        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.documents[0].subject, "Taxes");
        assert_eq!(corpus.documents[0].id, 0);
    }

    #[test]
    fn sampling_and_limit_apply_in_order() {
        let tmp = fixture();
        let sampled = Corpus::from_newsgroup_dir(
            tmp.path(),
            &CorpusFilter {
                sample_every: 2,
                ..CorpusFilter::default()
            },
        )
        .unwrap();
        let subjects: Vec<&str> = sampled.documents.iter().map(|d| d.subject.as_str()).collect();
        assert_eq!(subjects, vec!["Shuttle", "Taxes"]);

        let limited = Corpus::from_newsgroup_dir(
            tmp.path(),
            &CorpusFilter {
                limit: Some(2),
                ..CorpusFilter::default()
            },
        )
        .unwrap();
        assert_eq!(limited.len(), 2);
    }

    const MBOX: &str = "\
From alice@example.com Mon Apr  5 10:00:00 1993
From: alice@example.com
Newsgroups: sci.space,sci.astro
Subject: Shuttle launch
Date: Mon, 5 Apr 1993 10:00:00 +0000

The shuttle launch went well.

From bob@example.com Tue Apr  6 11:30:00 1993
From: bob@example.com
Newsgroups: talk.politics.misc
Subject: Budget vote
Date: Tue, 6 Apr 1993 11:30:00 +0000

The senate vote is tomorrow.

From carol@example.com Wed Apr  7 09:15:00 1993
From: carol@example.com
Newsgroups: sci.space
Subject: Orbit decay
Date: Wed, 7 Apr 1993 09:15:00 +0000

Orbital decay is slow at that altitude.
";

    fn mbox_fixture() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MBOX.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn mbox_category_is_first_newsgroup() {
        let file = mbox_fixture();
        let corpus = Corpus::from_mbox(file.path(), &CorpusFilter::default()).unwrap();

        assert_eq!(corpus.len(), 3);
        let first = &corpus.documents[0];
        assert_eq!(first.category.as_deref(), Some("sci.space"));
        assert_eq!(first.subject, "Shuttle launch");
        assert!(first.body.contains("shuttle launch went well"));
        let date = first.date.expect("parsed date");
        assert_eq!((date.year(), date.month(), date.day()), (1993, 4, 5));
        assert_eq!(corpus.documents[1].category.as_deref(), Some("talk.politics.misc"));
    }

    #[test]
    fn mbox_respects_sampling_and_limit() {
        let file = mbox_fixture();
        let sampled = Corpus::from_mbox(
            file.path(),
            &CorpusFilter {
                sample_every: 2,
                ..CorpusFilter::default()
            },
        )
        .unwrap();
        let subjects: Vec<&str> = sampled.documents.iter().map(|d| d.subject.as_str()).collect();
        assert_eq!(subjects, vec!["Shuttle launch", "Orbit decay"]);

        let limited = Corpus::from_mbox(
            file.path(),
            &CorpusFilter {
                limit: Some(1),
                ..CorpusFilter::default()
            },
        )
        .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited.documents[0].subject, "Shuttle launch");

        let space_only = Corpus::from_mbox(
            file.path(),
            &CorpusFilter {
                categories: Some(vec!["sci.space".to_string()]),
                ..CorpusFilter::default()
            },
        )
        .unwrap();
        assert_eq!(space_only.len(), 2);
    }

    #[test]
    fn zero_sample_step_is_rejected() {
        let tmp = fixture();
        let filter = CorpusFilter {
            sample_every: 0,
            ..CorpusFilter::default()
        };
        assert!(matches!(
            Corpus::from_newsgroup_dir(tmp.path(), &filter),
            Err(TopicsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        assert!(Corpus::from_newsgroup_dir(&missing, &CorpusFilter::default()).is_err());
    }
}
