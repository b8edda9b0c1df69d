//! Text cleaning and tokenization.

use std::collections::HashSet;

use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use regex::Regex;
use tracing::debug;

use crate::models::RawDocument;
use crate::parallel::with_workers;

/// Removes structural noise from a newsgroup post: header block, quoted
/// replies, signature footer, addresses and URLs.
pub struct TextCleaner {
    header_re: Regex,
    quote_re: Regex,
    address_re: Regex,
    url_re: Regex,
    space_re: Regex,
}

impl Default for TextCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl TextCleaner {
    pub fn new() -> Self {
        TextCleaner {
            header_re: Regex::new(r"(?i)^(from|subject|newsgroups|path|message-id|date|organization|lines|xref|sender|reply-to):")
                .expect("static regex"),
            quote_re: Regex::new(r"(?i)((writes|wrote|says|said):\s*$|writes in\b.*:\s*$|^in article|^quoted from|^\||^>)")
                .expect("static regex"),
            address_re: Regex::new(r"\S+@\S+").expect("static regex"),
            url_re: Regex::new(r"(?i)\b(?:https?|ftp)://\S+").expect("static regex"),
            space_re: Regex::new(r"\s+").expect("static regex"),
        }
    }

    pub fn clean(&self, text: &str) -> String {
        let body = strip_footer(strip_header(&self.header_re, text));

        let kept: Vec<&str> = body
            .lines()
            .filter(|line| !self.quote_re.is_match(line.trim_start()))
            .collect();
        let joined = kept.join("\n");

        let joined = self.url_re.replace_all(&joined, " ");
        let joined = self.address_re.replace_all(&joined, " ");
        self.space_re.replace_all(joined.trim(), " ").into_owned()
    }
}

/// Drops a leading header block, if the text still has one.
fn strip_header<'a>(header_re: &Regex, text: &'a str) -> &'a str {
    if !header_re.is_match(text) {
        return text;
    }
    match text.find("\n\n") {
        Some(pos) => &text[pos + 2..],
        None => text,
    }
}

/// Cuts everything from the last line made only of dashes.
fn strip_footer(text: &str) -> String {
    let lines: Vec<&str> = text.trim().lines().collect();
    let footer = lines.iter().rposition(|line| {
        let line = line.trim();
        !line.is_empty() && line.trim_matches('-').is_empty()
    });
    match footer {
        Some(pos) if pos > 0 => lines[..pos].join("\n"),
        _ => lines.join("\n"),
    }
}

pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Lowercasing word tokenizer with stop-word and length filtering.
pub struct RegexTokenizer {
    word_re: Regex,
    stop_words: HashSet<&'static str>,
    min_token_len: usize,
}

const STOP_WORDS: &[&str] = &[
    // Common English stop words
    "the", "and", "for", "are", "but", "not", "you", "your", "all", "can", "had",
    "her", "was", "one", "our", "out", "get", "has", "him", "his", "how", "its",
    "may", "now", "see", "who", "did", "way", "what", "when", "where", "will",
    "with", "this", "that", "have", "from", "they", "know", "been", "much", "some",
    "very", "here", "just", "like", "make", "many", "over", "such", "than", "them",
    "well", "were", "there", "these", "those", "then", "which", "while", "about",
    "into", "also", "only", "other", "any", "each", "more", "most", "own", "same",
    "should", "would", "could", "might", "shall", "does", "doing", "being",
    "because", "again", "once", "why", "off", "too", "very", "their", "theirs",
    "ours", "yours", "mine", "she", "hers", "him", "himself", "herself", "itself",
    "themselves", "yourself", "ourselves", "after", "before", "above", "below",
    "between", "through", "during", "under", "until", "against", "both", "few",
    "nor", "whom", "whose",
    // Newsgroup boilerplate
    "article", "writes", "wrote", "subject", "organization", "lines", "reply",
    "email", "mail", "posting", "host", "nntp", "edu", "com", "org", "net",
    "http", "https", "www", "ftp",
];

impl RegexTokenizer {
    pub fn new(min_token_len: usize) -> Self {
        RegexTokenizer {
            word_re: Regex::new(r"[a-z]+").expect("static regex"),
            stop_words: STOP_WORDS.iter().copied().collect(),
            min_token_len,
        }
    }
}

impl Tokenizer for RegexTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        self.word_re
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|word| !self.stop_words.contains(*word))
            .filter(|word| word.chars().count() >= self.min_token_len)
            .map(|word| word.to_string())
            .collect()
    }
}

/// Cleans and tokenizes every document on a pool of `workers` threads.
/// The output is indexed by document position.
pub fn preprocess_corpus(
    documents: &[RawDocument],
    cleaner: &TextCleaner,
    tokenizer: &dyn Tokenizer,
    workers: usize,
) -> Vec<Vec<String>> {
    let progress = ProgressBar::new(documents.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("{spinner} preprocessing [{bar:40}] {pos}/{len}") {
        progress.set_style(style);
    }

    let tokenized: Vec<Vec<String>> = with_workers(workers, || {
        documents
            .par_iter()
            .progress_with(progress.clone())
            .map(|doc| tokenizer.tokenize(&format!("{}\n{}", doc.subject, cleaner.clean(&doc.body))))
            .collect()
    });
    progress.finish_and_clear();

    debug!(
        documents = tokenized.len(),
        tokens = tokenized.iter().map(Vec::len).sum::<usize>(),
        "Preprocessing finished"
    );
    tokenized
}
