//! Request tokenisation and the domain-keyword → agent type table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "i", "in", "into", "is", "it",
    "me", "my", "of", "on", "or", "our", "please", "that", "the", "their", "them", "then", "this",
    "to", "us", "we", "with",
];

/// Lower-case content words of `text`, de-duplicated in first-seen order.
///
/// Punctuation splits words, stopwords are dropped and a trailing plural `s`
/// is removed, so "Deals" and "deal" compare equal.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for word in text.split(|c: char| !c.is_alphanumeric()) {
        let word = word.to_lowercase();
        if word.is_empty() || STOPWORDS.contains(&word.as_str()) {
            continue;
        }
        let token = stem(word);
        if !tokens.contains(&token) {
            tokens.push(token);
        }
    }
    tokens
}

fn stem(word: String) -> String {
    if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") {
        word[..word.len() - 1].to_owned()
    } else {
        word
    }
}

/// Which agent types a request plausibly needs, keyed by domain keyword.
///
/// Serialised as `type_id = ["keyword", ...]`, which is also how the CLI
/// config file overrides it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordTypeMap {
    types: BTreeMap<String, Vec<String>>,
}

impl Default for KeywordTypeMap {
    fn default() -> Self {
        Self::empty()
            .with(
                "sales_intelligence",
                ["sales", "deal", "opportunity", "pipeline", "lead", "salesforce", "revenue", "crm"],
            )
            .with("slack", ["slack", "notify", "notification", "alert", "channel", "post"])
            .with("jira", ["jira", "ticket", "issue", "bug", "story", "task"])
            .with("email_outreach", ["email", "mail", "outreach", "follow", "contact"])
    }
}

impl KeywordTypeMap {
    pub fn empty() -> Self {
        Self { types: BTreeMap::new() }
    }

    /// Add keywords for `type_id` (merged with any already present).
    pub fn with<I, S>(mut self, type_id: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entry = self.types.entry(type_id.into()).or_default();
        for keyword in keywords {
            for token in tokenize(keyword.as_ref()) {
                if !entry.contains(&token) {
                    entry.push(token);
                }
            }
        }
        self
    }

    /// Agent types mentioned by `request`, in order of first mention.
    pub fn infer_types(&self, request: &str) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for token in tokenize(request) {
            for (type_id, keywords) in &self.types {
                if keywords.contains(&token) && !found.contains(type_id) {
                    found.push(type_id.clone());
                }
            }
        }
        found
    }

    pub fn type_ids(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}
