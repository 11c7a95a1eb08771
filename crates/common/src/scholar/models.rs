//! Semantic Scholar Graph API records
//!
//! Field names follow the upstream JSON (`paperId`, `abstract`, ...).

use serde::{Deserialize, Serialize};

/// One search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperSummary {
    #[serde(rename = "paperId")]
    pub paper_id: String,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub year: Option<i32>,

    #[serde(rename = "abstract", default)]
    pub abstract_text: Option<String>,
}

impl PaperSummary {
    /// First `max_chars` characters of the abstract, with `...` appended
    pub fn abstract_preview(&self, max_chars: usize) -> Option<String> {
        let text = self.abstract_text.as_deref().filter(|t| !t.is_empty())?;
        let preview: String = text.chars().take(max_chars).collect();
        Some(format!("{preview}..."))
    }
}

/// Reference or citation entry; upstream may null either field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRef {
    #[serde(rename = "paperId", default)]
    pub paper_id: Option<String>,

    #[serde(default)]
    pub title: Option<String>,
}

impl PaperRef {
    pub fn new(paper_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            paper_id: Some(paper_id.into()),
            title: Some(title.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(rename = "authorId", default)]
    pub author_id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,
}

/// Full record of a seed paper with its neighborhood
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperDetails {
    #[serde(rename = "paperId")]
    pub paper_id: String,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub year: Option<i32>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub authors: Vec<Author>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub references: Vec<PaperRef>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub citations: Vec<PaperRef>,
}

impl PaperDetails {
    pub fn summary(&self) -> PaperSummary {
        PaperSummary {
            paper_id: self.paper_id.clone(),
            title: self.title.clone(),
            year: self.year,
            abstract_text: None,
        }
    }
}

/// Search endpoint envelope
#[derive(Debug, Deserialize)]
pub(crate) struct SearchEnvelope {
    #[serde(default)]
    #[allow(dead_code)]
    pub total: Option<u64>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Vec<SearchHit>,
}

/// Search hit as returned upstream, before hits without an id are dropped
#[derive(Debug, Deserialize)]
pub(crate) struct SearchHit {
    #[serde(rename = "paperId", default)]
    pub paper_id: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub year: Option<i32>,

    #[serde(rename = "abstract", default)]
    pub abstract_text: Option<String>,
}

impl SearchHit {
    pub fn into_summary(self) -> Option<PaperSummary> {
        Some(PaperSummary {
            paper_id: self.paper_id.filter(|id| !id.is_empty())?,
            title: self.title,
            year: self.year,
            abstract_text: self.abstract_text,
        })
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
