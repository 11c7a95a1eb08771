//! In-memory scholar client for tests and offline runs

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::models::{PaperDetails, PaperRef, PaperSummary};
use super::ScholarClient;
use crate::errors::{AppError, Result};

/// Fixed catalogue searched by case-insensitive title substring
#[derive(Default)]
pub struct StaticScholar {
    papers: Vec<PaperDetails>,
    abstracts: Vec<(String, String)>,
    keyed: bool,
    failing: AtomicBool,
    failing_details: AtomicBool,
    detail_calls: AtomicUsize,
    search_calls: AtomicUsize,
}

impl StaticScholar {
    pub fn new(papers: Vec<PaperDetails>) -> Self {
        Self {
            papers,
            ..Self::default()
        }
    }

    /// Attach an abstract to a catalogued paper
    pub fn with_abstract(mut self, paper_id: &str, text: &str) -> Self {
        self.abstracts.push((paper_id.to_string(), text.to_string()));
        self
    }

    /// Report keyed ("Pro") mode
    pub fn keyed(mut self) -> Self {
        self.keyed = true;
        self
    }

    /// Make every subsequent call fail with an upstream error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make only `get_paper` fail, leaving search intact
    pub fn set_failing_details(&self, failing: bool) {
        self.failing_details.store(failing, Ordering::SeqCst);
    }

    /// Number of `get_paper` calls served so far
    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    fn check_failing(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Upstream {
                status: 503,
                message: "static catalogue offline".to_string(),
            });
        }
        Ok(())
    }

    fn abstract_for(&self, paper_id: &str) -> Option<String> {
        self.abstracts
            .iter()
            .find(|(id, _)| id == paper_id)
            .map(|(_, text)| text.clone())
    }

    /// A small catalogue around "Attention Is All You Need"
    pub fn sample() -> Self {
        let transformer = PaperDetails {
            paper_id: "204e3073870fae3d05bcbc2f6a8e263d9b72e776".to_string(),
            title: Some("Attention Is All You Need".to_string()),
            year: Some(2017),
            authors: Vec::new(),
            references: vec![
                PaperRef::new("43428880d75b3a14257c3ee9bda054e61eb869c0", "Convolutional Sequence to Sequence Learning"),
                PaperRef::new("fa72afa9b2cbc8f0d7b05d52548906610ffbb9c5", "Neural Machine Translation by Jointly Learning to Align and Translate"),
                PaperRef { paper_id: None, title: Some("An unresolved reference".to_string()) },
                PaperRef::new("2e9d221c206e9503ceb452302d68d10e293f2a10", "Long Short-Term Memory"),
            ],
            citations: vec![
                PaperRef::new("df2b0e26d0599ce3e70df8a9da02e51594e0e992", "BERT: Pre-training of Deep Bidirectional Transformers for Language Understanding"),
                PaperRef::new("9405cc0d6169988371b2755e573cc28650d14dfe", "Language Models are Unsupervised Multitask Learners"),
            ],
        };

        let bert = PaperDetails {
            paper_id: "df2b0e26d0599ce3e70df8a9da02e51594e0e992".to_string(),
            title: Some("BERT: Pre-training of Deep Bidirectional Transformers for Language Understanding".to_string()),
            year: Some(2019),
            authors: Vec::new(),
            references: vec![PaperRef::new(
                "204e3073870fae3d05bcbc2f6a8e263d9b72e776",
                "Attention Is All You Need",
            )],
            citations: Vec::new(),
        };

        Self::new(vec![transformer, bert]).with_abstract(
            "204e3073870fae3d05bcbc2f6a8e263d9b72e776",
            "The dominant sequence transduction models are based on complex recurrent or convolutional neural networks.",
        )
    }
}

#[async_trait]
impl ScholarClient for StaticScholar {
    async fn search_paper(&self, query: &str, limit: usize) -> Result<Vec<PaperSummary>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;

        let needle = query.trim().to_lowercase();
        Ok(self
            .papers
            .iter()
            .filter(|p| {
                p.title
                    .as_deref()
                    .is_some_and(|t| t.to_lowercase().contains(&needle))
            })
            .take(limit)
            .map(|p| PaperSummary {
                abstract_text: self.abstract_for(&p.paper_id),
                ..p.summary()
            })
            .collect())
    }

    async fn get_paper(&self, paper_id: &str) -> Result<PaperDetails> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;
        if self.failing_details.load(Ordering::SeqCst) {
            return Err(AppError::UpstreamTimeout { timeout_ms: 30_000 });
        }

        self.papers
            .iter()
            .find(|p| p.paper_id == paper_id)
            .cloned()
            .ok_or_else(|| AppError::PaperNotFound {
                id: paper_id.to_string(),
            })
    }

    fn has_api_key(&self) -> bool {
        self.keyed
    }
}
