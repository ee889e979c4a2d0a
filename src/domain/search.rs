//! Exact top-K similarity search over an immutable [`KnowledgeBase`].
//!
//! Scores are dot products, which equal cosine similarity because every
//! stored embedding and every query vector is L2-normalized where it is
//! produced (see `infrastructure::embeddings` and `KnowledgeBaseBuilder`).
//! Norms are not re-checked here.
//!
//! Results are ordered by descending score; equal scores keep corpus order.
//! Every selection strategy ranks with the same total order, so they return
//! identical hits, tie order included.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::domain::{vector, Document, DomainError, KnowledgeBase};

/// Corpus size at which [`SelectionStrategy::Auto`] switches to partial selection.
pub const PARTIAL_SELECT_THRESHOLD: usize = 4096;

/// How the K best scores are picked out of the full score vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionStrategy {
    /// Sort all N scores, keep the first K. O(N log N).
    FullSort,
    /// Partition around the K-th best, then sort only the K survivors. O(N + K log K).
    PartialSelect,
    /// `PartialSelect` for large corpora, `FullSort` otherwise.
    #[default]
    Auto,
}

impl SelectionStrategy {
    fn resolve(self, n: usize, k: usize) -> Self {
        match self {
            Self::Auto if n >= PARTIAL_SELECT_THRESHOLD && k < n => Self::PartialSelect,
            Self::Auto => Self::FullSort,
            other => other,
        }
    }
}

/// One ranked match, borrowing its document from the knowledge base.
#[derive(Debug, Clone, Copy)]
pub struct SearchHit<'kb> {
    /// 1-based position in the result list.
    pub rank: usize,
    /// Row of the document in the knowledge base.
    pub index: usize,
    pub document: &'kb Document,
    pub score: f32,
}

/// Stateless search engine; holds only the selection strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchEngine {
    strategy: SelectionStrategy,
}

impl SearchEngine {
    pub fn new(strategy: SelectionStrategy) -> Self {
        Self { strategy }
    }

    /// Return up to `k` documents most similar to `query`.
    ///
    /// Fails with `InvalidArgument` when `k == 0` and with `DimensionMismatch`
    /// when `query` does not match the knowledge base dimensionality, even if
    /// the knowledge base is empty. An empty knowledge base yields no hits.
    pub fn search<'kb>(
        &self,
        query: &[f32],
        knowledge_base: &'kb KnowledgeBase,
        k: usize,
    ) -> Result<Vec<SearchHit<'kb>>, DomainError> {
        if k == 0 {
            return Err(DomainError::invalid_argument("k must be at least 1"));
        }
        if query.len() != knowledge_base.dimensions() {
            return Err(DomainError::dimension_mismatch(
                knowledge_base.dimensions(),
                query.len(),
            ));
        }
        if knowledge_base.is_empty() {
            return Ok(Vec::new());
        }

        let scored = score_rows(query, knowledge_base);
        let top = select_top_k(scored, k, self.strategy);

        let documents = knowledge_base.documents();
        Ok(top
            .into_iter()
            .enumerate()
            .map(|(pos, (index, score))| SearchHit {
                rank: pos + 1,
                index,
                document: &documents[index],
                score,
            })
            .collect())
    }
}

/// [`SearchEngine::search`] with the default strategy.
pub fn search<'kb>(
    query: &[f32],
    knowledge_base: &'kb KnowledgeBase,
    k: usize,
) -> Result<Vec<SearchHit<'kb>>, DomainError> {
    SearchEngine::default().search(query, knowledge_base, k)
}

/// Matrix-vector product: one `(row, score)` per stored embedding.
fn score_rows(query: &[f32], knowledge_base: &KnowledgeBase) -> Vec<(usize, f32)> {
    let dims = knowledge_base.dimensions();
    // `+ 0.0` folds -0.0 into +0.0 so numerically equal scores compare equal.
    let score = |(index, row): (usize, &[f32])| (index, vector::dot(row, query) + 0.0);

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        knowledge_base
            .matrix()
            .par_chunks_exact(dims)
            .enumerate()
            .map(score)
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        knowledge_base
            .matrix()
            .chunks_exact(dims)
            .enumerate()
            .map(score)
            .collect()
    }
}

/// Higher score first, then lower corpus index.
fn rank_order(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

fn select_top_k(
    mut scored: Vec<(usize, f32)>,
    k: usize,
    strategy: SelectionStrategy,
) -> Vec<(usize, f32)> {
    let n = scored.len();
    let k = k.min(n);
    if k == 0 {
        return Vec::new();
    }

    match strategy.resolve(n, k) {
        SelectionStrategy::PartialSelect => {
            if k < n {
                scored.select_nth_unstable_by(k - 1, rank_order);
                scored.truncate(k);
            }
            scored.sort_unstable_by(rank_order);
        }
        _ => {
            scored.sort_unstable_by(rank_order);
            scored.truncate(k);
        }
    }

    scored
}
