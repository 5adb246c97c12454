//! Workflow matcher: picks the stored workflow that best serves a request.
//!
//! Tiers are tried cheapest first and the first confident hit wins:
//! 1. **Keyword**: overlap between request tokens and the candidate's name,
//!    description and tags, as a share of the request tokens.
//! 2. **Composition**: Jaccard similarity between the agent types the request
//!    needs (via [`KeywordTypeMap`]) and the candidate's node types.
//! 3. **Semantic**: the reasoning service's pick, if its confidence is high
//!    enough and it names a real candidate.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::keywords::{tokenize, KeywordTypeMap};
use crate::models::WorkflowGraph;
use crate::reasoning::{ReasoningService, WorkflowSummary};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Which candidate wins when several reach the same best score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The earliest candidate in stored order.
    #[default]
    FirstInOrder,
    /// The latest candidate in stored order.
    LastInOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Minimum keyword confidence (overlap / request tokens).
    pub keyword_threshold: f64,
    /// Minimum number of shared tokens for a keyword hit.
    pub keyword_min_overlap: usize,
    /// Minimum Jaccard similarity for a composition hit.
    pub composition_threshold: f64,
    /// Minimum confidence reported by the reasoning service.
    pub semantic_threshold: f64,
    pub tie_break: TieBreak,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            keyword_threshold: 0.5,
            keyword_min_overlap: 2,
            composition_threshold: 0.7,
            semantic_threshold: 0.7,
            tie_break: TieBreak::FirstInOrder,
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Keyword,
    Composition,
    Semantic,
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchTier::Keyword => write!(f, "keyword"),
            MatchTier::Composition => write!(f, "composition"),
            MatchTier::Semantic => write!(f, "semantic"),
        }
    }
}

/// A confident match against one of the candidates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkflowMatch<'a> {
    pub graph: &'a WorkflowGraph,
    pub confidence: f64,
    pub tier: MatchTier,
}

// ---------------------------------------------------------------------------
// WorkflowMatcher
// ---------------------------------------------------------------------------

pub struct WorkflowMatcher {
    config: MatcherConfig,
    keywords: KeywordTypeMap,
    reasoner: Arc<dyn ReasoningService>,
}

impl WorkflowMatcher {
    pub fn new(config: MatcherConfig, keywords: KeywordTypeMap, reasoner: Arc<dyn ReasoningService>) -> Self {
        Self { config, keywords, reasoner }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Run the tiers in order. `None` means no tier was confident and the
    /// caller should compose a workflow instead.
    pub async fn find_match<'a>(
        &self,
        request: &str,
        candidates: &'a [WorkflowGraph],
    ) -> Option<WorkflowMatch<'a>> {
        if candidates.is_empty() {
            debug!("no stored workflows to match against");
            return None;
        }

        let found = match self.keyword_tier(request, candidates) {
            Some(hit) => Some(hit),
            None => match self.composition_tier(request, candidates) {
                Some(hit) => Some(hit),
                None => self.semantic_tier(request, candidates).await,
            },
        };

        match &found {
            Some(hit) => info!(
                "matched workflow '{}' at {} tier (confidence {:.2})",
                hit.graph.id, hit.tier, hit.confidence
            ),
            None => info!("no stored workflow matches the request"),
        }
        found
    }

    pub fn keyword_tier<'a>(&self, request: &str, candidates: &'a [WorkflowGraph]) -> Option<WorkflowMatch<'a>> {
        let request_tokens = tokenize(request);
        if request_tokens.is_empty() {
            return None;
        }

        let scored = candidates.iter().filter_map(|graph| {
            let text = format!("{} {} {}", graph.name, graph.description, graph.tags.join(" "));
            let graph_tokens: HashSet<String> = tokenize(&text).into_iter().collect();
            let overlap = request_tokens.iter().filter(|t| graph_tokens.contains(*t)).count();
            let confidence = overlap as f64 / request_tokens.len() as f64;
            (overlap >= self.config.keyword_min_overlap && confidence >= self.config.keyword_threshold)
                .then_some((graph, confidence))
        });

        self.pick(scored, MatchTier::Keyword)
    }

    pub fn composition_tier<'a>(&self, request: &str, candidates: &'a [WorkflowGraph]) -> Option<WorkflowMatch<'a>> {
        let needed = self.keywords.infer_types(request);
        if needed.is_empty() {
            return None;
        }

        let scored = candidates.iter().filter_map(|graph| {
            let similarity = jaccard(&needed, &graph.type_ids());
            (similarity >= self.config.composition_threshold).then_some((graph, similarity))
        });

        self.pick(scored, MatchTier::Composition)
    }

    async fn semantic_tier<'a>(&self, request: &str, candidates: &'a [WorkflowGraph]) -> Option<WorkflowMatch<'a>> {
        let summaries: Vec<WorkflowSummary> = candidates.iter().map(WorkflowSummary::from).collect();

        let choice = match self.reasoner.choose_workflow(request, &summaries).await {
            Ok(choice) => choice,
            Err(err) => {
                warn!("semantic matching skipped: {}", err);
                return None;
            }
        };

        let chosen_id = choice.workflow_id?;
        if choice.confidence < self.config.semantic_threshold {
            debug!("semantic pick '{}' below threshold ({:.2})", chosen_id, choice.confidence);
            return None;
        }

        match candidates.iter().find(|g| g.id == chosen_id) {
            Some(graph) => Some(WorkflowMatch {
                graph,
                confidence: choice.confidence.min(1.0),
                tier: MatchTier::Semantic,
            }),
            None => {
                warn!("reasoning service chose unknown workflow '{}'", chosen_id);
                None
            }
        }
    }

    /// Best score among passing candidates, honouring the tie-break rule.
    fn pick<'a>(
        &self,
        scored: impl Iterator<Item = (&'a WorkflowGraph, f64)>,
        tier: MatchTier,
    ) -> Option<WorkflowMatch<'a>> {
        let mut best: Option<(&'a WorkflowGraph, f64)> = None;
        for (graph, score) in scored {
            let better = match best {
                None => true,
                Some((_, top)) => match self.config.tie_break {
                    TieBreak::FirstInOrder => score > top,
                    TieBreak::LastInOrder => score >= top,
                },
            };
            if better {
                best = Some((graph, score));
            }
        }
        best.map(|(graph, confidence)| WorkflowMatch { graph, confidence, tier })
    }
}

/// Jaccard similarity of two sets of type ids; 0 when both are empty.
pub(crate) fn jaccard<A: AsRef<str>, B: AsRef<str>>(left: &[A], right: &[B]) -> f64 {
    let left: HashSet<&str> = left.iter().map(AsRef::as_ref).collect();
    let right: HashSet<&str> = right.iter().map(AsRef::as_ref).collect();
    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    left.intersection(&right).count() as f64 / union as f64
}
