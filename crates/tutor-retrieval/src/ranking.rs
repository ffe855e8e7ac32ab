//! Multi-tier ranking, coverage and context synthesis.
//!
//! Ranking groups candidate chunks by tier, orders each tier by quality, then
//! applies that tier's [`RetrievalStrategy`]: a similarity floor, a per-tier
//! cap and a weight multiplied into quality. Survivors from all tiers are
//! merged and re-sorted by weighted quality. Tiers without a strategy
//! contribute nothing.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use tutor_types::{extract_keywords, KnowledgeChunk, KnowledgeTier, RankingSettings, RetrievalStrategy};

use crate::quality::{QualityBreakdown, QualityScorer};

/// Related chunks pulled in per selected chunk during expansion.
pub const MAX_EXPANSION_PER_CHUNK: usize = 3;

/// A chunk with its scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedChunk {
    pub chunk: KnowledgeChunk,

    /// Unweighted quality signals
    pub quality: QualityBreakdown,

    /// Quality multiplied by the tier weight
    pub weighted_quality: f32,

    /// Pulled in by context expansion rather than ranking
    #[serde(default)]
    pub expanded: bool,
}

/// Synthesized context block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedContext {
    /// Prompt-ready text
    pub text: String,

    /// Estimated tokens of included chunk content
    pub token_estimate: usize,

    /// Number of chunks included
    pub included: usize,
}

/// Everything the engine produced for one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingReport {
    /// Ranked chunks followed by any expansion chunks
    pub ranked: Vec<RankedChunk>,

    /// Fraction of query keywords found in the selected content
    pub coverage: f32,

    /// Selected chunks per tier
    pub tier_counts: BTreeMap<KnowledgeTier, usize>,

    /// Synthesized context
    pub context: SynthesizedContext,
}

impl RankingReport {
    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}

/// Quality-weighted fusion of chunks from several tiers.
#[derive(Debug, Clone)]
pub struct RankingEngine {
    scorer: QualityScorer,
    settings: RankingSettings,
}

impl RankingEngine {
    /// Create an engine with default settings.
    pub fn new(scorer: QualityScorer) -> Self {
        Self::with_settings(scorer, RankingSettings::default())
    }

    /// Create an engine with custom settings.
    pub fn with_settings(scorer: QualityScorer, settings: RankingSettings) -> Self {
        Self { scorer, settings }
    }

    pub fn settings(&self) -> &RankingSettings {
        &self.settings
    }

    /// Replace the per-tier strategies.
    pub fn with_strategies(mut self, strategies: Vec<RetrievalStrategy>) -> Self {
        self.settings.strategies = strategies;
        self
    }

    fn strategy_for(&self, tier: KnowledgeTier) -> Option<&RetrievalStrategy> {
        self.settings.strategies.iter().find(|s| s.tier == tier)
    }

    /// Rank candidates and keep at most `cap` of them.
    pub fn rank(
        &self,
        chunks: &[KnowledgeChunk],
        query_topics: &[String],
        cap: usize,
        now: DateTime<Utc>,
    ) -> Vec<RankedChunk> {
        let mut by_tier: BTreeMap<KnowledgeTier, Vec<RankedChunk>> = BTreeMap::new();
        for chunk in chunks {
            let quality = self.scorer.score(chunk, query_topics, now);
            by_tier.entry(chunk.tier).or_default().push(RankedChunk {
                chunk: chunk.clone(),
                quality,
                weighted_quality: quality.total,
                expanded: false,
            });
        }

        let mut merged = Vec::new();
        for (tier, mut tier_chunks) in by_tier {
            let Some(strategy) = self.strategy_for(tier) else {
                debug!(tier = %tier, dropped = tier_chunks.len(), "No strategy for tier");
                continue;
            };

            tier_chunks.sort_by(|a, b| cmp_desc(a.quality.total, b.quality.total, a, b));
            let kept: Vec<RankedChunk> = tier_chunks
                .into_iter()
                .filter(|r| r.chunk.similarity >= strategy.min_similarity)
                .take(strategy.max_chunks)
                .map(|mut r| {
                    r.weighted_quality = r.quality.total * strategy.weight;
                    r
                })
                .collect();

            debug!(tier = %tier, kept = kept.len(), weight = strategy.weight, "Tier ranked");
            merged.extend(kept);
        }

        merged.sort_by(|a, b| cmp_desc(a.weighted_quality, b.weighted_quality, a, b));
        merged.truncate(cap);
        merged
    }

    /// Chunks named in `related_chunk_ids` of the selection that are not yet
    /// selected, at most three per selected chunk, in selection order.
    pub fn expand_context(
        &self,
        selected: &[RankedChunk],
        pool: &[KnowledgeChunk],
        query_topics: &[String],
        now: DateTime<Utc>,
    ) -> Vec<RankedChunk> {
        let mut taken: HashSet<&str> = selected.iter().map(|r| r.chunk.id.as_str()).collect();
        let mut extra = Vec::new();

        for ranked in selected {
            let mut added = 0;
            for related_id in &ranked.chunk.related_chunk_ids {
                if added >= MAX_EXPANSION_PER_CHUNK {
                    break;
                }
                if taken.contains(related_id.as_str()) {
                    continue;
                }
                if let Some(found) = pool.iter().find(|c| &c.id == related_id) {
                    let quality = self.scorer.score(found, query_topics, now);
                    let weight = self.strategy_for(found.tier).map(|s| s.weight).unwrap_or(0.0);
                    taken.insert(found.id.as_str());
                    extra.push(RankedChunk {
                        chunk: found.clone(),
                        quality,
                        weighted_quality: quality.total * weight,
                        expanded: true,
                    });
                    added += 1;
                }
            }
        }

        extra
    }

    /// Render chunks into a tiered context block within the token budget.
    pub fn synthesize(&self, ranked: &[RankedChunk]) -> SynthesizedContext {
        let mut by_tier: BTreeMap<KnowledgeTier, Vec<&KnowledgeChunk>> = BTreeMap::new();
        for r in ranked {
            by_tier.entry(r.chunk.tier).or_default().push(&r.chunk);
        }

        let budget = self.settings.token_budget;
        let mut text = String::new();
        let mut tokens = 0usize;
        let mut included = 0usize;

        'tiers: for (tier, chunks) in by_tier {
            let mut header_written = false;
            for chunk in chunks {
                let cost = chunk.estimated_tokens();
                if tokens + cost > budget {
                    break 'tiers;
                }
                if !header_written {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(&format!("## {}\n\n", tier.heading()));
                    header_written = true;
                }
                text.push_str(chunk.content.trim());
                text.push('\n');
                text.push_str(&self.attribution_line(chunk));
                text.push_str("\n\n");
                tokens += cost;
                included += 1;
            }
        }

        SynthesizedContext {
            text: text.trim_end().to_string(),
            token_estimate: tokens,
            included,
        }
    }

    fn attribution_line(&self, chunk: &KnowledgeChunk) -> String {
        let mut line = chunk.source.attribution();
        if let Some(topic_id) = &chunk.topic_id {
            let label = self
                .scorer
                .graph()
                .and_then(|g| g.get_topic(topic_id))
                .map(|t| t.name.as_str())
                .unwrap_or(topic_id.as_str());
            line.push_str(&format!(" | Topic: {}", label));
        }
        line
    }

    /// Rank, optionally expand, measure coverage and synthesize in one call.
    pub fn run(
        &self,
        query: &str,
        chunks: &[KnowledgeChunk],
        query_topics: &[String],
    ) -> RankingReport {
        let now = Utc::now();
        let mut ranked = self.rank(chunks, query_topics, self.settings.max_chunks, now);
        if self.settings.expand_context {
            let extra = self.expand_context(&ranked, chunks, query_topics, now);
            ranked.extend(extra);
        }

        let coverage = coverage(query, ranked.iter().map(|r| &r.chunk));
        let mut tier_counts = BTreeMap::new();
        for r in &ranked {
            *tier_counts.entry(r.chunk.tier).or_insert(0) += 1;
        }
        let context = self.synthesize(&ranked);

        debug!(
            candidates = chunks.len(),
            selected = ranked.len(),
            coverage = coverage,
            tokens = context.token_estimate,
            "Ranking complete"
        );

        RankingReport {
            ranked,
            coverage,
            tier_counts,
            context,
        }
    }
}

/// Fraction of query keywords appearing as substrings in the combined,
/// lowercased chunk content. Zero when there are no chunks or no keywords.
pub fn coverage<'a>(query: &str, chunks: impl IntoIterator<Item = &'a KnowledgeChunk>) -> f32 {
    let combined: String = chunks
        .into_iter()
        .map(|c| c.content.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    if combined.is_empty() {
        return 0.0;
    }

    let keywords = extract_keywords(query);
    if keywords.is_empty() {
        return 0.0;
    }

    let covered = keywords.iter().filter(|k| combined.contains(k.as_str())).count();
    covered as f32 / keywords.len() as f32
}

// Descending by score, ties by chunk id for a deterministic order.
fn cmp_desc(a_score: f32, b_score: f32, a: &RankedChunk, b: &RankedChunk) -> Ordering {
    b_score
        .partial_cmp(&a_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.chunk.id.cmp(&b.chunk.id))
}
