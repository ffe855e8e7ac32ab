//! Practice session generation from detected gaps.

use rand::Rng;
use serde::{Deserialize, Serialize};

use tutor_curriculum::{CurriculumGraph, DifficultyBand};

use crate::gaps::LearningGap;

/// Gaps mixed together by the interleaved strategy.
pub const INTERLEAVE_WIDTH: usize = 3;

/// How problems are spread across gaps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PracticeStrategy {
    /// Every problem targets the highest-priority gap
    #[default]
    Focused,
    /// Problems from the top gaps, shuffled together
    Interleaved,
}

impl PracticeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PracticeStrategy::Focused => "focused",
            PracticeStrategy::Interleaved => "interleaved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "focused" => Some(PracticeStrategy::Focused),
            "interleaved" => Some(PracticeStrategy::Interleaved),
            _ => None,
        }
    }
}

impl std::fmt::Display for PracticeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One problem slot in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeItem {
    pub topic_id: String,
    pub difficulty: DifficultyBand,
}

/// A generated practice session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticePlan {
    pub student_id: String,
    pub strategy: PracticeStrategy,
    pub items: Vec<PracticeItem>,
    /// Gaps the items were drawn from, highest priority first
    pub targeted: Vec<LearningGap>,
}

impl PracticePlan {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Problems per topic, in first-seen order.
    pub fn topic_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for item in &self.items {
            match counts.iter_mut().find(|(t, _)| *t == item.topic_id) {
                Some((_, n)) => *n += 1,
                None => counts.push((item.topic_id.clone(), 1)),
            }
        }
        counts
    }
}

/// Difficulty band adapted to performance on the gap's topic.
pub fn difficulty_for(gap: &LearningGap, graph: Option<&CurriculumGraph>) -> DifficultyBand {
    if gap.accuracy < 0.4 {
        DifficultyBand::easiest()
    } else if gap.accuracy > 0.8 && gap.mastery > 0.7 {
        DifficultyBand::hardest()
    } else {
        graph
            .and_then(|g| g.get_topic(&gap.topic_id))
            .map(|t| t.difficulty)
            .unwrap_or(DifficultyBand::Intermediate)
    }
}

/// Split `count` problems over `slots` gaps; earlier slots take the remainder.
pub fn split_evenly(count: usize, slots: usize) -> Vec<usize> {
    if slots == 0 {
        return Vec::new();
    }
    let base = count / slots;
    let remainder = count % slots;
    (0..slots).map(|i| base + usize::from(i < remainder)).collect()
}

/// In-place Fisher-Yates shuffle.
pub fn fisher_yates<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

/// Build the item list for `gaps` (sorted by priority).
pub fn build_items<R: Rng + ?Sized>(
    gaps: &[LearningGap],
    strategy: PracticeStrategy,
    count: usize,
    graph: Option<&CurriculumGraph>,
    rng: &mut R,
) -> (Vec<PracticeItem>, Vec<LearningGap>) {
    match strategy {
        PracticeStrategy::Focused => {
            let Some(top) = gaps.first() else {
                return (Vec::new(), Vec::new());
            };
            let difficulty = difficulty_for(top, graph);
            let items = (0..count)
                .map(|_| PracticeItem {
                    topic_id: top.topic_id.clone(),
                    difficulty,
                })
                .collect();
            (items, vec![top.clone()])
        }
        PracticeStrategy::Interleaved => {
            let targeted: Vec<LearningGap> = gaps.iter().take(INTERLEAVE_WIDTH).cloned().collect();
            let mut items = Vec::with_capacity(count);
            for (gap, n) in targeted.iter().zip(split_evenly(count, targeted.len())) {
                let difficulty = difficulty_for(gap, graph);
                items.extend((0..n).map(|_| PracticeItem {
                    topic_id: gap.topic_id.clone(),
                    difficulty,
                }));
            }
            fisher_yates(&mut items, rng);
            (items, targeted)
        }
    }
}
