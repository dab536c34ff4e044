//! Offline text-to-entity resolution: maps free text to the best goal and
//! area by name without asking the oracle.

use serde::Serialize;

use crate::types::{Area, Goal};

pub const EXACT_SCORE: f64 = 100.0;
pub const DEFAULT_THRESHOLD: f64 = 30.0;
const OVERLAP_WEIGHT: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredMatch {
    pub id: String,
    pub name: String,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMatch {
    pub goal: Option<ScoredMatch>,
    pub area: Option<ScoredMatch>,
}

impl EntityMatch {
    pub fn goal_id(&self) -> Option<&str> {
        self.goal.as_ref().map(|m| m.id.as_str())
    }

    pub fn area_id(&self) -> Option<&str> {
        self.area.as_ref().map(|m| m.id.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EntityMatcher {
    threshold: f64,
}

impl Default for EntityMatcher {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl EntityMatcher {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Goals and areas are matched independently.
    pub fn match_query(&self, query: &str, goals: &[Goal], areas: &[Area]) -> EntityMatch {
        let query = query.trim().to_lowercase();
        let tokens = tokenize(&query);
        EntityMatch {
            goal: self.best(
                &query,
                &tokens,
                goals.iter().map(|g| (g.id.as_str(), g.title.as_str())),
            ),
            area: self.best(
                &query,
                &tokens,
                areas.iter().map(|a| (a.id.as_str(), a.name.as_str())),
            ),
        }
    }

    /// First containment hit wins outright; otherwise the highest overlap
    /// score seen, if it clears the threshold.
    fn best<'a>(
        &self,
        query: &str,
        query_tokens: &[String],
        candidates: impl Iterator<Item = (&'a str, &'a str)>,
    ) -> Option<ScoredMatch> {
        if query.is_empty() {
            return None;
        }
        let mut best: Option<ScoredMatch> = None;
        for (id, name) in candidates {
            let lowered = name.trim().to_lowercase();
            if lowered.is_empty() {
                continue;
            }
            if query.contains(&lowered) || lowered.contains(query) {
                return Some(ScoredMatch {
                    id: id.to_string(),
                    name: name.to_string(),
                    score: EXACT_SCORE,
                });
            }
            let score = overlap_score(query_tokens, &tokenize(&lowered));
            if best.as_ref().is_none_or(|b| score > b.score) {
                best = Some(ScoredMatch {
                    id: id.to_string(),
                    name: name.to_string(),
                    score,
                });
            }
        }
        best.filter(|b| b.score >= self.threshold)
    }
}

/// Words longer than two characters.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

fn related(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}

/// Matched tokens counted from both sides, over the longer token list,
/// scaled to and capped at `OVERLAP_WEIGHT`. Only containment scores
/// `EXACT_SCORE`.
fn overlap_score(query_tokens: &[String], name_tokens: &[String]) -> f64 {
    let denominator = query_tokens.len().max(name_tokens.len());
    if denominator == 0 {
        return 0.0;
    }
    let query_hits = query_tokens
        .iter()
        .filter(|q| name_tokens.iter().any(|n| related(q, n)))
        .count();
    let name_hits = name_tokens
        .iter()
        .filter(|n| query_tokens.iter().any(|q| related(q, n)))
        .count();
    ((query_hits + name_hits) as f64 / denominator as f64 * OVERLAP_WEIGHT).min(OVERLAP_WEIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goals() -> Vec<Goal> {
        vec![Goal::new("g1", "Learn Spanish")]
    }

    #[test]
    fn shared_token_matches_above_threshold() {
        let m = EntityMatcher::default().match_query("book Spanish lesson", &goals(), &[]);
        let goal = m.goal.expect("expected a goal match");
        assert_eq!(goal.id, "g1");
        assert!(goal.score >= DEFAULT_THRESHOLD && goal.score < EXACT_SCORE);
    }

    #[test]
    fn unrelated_query_has_no_match() {
        let m = EntityMatcher::default().match_query("buy groceries", &goals(), &[]);
        assert!(m.goal.is_none());
    }

    #[test]
    fn containment_scores_exact() {
        let m = EntityMatcher::default().match_query("progress on Learn Spanish", &goals(), &[]);
        assert_eq!(m.goal.unwrap().score, EXACT_SCORE);
    }

    #[test]
    fn reordered_words_stay_below_exact() {
        let m = EntityMatcher::default().match_query("spanish learn", &goals(), &[]);
        let goal = m.goal.expect("expected a goal match");
        assert_eq!(goal.score, OVERLAP_WEIGHT);
        assert!(goal.score < EXACT_SCORE);
    }

    #[test]
    fn first_exact_match_wins() {
        let goals = vec![Goal::new("g1", "Run"), Goal::new("g2", "Run a marathon")];
        let m = EntityMatcher::default().match_query("run a marathon in spring", &goals, &[]);
        // "run" is contained in the query first, so the scan stops there.
        assert_eq!(m.goal_id(), Some("g1"));
    }

    #[test]
    fn goals_and_areas_are_independent() {
        let areas = vec![Area::new("a1", "Zdraví"), Area::new("a2", "Práce")];
        let m = EntityMatcher::default().match_query("práce na Learn Spanish", &goals(), &areas);
        assert_eq!(m.goal_id(), Some("g1"));
        assert_eq!(m.area_id(), Some("a2"));
    }

    #[test]
    fn best_overlap_is_kept() {
        let goals = vec![
            Goal::new("g1", "Spanish vocabulary drills"),
            Goal::new("g2", "Spanish lesson plan"),
        ];
        let m = EntityMatcher::default().match_query("book spanish lesson", &goals, &[]);
        assert_eq!(m.goal_id(), Some("g2"));
    }

    #[test]
    fn threshold_is_configurable() {
        let m = EntityMatcher::new(90.0).match_query("book Spanish lesson", &goals(), &[]);
        assert!(m.goal.is_none());
    }

    #[test]
    fn short_words_are_ignored() {
        assert_eq!(tokenize("go to the gym"), vec!["the", "gym"]);
    }

    #[test]
    fn empty_query_matches_nothing() {
        let m = EntityMatcher::default().match_query("   ", &goals(), &[]);
        assert_eq!(m, EntityMatch::default());
    }
}
