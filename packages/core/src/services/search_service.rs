//! Fuzzy Search Engine
//!
//! Ranks cached nodes against a free-text query without a full-text index.
//! Two stages:
//!
//! 1. **Candidate pre-filter** (coarse, in the store): three LIKE passes
//!    unioned and de-duplicated by id - exact phrase (unbounded, guaranteed
//!    relevant), all words present (bounded), any word present (bounded).
//!    The word passes only run for multi-word queries.
//! 2. **Scoring** (fine, in memory): a weighted composite of phrase
//!    exactness, per-word match quality, and whole-query trigram similarity.
//!
//! Per-word matching uses a priority ladder so that better match shapes
//! always outrank worse ones: exact token > prefix > substring > trigram.
//! The substring rung is deliberately penalized to keep "body" from ranking
//! "somebody" next to a literal "body".
//!
//! Results below the composite floor are discarded; survivors are sorted by
//! score and annotated with a breadcrumb path (cycle-guarded `parent_id`
//! walk) and a preview of their first children.

use crate::db::DatabaseService;
use crate::models::Node;
use crate::services::error::ServiceError;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Default number of results when the caller does not specify one
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Hard ceiling on the caller-requested result limit
pub const MAX_SEARCH_LIMIT: usize = 100;

/// Composite scores below this are noise and dropped
const MIN_COMPOSITE_SCORE: f64 = 0.2;

/// Weight of an exact phrase hit in the name
const WEIGHT_PHRASE: f64 = 0.45;

/// Note hits count at this fraction of an equivalent name hit
const NOTE_FIELD_FACTOR: f64 = 0.8;

/// Weight of all query words matching in the name
const WEIGHT_WORDS_IN_NAME: f64 = 0.30;

/// Weight of all query words matching anywhere (name or note)
const WEIGHT_WORDS_ANYWHERE: f64 = 0.10;

/// Weight of whole-query trigram similarity against the name
const WEIGHT_TRIGRAM: f64 = 0.15;

/// Names longer than this skip the trigram component - window noise
/// dominates the signal on long names
const TRIGRAM_NAME_MAX_CHARS: usize = 50;

/// Trigram similarity below this floor contributes nothing to word matching
const TRIGRAM_WORD_FLOOR: f64 = 0.4;

/// How many children to include in each result's preview
const PREVIEW_CHILDREN: usize = 3;

/// Safety bound on the breadcrumb walk
const MAX_BREADCRUMB_DEPTH: usize = 64;

/// A ranked search result
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    #[serde(flatten)]
    pub node: Node,

    /// Composite relevance score
    pub score: f64,

    /// Names from the top level down to this node (inclusive)
    pub path: Vec<String>,

    /// First few children by priority, for orientation
    pub children_preview: Vec<Node>,
}

/// Scores and ranks cached nodes against free-text queries
pub struct SearchService {
    db: Arc<DatabaseService>,
}

impl SearchService {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    /// Rank cached nodes against `query`, best first
    ///
    /// `limit` is clamped to `1..=MAX_SEARCH_LIMIT`. The engine is a pure
    /// reader: freshness is the caller's concern (see `SyncService::ensure_fresh`).
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, ServiceError> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(ServiceError::invalid_argument("query cannot be empty"));
        }
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT);
        let query_lower = trimmed.to_lowercase();
        let words = tokenize(trimmed);

        // Candidate union, de-duplicated by id
        let mut candidates: HashMap<String, Node> = HashMap::new();
        for node in self.db.db_find_by_phrase(trimmed).await? {
            candidates.insert(node.id.clone(), node);
        }
        if words.len() >= 2 {
            for node in self.db.db_find_all_words(&words).await? {
                candidates.entry(node.id.clone()).or_insert(node);
            }
            for node in self.db.db_find_any_word(&words).await? {
                candidates.entry(node.id.clone()).or_insert(node);
            }
        }

        let mut scored: Vec<(f64, Node)> = candidates
            .into_values()
            .filter_map(|node| {
                let score = score_node(&query_lower, &words, &node.name, node.note.as_deref());
                (score >= MIN_COMPOSITE_SCORE).then_some((score, node))
            })
            .collect();

        scored.sort_by(|(sa, na), (sb, nb)| {
            sb.partial_cmp(sa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| na.name.cmp(&nb.name))
        });
        scored.truncate(limit);

        let mut hits = Vec::with_capacity(scored.len());
        for (score, node) in scored {
            let path = self.breadcrumb(&node).await?;
            let mut children_preview = self.db.db_get_children(Some(&node.id)).await?;
            children_preview.truncate(PREVIEW_CHILDREN);
            hits.push(SearchHit {
                node,
                score,
                path,
                children_preview,
            });
        }
        Ok(hits)
    }

    /// Walk `parent_id` to the top, cycle-guarded, returning names
    /// top-down with the node's own name last
    async fn breadcrumb(&self, node: &Node) -> Result<Vec<String>, ServiceError> {
        let mut path = vec![node.name.clone()];
        let mut visited: HashSet<String> = HashSet::from([node.id.clone()]);
        let mut current = node.parent_id.clone();

        while let Some(id) = current {
            if !visited.insert(id.clone()) {
                // Cycle in cached data; stop rather than loop forever
                break;
            }
            if path.len() >= MAX_BREADCRUMB_DEPTH {
                break;
            }
            match self.db.db_get_node(&id).await? {
                Some(parent) => {
                    path.push(parent.name.clone());
                    current = parent.parent_id;
                }
                None => break,
            }
        }

        path.reverse();
        Ok(path)
    }
}

/// Lowercased alphanumeric tokens of a text
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Composite relevance of one candidate
///
/// `query` must be lowercased, `words` its tokens. Components:
///
/// - exact phrase in name (0.45), or in note at 0.8 of that
/// - all query words matched in name (0.30, scaled by match quality)
/// - all query words matched anywhere (0.10, scaled by match quality)
/// - whole-query trigram similarity vs. short names (0.15)
pub(crate) fn score_node(query: &str, words: &[String], name: &str, note: Option<&str>) -> f64 {
    let name_lower = name.to_lowercase();
    let mut score = 0.0;

    if name_lower.contains(query) {
        score += WEIGHT_PHRASE;
    } else if note
        .map(|n| n.to_lowercase().contains(query))
        .unwrap_or(false)
    {
        score += WEIGHT_PHRASE * NOTE_FIELD_FACTOR;
    }

    if !words.is_empty() {
        let name_tokens = tokenize(name);
        let mut all_tokens = name_tokens.clone();
        if let Some(note) = note {
            all_tokens.extend(tokenize(note));
        }

        let name_scores: Vec<f64> = words.iter().map(|w| word_score(w, &name_tokens)).collect();
        if name_scores.iter().all(|&s| s > 0.0) {
            let avg = name_scores.iter().sum::<f64>() / name_scores.len() as f64;
            score += WEIGHT_WORDS_IN_NAME * avg;
        }

        let any_scores: Vec<f64> = words.iter().map(|w| word_score(w, &all_tokens)).collect();
        if any_scores.iter().all(|&s| s > 0.0) {
            let avg = any_scores.iter().sum::<f64>() / any_scores.len() as f64;
            score += WEIGHT_WORDS_ANYWHERE * avg;
        }
    }

    if name_lower.chars().count() <= TRIGRAM_NAME_MAX_CHARS {
        score += WEIGHT_TRIGRAM * trigram_similarity(query, &name_lower);
    }

    score
}

/// Best match of one query word against a set of candidate tokens
///
/// Priority ladder: exact equality (1.0) > word-is-prefix-of-token (0.9,
/// words of 3+ chars) > token-is-prefix-of-word (0.8, tokens of 3+ chars) >
/// word-as-substring-of-a-longer-token (0.3, penalized) > trigram similarity
/// above the floor, scaled down (x0.7).
fn word_score(word: &str, tokens: &[String]) -> f64 {
    let mut best = 0.0f64;
    for token in tokens {
        let rung = if token == word {
            1.0
        } else if word.len() >= 3 && token.starts_with(word) {
            0.9
        } else if token.len() >= 3 && word.starts_with(token.as_str()) {
            0.8
        } else if token.contains(word) {
            0.3
        } else {
            let sim = trigram_similarity(word, token);
            if sim > TRIGRAM_WORD_FLOOR {
                sim * 0.7
            } else {
                0.0
            }
        };
        best = best.max(rung);
    }
    best
}

/// Dice coefficient over 3-character sliding windows
///
/// Inputs are lowercased and padded with one space on each side, so word
/// boundaries participate in the window set.
pub fn trigram_similarity(a: &str, b: &str) -> f64 {
    let grams_a = trigrams(a);
    let grams_b = trigrams(b);
    if grams_a.is_empty() || grams_b.is_empty() {
        return 0.0;
    }
    let shared = grams_a.intersection(&grams_b).count();
    2.0 * shared as f64 / (grams_a.len() + grams_b.len()) as f64
}

fn trigrams(s: &str) -> HashSet<String> {
    let padded: Vec<char> = format!(" {} ", s.trim().to_lowercase()).chars().collect();
    padded
        .windows(3)
        .map(|w| w.iter().collect::<String>())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(query: &str, name: &str, note: Option<&str>) -> f64 {
        let query_lower = query.to_lowercase();
        let words = tokenize(query);
        score_node(&query_lower, &words, name, note)
    }

    #[test]
    fn test_trigram_identical_strings() {
        assert!((trigram_similarity("body", "body") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_trigram_known_value() {
        // " body " -> { bo, bod, ody, dy } (4), " somebody " -> 8 windows,
        // 3 shared: 2*3/(4+8) = 0.5
        assert!((trigram_similarity("body", "somebody") - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_trigram_disjoint() {
        assert_eq!(trigram_similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_word_ladder_ordering() {
        let tokens = |s: &str| tokenize(s);
        // Exact beats prefix beats substring
        assert_eq!(word_score("today", &tokens("today")), 1.0);
        assert_eq!(word_score("tod", &tokens("today")), 0.9);
        assert_eq!(word_score("todays", &tokens("today")), 0.8);
        assert_eq!(word_score("body", &tokens("somebody")), 0.3);
    }

    #[test]
    fn test_word_ladder_short_words_do_not_get_prefix_credit() {
        // A 2-char word inside a token falls to the substring rung
        assert_eq!(word_score("to", &tokenize("today")), 0.3);
    }

    #[test]
    fn test_exact_phrase_outranks_reordered_words() {
        let exact = score("today tasks", "Today Tasks", None);
        let reordered = score("today tasks", "Tasks for Today Later", None);
        assert!(
            exact > reordered,
            "exact {} should beat reordered {}",
            exact,
            reordered
        );
    }

    #[test]
    fn test_substring_penalty_holds() {
        let literal = score("body", "body", None);
        let embedded = score("body", "somebody", None);
        assert!(
            literal > embedded,
            "literal {} should beat embedded {}",
            literal,
            embedded
        );
    }

    #[test]
    fn test_name_hit_outranks_note_hit() {
        let in_name = score("quarterly report", "Quarterly report", None);
        let in_note = score("quarterly report", "Misc", Some("the quarterly report lives here"));
        assert!(in_name > in_note);
    }

    #[test]
    fn test_unrelated_candidate_falls_below_floor() {
        let s = score("quarterly report", "Grocery list", None);
        assert!(s < MIN_COMPOSITE_SCORE, "unrelated scored {}", s);
    }

    #[test]
    fn test_long_names_skip_trigram_component() {
        let long_name = "a".repeat(60);
        // No phrase, no word match: with trigram gated off the score is 0
        assert_eq!(score("zzz", &long_name, None), 0.0);
    }

    #[test]
    fn test_tokenize_strips_punctuation() {
        assert_eq!(tokenize("Tasks, today!"), vec!["tasks", "today"]);
        assert_eq!(tokenize("  "), Vec::<String>::new());
    }
}
