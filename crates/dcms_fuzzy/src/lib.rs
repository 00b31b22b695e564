//! Fuzzy string scoring for `schema_info`'s `api_key`/`name`/`id` lookup.
//!
//! Tiers, evaluated in order, first match wins:
//!
//! 1. Exact match (case-insensitive) → 1000
//! 2. Substring, either direction → 500 + an earlier-is-better position bonus
//! 3. Levenshtein with normalized distance < 0.5 → `450 - 150 * d/max`
//! 4. In-order character subsequence → `10*matches + 5*consecutive`
//! 5. Otherwise → 0 ("discard")
//!
//! Position bonus and the subsequence weights are not pinned down further
//! by the calling spec; this module picks a concrete, monotonic formula and
//! documents it here rather than in a side channel, since callers rely on
//! its exact behavior for ranking.

/// Score `query` against `target`. Higher is a better match; 0 means
/// "discard this candidate".
pub fn fuzzy_score(query: &str, target: &str) -> u32 {
    if target.is_empty() {
        return 0;
    }
    let query_lower = query.to_lowercase();
    let target_lower = target.to_lowercase();

    if query_lower == target_lower {
        return 1000;
    }

    if let Some(score) = substring_score(&query_lower, &target_lower) {
        return score;
    }

    if let Some(score) = levenshtein_score(&query_lower, &target_lower) {
        return score;
    }

    subsequence_score(&query_lower, &target_lower).unwrap_or(0)
}

/// Ranks `candidates` by [`fuzzy_score`] against `query`, descending,
/// dropping zero-score candidates, ties broken by original insertion order.
pub fn best_matches<'a, T>(
    query: &str,
    candidates: &'a [T],
    key: impl Fn(&T) -> &str,
) -> Vec<&'a T> {
    let mut scored: Vec<(usize, u32, &T)> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| (i, fuzzy_score(query, key(c)), c))
        .filter(|(_, score, _)| *score > 0)
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    scored.into_iter().map(|(_, _, c)| c).collect()
}

fn substring_score(query_lower: &str, target_lower: &str) -> Option<u32> {
    let position = if let Some(pos) = target_lower.find(query_lower) {
        target_lower[..pos].chars().count()
    } else if let Some(pos) = query_lower.find(target_lower) {
        query_lower[..pos].chars().count()
    } else {
        return None;
    };
    let bonus = 50u32.saturating_sub(position as u32);
    Some(500 + bonus)
}

fn levenshtein_score(query_lower: &str, target_lower: &str) -> Option<u32> {
    let distance = strsim::levenshtein(query_lower, target_lower);
    let max_len = query_lower.chars().count().max(target_lower.chars().count());
    if max_len == 0 {
        return None;
    }
    let normalized = distance as f64 / max_len as f64;
    if normalized < 0.5 {
        let score = 450.0 - 150.0 * normalized;
        Some(score.round() as u32)
    } else {
        None
    }
}

/// Full in-order character subsequence match; `None` if not every
/// character of `query_lower` appears, in order, within `target_lower`.
fn subsequence_score(query_lower: &str, target_lower: &str) -> Option<u32> {
    let target_chars: Vec<char> = target_lower.chars().collect();
    let mut positions = Vec::new();
    let mut cursor = 0usize;

    for qc in query_lower.chars() {
        let found = target_chars[cursor..].iter().position(|&tc| tc == qc)?;
        let idx = cursor + found;
        positions.push(idx);
        cursor = idx + 1;
    }

    if positions.is_empty() {
        return None;
    }

    let matches = positions.len() as u32;
    let consecutive = positions.windows(2).filter(|w| w[1] == w[0] + 1).count() as u32;
    Some(10 * matches + 5 * consecutive)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_case_insensitive_scores_1000() {
        assert_eq!(fuzzy_score("Blog", "blog"), 1000);
        assert_eq!(fuzzy_score("blog", "blog"), 1000);
    }

    #[test]
    fn empty_target_scores_zero() {
        assert_eq!(fuzzy_score("x", ""), 0);
    }

    #[test]
    fn substring_scores_above_500_and_rewards_earlier_position() {
        let early = fuzzy_score("post", "post_title");
        let late = fuzzy_score("post", "blog_post");
        assert!(early > 500);
        assert!(late > 500);
        assert!(early > late);
    }

    #[test]
    fn unrelated_strings_score_zero() {
        assert_eq!(fuzzy_score("xyz", "blog_post"), 0);
    }

    #[test]
    fn subsequence_match_scores_positive_but_below_substring_tier() {
        let score = fuzzy_score("usr", "user_profile");
        assert!(score > 0);
        assert!(score < 500);
    }

    #[test]
    fn levenshtein_close_strings_score_in_band() {
        let score = fuzzy_score("titel", "title");
        assert!(score > 0);
        assert!((300..=450).contains(&score));
    }

    #[test]
    fn best_matches_orders_by_score_then_insertion() {
        let names = vec!["unrelated".to_string(), "blog".to_string(), "blog_post".to_string()];
        let ranked = best_matches("blog", &names, |s| s.as_str());
        assert_eq!(ranked[0], "blog");
        assert_eq!(ranked.len(), 2);
    }
}
