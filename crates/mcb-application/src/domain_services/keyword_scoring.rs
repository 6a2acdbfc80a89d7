//! Keyword Search Scoring
//!
//! Scores a title against a lowercase query by substring position alone —
//! used both for the SQL `ILIKE` keyword path and the GraphQL keyword
//! backend, where the upstream already filtered to matching rows and all
//! that's left is ranking them.

use mcb_domain::constants::{
    KEYWORD_EXACT_MATCH_SCORE, KEYWORD_NO_MATCH_SCORE, KEYWORD_PARTIAL_MATCH_FLOOR,
};

/// Score `title` against `query`. Exact case-insensitive match scores
/// highest; an earlier substring position scores higher than a later one,
/// floored so even a late match beats "no match".
pub fn score(query: &str, title: &str) -> f32 {
    let q = query.trim().to_lowercase();
    let t = title.trim().to_lowercase();
    if q.is_empty() || t.is_empty() {
        return 0.0;
    }
    if q == t {
        return KEYWORD_EXACT_MATCH_SCORE;
    }
    match t.find(&q) {
        None => KEYWORD_NO_MATCH_SCORE,
        Some(byte_pos) => {
            // Position in chars, not bytes, so multi-byte CJK titles score
            // the same way an equivalent-length ASCII title would.
            let pos = t[..byte_pos].chars().count();
            (0.9 / (1.0 + pos as f32)).max(KEYWORD_PARTIAL_MATCH_FLOOR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_orders_exact_then_position_then_no_match() {
        let exact = score("alien", "Alien");
        let positioned = score("alien", "The Alien");
        let none = score("alien", "xenomorph");
        assert_eq!(exact, 1.0);
        assert!((positioned - 0.2).abs() < 1e-6);
        assert_eq!(none, 0.1);
        assert!(exact > positioned && positioned > none);
    }

    #[test]
    fn monotonic_in_position_for_non_exact_matches() {
        let earlier = score("war", "warhorse saga");
        let later = score("war", "the great warhorse saga");
        assert!(earlier > later);
    }
}
