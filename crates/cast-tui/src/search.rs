//! Directory search scoring.
//!
//! Pure functions over card text: deterministic for a given query, no
//! network, no state.  Match quality is tiered (exact substring beats
//! word-prefix beats character subsequence) and the per-field tiers are
//! combined with fixed weights — the title counts most.

/// Per-field match tier: 3 = substring, 2 = word prefix, 1 = subsequence,
/// 0 = no match.
pub fn match_tier(text: &str, term: &str) -> u32 {
    let text = text.to_lowercase();
    let term = term.to_lowercase();

    if text.contains(&term) {
        return 3;
    }

    for word in text.split_whitespace() {
        if word.starts_with(&term) {
            return 2;
        }
    }

    // Subsequence fallback: every query char appears in order.
    let mut chars = term.chars().peekable();
    for c in text.chars() {
        if chars.peek() == Some(&c) {
            chars.next();
        }
    }
    if chars.peek().is_none() {
        1
    } else {
        0
    }
}

/// Weighted card score: title ×3, author ×2, description ×1.
pub fn score_card(title: &str, author: &str, description: &str, query: &str) -> u32 {
    match_tier(title, query) * 3 + match_tier(author, query) * 2 + match_tier(description, query)
}

/// Rank cards against `query`.  Returns `(original_index, score)` pairs with
/// zero-score cards dropped, ordered by descending score; ties keep their
/// original order.  A blank query keeps every card in place.
pub fn rank<'a, I>(cards: I, query: &str) -> Vec<(usize, u32)>
where
    I: IntoIterator<Item = (&'a str, &'a str, &'a str)>,
{
    let query = query.trim();
    if query.is_empty() {
        return cards.into_iter().enumerate().map(|(i, _)| (i, 0)).collect();
    }

    let mut scored: Vec<(usize, u32)> = cards
        .into_iter()
        .enumerate()
        .map(|(i, (title, author, description))| (i, score_card(title, author, description, query)))
        .filter(|(_, score)| *score > 0)
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_is_top_tier() {
        assert_eq!(match_tier("The Daily Show", "daily"), 3);
        assert_eq!(match_tier("The Daily Show", "DAILY"), 3);
    }

    #[test]
    fn subsequence_is_lowest_nonzero_tier() {
        assert_eq!(match_tier("The Daily Show", "ds"), 1);
        assert_eq!(match_tier("The Daily Show", "tds"), 1);
    }

    #[test]
    fn no_match_is_zero() {
        assert_eq!(match_tier("The Daily Show", "xyz"), 0);
        // Right chars, wrong order — not a subsequence.
        assert_eq!(match_tier("The Daily Show", "sd"), 0);
    }

    #[test]
    fn field_weights_apply() {
        // Substring in the title only.
        assert_eq!(score_card("Morning News", "", "", "news"), 9);
        // Substring in the author only.
        assert_eq!(score_card("", "News Corp", "", "news"), 6);
        // Substring in the description only.
        assert_eq!(score_card("", "", "all the news", "news"), 3);
        // Summed across fields.
        assert_eq!(score_card("Morning News", "News Corp", "all the news", "news"), 18);
    }

    #[test]
    fn rank_hides_zero_and_orders_descending() {
        let cards = vec![
            ("Cooking Hour", "Pat", "recipes weekly"),
            ("Morning News", "Alex", "daily headlines"),
            ("Sports Talk", "Sam", "news from the field"),
        ];
        let ranked = rank(cards, "news");
        assert_eq!(ranked.len(), 2);
        // Title match (9) before description match (3).
        assert_eq!(ranked[0].0, 1);
        assert_eq!(ranked[1].0, 2);
        assert!(ranked[0].1 > ranked[1].1);
    }

    #[test]
    fn rank_is_deterministic_and_stable_on_ties() {
        let cards = vec![
            ("Morning News", "a", "b"),
            ("Evening News", "c", "d"),
        ];
        let first = rank(cards.clone(), "news");
        let second = rank(cards, "news");
        assert_eq!(first, second);
        assert_eq!(first[0].0, 0);
        assert_eq!(first[1].0, 1);
    }

    #[test]
    fn blank_query_keeps_everything() {
        let cards = vec![("A", "", ""), ("B", "", "")];
        let ranked = rank(cards, "   ");
        assert_eq!(ranked, vec![(0, 0), (1, 0)]);
    }
}
