//! Per-request relevance scoring.
//!
//! Candidate rows are filtered by SQLite as usual; the score is computed by a
//! deterministic scalar function registered on the connection so the search
//! stage can exclude zero scores and sort on the value inside the same
//! statement. Nothing is persisted.

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use rusqlite::Connection;
use rusqlite::functions::FunctionFlags;

/// Name of the SQL function: `relevance(query, primary, secondary)`.
pub(crate) const FUNCTION: &str = "relevance";

const PRIMARY_WEIGHT: f64 = 2.0;
const SECONDARY_WEIGHT: f64 = 1.0;

const EXACT: f64 = 3.0;
const PREFIX: f64 = 2.0;
const FUZZY: f64 = 1.0;
const PHRASE_BONUS: f64 = 1.0;

pub(crate) fn register(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        FUNCTION,
        3,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let query = ctx.get::<Option<String>>(0)?.unwrap_or_default();
            let primary = ctx.get::<Option<String>>(1)?.unwrap_or_default();
            let secondary = ctx.get::<Option<String>>(2)?.unwrap_or_default();
            Ok(score(&query, &primary, &secondary))
        },
    )
}

/// Scores `query` against a primary field (title, content) and a secondary
/// field (description). Each query token contributes its best word match,
/// weighted by field. Returns 0.0 when no token matches anything.
pub fn score(query: &str, primary: &str, secondary: &str) -> f64 {
    let tokens = tokenize(query);
    if tokens.is_empty() {
        return 0.0;
    }

    let matcher = SkimMatcherV2::default().ignore_case();
    let primary_words = tokenize(primary);
    let secondary_words = tokenize(secondary);

    let mut total = 0.0;
    for token in &tokens {
        let best = f64::max(
            PRIMARY_WEIGHT * best_word_match(&matcher, token, &primary_words),
            SECONDARY_WEIGHT * best_word_match(&matcher, token, &secondary_words),
        );
        total += best;
    }

    if total > 0.0 && tokens.len() > 1 {
        let phrase = tokens.join(" ");
        if primary_words.join(" ").contains(&phrase) {
            total += PHRASE_BONUS * PRIMARY_WEIGHT;
        }
    }

    total
}

fn best_word_match(matcher: &SkimMatcherV2, token: &str, words: &[String]) -> f64 {
    words
        .iter()
        .map(|word| word_match(matcher, token, word))
        .fold(0.0, f64::max)
}

fn word_match(matcher: &SkimMatcherV2, token: &str, word: &str) -> f64 {
    if word == token {
        return EXACT;
    }
    if word.starts_with(token) {
        return PREFIX;
    }
    // Fuzzy hits must at least agree on the first character; otherwise a
    // short token would match nearly every long word as a subsequence.
    if word.chars().next() != token.chars().next() {
        return 0.0;
    }
    if matcher.fuzzy_match(word, token).is_some() {
        return FUZZY;
    }
    if token.chars().count() >= 4 && within_one_edit(token, word) {
        return FUZZY;
    }
    0.0
}

/// True when `a` and `b` differ by one insertion, deletion, substitution or
/// adjacent transposition.
fn within_one_edit(a: &str, b: &str) -> bool {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (shorter, longer) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    if longer.len() - shorter.len() > 1 {
        return false;
    }

    let prefix = shorter
        .iter()
        .zip(longer.iter())
        .take_while(|(x, y)| x == y)
        .count();
    if prefix == shorter.len() {
        return true;
    }

    if shorter.len() == longer.len() {
        let same_tail = shorter[prefix + 1..] == longer[prefix + 1..];
        let swapped = prefix + 1 < shorter.len()
            && shorter[prefix] == longer[prefix + 1]
            && shorter[prefix + 1] == longer[prefix]
            && shorter[prefix + 2..] == longer[prefix + 2..];
        same_tail || swapped
    } else {
        shorter[prefix..] == longer[prefix + 1..]
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_or_unmatched_query_scores_zero() {
        assert_eq!(score("   ", "Rust tutorial", ""), 0.0);
        assert_eq!(score("gardening", "Rust tutorial", "systems programming"), 0.0);
    }

    #[test]
    fn exact_beats_prefix_beats_fuzzy() {
        let exact = score("rust", "rust basics", "");
        let prefix = score("rus", "rust basics", "");
        let fuzzy = score("rst", "rust basics", "");
        assert!(exact > prefix, "{exact} vs {prefix}");
        assert!(prefix > fuzzy, "{prefix} vs {fuzzy}");
        assert!(fuzzy > 0.0);
    }

    #[test]
    fn title_hits_outweigh_description_hits() {
        let in_title = score("async", "Async in depth", "an overview");
        let in_description = score("async", "In depth", "an async overview");
        assert!(in_title > in_description);
        assert!(in_description > 0.0);
    }

    #[test]
    fn single_typo_still_matches() {
        assert!(score("tutorail", "Rust tutorial", "") > 0.0);
        assert!(score("tutoral", "Rust tutorial", "") > 0.0);
        assert!(!within_one_edit("tutorial", "material"));
    }

    #[test]
    fn typos_in_the_first_letter_do_not_match() {
        for query in ["bust", "just", "must", "dust"] {
            assert_eq!(score(query, "Rust basics", ""), 0.0, "{query}");
        }
        assert!(score("rusk", "Rust basics", "") > 0.0);
    }

    #[test]
    fn matching_is_case_insensitive_and_phrase_aware() {
        let phrase = score("error handling", "Error Handling in Rust", "");
        let scattered = score("error handling", "Handling every error", "");
        assert!(phrase > scattered);
        assert_eq!(score("RUST", "rust", ""), score("rust", "RUST", ""));
    }

    #[test]
    fn registered_function_is_callable_from_sql() {
        let conn = Connection::open_in_memory().unwrap();
        register(&conn).unwrap();
        let value: f64 = conn
            .query_row("SELECT relevance('rust', 'Rust basics', NULL)", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(value, score("rust", "Rust basics", ""));
    }
}
