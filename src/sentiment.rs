//! # Sentiment
//! Naive lexicon scorer for headlines.
//!
//! Terms are matched as substrings of the case-folded text, so multi-word
//! phrases ("beats expectations") work without tokenizing. Each term counts
//! once per text regardless of how often it appears.

/// Terms that push the score towards +1.0.
pub const POSITIVE_TERMS: &[&str] = &[
    "good",
    "great",
    "positive",
    "praise",
    "beats",
    "beats expectations",
    "jumps",
    "rise",
    "strong",
    "upgrade",
];

/// Terms that push the score towards -1.0.
pub const NEGATIVE_TERMS: &[&str] = &[
    "concern",
    "recall",
    "drop",
    "decline",
    "worse",
    "question",
    "regulatory",
    "down",
    "risk",
    "delay",
];

/// Returns `(positive_hits, negative_hits)` for `text`.
pub fn term_hits(text: &str) -> (usize, usize) {
    let folded = text.to_lowercase();
    let count = |terms: &[&str]| terms.iter().filter(|t| folded.contains(*t)).count();
    (count(POSITIVE_TERMS), count(NEGATIVE_TERMS))
}

/// Score `text` into `[-1.0, 1.0]`.
///
/// `(pos - neg) / (pos + neg)`, or `0.0` when no term matches.
pub fn score_text(text: &str) -> f64 {
    let (pos, neg) = term_hits(text);
    let total = pos + neg;
    if total == 0 {
        return 0.0;
    }
    let raw = (pos as f64 - neg as f64) / total as f64;
    raw.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_headline_scores_one() {
        assert_eq!(score_text("Stock $ABC jumps on strong earnings"), 1.0);
    }

    #[test]
    fn negative_headline_scores_minus_one() {
        assert_eq!(
            score_text("Company faces regulatory recall amid decline"),
            -1.0
        );
    }

    #[test]
    fn mixed_headline_is_balanced() {
        // "strong" vs "concern"
        assert_eq!(score_text("Strong quarter, but margin concern remains"), 0.0);
        // "beats" + "beats expectations" vs "risk"
        let s = score_text("Chipmaker beats expectations despite supply risk");
        assert!((s - 1.0 / 3.0).abs() < 1e-9, "got {s}");
    }

    #[test]
    fn case_folding_and_repeats() {
        assert_eq!(score_text("GREAT great GrEaT"), 1.0);
        assert_eq!(term_hits("DROP drop drop"), (0, 1));
    }

    #[test]
    fn empty_and_neutral_text_is_zero() {
        assert_eq!(score_text(""), 0.0);
        assert_eq!(score_text("The committee met on Tuesday"), 0.0);
    }

    #[test]
    fn always_in_range_and_deterministic() {
        let samples = [
            "good great positive praise beats jumps rise strong upgrade",
            "concern recall drop decline worse question regulatory down risk delay",
            "downgrade risk after upgrade",
            "ÄÖÜ unicode ünïcödé risk",
            "$$$ ### !!!",
        ];
        for s in samples {
            let a = score_text(s);
            let b = score_text(s);
            assert!((-1.0..=1.0).contains(&a), "{s} -> {a}");
            assert_eq!(a, b);
        }
    }
}
