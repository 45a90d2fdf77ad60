//! Lexicon polarity for side-income content.

/// Word weights. Keys are lowercase single words; the per-text score is the
/// clamped sum of matching weights.
pub(crate) const LEXICON: &[(&str, f64)] = &[
    // Positive signals
    ("great", 0.4),
    ("amazing", 0.5),
    ("excellent", 0.5),
    ("fantastic", 0.5),
    ("awesome", 0.5),
    ("love", 0.5),
    ("best", 0.5),
    ("perfect", 0.5),
    ("wonderful", 0.5),
    ("profitable", 0.5),
    ("profit", 0.3),
    ("success", 0.4),
    ("successful", 0.4),
    ("growing", 0.3),
    ("doubled", 0.4),
    ("easy", 0.3),
    ("recommend", 0.4),
    ("worth", 0.3),
    ("legit", 0.4),
    ("win", 0.4),
    // Negative signals
    ("bad", -0.4),
    ("terrible", -0.6),
    ("awful", -0.6),
    ("hate", -0.5),
    ("worst", -0.6),
    ("horrible", -0.6),
    ("disappointing", -0.5),
    ("failed", -0.4),
    ("failure", -0.4),
    ("scam", -0.7),
    ("scammed", -0.7),
    ("waste", -0.5),
    ("lost", -0.4),
    ("saturated", -0.4),
    ("banned", -0.6),
    ("risky", -0.3),
    ("struggling", -0.4),
];

/// Polarity of `text` in `[-1, 1]`, or `None` when no lexicon word occurs.
#[must_use]
pub fn polarity(text: &str) -> Option<f64> {
    let mut score = 0.0_f64;
    let mut hits = 0usize;
    for word in text.split_whitespace() {
        let w = word
            .trim_matches(|c: char| !c.is_alphabetic())
            .to_lowercase();
        if let Some(&(_, weight)) = LEXICON.iter().find(|(lex, _)| *lex == w) {
            score += weight;
            hits += 1;
        }
    }
    (hits > 0).then(|| score.clamp(-1.0, 1.0))
}

/// Mean polarity over the texts that have one; `0.0` if none do.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean_polarity<'a>(texts: impl IntoIterator<Item = &'a str>) -> f64 {
    let scores: Vec<f64> = texts.into_iter().filter_map(polarity).collect();
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_text_has_no_polarity() {
        assert_eq!(polarity(""), None);
        assert_eq!(polarity("the quick brown fox"), None);
    }

    #[test]
    fn signs_follow_the_lexicon() {
        assert!(polarity("this side hustle is profitable").unwrap() > 0.0);
        assert!(polarity("total scam, avoid").unwrap() < 0.0);
    }

    #[test]
    fn punctuation_is_stripped() {
        assert!(polarity("Amazing!").unwrap() > 0.0);
    }

    #[test]
    fn score_clamps() {
        let text = "amazing excellent fantastic awesome perfect wonderful";
        assert!((polarity(text).unwrap() - 1.0).abs() < f64::EPSILON);
        let text = "scam scammed terrible awful horrible worst";
        assert!((polarity(text).unwrap() + 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn mean_ignores_neutral_texts() {
        let mean = mean_polarity(["great results", "no opinion here", "bad month"]);
        assert!((mean - 0.0).abs() < 1e-12);
        assert!((mean_polarity(["nothing", "here"]) - 0.0).abs() < f64::EPSILON);
        assert!((mean_polarity(["great", "neutral"]) - 0.4).abs() < 1e-12);
    }
}
