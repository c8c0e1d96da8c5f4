//! Sentiment polarity scoring for comment text.
//!
//! [`SentimentAnalyzer`] is the seam the comment aggregator calls; the
//! default [`LexiconAnalyzer`] scores words from a small built-in polarity
//! lexicon, with intensifier and negation handling.

/// Lowest possible polarity (strongly negative).
pub const MIN_POLARITY: f64 = -1.0;

/// Highest possible polarity (strongly positive).
pub const MAX_POLARITY: f64 = 1.0;

/// Multiplier applied to a word's polarity when it follows a negation.
const NEGATION_FACTOR: f64 = -0.5;

/// How many tokens before a scored word are checked for a negation.
const NEGATION_WINDOW: usize = 2;

/// Computes a polarity score for a piece of text.
pub trait SentimentAnalyzer: Send + Sync {
    /// Return a score in `[MIN_POLARITY, MAX_POLARITY]`.
    fn polarity(&self, text: &str) -> f64;
}

const LEXICON: &[(&str, f64)] = &[
    ("amazing", 0.6),
    ("awesome", 1.0),
    ("beautiful", 0.85),
    ("best", 1.0),
    ("brilliant", 0.9),
    ("calm", 0.3),
    ("cool", 0.35),
    ("cute", 0.5),
    ("excellent", 1.0),
    ("fantastic", 0.4),
    ("fine", 0.42),
    ("fun", 0.3),
    ("gorgeous", 0.7),
    ("great", 0.8),
    ("good", 0.7),
    ("happy", 0.8),
    ("like", 0.2),
    ("love", 0.5),
    ("lovely", 0.5),
    ("nice", 0.6),
    ("perfect", 1.0),
    ("pretty", 0.25),
    ("sharp", 0.2),
    ("stunning", 0.5),
    ("wonderful", 1.0),
    ("wow", 0.1),
    ("annoying", -0.8),
    ("awful", -1.0),
    ("bad", -0.7),
    ("blurry", -0.3),
    ("boring", -1.0),
    ("dark", -0.15),
    ("disappointing", -0.6),
    ("dull", -0.3),
    ("hate", -0.8),
    ("horrible", -1.0),
    ("mediocre", -0.5),
    ("poor", -0.4),
    ("sad", -0.5),
    ("terrible", -1.0),
    ("ugly", -0.7),
    ("worst", -1.0),
    ("wrong", -0.5),
];

const INTENSIFIERS: &[(&str, f64)] = &[
    ("extremely", 1.5),
    ("incredibly", 1.4),
    ("really", 1.3),
    ("so", 1.3),
    ("super", 1.3),
    ("too", 1.2),
    ("very", 1.3),
];

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "nothing", "don't", "doesn't", "didn't", "isn't", "wasn't", "aren't",
    "can't", "won't", "hardly",
];

/// Lexicon-based analyzer.
///
/// The polarity of a text is the mean of the scores of the lexicon words it
/// contains, clamped to `[-1, 1]`. Text without any lexicon word scores `0.0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconAnalyzer;

impl LexiconAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl SentimentAnalyzer for LexiconAnalyzer {
    fn polarity(&self, text: &str) -> f64 {
        let tokens = tokenize(text);
        let mut total = 0.0;
        let mut hits = 0usize;

        for (i, token) in tokens.iter().enumerate() {
            let Some(mut score) = lookup(LEXICON, token) else {
                continue;
            };

            if i > 0 {
                if let Some(boost) = lookup(INTENSIFIERS, &tokens[i - 1]) {
                    score *= boost;
                }
            }

            let window_start = i.saturating_sub(NEGATION_WINDOW);
            if tokens[window_start..i]
                .iter()
                .any(|t| NEGATIONS.contains(&t.as_str()))
            {
                score *= NEGATION_FACTOR;
            }

            total += score.clamp(MIN_POLARITY, MAX_POLARITY);
            hits += 1;
        }

        if hits == 0 {
            return 0.0;
        }
        (total / hits as f64).clamp(MIN_POLARITY, MAX_POLARITY)
    }
}

/// Lower-case word tokens; apostrophes are kept so contractions stay whole.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|t| t.trim_matches('\'').to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn lookup(table: &[(&str, f64)], word: &str) -> Option<f64> {
    table
        .iter()
        .find(|(entry, _)| *entry == word)
        .map(|(_, score)| *score)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn neutral_text_scores_zero() {
        assert_eq!(LexiconAnalyzer.polarity("a photo of a boat"), 0.0);
        assert_eq!(LexiconAnalyzer.polarity(""), 0.0);
    }

    #[test]
    fn single_positive_word() {
        assert!(approx(LexiconAnalyzer.polarity("good shot"), 0.7));
        assert!(approx(LexiconAnalyzer.polarity("I love it"), 0.5));
    }

    #[test]
    fn single_negative_word() {
        assert!(approx(LexiconAnalyzer.polarity("terrible"), -1.0));
    }

    #[test]
    fn case_and_punctuation_are_ignored() {
        assert!(approx(LexiconAnalyzer.polarity("GOOD!!!"), 0.7));
    }

    #[test]
    fn intensifier_boosts_score() {
        let plain = LexiconAnalyzer.polarity("nice");
        let boosted = LexiconAnalyzer.polarity("very nice");
        assert!(boosted > plain);
        assert!(approx(boosted, 0.78));
    }

    #[test]
    fn intensified_score_is_clamped() {
        assert!(approx(LexiconAnalyzer.polarity("extremely perfect"), 1.0));
    }

    #[test]
    fn negation_flips_and_dampens() {
        assert!(approx(LexiconAnalyzer.polarity("not good"), -0.35));
        assert!(approx(LexiconAnalyzer.polarity("isn't bad at all"), 0.35));
    }

    #[test]
    fn negation_outside_window_is_ignored() {
        assert!(approx(
            LexiconAnalyzer.polarity("not that it matters, good"),
            0.7
        ));
    }

    #[test]
    fn mixed_text_averages_hits() {
        assert!(approx(LexiconAnalyzer.polarity("good but ugly"), 0.0));
    }

    #[test]
    fn result_always_within_bounds() {
        for text in ["awful awful awful", "best best", "so so so terrible"] {
            let p = LexiconAnalyzer.polarity(text);
            assert!((MIN_POLARITY..=MAX_POLARITY).contains(&p), "{text}: {p}");
        }
    }
}
