//! Word lists and bag-of-words scoring.
//!
//! Single words match whole tokens; entries containing a space match as
//! substrings of the lowercased text.

pub const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "thanks", "thank", "yes", "ok", "okay", "perfect", "love", "nice",
    "excellent", "happy", "sure", "murakoze", "merci", "yego",
];

pub const NEGATIVE_WORDS: &[&str] = &[
    "bad", "no", "not", "problem", "angry", "slow", "expensive", "difficult", "terrible",
    "wrong", "late", "cancel", "hate", "oya",
];

pub const OBJECTION_WORDS: &[&str] = &["no", "not", "cannot", "difficult", "expensive", "busy"];

pub const INTENT_WORDS: &[&str] = &[
    "buy", "order", "book", "booking", "pay", "purchase", "reserve", "subscribe", "sign up",
];

pub const PRICE_WORDS: &[&str] = &[
    "price", "cost", "how much", "fee", "fees", "rate", "cheap", "discount", "expensive",
];

pub const INTEREST_WORDS: &[&str] = &[
    "interested", "tell me more", "more info", "details", "how does", "how do", "want to know",
    "curious",
];

const SENTIMENT_STEP: f64 = 0.1;

/// Number of distinct lexicon entries present in `text`.
pub fn count_hits(text: &str, lexicon: &[&str]) -> usize {
    let lower = text.to_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|token| !token.is_empty())
        .collect();

    lexicon
        .iter()
        .filter(|entry| {
            if entry.contains(' ') {
                lower.contains(*entry)
            } else {
                tokens.contains(*entry)
            }
        })
        .count()
}

pub fn contains_any(text: &str, lexicon: &[&str]) -> bool {
    count_hits(text, lexicon) > 0
}

/// Polarity in [-1, 1]: +0.1 per positive hit, -0.1 per negative hit.
pub fn sentiment(text: &str) -> f64 {
    let positive = count_hits(text, POSITIVE_WORDS) as f64;
    let negative = count_hits(text, NEGATIVE_WORDS) as f64;
    ((positive - negative) * SENTIMENT_STEP).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_word_matching() {
        assert_eq!(count_hits("I know the way", OBJECTION_WORDS), 0);
        assert_eq!(count_hits("No, I'm busy", OBJECTION_WORDS), 2);
    }

    #[test]
    fn test_phrase_matching() {
        assert!(contains_any("How much is it?", PRICE_WORDS));
        assert!(contains_any("please tell me more", INTEREST_WORDS));
    }

    #[test]
    fn test_sentiment_polarity() {
        assert!((sentiment("great, thanks!") - 0.2).abs() < 1e-9);
        assert!((sentiment("this is bad and slow") + 0.2).abs() < 1e-9);
        assert_eq!(sentiment("hello"), 0.0);
    }
}
