//! Rule table for entity, preference and fact extraction.
//!
//! Each rule is one regular expression plus how to turn its match into a
//! memory. Rules are compiled once by [`Extractor::new`] and shared.

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::MemoryError;

/// Words that end a captured phrase.
const CLAUSE_CONNECTORS: &[&str] = &[
    "and", "but", "or", "so", "because", "then", "while", "where", "who", "which", "since",
];

/// What a rule produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// A named value attached to the conversation row.
    Entity,
    /// A stated preference, stored as its own row.
    Preference,
    /// A stated fact about the user, stored as its own row.
    Fact,
}

/// How the matched text becomes the extracted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    /// The whole match.
    Whole,
    /// Capture group 1 verbatim.
    Group,
    /// Capture group 1, cut at the first clause connector.
    Phrase,
    /// A fixed value whenever the pattern matches.
    Fixed(&'static str),
}

/// One extraction rule.
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    /// Rule name; the entity key for entity rules.
    pub name: &'static str,
    pub kind: RuleKind,
    /// Only the first matching rule of a group fires.
    pub group: Option<&'static str>,
    pattern: Regex,
    capture: Capture,
    /// Content template; `{}` is replaced with the extracted value.
    template: &'static str,
    confidence: f64,
    tags: &'static [&'static str],
}

impl ExtractionRule {
    fn new(
        name: &'static str,
        kind: RuleKind,
        pattern: &str,
        capture: Capture,
        template: &'static str,
        confidence: f64,
        tags: &'static [&'static str],
    ) -> Result<Self, MemoryError> {
        Ok(Self {
            name,
            kind,
            group: None,
            pattern: Regex::new(pattern)?,
            capture,
            template,
            confidence,
            tags,
        })
    }

    fn in_group(mut self, group: &'static str) -> Self {
        self.group = Some(group);
        self
    }

    /// Apply the rule to a message.
    pub fn apply(&self, text: &str) -> Option<Extraction> {
        let captures = self.pattern.captures(text)?;
        let value = match self.capture {
            Capture::Whole => captures.get(0)?.as_str().trim().to_string(),
            Capture::Group => captures.get(1)?.as_str().trim().to_string(),
            Capture::Phrase => cut_phrase(captures.get(1)?.as_str()),
            Capture::Fixed(value) => value.to_string(),
        };
        if value.is_empty() {
            return None;
        }

        let mut tags: Vec<String> = self.tags.iter().map(|t| t.to_string()).collect();
        if let Capture::Fixed(value) = self.capture {
            tags.push(value.to_string());
        }

        Some(Extraction {
            rule: self.name,
            kind: self.kind,
            content: self.template.replace("{}", &value),
            value,
            confidence: self.confidence,
            tags,
        })
    }
}

/// A value extracted by one rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub rule: &'static str,
    pub kind: RuleKind,
    /// Human-readable memory content (e.g., "User name: Jean").
    pub content: String,
    /// The raw extracted value.
    pub value: String,
    pub confidence: f64,
    pub tags: Vec<String>,
}

/// Everything extracted from one user message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extracted {
    /// Entity key to value.
    pub entities: Map<String, Value>,
    pub preferences: Vec<Extraction>,
    pub facts: Vec<Extraction>,
}

/// Compiled rule table.
#[derive(Debug, Clone)]
pub struct Extractor {
    rules: Vec<ExtractionRule>,
}

impl Extractor {
    /// Compile the default rule table.
    pub fn new() -> Result<Self, MemoryError> {
        use Capture::*;
        use RuleKind::*;

        let phrase = r"([\p{L}\s]+)";
        let rules = vec![
            ExtractionRule::new(
                "phoneNumber",
                Entity,
                r"\+25\d{10}|07\d{8}",
                Whole,
                "{}",
                1.0,
                &[],
            )?,
            ExtractionRule::new(
                "amount",
                Entity,
                r"(?i)\d+(?:,\d{3})*(?:\.\d{2})?\s*(?:rwf|frw|francs?)",
                Whole,
                "{}",
                1.0,
                &[],
            )?,
            ExtractionRule::new(
                "location",
                Entity,
                &format!(r"(?i)\b(?:to|from|in)\s+{phrase}"),
                Phrase,
                "{}",
                1.0,
                &[],
            )?,
            ExtractionRule::new(
                "time",
                Entity,
                r"(?i)\b(?:at|around)\s+(\d{1,2}:\d{2}|\d{1,2}\s*(?:am|pm))",
                Group,
                "{}",
                1.0,
                &[],
            )?,
            ExtractionRule::new(
                "language_rw",
                Preference,
                r"(?i)kinyarwanda|rwandan",
                Fixed("rw"),
                "Prefers {} language",
                0.8,
                &["language"],
            )?
            .in_group("language"),
            ExtractionRule::new(
                "language_fr",
                Preference,
                r"(?i)french|français",
                Fixed("fr"),
                "Prefers {} language",
                0.8,
                &["language"],
            )?
            .in_group("language"),
            ExtractionRule::new(
                "payment_method",
                Preference,
                r"(?i)mobile\s*money|momo|cash|credit",
                Whole,
                "Prefers payment method: {}",
                0.8,
                &["payment", "method"],
            )?,
            ExtractionRule::new(
                "name",
                Fact,
                &format!(r"(?i)\bmy name is\s+{phrase}"),
                Phrase,
                "User name: {}",
                0.9,
                &["identity", "name"],
            )?,
            ExtractionRule::new(
                "employer",
                Fact,
                &format!(r"(?i)\b(?:work at|works at|job at)\s+{phrase}"),
                Phrase,
                "Works at: {}",
                0.8,
                &["work", "employment"],
            )?,
            ExtractionRule::new(
                "residence",
                Fact,
                &format!(r"(?i)\b(?:live in|lives in|from)\s+{phrase}"),
                Phrase,
                "Lives in: {}",
                0.8,
                &["location", "residence"],
            )?,
        ];

        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[ExtractionRule] {
        &self.rules
    }

    /// Look up a rule by name.
    pub fn rule(&self, name: &str) -> Option<&ExtractionRule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    /// Run every rule over a message.
    pub fn extract(&self, text: &str) -> Extracted {
        let mut extracted = Extracted::default();
        let mut fired_groups: Vec<&'static str> = Vec::new();

        for rule in &self.rules {
            if rule.group.is_some_and(|group| fired_groups.contains(&group)) {
                continue;
            }
            let Some(extraction) = rule.apply(text) else {
                continue;
            };
            if let Some(group) = rule.group {
                fired_groups.push(group);
            }

            match extraction.kind {
                RuleKind::Entity => {
                    extracted
                        .entities
                        .insert(rule.name.to_string(), Value::String(extraction.value));
                }
                RuleKind::Preference => extracted.preferences.push(extraction),
                RuleKind::Fact => extracted.facts.push(extraction),
            }
        }

        extracted
    }
}

/// Trim a captured phrase and cut it at the first clause connector.
fn cut_phrase(raw: &str) -> String {
    raw.split_whitespace()
        .take_while(|word| {
            let lower = word.to_lowercase();
            !CLAUSE_CONNECTORS.contains(&lower.as_str())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> Extractor {
        Extractor::new().unwrap()
    }

    fn apply(rule: &str, text: &str) -> Option<String> {
        extractor().rule(rule).unwrap().apply(text).map(|e| e.content)
    }

    #[test]
    fn test_phone_number_rule() {
        assert_eq!(apply("phoneNumber", "call +250788123456 now").as_deref(), Some("+250788123456"));
        assert_eq!(apply("phoneNumber", "or 0788123456").as_deref(), Some("0788123456"));
        assert!(apply("phoneNumber", "12345").is_none());
    }

    #[test]
    fn test_amount_rule() {
        assert_eq!(apply("amount", "send 5,000 RWF please").as_deref(), Some("5,000 RWF"));
        assert_eq!(apply("amount", "it costs 200 francs").as_deref(), Some("200 francs"));
        assert!(apply("amount", "5000 dollars").is_none());
    }

    #[test]
    fn test_location_rule() {
        assert_eq!(apply("location", "take me to Kimironko").as_deref(), Some("Kimironko"));
        assert_eq!(
            apply("location", "going to Nyamirambo and back").as_deref(),
            Some("Nyamirambo")
        );
        assert!(apply("location", "a potato").is_none());
    }

    #[test]
    fn test_time_rule() {
        assert_eq!(apply("time", "pick me at 14:30").as_deref(), Some("14:30"));
        assert_eq!(apply("time", "around 7 pm").as_deref(), Some("7 pm"));
    }

    #[test]
    fn test_language_rules() {
        assert_eq!(
            apply("language_rw", "I prefer Kinyarwanda").as_deref(),
            Some("Prefers rw language")
        );
        assert_eq!(
            apply("language_fr", "parlez en français").as_deref(),
            Some("Prefers fr language")
        );
    }

    #[test]
    fn test_language_group_prefers_first_rule() {
        let extracted = extractor().extract("I speak French and Kinyarwanda");
        assert_eq!(extracted.preferences.len(), 1);
        assert_eq!(extracted.preferences[0].content, "Prefers rw language");
        assert_eq!(extracted.preferences[0].tags, vec!["language", "rw"]);
    }

    #[test]
    fn test_payment_method_rule() {
        assert_eq!(
            apply("payment_method", "I pay with Mobile Money").as_deref(),
            Some("Prefers payment method: Mobile Money")
        );
        assert_eq!(
            apply("payment_method", "cash only").as_deref(),
            Some("Prefers payment method: cash")
        );
    }

    #[test]
    fn test_name_rule() {
        assert_eq!(apply("name", "Hi, my name is Jean").as_deref(), Some("User name: Jean"));
        assert_eq!(
            apply("name", "My name is Marie Claire, thanks").as_deref(),
            Some("User name: Marie Claire")
        );
    }

    #[test]
    fn test_employer_rule() {
        assert_eq!(
            apply("employer", "I work at Bank of Kigali").as_deref(),
            Some("Works at: Bank of Kigali")
        );
        assert!(apply("employer", "I work hard").is_none());
    }

    #[test]
    fn test_residence_rule() {
        assert_eq!(apply("residence", "I live in Musanze").as_deref(), Some("Lives in: Musanze"));
        assert_eq!(apply("residence", "I am from Huye").as_deref(), Some("Lives in: Huye"));
    }

    #[test]
    fn test_clause_connectors_split_facts() {
        let extracted = extractor().extract("I live in Kigali and my name is Jean");
        let facts: Vec<_> = extracted.facts.iter().map(|f| f.content.as_str()).collect();

        assert_eq!(facts, vec!["User name: Jean", "Lives in: Kigali"]);
        assert_eq!(extracted.entities["location"], "Kigali");
    }

    #[test]
    fn test_full_international_number_in_entities() {
        let extracted = extractor().extract("call me on +250788123456 please");
        assert_eq!(extracted.entities["phoneNumber"], "+250788123456");
    }

    #[test]
    fn test_plain_message_extracts_nothing() {
        let extracted = extractor().extract("hello");
        assert!(extracted.entities.is_empty());
        assert!(extracted.preferences.is_empty());
        assert!(extracted.facts.is_empty());
    }

    #[test]
    fn test_cut_phrase() {
        assert_eq!(cut_phrase("  Kigali   but not today"), "Kigali");
        assert_eq!(cut_phrase("and"), "");
    }
}
