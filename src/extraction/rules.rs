//! Declarative extraction rules
//!
//! A [`RuleSet`] maps each [`Field`] to an ordered cascade of [`Rule`]s. A
//! rule is either a regex over one view of the text plus a function that
//! turns captures into a value, or a free-form heuristic over the whole
//! document. Pattern rules try every match in order, not just the first.

use regex::{Captures, Regex};
use tracing::{debug, trace};

use super::normalize::{collapse_whitespace, fold_diacritics};
use super::{ExtractedFields, ExtractedValue, Field, FieldSource};
use crate::error::Result;

/// Recognized text in the three views rules can match against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Text as recognized, line breaks kept
    pub raw: String,
    /// Whitespace runs (including line breaks) collapsed to single spaces
    pub flat: String,
    /// `raw` with diacritics folded and uppercased, line breaks kept
    pub folded: String,
}

impl Document {
    pub fn new(text: &str) -> Self {
        Self {
            raw: text.to_string(),
            flat: collapse_whitespace(text),
            folded: fold_diacritics(text),
        }
    }

    pub fn view(&self, haystack: Haystack) -> &str {
        match haystack {
            Haystack::Raw => &self.raw,
            Haystack::Flat => &self.flat,
            Haystack::Folded => &self.folded,
        }
    }
}

/// Which view of the document a pattern runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Haystack {
    Raw,
    Flat,
    Folded,
}

/// Turns one regex match into a field value, or rejects it
pub type CaptureExtractor = fn(&Captures<'_>) -> Option<String>;

/// Free-form extraction over the whole document
pub type HeuristicFn = fn(&Document) -> Option<String>;

pub enum Matcher {
    Pattern {
        regex: Regex,
        haystack: Haystack,
        extract: CaptureExtractor,
    },
    Heuristic(HeuristicFn),
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Matcher::Pattern { regex, haystack, .. } => f
                .debug_struct("Pattern")
                .field("regex", &regex.as_str())
                .field("haystack", haystack)
                .finish(),
            Matcher::Heuristic(_) => f.write_str("Heuristic"),
        }
    }
}

/// One step of a field's cascade
#[derive(Debug)]
pub struct Rule {
    name: String,
    source: FieldSource,
    matcher: Matcher,
}

impl Rule {
    /// Build a regex rule.
    ///
    /// Fails with `OcrError::InvalidPattern` if `pattern` does not compile.
    pub fn pattern(
        name: impl Into<String>,
        source: FieldSource,
        haystack: Haystack,
        pattern: &str,
        extract: CaptureExtractor,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            source,
            matcher: Matcher::Pattern {
                regex: Regex::new(pattern)?,
                haystack,
                extract,
            },
        })
    }

    /// Build a heuristic rule; its values are always flagged as heuristic
    pub fn heuristic(name: impl Into<String>, heuristic: HeuristicFn) -> Self {
        Self {
            name: name.into(),
            source: FieldSource::Heuristic,
            matcher: Matcher::Heuristic(heuristic),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> FieldSource {
        self.source
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// First non-empty value this rule produces, trimmed
    pub fn apply(&self, document: &Document) -> Option<String> {
        match &self.matcher {
            Matcher::Pattern {
                regex,
                haystack,
                extract,
            } => regex
                .captures_iter(document.view(*haystack))
                .filter_map(|caps| extract(&caps))
                .find_map(non_empty),
            Matcher::Heuristic(heuristic) => heuristic(document).and_then(non_empty),
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

/// Ordered rule cascades for every field
#[derive(Debug, Default)]
pub struct RuleSet {
    cascades: Vec<(Field, Vec<Rule>)>,
}

impl RuleSet {
    /// A rule set with no rules; every field comes out absent
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append a rule to the end of a field's cascade
    pub fn with_rule(mut self, field: Field, rule: Rule) -> Self {
        self.cascade_mut(field).push(rule);
        self
    }

    /// Insert a rule at the front of a field's cascade
    pub fn prepend_rule(mut self, field: Field, rule: Rule) -> Self {
        self.cascade_mut(field).insert(0, rule);
        self
    }

    /// Rules for a field, in evaluation order
    pub fn rules_for(&self, field: Field) -> &[Rule] {
        self.cascades
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, rules)| rules.as_slice())
            .unwrap_or(&[])
    }

    fn cascade_mut(&mut self, field: Field) -> &mut Vec<Rule> {
        let index = match self.cascades.iter().position(|(f, _)| *f == field) {
            Some(index) => index,
            None => {
                self.cascades.push((field, Vec::new()));
                self.cascades.len() - 1
            }
        };
        &mut self.cascades[index].1
    }

    /// Run every cascade over the text. Pure: the same text always yields
    /// the same fields.
    pub fn extract(&self, text: &str) -> ExtractedFields {
        let document = Document::new(text);
        self.extract_document(&document)
    }

    pub fn extract_document(&self, document: &Document) -> ExtractedFields {
        let mut fields = ExtractedFields::new();

        for field in Field::ALL {
            let hit = self
                .rules_for(field)
                .iter()
                .find_map(|rule| rule.apply(document).map(|value| (rule, value)));

            match hit {
                Some((rule, value)) => {
                    debug!("{}: '{}' via {} ({:?})", field, value, rule.name, rule.source);
                    fields.insert(
                        field,
                        ExtractedValue {
                            value,
                            source: rule.source,
                            rule: rule.name.clone(),
                        },
                    );
                }
                None => trace!("{}: no rule matched", field),
            }
        }

        fields
    }
}
