//! Query classification as ordered decision tables.
//!
//! Each table is a list of `(pattern, result)` rules tested in order against
//! the lowercased query; the first match wins. Rule order encodes precedence:
//! a framework question that also says "error" is still a framework question.

use crate::types::{Classification, Intent, Scope};
use codectx_units::UnitType;
use once_cell::sync::Lazy;
use regex::Regex;

struct Rule<T> {
    pattern: Regex,
    result: T,
}

fn rule<T>(pattern: &str, result: T) -> Rule<T> {
    Rule {
        pattern: Regex::new(pattern).unwrap(),
        result,
    }
}

fn first_match<T: Clone>(rules: &[Rule<T>], text: &str) -> Option<T> {
    rules
        .iter()
        .find(|rule| rule.pattern.is_match(text))
        .map(|rule| rule.result.clone())
}

const FRAMEWORK_NAMES: &str = r"rails|active\s?record|active\s?support|active\s?model|active\s?job|active\s?storage|action\s?controller|action\s?pack|action\s?view|action\s?mailer|action\s?cable|rack|sidekiq|devise";

static INTENT_RULES: Lazy<Vec<Rule<Intent>>> = Lazy::new(|| {
    vec![
        rule(
            &format!(r"\bhow (does|do|is|are)\s+({FRAMEWORK_NAMES})\b|\b({FRAMEWORK_NAMES}|framework)\s+(internals?|source|implementation)\b|\bunder the hood\b"),
            Intent::Framework,
        ),
        rule(
            r"\b(bugs?|errors?|exceptions?|fail(s|ed|ing|ure)?|broken|crash(es|ed|ing)?|debug(ging)?|fix|wrong|not working|nil|undefined|raises?)\b",
            Intent::Debug,
        ),
        rule(
            r"\b(trace|flow|calls?|called|invoked?s?|depends? on|dependenc(y|ies)|dependents?|what uses|who uses|call chain|goes through|triggers?|triggered)\b",
            Intent::Trace,
        ),
        rule(
            r"\b(compare|comparison|difference|differ|vs\.?|versus)\b",
            Intent::Compare,
        ),
        rule(
            r"\b(implement|add|create|build|write|extend|new feature|how (do|can|should) i|how to)\b",
            Intent::Implement,
        ),
        rule(
            r"\b(where|find|locate|which file|defined|definition)\b",
            Intent::Locate,
        ),
        rule(
            r"\b(list|signature|api|reference|docs?|options|params|parameters|arguments|columns|attributes|fields|methods)\b",
            Intent::Reference,
        ),
        rule(
            r"\b(how|why|what|explain|understand|describe|overview)\b",
            Intent::Understand,
        ),
    ]
});

static SCOPE_RULES: Lazy<Vec<Rule<Scope>>> = Lazy::new(|| {
    vec![
        // A lone identifier or term is a direct lookup
        rule(r"^\S+$", Scope::Pinpoint),
        rule(
            r"\b(exactly|specific(ally)?|line \d+|just the|only the)\b",
            Scope::Pinpoint,
        ),
        rule(
            r"\b(all|every|entire|whole|complete|comprehensive|architecture|everything|full)\b",
            Scope::Comprehensive,
        ),
        rule(
            r"\b(explore|related|overview|similar|around|ecosystem|landscape|connected|neighbou?rhood)\b",
            Scope::Exploratory,
        ),
    ]
});

static TARGET_TYPE_RULES: Lazy<Vec<Rule<UnitType>>> = Lazy::new(|| {
    vec![
        rule(r"\bmodels?\b", UnitType::Model),
        rule(r"\b(controllers?|endpoints?)\b", UnitType::Controller),
        rule(r"\bservices?\b", UnitType::Service),
        rule(r"\b(jobs?|workers?)\b", UnitType::Job),
        rule(r"\b(mailers?|emails?)\b", UnitType::Mailer),
        rule(r"\b(graphql|mutations?|resolvers?)\b", UnitType::Graphql),
    ]
});

static FRAMEWORK_TERMS: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\b({FRAMEWORK_NAMES}|gems?|framework)\b")).unwrap());

static TOKEN_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}_]+").unwrap());

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "am", "how", "does", "do", "did",
    "what", "where", "when", "why", "who", "which", "work", "works", "i", "me", "my", "we", "our",
    "you", "your", "it", "its", "of", "in", "on", "at", "to", "for", "from", "with", "by", "and",
    "or", "not", "this", "that", "these", "those", "there", "can", "could", "should", "would",
    "will", "find", "show", "get", "all", "any", "about", "into", "use", "used", "uses", "has",
    "have", "happens", "tell", "explain",
];

/// Stateless query classifier
pub struct QueryClassifier;

impl QueryClassifier {
    #[must_use]
    pub fn classify(query: &str) -> Classification {
        let text = query.trim().to_lowercase();

        let intent = first_match(&INTENT_RULES, &text).unwrap_or(Intent::Understand);
        let scope = Self::scope(&text);
        let target_type = first_match(&TARGET_TYPE_RULES, &text);
        let framework_context = intent == Intent::Framework || FRAMEWORK_TERMS.is_match(&text);
        let keywords = Self::keywords(&text);

        log::debug!(
            "Classified '{}': intent={intent:?} scope={scope:?} target={target_type:?} framework={framework_context}",
            query.trim()
        );

        Classification {
            intent,
            scope,
            target_type,
            framework_context,
            keywords,
        }
    }

    fn scope(text: &str) -> Scope {
        first_match(&SCOPE_RULES, text).unwrap_or(Scope::Focused)
    }

    /// Lowercase content words: punctuation stripped, stop words and
    /// one-character tokens dropped, first occurrence kept
    #[must_use]
    pub fn keywords(query: &str) -> Vec<String> {
        let lowered = query.to_lowercase();
        let mut keywords: Vec<String> = Vec::new();
        for token in TOKEN_SPLIT.split(&lowered) {
            let token = token.trim_matches('_');
            if token.chars().count() < 2 || STOP_WORDS.contains(&token) {
                continue;
            }
            if !keywords.iter().any(|k| k == token) {
                keywords.push(token.to_string());
            }
        }
        keywords
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn authentication_question_is_plain_understand() {
        let c = QueryClassifier::classify("how does user authentication work?");
        assert_eq!(c.intent, Intent::Understand);
        assert_eq!(c.scope, Scope::Focused);
        assert!(!c.framework_context);
        assert_eq!(c.target_type, None);
        assert_eq!(c.keywords, ["user", "authentication"]);
    }

    #[test]
    fn framework_intent_wins_over_debug() {
        let c = QueryClassifier::classify("How does ActiveRecord handle errors in callbacks?");
        assert_eq!(c.intent, Intent::Framework);
        assert!(c.framework_context);
    }

    #[test]
    fn intents_follow_table_order() {
        let cases = [
            ("why is checkout raising an exception", Intent::Debug),
            ("trace the order flow from cart", Intent::Trace),
            ("difference between order and invoice", Intent::Compare),
            ("add a refund endpoint", Intent::Implement),
            ("where is the payment gateway defined", Intent::Locate),
            ("list the order columns", Intent::Reference),
            ("explain invoicing", Intent::Understand),
            ("invoice totals", Intent::Understand),
        ];
        for (query, expected) in cases {
            assert_eq!(QueryClassifier::classify(query).intent, expected, "{query}");
        }
    }

    #[test]
    fn scopes() {
        assert_eq!(QueryClassifier::classify("User").scope, Scope::Pinpoint);
        assert_eq!(
            QueryClassifier::classify("show exactly the user model").scope,
            Scope::Pinpoint
        );
        assert_eq!(
            QueryClassifier::classify("describe the entire billing architecture").scope,
            Scope::Comprehensive
        );
        assert_eq!(
            QueryClassifier::classify("explore code related to invoices").scope,
            Scope::Exploratory
        );
    }

    #[test]
    fn single_term_is_pinpoint_before_other_scope_rows() {
        assert_eq!(QueryClassifier::classify("everything").scope, Scope::Pinpoint);
        assert_eq!(QueryClassifier::classify("  Admin::User  ").scope, Scope::Pinpoint);
        assert_eq!(QueryClassifier::classify("everything here").scope, Scope::Comprehensive);
        assert_eq!(QueryClassifier::classify("").scope, Scope::Focused);
    }

    #[test]
    fn target_type_uses_first_matching_row() {
        assert_eq!(
            QueryClassifier::classify("which model does the orders controller use").target_type,
            Some(UnitType::Model)
        );
        assert_eq!(
            QueryClassifier::classify("the welcome email").target_type,
            Some(UnitType::Mailer)
        );
        assert_eq!(
            QueryClassifier::classify("graphql order mutation").target_type,
            Some(UnitType::Graphql)
        );
    }

    #[test]
    fn gem_mentions_set_framework_context() {
        let c = QueryClassifier::classify("where is the devise session stored");
        assert_eq!(c.intent, Intent::Locate);
        assert!(c.framework_context);
    }

    #[test]
    fn keywords_strip_punctuation_and_dedupe() {
        assert_eq!(
            QueryClassifier::keywords("User's user_session, Admin::User -- a x"),
            ["user", "user_session", "admin"]
        );
        assert!(QueryClassifier::keywords("").is_empty());
        assert!(QueryClassifier::keywords("how does it work").is_empty());
    }

    #[test]
    fn keywords_keep_accented_words_whole() {
        assert_eq!(
            QueryClassifier::keywords("Café größe, naïve!"),
            ["café", "größe", "naïve"]
        );
        assert_eq!(QueryClassifier::keywords("Über::Straße"), ["über", "straße"]);
    }
}
