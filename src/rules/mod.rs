pub mod operator;

pub use operator::{compare, lookup, Comparator, Operator};

use std::collections::HashMap;

use crate::domain::TargetingRule;

/// Check a single rule against a user's attributes.
///
/// An absent attribute never matches, whatever the operator.
pub fn rule_matches(rule: &TargetingRule, attributes: &HashMap<String, String>) -> bool {
    match attributes.get(&rule.attribute) {
        Some(value) => compare(&rule.operator, value, &rule.value),
        None => false,
    }
}

/// Return the first rule, in iteration order, that matches the attributes.
pub fn first_match<'a>(
    rules: &'a [TargetingRule],
    attributes: &HashMap<String, String>,
) -> Option<&'a TargetingRule> {
    rules.iter().find(|rule| rule_matches(rule, attributes))
}
