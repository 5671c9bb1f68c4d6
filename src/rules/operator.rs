use std::fmt;

/// Pure comparison between an attribute value (left) and a rule value (right).
pub type Comparator = fn(&str, &str) -> bool;

/// Supported targeting operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equals,
    Contains,
    In,
    StartsWith,
}

const OPERATORS: [(&str, Operator); 4] = [
    ("equals", Operator::Equals),
    ("contains", Operator::Contains),
    ("in", Operator::In),
    ("starts_with", Operator::StartsWith),
];

impl Operator {
    /// Look up an operator by name. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        OPERATORS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, op)| *op)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::Contains => "contains",
            Operator::In => "in",
            Operator::StartsWith => "starts_with",
        }
    }

    #[inline]
    pub fn comparator(&self) -> Comparator {
        match self {
            Operator::Equals => equals,
            Operator::Contains => contains,
            Operator::In => is_in,
            Operator::StartsWith => starts_with,
        }
    }

    /// Apply the operator with the attribute value on the left.
    #[inline]
    pub fn apply(&self, attribute_value: &str, rule_value: &str) -> bool {
        (self.comparator())(attribute_value, rule_value)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve an operator name to its comparison function.
pub fn lookup(name: &str) -> Option<Comparator> {
    Operator::from_name(name).map(|op| op.comparator())
}

/// Compare by operator name. Unknown operators never match.
pub fn compare(operator: &str, attribute_value: &str, rule_value: &str) -> bool {
    lookup(operator).is_some_and(|cmp| cmp(attribute_value, rule_value))
}

fn equals(left: &str, right: &str) -> bool {
    left == right
}

fn contains(left: &str, right: &str) -> bool {
    left.contains(right)
}

fn starts_with(left: &str, right: &str) -> bool {
    left.starts_with(right)
}

fn is_in(left: &str, right: &str) -> bool {
    list_items(right).contains(&left)
}

/// Split a comma-separated list. Items are not trimmed; trailing empty
/// items are dropped once a separator is present, so "A,B," holds only
/// "A" and "B" while "" holds a single empty item.
fn list_items(list: &str) -> Vec<&str> {
    let mut items: Vec<&str> = list.split(',').collect();
    if items.len() > 1 {
        while items.last() == Some(&"") {
            items.pop();
        }
    }
    items
}
