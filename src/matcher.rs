use crate::config::CounterConfig;
use std::collections::HashSet;

/// A single classification rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// Matches codes equal to one of the set members.
    Exact(HashSet<String>),
    /// Matches codes starting with one of the prefixes. An empty prefix
    /// matches every code.
    Prefix(Vec<String>),
}

impl Rule {
    pub fn matches(&self, code: &str) -> bool {
        match self {
            Rule::Exact(codes) => codes.contains(code),
            Rule::Prefix(prefixes) => prefixes.iter().any(|p| code.starts_with(p.as_str())),
        }
    }
}

/// A named category. A code belongs to it if any of its rules matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    name: String,
    rules: Vec<Rule>,
}

impl Category {
    pub fn new(name: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self {
            name: name.into(),
            rules,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn matches(&self, code: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(code))
    }
}

/// Classifies codes against a fixed, name-sorted set of categories.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    categories: Vec<Category>,
}

impl Matcher {
    pub fn from_config(config: &CounterConfig) -> Self {
        let categories = config
            .category_names()
            .map(|name| {
                let mut rules = Vec::with_capacity(2);
                if let Some(codes) = config.codes_full.get(name) {
                    rules.push(Rule::Exact(codes.iter().cloned().collect()));
                }
                if let Some(prefixes) = config.codes_initial.get(name) {
                    if prefixes.iter().any(String::is_empty) {
                        tracing::warn!(category = name, "empty prefix matches every code");
                    }
                    rules.push(Rule::Prefix(prefixes.clone()));
                }
                Category::new(name, rules)
            })
            .collect();

        Self { categories }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(Category::name)
    }

    pub fn position(&self, category: &str) -> Option<usize> {
        self.categories
            .binary_search_by(|c| c.name().cmp(category))
            .ok()
    }

    /// Whether `code` belongs to `category`. Unknown categories match nothing.
    pub fn matches(&self, code: &str, category: &str) -> bool {
        self.position(category)
            .is_some_and(|i| self.categories[i].matches(code))
    }

    /// Indices of every category `code` belongs to, in column order.
    pub fn classify<'a>(&'a self, code: &'a str) -> impl Iterator<Item = usize> + 'a {
        self.categories
            .iter()
            .enumerate()
            .filter(move |(_, category)| category.matches(code))
            .map(|(i, _)| i)
    }
}
