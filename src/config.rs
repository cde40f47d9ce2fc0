use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Category names must not be empty")]
    EmptyCategoryName,

    #[error("Date field name must not be empty")]
    EmptyDateField,
}

/// Whether first/last matching dates are tracked, and under which chunk
/// column name the dates arrive.
///
/// In JSON this is `null`/`false` for [`Off`](Self::Off), `true` for
/// [`On`](Self::On) and a string for [`Field`](Self::Field).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<TrackingFlag>", into = "Option<TrackingFlag>")]
pub enum DateTracking {
    #[default]
    Off,
    /// Dates are tracked; each update names its date column.
    On,
    /// Dates are tracked in the named column.
    Field(String),
}

impl DateTracking {
    /// The configured date column, if one is fixed.
    pub fn date_field(&self) -> Option<&str> {
        match self {
            DateTracking::Off | DateTracking::On => None,
            DateTracking::Field(name) => Some(name),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, DateTracking::Off)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum TrackingFlag {
    Enabled(bool),
    Field(String),
}

impl From<Option<TrackingFlag>> for DateTracking {
    fn from(flag: Option<TrackingFlag>) -> Self {
        match flag {
            None | Some(TrackingFlag::Enabled(false)) => DateTracking::Off,
            Some(TrackingFlag::Enabled(true)) => DateTracking::On,
            Some(TrackingFlag::Field(name)) => DateTracking::Field(name),
        }
    }
}

impl From<DateTracking> for Option<TrackingFlag> {
    fn from(tracking: DateTracking) -> Self {
        match tracking {
            DateTracking::Off => None,
            DateTracking::On => Some(TrackingFlag::Enabled(true)),
            DateTracking::Field(name) => Some(TrackingFlag::Field(name)),
        }
    }
}

/// Category definitions for a [`Counter`](crate::Counter).
///
/// `codes_full` maps a category name to the exact codes that belong to it.
/// `codes_initial` maps a category name to code prefixes: any code starting
/// with one of them belongs to the category. A name may appear in either map
/// or in both, in which case a code matching either rule counts.
///
/// Note that an empty prefix matches every code.
///
/// # Examples
///
/// ```rust
/// use code_tally::CounterConfig;
///
/// let config = CounterConfig::from_json_str(r#"{
///     "codes_full": { "diabetes": ["25000", "25001"] },
///     "codes_initial": { "hypertension": ["401", "402"] },
///     "date_tracking": "visit_date"
/// }"#)?;
///
/// assert_eq!(config.date_tracking.date_field(), Some("visit_date"));
/// # Ok::<(), code_tally::ConfigError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    /// Category name to exact codes.
    pub codes_full: BTreeMap<String, Vec<String>>,
    /// Category name to code prefixes.
    pub codes_initial: BTreeMap<String, Vec<String>>,
    pub date_tracking: DateTracking,
}

impl CounterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// A config with a single exact-code category, for callers holding a bare
    /// list of codes rather than a mapping.
    pub fn single_full<I, C>(name: impl Into<String>, codes: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        Self::new().with_full(name, codes)
    }

    /// A config with a single prefix category.
    pub fn single_initial<I, C>(name: impl Into<String>, prefixes: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        Self::new().with_initial(name, prefixes)
    }

    pub fn with_full<I, C>(mut self, name: impl Into<String>, codes: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.codes_full
            .entry(name.into())
            .or_default()
            .extend(codes.into_iter().map(Into::into));
        self
    }

    pub fn with_initial<I, C>(mut self, name: impl Into<String>, prefixes: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.codes_initial
            .entry(name.into())
            .or_default()
            .extend(prefixes.into_iter().map(Into::into));
        self
    }

    pub fn track_dates(mut self, date_field: impl Into<String>) -> Self {
        self.date_tracking = DateTracking::Field(date_field.into());
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.category_names().any(str::is_empty) {
            return Err(ConfigError::EmptyCategoryName);
        }
        if self.date_tracking.date_field() == Some("") {
            return Err(ConfigError::EmptyDateField);
        }
        Ok(())
    }

    /// Every configured category name, sorted and deduplicated.
    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        let mut names: Vec<&str> = self
            .codes_full
            .keys()
            .chain(self.codes_initial.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names.dedup();
        names.into_iter()
    }
}
