use std::fmt;

use serde::{Deserialize, Serialize};

/// Field of a layer object that carries its name.
pub const NAME_FIELD: &str = "name";

/// Remote action requested by a directive prefix on a layer name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LayerAction {
    /// Write the layer body to the layer store; never overwrites.
    Create,
    /// Replace the layer body with the stored copy.
    Read,
    /// Overwrite the stored copy with the layer body.
    Update,
    /// Recognised but performs no remote mutation.
    Delete,
}

impl LayerAction {
    pub const ALL: [LayerAction; 4] = [Self::Create, Self::Read, Self::Update, Self::Delete];

    /// The directive prefix, including the trailing `:`.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Create => "CREATE:",
            Self::Read => "READ:",
            Self::Update => "UPDATE:",
            Self::Delete => "DELETE:",
        }
    }

    /// Longest directive prefix of `name`, if any. Matching is case-sensitive.
    fn match_prefix(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .filter(|action| name.starts_with(action.prefix()))
            .max_by_key(|action| action.prefix().len())
    }
}

impl fmt::Display for LayerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix().trim_end_matches(':'))
    }
}

/// A layer name, parsed once at ingestion.
///
/// Stacked prefixes such as `CREATE:READ:x` resolve to `x`; the outermost
/// prefix selects the action. This keeps resolved names directive-free.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LayerName {
    Plain(String),
    Directive { action: LayerAction, name: String },
}

impl LayerName {
    pub fn parse(raw: &str) -> Self {
        let Some(action) = LayerAction::match_prefix(raw) else {
            return Self::Plain(raw.to_string());
        };
        let mut rest = &raw[action.prefix().len()..];
        while let Some(inner) = LayerAction::match_prefix(rest) {
            rest = &rest[inner.prefix().len()..];
        }
        Self::Directive {
            action,
            name: rest.to_string(),
        }
    }

    /// The name with any directive stripped.
    pub fn resolved(&self) -> &str {
        match self {
            Self::Plain(name) | Self::Directive { name, .. } => name,
        }
    }

    pub fn action(&self) -> Option<LayerAction> {
        match self {
            Self::Plain(_) => None,
            Self::Directive { action, .. } => Some(*action),
        }
    }

    pub fn into_resolved(self) -> String {
        match self {
            Self::Plain(name) | Self::Directive { name, .. } => name,
        }
    }
}

impl fmt::Display for LayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(name) => f.write_str(name),
            Self::Directive { action, name } => write!(f, "{}{}", action.prefix(), name),
        }
    }
}
