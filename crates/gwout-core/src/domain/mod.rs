pub mod errors;

pub use errors::{ErrorCategory, OutputError, OutputResult};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Head,
    Drawdown,
    Flow,
    Budget,
}

impl FieldKind {
    pub const ALL: [FieldKind; 4] = [Self::Head, Self::Drawdown, Self::Flow, Self::Budget];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Head => "HEAD",
            Self::Drawdown => "DRAWDOWN",
            Self::Flow => "FLOW",
            Self::Budget => "BUDGET",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "HEAD" | "HDS" => Some(Self::Head),
            "DRAWDOWN" | "DDN" => Some(Self::Drawdown),
            "FLOW" => Some(Self::Flow),
            "BUDGET" | "BD" => Some(Self::Budget),
            _ => None,
        }
    }

    /// Head and drawdown are stored one preamble per layer.
    pub const fn is_layered(self) -> bool {
        matches!(self, Self::Head | Self::Drawdown)
    }
}

impl Display for FieldKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
pub struct OutputCoordinate {
    pub period: usize,
    pub step: usize,
    pub layer: usize,
}

impl OutputCoordinate {
    pub const fn new(period: usize, step: usize, layer: usize) -> Self {
        Self {
            period,
            step,
            layer,
        }
    }
}

impl Display for OutputCoordinate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "period {} step {} layer {}",
            self.period, self.step, self.layer
        )
    }
}
