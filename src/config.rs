// Join Configuration
//
// Static policy handed to the join facade. Nothing here changes which rows a
// join produces, only how they are computed and what gets logged.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::executor::result::{JoinError, JoinResult};

/// Join algorithm used by the facade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JoinAlgorithm {
    #[default]
    Hash,
    /// Baseline for testing and debugging
    NestedLoop,
}

/// Which input of a left join is held in memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeftJoinStrategy {
    /// Hold the optional side; stream the preserved left side
    #[default]
    MaterializeRight,
    /// Hold the preserved left side; unmatched rows are emitted at the end
    MaterializeLeft,
}

/// Built-in key hashers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HasherKind {
    /// First key variable only
    #[default]
    Leading,
    /// Every key variable
    Composite,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinConfig {
    pub algorithm: JoinAlgorithm,
    pub left_join_strategy: LeftJoinStrategy,
    pub hasher: HasherKind,
    /// Log join statistics when each join is closed
    pub explain: bool,
}

impl JoinConfig {
    pub fn from_json(text: &str) -> JoinResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| JoinError::InvalidOperation(format!("Invalid join config: {}", e)))
    }

    pub fn with_algorithm(mut self, algorithm: JoinAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_left_join_strategy(mut self, strategy: LeftJoinStrategy) -> Self {
        self.left_join_strategy = strategy;
        self
    }

    pub fn with_hasher(mut self, hasher: HasherKind) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_explain(mut self, explain: bool) -> Self {
        self.explain = explain;
        self
    }
}

impl FromStr for JoinAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hash" => Ok(JoinAlgorithm::Hash),
            "nested-loop" | "loop" => Ok(JoinAlgorithm::NestedLoop),
            other => Err(format!("unknown join algorithm '{}'", other)),
        }
    }
}

impl FromStr for LeftJoinStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "materialize-right" | "right" => Ok(LeftJoinStrategy::MaterializeRight),
            "materialize-left" | "left" => Ok(LeftJoinStrategy::MaterializeLeft),
            other => Err(format!("unknown left join strategy '{}'", other)),
        }
    }
}

impl FromStr for HasherKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "leading" => Ok(HasherKind::Leading),
            "composite" => Ok(HasherKind::Composite),
            other => Err(format!("unknown hasher '{}'", other)),
        }
    }
}

impl fmt::Display for JoinAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinAlgorithm::Hash => write!(f, "hash"),
            JoinAlgorithm::NestedLoop => write!(f, "nested-loop"),
        }
    }
}
