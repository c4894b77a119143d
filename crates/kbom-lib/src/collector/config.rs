//! Per-run configuration for the collector

use crate::models::Tool;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// How much per-instance detail a run records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Counts only; no labels, annotations or resource names
    Short,
    #[default]
    Full,
}

impl Mode {
    pub fn from_short_flag(short: bool) -> Self {
        if short {
            Mode::Short
        } else {
            Mode::Full
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Short => "short",
            Mode::Full => "full",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Namespace and resource kind allow-lists. Empty means "everything".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    pub namespaces: BTreeSet<String>,
    pub kinds: BTreeSet<String>,
}

impl Filters {
    /// Parse comma-separated lists such as `"default, kube-system"`
    pub fn parse(namespaces: &str, kinds: &str) -> Self {
        Self {
            namespaces: parse_list(namespaces),
            kinds: parse_list(kinds),
        }
    }

    pub fn allows_namespace(&self, namespace: &str) -> bool {
        self.namespaces.is_empty() || self.namespaces.contains(&namespace.to_lowercase())
    }

    pub fn allows_kind(&self, kind: &str) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind.to_lowercase())
    }

    pub fn filters_namespaces(&self) -> bool {
        !self.namespaces.is_empty()
    }
}

fn parse_list(value: &str) -> BTreeSet<String> {
    value
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .split(',')
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Everything one collection run needs to know, built once at start-up
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub mode: Mode,
    pub filters: Filters,
    /// Upper bound for each individual cluster call
    pub request_timeout: Duration,
    /// Resource kinds listed at the same time
    pub concurrency: usize,
    pub tool: Tool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            mode: Mode::default(),
            filters: Filters::default(),
            request_timeout: Duration::from_secs(30),
            concurrency: 4,
            tool: Tool::default(),
        }
    }
}
