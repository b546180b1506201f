//! Templated path patterns with named captures.
//!
//! A template is split on `/`. Segments written as `{name}` or `{name:regex}`
//! become named capture groups, everything else is copied into the expression
//! as-is:
//!
//! - `/users/{id}/books` becomes `^/users/(?P<id>[^/]+)/books$`
//! - `/users/{id:[0-9]+}/books` becomes `^/users/(?P<id>[0-9]+)/books$`
//!
//! Literal segments are not escaped, so a `.` in a literal matches any
//! character. Templates are expected to use plain resource names.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::error::GatehouseError;

const DEFAULT_SEGMENT_REGEX: &str = "[^/]+";

static PATTERN_CACHE: Lazy<RwLock<HashMap<(String, bool), Arc<CompiledPattern>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Parameters captured from a path, and whether the path matched at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PathMatch {
    pub params: BTreeMap<String, String>,
    pub matched: bool,
}

impl PathMatch {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// A template compiled into a single anchored regular expression.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    template: String,
    anchored_end: bool,
    regex: Regex,
}

impl CompiledPattern {
    /// Compile `template`. The expression is always anchored at the start, and
    /// at the end only when `anchor_end` is set, which allows prefix matching.
    pub fn compile(template: &str, anchor_end: bool) -> Result<Self, GatehouseError> {
        let expression = template_to_regex(template, anchor_end);
        let regex = Regex::new(&expression)?;
        debug!(
            event = "PathPattern",
            phase = "Compiled",
            template = template,
            expression = expression
        );
        Ok(Self {
            template: template.to_string(),
            anchored_end: anchor_end,
            regex,
        })
    }

    /// Compile once per process, then hand out the shared pattern.
    pub fn cached(template: &str, anchor_end: bool) -> Result<Arc<Self>, GatehouseError> {
        let key = (template.to_string(), anchor_end);
        if let Some(pattern) = PATTERN_CACHE.read()?.get(&key) {
            return Ok(Arc::clone(pattern));
        }

        let compiled = Arc::new(Self::compile(template, anchor_end)?);
        let mut cache = PATTERN_CACHE.write()?;
        Ok(Arc::clone(cache.entry(key).or_insert(compiled)))
    }

    /// Match `path`, returning one parameter per named group.
    ///
    /// A group that took no part in the match is reported as an empty string.
    pub fn match_path(&self, path: &str) -> PathMatch {
        let Some(captures) = self.regex.captures(path) else {
            return PathMatch::default();
        };

        let params = self
            .regex
            .capture_names()
            .flatten()
            .map(|name| {
                let value = captures.name(name).map_or("", |m| m.as_str());
                (name.to_string(), value.to_string())
            })
            .collect();

        PathMatch {
            params,
            matched: true,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn is_anchored_end(&self) -> bool {
        self.anchored_end
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// Translate a template into its regular expression source.
pub fn template_to_regex(template: &str, anchor_end: bool) -> String {
    let body = template
        .split('/')
        .map(|segment| match placeholder(segment) {
            Some((name, regex)) => format!("(?P<{name}>{regex})"),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/");

    if anchor_end {
        format!("^{body}$")
    } else {
        format!("^{body}")
    }
}

fn placeholder(segment: &str) -> Option<(&str, &str)> {
    let inner = segment.strip_prefix('{')?.strip_suffix('}')?;
    Some(
        inner
            .split_once(':')
            .unwrap_or((inner, DEFAULT_SEGMENT_REGEX)),
    )
}
