//! Label selector compilation.
//!
//! Accepts the Kubernetes selector string grammar: comma-separated
//! requirements of the form `k=v`, `k==v`, `k!=v`, `k in (a,b)`,
//! `k notin (a,b)`, `k` and `!k`. The compiled form renders back to canonical
//! selector text for `ListParams` and can be evaluated against a label map.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use keel_core::{KeelError, KeelResult};
use once_cell::sync::Lazy;
use regex::Regex;

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?$").expect("static regex"));
static DNS_SUBDOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$").expect("static regex")
});
static SET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\S+)\s+(in|notin)\s*\((.*)\)$").expect("static regex"));

const MAX_NAME_LEN: usize = 63;
const MAX_PREFIX_LEN: usize = 253;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operator {
    Equals(String),
    NotEquals(String),
    In(BTreeSet<String>),
    NotIn(BTreeSet<String>),
    Exists,
    DoesNotExist,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub key: String,
    pub op: Operator,
}

impl Requirement {
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        let value = labels.get(&self.key);
        match &self.op {
            Operator::Equals(v) => value == Some(v),
            Operator::NotEquals(v) => value != Some(v),
            Operator::In(set) => value.map(|v| set.contains(v)).unwrap_or(false),
            Operator::NotIn(set) => value.map(|v| !set.contains(v)).unwrap_or(true),
            Operator::Exists => value.is_some(),
            Operator::DoesNotExist => value.is_none(),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |set: &BTreeSet<String>| set.iter().cloned().collect::<Vec<_>>().join(",");
        match &self.op {
            Operator::Equals(v) => write!(f, "{}={}", self.key, v),
            Operator::NotEquals(v) => write!(f, "{}!={}", self.key, v),
            Operator::In(set) => write!(f, "{} in ({})", self.key, join(set)),
            Operator::NotIn(set) => write!(f, "{} notin ({})", self.key, join(set)),
            Operator::Exists => write!(f, "{}", self.key),
            Operator::DoesNotExist => write!(f, "!{}", self.key),
        }
    }
}

/// A parsed selector. All requirements must hold for a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledSelector {
    requirements: Vec<Requirement>,
}

impl CompiledSelector {
    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|r| r.matches(labels))
    }
}

impl fmt::Display for CompiledSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.requirements.iter().map(|r| r.to_string()).collect();
        f.write_str(&parts.join(","))
    }
}

/// Compile a selector expression. Blank input means "no selector" and yields `None`.
pub fn compile_selector(expression: &str) -> KeelResult<Option<CompiledSelector>> {
    if expression.trim().is_empty() {
        return Ok(None);
    }
    let fail = |reason: String| KeelError::InvalidSelectorSyntax { expression: expression.to_string(), reason };
    let mut requirements = Vec::new();
    for term in split_terms(expression).map_err(fail)? {
        requirements.push(parse_requirement(term.trim()).map_err(fail)?);
    }
    Ok(Some(CompiledSelector { requirements }))
}

/// Split on commas that are not inside a parenthesised value set.
fn split_terms(expr: &str) -> Result<Vec<&str>, String> {
    let mut out = Vec::new();
    let (mut depth, mut start) = (0i32, 0usize);
    for (i, c) in expr.char_indices() {
        match c {
            '(' => {
                depth += 1;
                if depth > 1 {
                    return Err("nested parentheses".into());
                }
            }
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err("unbalanced ')'".into());
                }
            }
            ',' if depth == 0 => {
                out.push(&expr[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err("unbalanced '('".into());
    }
    out.push(&expr[start..]);
    Ok(out)
}

fn parse_requirement(term: &str) -> Result<Requirement, String> {
    if term.is_empty() {
        return Err("empty requirement".into());
    }
    if let Some(rest) = term.strip_prefix('!') {
        let key = rest.trim();
        validate_key(key)?;
        return Ok(Requirement { key: key.to_string(), op: Operator::DoesNotExist });
    }
    if let Some(caps) = SET_RE.captures(term) {
        let key = &caps[1];
        validate_key(key)?;
        let mut values = BTreeSet::new();
        for v in caps[3].split(',') {
            let v = v.trim();
            validate_value(v)?;
            values.insert(v.to_string());
        }
        let op = if &caps[2] == "in" { Operator::In(values) } else { Operator::NotIn(values) };
        return Ok(Requirement { key: key.to_string(), op });
    }
    if let Some((key, value)) = term.split_once("!=") {
        return equality(key, value, false);
    }
    if let Some((key, value)) = term.split_once("==") {
        return equality(key, value, true);
    }
    if let Some((key, value)) = term.split_once('=') {
        return equality(key, value, true);
    }
    if term.contains(char::is_whitespace) || term.contains(&['(', ')'][..]) {
        return Err(format!("unexpected token in '{}'", term));
    }
    validate_key(term)?;
    Ok(Requirement { key: term.to_string(), op: Operator::Exists })
}

fn equality(key: &str, value: &str, equals: bool) -> Result<Requirement, String> {
    let (key, value) = (key.trim(), value.trim());
    validate_key(key)?;
    validate_value(value)?;
    let op = if equals { Operator::Equals(value.to_string()) } else { Operator::NotEquals(value.to_string()) };
    Ok(Requirement { key: key.to_string(), op })
}

fn validate_key(key: &str) -> Result<(), String> {
    if key.is_empty() {
        return Err("missing label key".into());
    }
    let name = match key.split_once('/') {
        Some((prefix, name)) => {
            if prefix.is_empty() || prefix.len() > MAX_PREFIX_LEN || !DNS_SUBDOMAIN_RE.is_match(prefix) {
                return Err(format!("invalid label key prefix '{}'", prefix));
            }
            name
        }
        None => key,
    };
    if name.is_empty() || name.len() > MAX_NAME_LEN || !NAME_RE.is_match(name) {
        return Err(format!("invalid label key '{}'", key));
    }
    Ok(())
}

fn validate_value(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Ok(());
    }
    if value.len() > MAX_NAME_LEN || !NAME_RE.is_match(value) {
        return Err(format!("invalid label value '{}'", value));
    }
    Ok(())
}
