//! Per-function label bookkeeping.
//!
//! Labels are keyed by `(scope, label)` so two functions may both use
//! `LOOP` without colliding. References may precede their definition, so
//! checking happens when a scope is closed.

use std::collections::HashSet;

use crate::error::{InvalidOperandSnafu, Result, UnresolvedLabelSnafu};

/// Scope of the symbols emitted by the bootstrap.
pub const BOOTSTRAP_SCOPE: &str = "Bootstrap";
const RETURN_PREFIX: &str = "ret.";
const TRUE_PREFIX: &str = "TRUE_";
const END_CMP_PREFIX: &str = "END_CMP_";

fn numbered(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .map_or(false, |n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Label, within its scope, of the `site`-th call's return address.
pub fn return_label(site: usize) -> String {
    format!("{}{}", RETURN_PREFIX, site)
}

/// Unscoped `(true, end)` symbols of the `n`-th comparison.
pub fn comparison_labels(n: usize) -> (String, String) {
    (format!("{}{}", TRUE_PREFIX, n), format!("{}{}", END_CMP_PREFIX, n))
}

/// Why a user label would clash with a generated one, if it would.
pub fn reserved_label(label: &str) -> Option<&'static str> {
    numbered(label, RETURN_PREFIX).then_some("labels of the form ret.N are used for return addresses")
}

/// Why `name` cannot scope labels or name a function, if it cannot.
pub fn reserved_scope(name: &str) -> Option<&'static str> {
    if name.contains('$') {
        Some("'$' separates function and label in scoped symbols")
    } else if name == BOOTSTRAP_SCOPE {
        Some("the name is used by the bootstrap")
    } else if numbered(name, TRUE_PREFIX) || numbered(name, END_CMP_PREFIX) {
        Some("the name is used by comparison labels")
    } else {
        None
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct ScopedLabel {
    pub scope: String,
    pub label: String,
}

impl ScopedLabel {
    pub fn new(scope: &str, label: &str) -> Self {
        ScopedLabel {
            scope: scope.to_string(),
            label: label.to_string(),
        }
    }

    /// Assembly symbol for this label.
    pub fn symbol(&self) -> String {
        format!("{}${}", self.scope, self.label)
    }
}

#[derive(Debug, Clone)]
struct Reference {
    target: ScopedLabel,
    line: usize,
}

#[derive(Debug, Default)]
pub struct LabelTable {
    defined: HashSet<ScopedLabel>,
    pending: Vec<Reference>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, unit: &str, line: usize, raw: &str, target: ScopedLabel) -> Result<()> {
        if self.defined.contains(&target) {
            return InvalidOperandSnafu {
                unit,
                line,
                raw,
                reason: format!("label '{}' already defined in '{}'", target.label, target.scope),
            }
            .fail();
        }
        self.defined.insert(target);
        Ok(())
    }

    pub fn reference(&mut self, line: usize, target: ScopedLabel) {
        self.pending.push(Reference { target, line });
    }

    /// Check every reference made so far against the definitions, then
    /// forget the references. Reports the earliest unresolved one.
    pub fn resolve(&mut self, unit: &str) -> Result<()> {
        let pending = std::mem::take(&mut self.pending);
        match pending.iter().find(|r| !self.defined.contains(&r.target)) {
            Some(missing) => UnresolvedLabelSnafu {
                unit,
                line: missing.line,
                function: missing.target.scope.as_str(),
                label: missing.target.label.as_str(),
            }
            .fail(),
            None => Ok(()),
        }
    }
}
