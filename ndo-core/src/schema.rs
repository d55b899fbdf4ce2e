//! Declarative rule tables describing which fields a policy kind has, and how
//! caller-facing values become wire values.
//!
//! Adding a field or a policy kind is a matter of adding rows here; the patch
//! builder consumes the tables uniformly.

use serde_json::Value;

use crate::{
    desired::{Desired, DesiredFieldSet},
    document::FieldPath,
    Error, Result,
};

/// A fixed lookup from caller-facing choices to wire values.
#[derive(Debug)]
pub struct Translation {
    pub entries: &'static [(&'static str, &'static str)],
}

impl Translation {
    /// Translate a choice. Numbers are looked up by their decimal rendering.
    pub fn wire(&self, value: &Value) -> Option<Value> {
        let key = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        self.entries
            .iter()
            .find(|(choice, _)| *choice == key)
            .map(|(_, wire)| Value::String(wire.to_string()))
    }

    pub fn choices(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(choice, _)| *choice).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    Range { min: i64, max: i64 },
    /// Either 0 (feature off) or within the range.
    ZeroOrRange { min: i64, max: i64 },
}

impl Constraint {
    fn check(&self, value: &Value) -> bool {
        let Some(n) = value.as_i64() else {
            return false;
        };
        match *self {
            Constraint::Range { min, max } => (min..=max).contains(&n),
            Constraint::ZeroOrRange { min, max } => n == 0 || (min..=max).contains(&n),
        }
    }

    fn describe(&self) -> String {
        match self {
            Constraint::Range { min, max } => format!("between {} and {}", min, max),
            Constraint::ZeroOrRange { min, max } => format!("0 or between {} and {}", min, max),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    /// Sent whole on creation. Entries are not reconciled on update.
    List,
}

#[derive(Debug)]
pub struct FieldRule {
    /// Wire path, e.g. `["macsecParams", "cipherSuite"]`.
    pub path: &'static [&'static str],
    /// Caller-facing name, used in error messages.
    pub param: &'static str,
    pub kind: FieldKind,
    pub translation: Option<&'static Translation>,
    pub constraint: Option<Constraint>,
}

impl FieldRule {
    pub const fn scalar(path: &'static [&'static str], param: &'static str) -> Self {
        FieldRule {
            path,
            param,
            kind: FieldKind::Scalar,
            translation: None,
            constraint: None,
        }
    }

    pub const fn list(path: &'static [&'static str], param: &'static str) -> Self {
        FieldRule {
            path,
            param,
            kind: FieldKind::List,
            translation: None,
            constraint: None,
        }
    }

    pub const fn translated(self, translation: &'static Translation) -> Self {
        FieldRule {
            translation: Some(translation),
            ..self
        }
    }

    pub const fn constrained(self, constraint: Constraint) -> Self {
        FieldRule {
            constraint: Some(constraint),
            ..self
        }
    }

    fn matches(&self, path: &FieldPath) -> bool {
        path.segments().len() == self.path.len()
            && path.segments().iter().zip(self.path).all(|(a, b)| a == b)
    }

    /// Translate and check a caller-facing value.
    pub fn wire_value(&self, value: &Value) -> Result<Value> {
        let value = match self.translation {
            Some(translation) => translation.wire(value).ok_or_else(|| {
                Error::Validation(format!(
                    "value of {} must be one of: {}, got: {}",
                    self.param,
                    translation.choices().join(", "),
                    value
                ))
            })?,
            None => value.clone(),
        };
        if let Some(constraint) = self.constraint {
            if !constraint.check(&value) {
                return Err(Error::Validation(format!(
                    "value of {} must be {}, got: {}",
                    self.param,
                    constraint.describe(),
                    value
                )));
            }
        }
        Ok(value)
    }
}

/// A literal injected by the schema rather than supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Literal {
    Int(i64),
    Str(&'static str),
}

impl Literal {
    pub fn to_value(self) -> Value {
        match self {
            Literal::Int(n) => Value::from(n),
            Literal::Str(s) => Value::from(s),
        }
    }
}

#[derive(Debug)]
pub struct SectionRule {
    pub name: &'static str,
    pub param: &'static str,
    /// Set on every creation of the section.
    pub injected: &'static [(&'static str, Literal)],
    /// Wire fields that must be supplied when the section is enabled.
    pub companions: &'static [&'static str],
}

/// The rule table of one policy kind.
#[derive(Debug)]
pub struct PolicySchema {
    pub kind: &'static str,
    /// Human readable object description, e.g. "MACSec Policy".
    pub description: &'static str,
    pub fields: &'static [FieldRule],
    pub sections: &'static [SectionRule],
}

impl PolicySchema {
    pub fn field(&self, path: &FieldPath) -> Option<&FieldRule> {
        self.fields.iter().find(|rule| rule.matches(path))
    }

    pub fn section(&self, name: &str) -> Option<&SectionRule> {
        self.sections.iter().find(|rule| rule.name == name)
    }

    /// The rule for a path that is known to have passed [`Self::validate`].
    pub(crate) fn rule(&self, path: &FieldPath) -> Result<&FieldRule> {
        self.field(path).ok_or_else(|| {
            Error::Validation(format!("unknown {} field: {}", self.kind, path))
        })
    }

    /// Translate a caller-facing value for `path` to its wire value.
    pub fn wire_value(&self, path: &FieldPath, value: &Value) -> Result<Value> {
        self.rule(path)?.wire_value(value)
    }

    fn param_name(&self, section: &SectionRule, field: &str) -> String {
        self.field(&FieldPath::nested(section.name, field))
            .map(|rule| rule.param.to_string())
            .unwrap_or_else(|| format!("{}.{}", section.param, field))
    }

    /// Check a desired state against the table before any operation is
    /// built.
    pub fn validate(&self, desired: &DesiredFieldSet) -> Result<()> {
        for (path, want) in desired.entries() {
            let section = match path.section() {
                Some(name) => Some(name),
                None if self.section(path.head()).is_some() => Some(path.head()),
                None => None,
            };
            if let Some(name) = section {
                if self.section(name).is_none() {
                    return Err(Error::Validation(format!(
                        "unknown {} section: {}",
                        self.kind, name
                    )));
                }
            }
            match (want, path.is_nested()) {
                (Desired::Unset, _) => {}
                // Section level entries only carry the removal sentinel.
                (Desired::Set(_), false) if section.is_some() => {
                    return Err(Error::Validation(format!(
                        "{} must be configured field by field",
                        path
                    )));
                }
                (Desired::Set(value), _) => {
                    self.wire_value(path, value)?;
                }
                (Desired::Remove, true) => {
                    self.rule(path)?;
                }
                (Desired::Remove, false) => {
                    if section.is_none() {
                        self.rule(path)?;
                    }
                }
            }
        }

        for name in desired.enabled_sections() {
            let Some(rule) = self.section(name) else {
                return Err(Error::Validation(format!(
                    "unknown {} section: {}",
                    self.kind, name
                )));
            };
            let missing: Vec<String> = rule
                .companions
                .iter()
                .filter(|field| {
                    !matches!(
                        desired.get(&FieldPath::nested(rule.name, field)),
                        Desired::Set(_)
                    )
                })
                .map(|field| self.param_name(rule, field))
                .collect();
            if !missing.is_empty() {
                return Err(Error::MissingCompanions {
                    section: rule.param.to_string(),
                    missing,
                });
            }
        }

        for rule in self.sections {
            let removed = matches!(
                desired.get(&FieldPath::leaf(rule.name)),
                Desired::Remove
            );
            if removed
                && (desired.is_enabled(rule.name)
                    || desired.section_values(rule.name).next().is_some())
            {
                return Err(Error::Validation(format!(
                    "{} cannot be removed and configured at the same time",
                    rule.param
                )));
            }
        }
        Ok(())
    }
}
