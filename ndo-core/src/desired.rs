use serde_json::Value;

use crate::document::FieldPath;

/// What the caller asked for at one field path.
#[derive(Debug, Clone, PartialEq)]
pub enum Desired {
    /// Not supplied; never produces an operation.
    Unset,
    /// Converge the field to this caller-facing value.
    Set(Value),
    /// Clear the field (typically a whole sub-section).
    Remove,
}

static UNSET: Desired = Desired::Unset;

/// A sparse desired state, in the order the fields are to be evaluated.
///
/// Setting the same path twice keeps the first position and the last value,
/// so the order of emitted operations only depends on the order in which the
/// paths were first mentioned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesiredFieldSet {
    entries: Vec<(FieldPath, Desired)>,
    enabled: Vec<String>,
}

impl DesiredFieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn put(&mut self, path: FieldPath, desired: Desired) -> &mut Self {
        match self.entries.iter_mut().find(|(p, _)| *p == path) {
            Some((_, slot)) => *slot = desired,
            None => self.entries.push((path, desired)),
        }
        self
    }

    pub fn set(&mut self, path: FieldPath, value: impl Into<Value>) -> &mut Self {
        self.put(path, Desired::Set(value.into()))
    }

    /// Set the field if the caller supplied a value, otherwise record it as
    /// unset.
    pub fn set_opt<T: Into<Value>>(&mut self, path: FieldPath, value: Option<T>) -> &mut Self {
        match value {
            Some(v) => self.put(path, Desired::Set(v.into())),
            None => self.put(path, Desired::Unset),
        }
    }

    pub fn remove(&mut self, path: FieldPath) -> &mut Self {
        self.put(path, Desired::Remove)
    }

    /// Mark a sub-section as explicitly enabled, which makes its companion
    /// fields mandatory.
    pub fn enable(&mut self, section: &str) -> &mut Self {
        if !self.is_enabled(section) {
            self.enabled.push(section.to_string());
        }
        self
    }

    pub fn is_enabled(&self, section: &str) -> bool {
        self.enabled.iter().any(|s| s == section)
    }

    pub fn enabled_sections(&self) -> impl Iterator<Item = &str> {
        self.enabled.iter().map(String::as_str)
    }

    pub fn get(&self, path: &FieldPath) -> &Desired {
        self.entries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, d)| d)
            .unwrap_or(&UNSET)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&FieldPath, &Desired)> {
        self.entries.iter().map(|(p, d)| (p, d))
    }

    /// The values supplied for fields of one sub-section, in order.
    pub fn section_values<'a>(
        &'a self,
        section: &'a str,
    ) -> impl Iterator<Item = (&'a FieldPath, &'a Value)> + 'a {
        self.entries.iter().filter_map(move |(p, d)| match d {
            Desired::Set(v) if p.section() == Some(section) => Some((p, v)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_opt_none_is_unset() {
        let mut d = DesiredFieldSet::new();
        d.set_opt(FieldPath::leaf("description"), None::<String>);
        assert_eq!(d.get(&FieldPath::leaf("description")), &Desired::Unset);
        assert_eq!(d.get(&FieldPath::leaf("other")), &Desired::Unset);
    }

    #[test]
    fn test_resetting_keeps_position() {
        let mut d = DesiredFieldSet::new();
        d.set(FieldPath::leaf("a"), 1)
            .set(FieldPath::leaf("b"), 2)
            .set(FieldPath::leaf("a"), 3);
        let entries: Vec<_> = d.entries().map(|(p, v)| (p.to_string(), v.clone())).collect();
        assert_eq!(
            entries,
            vec![
                ("a".to_string(), Desired::Set(json!(3))),
                ("b".to_string(), Desired::Set(json!(2))),
            ]
        );
    }

    #[test]
    fn test_section_values() {
        let mut d = DesiredFieldSet::new();
        d.set(FieldPath::nested("ptp", "domain"), 25)
            .set(FieldPath::leaf("name"), "ns1")
            .set_opt(FieldPath::nested("ptp", "prio2"), None::<i64>)
            .set(FieldPath::nested("synce", "adminState"), "enabled");
        let ptp: Vec<_> = d.section_values("ptp").map(|(p, _)| p.to_string()).collect();
        assert_eq!(ptp, vec!["ptp.domain"]);
    }

    #[test]
    fn test_enable_is_idempotent() {
        let mut d = DesiredFieldSet::new();
        d.enable("synce").enable("synce");
        assert_eq!(d.enabled_sections().count(), 1);
        assert!(d.is_enabled("synce"));
        assert!(!d.is_enabled("ptp"));
    }
}
