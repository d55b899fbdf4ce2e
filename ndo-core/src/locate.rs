use std::fmt;

use serde_json::Value;

use crate::{document::Document, Error, Result};

/// An object found in a collection: its position at lookup time and a copy
/// of its contents.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub index: usize,
    pub details: Document,
}

/// One `key == value` condition on a string field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyValue<'a> {
    pub key: &'a str,
    pub value: &'a str,
}

impl<'a> KeyValue<'a> {
    pub fn new(key: &'a str, value: &'a str) -> Self {
        KeyValue { key, value }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKey<'a> {
    Uuid(&'a str),
    Name(&'a str),
    /// No key: return the whole collection.
    All,
}

impl<'a> LookupKey<'a> {
    /// The uuid wins when both are given; the name may then be a rename.
    pub fn from_parts(uuid: Option<&'a str>, name: Option<&'a str>) -> Self {
        match (uuid, name) {
            (Some(uuid), _) => LookupKey::Uuid(uuid),
            (None, Some(name)) => LookupKey::Name(name),
            (None, None) => LookupKey::All,
        }
    }
}

impl fmt::Display for LookupKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupKey::Uuid(uuid) => write!(f, "uuid '{}'", uuid),
            LookupKey::Name(name) => write!(f, "name '{}'", name),
            LookupKey::All => write!(f, "any key"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(Match),
    Absent,
    All(Vec<Value>),
}

impl Lookup {
    pub fn found(&self) -> Option<&Match> {
        match self {
            Lookup::Found(m) => Some(m),
            _ => None,
        }
    }
}

/// Indices of the objects whose string fields satisfy every pair.
pub fn matching_indices(collection: &[Value], pairs: &[KeyValue<'_>]) -> Vec<usize> {
    collection
        .iter()
        .enumerate()
        .filter(|(_, item)| {
            pairs
                .iter()
                .all(|kv| item.get(kv.key).and_then(Value::as_str) == Some(kv.value))
        })
        .map(|(index, _)| index)
        .collect()
}

fn to_match(collection: &[Value], index: usize) -> Result<Match> {
    Ok(Match {
        index,
        details: Document::from_value(collection[index].clone())?,
    })
}

/// Find the single object matching all `pairs`.
///
/// Several matches are reported as [`Error::AmbiguousMatch`]; the caller must
/// not guess.
pub fn find_by_key_values(
    description: &str,
    collection: &[Value],
    pairs: &[KeyValue<'_>],
) -> Result<Option<Match>> {
    match matching_indices(collection, pairs).as_slice() {
        [] => Ok(None),
        [index] => to_match(collection, *index).map(Some),
        indices => Err(Error::AmbiguousMatch {
            description: description.to_string(),
            key: pairs
                .iter()
                .map(|kv| format!("{} '{}'", kv.key, kv.value))
                .collect::<Vec<_>>()
                .join(" and "),
            indices: indices.to_vec(),
        }),
    }
}

/// Resolve `key` against `collection`.
pub fn locate(description: &str, collection: &[Value], key: LookupKey<'_>) -> Result<Lookup> {
    let found = match key {
        LookupKey::All => return Ok(Lookup::All(collection.to_vec())),
        LookupKey::Uuid(uuid) => {
            let indices = matching_indices(collection, &[KeyValue::new("uuid", uuid)]);
            if indices.len() > 1 {
                return Err(Error::Configuration(format!(
                    "uuid '{}' is shared by {} {} objects at indices {:?}",
                    uuid,
                    indices.len(),
                    description,
                    indices
                )));
            }
            match indices.first() {
                Some(index) => Some(to_match(collection, *index)?),
                None => None,
            }
        }
        LookupKey::Name(name) => {
            find_by_key_values(description, collection, &[KeyValue::new("name", name)])?
        }
    };
    tracing::debug!(%key, index = ?found.as_ref().map(|m| m.index), "located {}", description);
    Ok(match found {
        Some(m) => Lookup::Found(m),
        None => Lookup::Absent,
    })
}
