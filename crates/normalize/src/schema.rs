use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Index;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityType {
    Compound,
    Protein,
    Peptide,
    /// Any other value, lower-cased and trimmed, carried through as-is
    Other(String),
}

impl EntityType {
    pub fn as_str(&self) -> &str {
        match self {
            EntityType::Compound => "compound",
            EntityType::Protein => "protein",
            EntityType::Peptide => "peptide",
            EntityType::Other(other) => other,
        }
    }
}

impl From<&str> for EntityType {
    fn from(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "compound" => EntityType::Compound,
            "protein" => EntityType::Protein,
            "peptide" => EntityType::Peptide,
            other => EntityType::Other(other.to_string()),
        }
    }
}

impl From<String> for EntityType {
    fn from(value: String) -> Self {
        EntityType::from(value.as_str())
    }
}

impl From<EntityType> for String {
    fn from(value: EntityType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar metadata value attached to an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl From<f64> for ExtraValue {
    fn from(value: f64) -> Self {
        ExtraValue::Number(value)
    }
}

impl From<String> for ExtraValue {
    fn from(value: String) -> Self {
        ExtraValue::Text(value)
    }
}

impl From<&str> for ExtraValue {
    fn from(value: &str) -> Self {
        ExtraValue::Text(value.to_string())
    }
}

impl From<bool> for ExtraValue {
    fn from(value: bool) -> Self {
        ExtraValue::Bool(value)
    }
}

/// Entity metadata keyed by name. Keys keep the order they were inserted in,
/// which is also the order they serialize in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extras(Vec<(String, ExtraValue)>);

impl Extras {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing an earlier value in place. Returns the old value.
    pub fn insert(&mut self, key: String, value: ExtraValue) -> Option<ExtraValue> {
        match self.0.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.0.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&ExtraValue> {
        self.0.iter().find(|(existing, _)| existing == key).map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExtraValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Index<&str> for Extras {
    type Output = ExtraValue;

    fn index(&self, key: &str) -> &ExtraValue {
        match self.get(key) {
            Some(value) => value,
            None => panic!("no extra named {key:?}"),
        }
    }
}

impl Serialize for Extras {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Extras {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ExtrasVisitor;

        impl<'de> Visitor<'de> for ExtrasVisitor {
            type Value = Extras;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of scalar values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Extras, A::Error> {
                let mut extras = Extras::new();
                while let Some((key, value)) = access.next_entry::<String, ExtraValue>()? {
                    extras.insert(key, value);
                }
                Ok(extras)
            }
        }

        deserializer.deserialize_map(ExtrasVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEntity {
    pub row_id: usize,
    pub entity_type: EntityType,
    pub identifier: String,
    pub normalized_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub context_tags: Vec<String>,
    #[serde(default)]
    pub extras: Extras,
}

impl NormalizedEntity {
    /// Name when present, otherwise the raw identifier
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.identifier)
    }
}
