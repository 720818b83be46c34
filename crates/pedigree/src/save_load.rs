//! Structural pedigree documents.
//!
//! A [`Document`] lists every node and partnership with their properties and
//! edges. Rank, order and position are never stored; they are recomputed
//! after every load.
//!
//! ```json
//! {
//!   "nodes": [{"id": 1, "type": "person", "gender": "F", "lifeStatus": "alive", "properties": {}}],
//!   "partnerships": [{"id": 3, "partners": [1, 2], "children": [4], "properties": {}}]
//! }
//! ```

use std::collections::BTreeMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use pedigree_core::{
    attributes::{Gender, LifeStatus},
    identifier::{Id, TermId},
    properties::{PartnershipProperties, PersonProperties, PropertyKey, PropertyValue},
};

use crate::{
    error::PedigreeError,
    structure::{GraphSnapshot, Node, NodeKind, Partnership, PedigreeGraph},
};

/// Node type tag of a [`NodeEntry`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryKind {
    #[default]
    Person,
    PersonGroup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeEntry {
    pub id: Id,
    #[serde(rename = "type", default)]
    pub kind: EntryKind,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub life_status: LifeStatus,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnershipEntry {
    pub id: Id,
    pub partners: [Id; 2],
    #[serde(default)]
    pub children: Vec<Id>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub nodes: Vec<NodeEntry>,
    #[serde(default)]
    pub partnerships: Vec<PartnershipEntry>,
}

impl Document {
    /// Parses a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`PedigreeError::CorruptDocument`] for malformed JSON.
    pub fn from_json(source: &str) -> Result<Self, PedigreeError> {
        let document: Self = serde_json::from_str(source).map_err(PedigreeError::corrupt)?;
        info!(
            nodes = document.nodes.len(),
            partnerships = document.partnerships.len();
            "Document parsed"
        );
        Ok(document)
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, PedigreeError> {
        serde_json::to_string_pretty(self).map_err(PedigreeError::corrupt)
    }
}

/// Walks `graph` and emits its document.
///
/// Only values that differ from the defaults are written to `properties`.
pub fn serialize(graph: &PedigreeGraph) -> Document {
    let defaults = PersonProperties::default();
    let nodes: Vec<NodeEntry> = graph
        .nodes()
        .map(|node| {
            let record = node.properties();
            let mut properties = sparse_properties(
                PropertyKey::ALL
                    .iter()
                    .filter(|key| !matches!(key, PropertyKey::Gender | PropertyKey::LifeStatus))
                    .filter_map(|&key| Some((key, record.get(key).ok()?, defaults.get(key).ok()?))),
            );
            let kind = match node.kind() {
                NodeKind::Person => EntryKind::Person,
                NodeKind::PersonGroup { count } => {
                    properties.insert(
                        PropertyKey::NumPersons.as_str().to_owned(),
                        Value::from(count),
                    );
                    EntryKind::PersonGroup
                }
            };
            NodeEntry {
                id: node.id(),
                kind,
                gender: record.gender,
                life_status: record.life_status,
                properties,
            }
        })
        .collect();

    let partnership_defaults = PartnershipProperties::default();
    let partnerships: Vec<PartnershipEntry> = graph
        .partnerships()
        .map(|partnership| {
            let record = partnership.properties();
            let properties = sparse_properties(
                [
                    PropertyKey::ChildlessStatus,
                    PropertyKey::Consanguinity,
                    PropertyKey::Broken,
                ]
                .into_iter()
                .filter_map(|key| {
                    Some((key, record.get(key).ok()?, partnership_defaults.get(key).ok()?))
                }),
            );
            PartnershipEntry {
                id: partnership.id(),
                partners: partnership.partners(),
                children: graph.children_of(partnership.id()).to_vec(),
                properties,
            }
        })
        .collect();

    info!(nodes = nodes.len(), partnerships = partnerships.len(); "Document serialized");
    Document {
        nodes,
        partnerships,
    }
}

/// Converts `document` into a graph snapshot.
///
/// Unknown property names are skipped with a warning. Structural validation
/// happens when the snapshot is committed to a graph.
///
/// # Errors
///
/// Returns [`PedigreeError::CorruptDocument`] for values outside their
/// domain or a `type` that contradicts the properties.
pub fn deserialize(document: &Document) -> Result<GraphSnapshot, PedigreeError> {
    let mut snapshot = GraphSnapshot::default();

    for entry in &document.nodes {
        let mut properties = PersonProperties {
            gender: entry.gender,
            life_status: entry.life_status,
            ..PersonProperties::default()
        };
        let mut count = None;
        for (name, raw) in &entry.properties {
            let Some(key) = known_key(entry.id, name) else {
                continue;
            };
            let value = value_from_json(raw)
                .map_err(|reason| corrupt_property(entry.id, name, reason))?;
            if key == PropertyKey::NumPersons {
                count = Some(
                    value
                        .as_group_size()
                        .map_err(|err| corrupt_property(entry.id, name, err))?,
                );
            } else {
                properties
                    .set(key, &value)
                    .map_err(|err| corrupt_property(entry.id, name, err))?;
            }
        }

        let kind = match (entry.kind, count) {
            (EntryKind::Person, None) => NodeKind::Person,
            (EntryKind::Person, Some(_)) => {
                return Err(PedigreeError::corrupt(format!(
                    "node {}: a person cannot carry numPersons",
                    entry.id
                )));
            }
            (EntryKind::PersonGroup, count) => NodeKind::PersonGroup {
                count: count.unwrap_or(1),
            },
        };
        snapshot.nodes.push(Node::new(entry.id, kind, properties));
    }

    let mut children = BTreeMap::new();
    for entry in &document.partnerships {
        let mut properties = PartnershipProperties::default();
        for (name, raw) in &entry.properties {
            let Some(key) = known_key(entry.id, name) else {
                continue;
            };
            let value = value_from_json(raw)
                .map_err(|reason| corrupt_property(entry.id, name, reason))?;
            properties
                .set(key, &value)
                .map_err(|err| corrupt_property(entry.id, name, err))?;
        }
        snapshot
            .partnerships
            .push(Partnership::new(entry.id, entry.partners, properties));
        if !entry.children.is_empty() {
            children.insert(entry.id, entry.children.clone());
        }
    }
    snapshot.children = children;

    Ok(snapshot)
}

fn sparse_properties(
    values: impl Iterator<Item = (PropertyKey, PropertyValue, PropertyValue)>,
) -> Map<String, Value> {
    values
        .filter(|(_, value, default)| value != default)
        .map(|(key, value, _)| (key.as_str().to_owned(), value_to_json(value)))
        .collect()
}

fn known_key(id: Id, name: &str) -> Option<PropertyKey> {
    match name.parse() {
        Ok(key) => Some(key),
        Err(_) => {
            warn!(entity_id = id.get(), property = name; "Unknown property ignored");
            None
        }
    }
}

fn corrupt_property(id: Id, name: &str, reason: impl std::fmt::Display) -> PedigreeError {
    PedigreeError::corrupt(format!("entity {id}: property {name}: {reason}"))
}

fn value_to_json(value: PropertyValue) -> Value {
    match value {
        PropertyValue::Null => Value::Null,
        PropertyValue::Bool(flag) => Value::Bool(flag),
        PropertyValue::Int(number) => Value::from(number),
        PropertyValue::Text(text) => Value::String(text),
        PropertyValue::Terms(terms) => terms
            .iter()
            .map(|term| Value::String(term.as_string()))
            .collect(),
    }
}

fn value_from_json(value: &Value) -> Result<PropertyValue, String> {
    match value {
        Value::Null => Ok(PropertyValue::Null),
        Value::Bool(flag) => Ok(PropertyValue::Bool(*flag)),
        Value::Number(number) => number
            .as_i64()
            .map(PropertyValue::Int)
            .ok_or_else(|| format!("{number} is not an integer")),
        Value::String(text) => Ok(PropertyValue::Text(text.clone())),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(TermId::new)
                    .ok_or_else(|| format!("term list entry {item} is not a string"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(PropertyValue::Terms),
        Value::Object(_) => Err("objects are not property values".to_owned()),
    }
}
