//! Read-only property summaries for property-editing collaborators.
//!
//! A summary lists every editable field of an entity together with two
//! flags: `inactive` marks fields that do not apply in the current state
//! (the editor shows them greyed out), `disabled` marks fields that cannot be
//! edited at all given the surrounding structure.

use indexmap::IndexMap;
use serde::Serialize;

use pedigree_core::{
    identifier::Id,
    properties::{PropertyKey, PropertyValue},
};

use super::{childless, entity::NodeKind, pedigree_graph::PedigreeGraph};
use crate::error::PedigreeError;

/// One field of a [`Summary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryField {
    pub value: PropertyValue,
    pub inactive: bool,
    pub disabled: bool,
}

impl SummaryField {
    fn active(value: PropertyValue) -> Self {
        Self {
            value,
            inactive: false,
            disabled: false,
        }
    }

    fn inactive_if(mut self, inactive: bool) -> Self {
        self.inactive = inactive;
        self
    }

    fn disabled_if(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

/// Ordered field name → field map.
pub type Summary = IndexMap<&'static str, SummaryField>;

const PERSON_FIELDS: [PropertyKey; 20] = [
    PropertyKey::Gender,
    PropertyKey::FirstName,
    PropertyKey::LastName,
    PropertyKey::ExternalId,
    PropertyKey::LifeStatus,
    PropertyKey::BirthDate,
    PropertyKey::DeathDate,
    PropertyKey::GestationAge,
    PropertyKey::CarrierStatus,
    PropertyKey::Evaluated,
    PropertyKey::Disorders,
    PropertyKey::Genes,
    PropertyKey::Phenotypes,
    PropertyKey::ChildlessStatus,
    PropertyKey::Adopted,
    PropertyKey::TwinGroup,
    PropertyKey::LostContact,
    PropertyKey::Placeholder,
    PropertyKey::Proband,
    PropertyKey::Comments,
];

/// Builds the summary of the node or partnership `id`.
pub(super) fn summarize(graph: &PedigreeGraph, id: Id) -> Result<Summary, PedigreeError> {
    if graph.node(id).is_some() {
        summarize_node(graph, id)
    } else if graph.partnership(id).is_some() {
        summarize_partnership(graph, id)
    } else {
        Err(PedigreeError::NotFound(id))
    }
}

fn summarize_node(graph: &PedigreeGraph, id: Id) -> Result<Summary, PedigreeError> {
    let node = graph.node(id).ok_or(PedigreeError::NotFound(id))?;
    let properties = node.properties();
    let life_status = properties.life_status;
    let is_group = node.kind().is_group();

    let mut summary = Summary::new();
    summary.insert(
        "identifier",
        SummaryField::active(PropertyValue::Int(i64::from(id.get()))).disabled_if(true),
    );
    if let NodeKind::PersonGroup { count } = node.kind() {
        summary.insert(
            PropertyKey::NumPersons.as_str(),
            SummaryField::active(PropertyValue::Int(i64::from(count))),
        );
    }

    for key in PERSON_FIELDS {
        let value = properties
            .get(key)
            .map_err(|err| PedigreeError::invalid_property(id, err))?;
        let field = SummaryField::active(value);
        let field = match key {
            PropertyKey::GestationAge => field.inactive_if(!life_status.is_prenatal()),
            PropertyKey::DeathDate => field.inactive_if(!life_status.has_death_date()),
            PropertyKey::ChildlessStatus => {
                field.inactive_if(childless::person_has_biological_children(graph, id))
            }
            PropertyKey::Adopted => field.disabled_if(graph.origin_of(id).is_none()),
            PropertyKey::TwinGroup => {
                field.disabled_if(is_group || graph.siblings_of(id).is_empty())
            }
            PropertyKey::Proband => field.disabled_if(is_group),
            _ => field,
        };
        summary.insert(key.as_str(), field);
    }
    Ok(summary)
}

fn summarize_partnership(graph: &PedigreeGraph, id: Id) -> Result<Summary, PedigreeError> {
    let partnership = graph.partnership(id).ok_or(PedigreeError::NotFound(id))?;
    let properties = partnership.properties();
    let field = |key: PropertyKey| {
        properties
            .get(key)
            .map(SummaryField::active)
            .map_err(|err| PedigreeError::invalid_property(id, err))
    };

    let mut summary = Summary::new();
    summary.insert(
        "identifier",
        SummaryField::active(PropertyValue::Int(i64::from(id.get()))).disabled_if(true),
    );
    summary.insert(
        "childlessSelect",
        field(PropertyKey::ChildlessStatus)?.inactive_if(childless::has_biological_children(
            graph,
            graph.children_of(id),
        )),
    );
    summary.insert(PropertyKey::Consanguinity.as_str(), field(PropertyKey::Consanguinity)?);
    summary.insert(PropertyKey::Broken.as_str(), field(PropertyKey::Broken)?);
    Ok(summary)
}
