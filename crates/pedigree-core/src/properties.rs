//! Typed property schema for persons and partnerships.
//!
//! Editing collaborators address properties through a [`PropertyKey`] and a
//! loosely typed [`PropertyValue`]; the schema in this module parses and
//! validates the value against the key's declared type and domain before
//! anything is stored. [`PersonProperties::set`] and
//! [`PartnershipProperties::set`] either store the new value and return the
//! previous one (so callers can build an exact inverse), or fail without
//! touching the record.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    attributes::{CarrierStatus, ChildlessStatus, Consanguinity, Gender, LifeStatus},
    identifier::TermId,
};

/// Upper bound for a recorded gestation age, in weeks.
pub const MAX_GESTATION_WEEKS: i64 = 50;

/// Upper bound for the size of a person group.
pub const MAX_GROUP_SIZE: i64 = 99;

/// Schema violations raised while parsing or storing a property value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    #[error("`{value}` is not a valid value for `{key}`")]
    UnknownValue { key: &'static str, value: String },

    #[error("`{key}` expects {expected}")]
    WrongType {
        key: &'static str,
        expected: &'static str,
    },

    #[error("`{key}` is out of range: {reason}")]
    OutOfRange { key: &'static str, reason: String },

    #[error("`{key}` does not apply to {target}")]
    NotApplicable {
        key: &'static str,
        target: &'static str,
    },

    #[error("unknown property `{0}`")]
    UnknownKey(String),
}

/// Names of editable properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyKey {
    Gender,
    LifeStatus,
    FirstName,
    LastName,
    ExternalId,
    CarrierStatus,
    Evaluated,
    Disorders,
    Genes,
    Phenotypes,
    BirthDate,
    DeathDate,
    GestationAge,
    ChildlessStatus,
    Adopted,
    TwinGroup,
    LostContact,
    Placeholder,
    Proband,
    Comments,
    NumPersons,
    Consanguinity,
    Broken,
}

impl PropertyKey {
    pub const ALL: [PropertyKey; 23] = [
        Self::Gender,
        Self::LifeStatus,
        Self::FirstName,
        Self::LastName,
        Self::ExternalId,
        Self::CarrierStatus,
        Self::Evaluated,
        Self::Disorders,
        Self::Genes,
        Self::Phenotypes,
        Self::BirthDate,
        Self::DeathDate,
        Self::GestationAge,
        Self::ChildlessStatus,
        Self::Adopted,
        Self::TwinGroup,
        Self::LostContact,
        Self::Placeholder,
        Self::Proband,
        Self::Comments,
        Self::NumPersons,
        Self::Consanguinity,
        Self::Broken,
    ];

    /// Document name of the property.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gender => "gender",
            Self::LifeStatus => "lifeStatus",
            Self::FirstName => "firstName",
            Self::LastName => "lastName",
            Self::ExternalId => "externalId",
            Self::CarrierStatus => "carrierStatus",
            Self::Evaluated => "evaluated",
            Self::Disorders => "disorders",
            Self::Genes => "candidateGenes",
            Self::Phenotypes => "hpoTerms",
            Self::BirthDate => "birthDate",
            Self::DeathDate => "deathDate",
            Self::GestationAge => "gestationAge",
            Self::ChildlessStatus => "childlessStatus",
            Self::Adopted => "adopted",
            Self::TwinGroup => "twinGroup",
            Self::LostContact => "lostContact",
            Self::Placeholder => "placeholder",
            Self::Proband => "proband",
            Self::Comments => "comments",
            Self::NumPersons => "numPersons",
            Self::Consanguinity => "consangr",
            Self::Broken => "broken",
        }
    }

    /// Keys holding clinical term lists, tracked by legends.
    pub fn is_term_list(self) -> bool {
        matches!(self, Self::Disorders | Self::Genes | Self::Phenotypes)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyKey {
    type Err = PropertyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| PropertyError::UnknownKey(s.to_string()))
    }
}

impl Serialize for PropertyKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PropertyKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// A loosely typed property value as supplied by editing collaborators.
///
/// # Examples
///
/// ```
/// use pedigree_core::properties::PropertyValue;
///
/// let value: PropertyValue = serde_json::from_str("\"deceased\"").unwrap();
/// assert_eq!(value, PropertyValue::from("deceased"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Terms(Vec<TermId>),
}

impl PropertyValue {
    fn as_text(&self, key: PropertyKey) -> Result<&str, PropertyError> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Null => Ok(""),
            _ => Err(PropertyError::WrongType {
                key: key.as_str(),
                expected: "a string",
            }),
        }
    }

    fn as_bool(&self, key: PropertyKey) -> Result<bool, PropertyError> {
        match self {
            Self::Bool(value) => Ok(*value),
            Self::Null => Ok(false),
            _ => Err(PropertyError::WrongType {
                key: key.as_str(),
                expected: "a boolean",
            }),
        }
    }

    fn as_optional_text(&self, key: PropertyKey) -> Result<Option<String>, PropertyError> {
        let text = self.as_text(key)?;
        Ok((!text.is_empty()).then(|| text.to_string()))
    }

    fn as_optional_int(&self, key: PropertyKey) -> Result<Option<i64>, PropertyError> {
        match self {
            Self::Int(value) => Ok(Some(*value)),
            Self::Null => Ok(None),
            _ => Err(PropertyError::WrongType {
                key: key.as_str(),
                expected: "an integer",
            }),
        }
    }

    fn as_terms(&self, key: PropertyKey) -> Result<Vec<TermId>, PropertyError> {
        match self {
            Self::Terms(terms) => {
                let mut unique = Vec::with_capacity(terms.len());
                for term in terms {
                    if !unique.contains(term) {
                        unique.push(*term);
                    }
                }
                Ok(unique)
            }
            Self::Null => Ok(Vec::new()),
            _ => Err(PropertyError::WrongType {
                key: key.as_str(),
                expected: "a list of terms",
            }),
        }
    }

    /// Term list carried by this value, or an empty slice.
    pub fn terms(&self) -> &[TermId] {
        match self {
            Self::Terms(terms) => terms,
            _ => &[],
        }
    }

    /// Parses an enum-valued property from its text form.
    pub fn parse_code<T>(&self, key: PropertyKey) -> Result<T, PropertyError>
    where
        T: FromStr<Err = PropertyError>,
    {
        self.as_text(key)?.parse()
    }

    /// Reads a positive integer, used for group sizes.
    pub fn as_group_size(&self) -> Result<u32, PropertyError> {
        let key = PropertyKey::NumPersons;
        match self.as_optional_int(key)? {
            Some(count) if (1..=MAX_GROUP_SIZE).contains(&count) => Ok(count as u32),
            Some(count) => Err(PropertyError::OutOfRange {
                key: key.as_str(),
                reason: format!("{count} is not between 1 and {MAX_GROUP_SIZE}"),
            }),
            None => Err(PropertyError::WrongType {
                key: key.as_str(),
                expected: "an integer",
            }),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<Vec<TermId>> for PropertyValue {
    fn from(terms: Vec<TermId>) -> Self {
        Self::Terms(terms)
    }
}

fn text_value(text: &Option<String>) -> PropertyValue {
    text.as_ref()
        .map_or(PropertyValue::Null, |text| PropertyValue::Text(text.clone()))
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Attributes of a person or person group.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonProperties {
    pub gender: Gender,
    pub life_status: LifeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "is_not_affected")]
    pub carrier_status: CarrierStatus,
    #[serde(skip_serializing_if = "is_false")]
    pub evaluated: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub disorders: Vec<TermId>,
    #[serde(rename = "candidateGenes", skip_serializing_if = "Vec::is_empty")]
    pub genes: Vec<TermId>,
    #[serde(rename = "hpoTerms", skip_serializing_if = "Vec::is_empty")]
    pub phenotypes: Vec<TermId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub death_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gestation_age: Option<u32>,
    #[serde(skip_serializing_if = "is_childless_none")]
    pub childless_status: ChildlessStatus,
    #[serde(skip_serializing_if = "is_false")]
    pub adopted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twin_group: Option<u32>,
    #[serde(skip_serializing_if = "is_false")]
    pub lost_contact: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub placeholder: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub proband: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

fn is_not_affected(status: &CarrierStatus) -> bool {
    *status == CarrierStatus::NotAffected
}

fn is_childless_none(status: &ChildlessStatus) -> bool {
    !status.is_set()
}

impl PersonProperties {
    /// Creates properties with the given gender and defaults elsewhere.
    pub fn with_gender(gender: Gender) -> Self {
        Self {
            gender,
            ..Self::default()
        }
    }

    /// Properties of a placeholder node of unknown gender.
    pub fn placeholder() -> Self {
        Self {
            placeholder: true,
            ..Self::default()
        }
    }

    /// Reads a property.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::NotApplicable`] for partnership-only keys and
    /// for the group size, which is stored on the node kind.
    pub fn get(&self, key: PropertyKey) -> Result<PropertyValue, PropertyError> {
        let value = match key {
            PropertyKey::Gender => self.gender.as_str().into(),
            PropertyKey::LifeStatus => self.life_status.as_str().into(),
            PropertyKey::FirstName => text_value(&self.first_name),
            PropertyKey::LastName => text_value(&self.last_name),
            PropertyKey::ExternalId => text_value(&self.external_id),
            PropertyKey::CarrierStatus => self.carrier_status.as_str().into(),
            PropertyKey::Evaluated => self.evaluated.into(),
            PropertyKey::Disorders => self.disorders.clone().into(),
            PropertyKey::Genes => self.genes.clone().into(),
            PropertyKey::Phenotypes => self.phenotypes.clone().into(),
            PropertyKey::BirthDate => text_value(&self.birth_date),
            PropertyKey::DeathDate => text_value(&self.death_date),
            PropertyKey::GestationAge => self
                .gestation_age
                .map_or(PropertyValue::Null, |weeks| i64::from(weeks).into()),
            PropertyKey::ChildlessStatus => self.childless_status.as_str().into(),
            PropertyKey::Adopted => self.adopted.into(),
            PropertyKey::TwinGroup => self
                .twin_group
                .map_or(PropertyValue::Null, |group| i64::from(group).into()),
            PropertyKey::LostContact => self.lost_contact.into(),
            PropertyKey::Placeholder => self.placeholder.into(),
            PropertyKey::Proband => self.proband.into(),
            PropertyKey::Comments => text_value(&self.comments),
            PropertyKey::NumPersons | PropertyKey::Consanguinity | PropertyKey::Broken => {
                return Err(PropertyError::NotApplicable {
                    key: key.as_str(),
                    target: "a person",
                });
            }
        };
        Ok(value)
    }

    /// Validates and stores a property, returning the previous value.
    ///
    /// The record is left untouched when validation fails.
    pub fn set(
        &mut self,
        key: PropertyKey,
        value: &PropertyValue,
    ) -> Result<PropertyValue, PropertyError> {
        let previous = self.get(key)?;
        match key {
            PropertyKey::Gender => self.gender = value.parse_code(key)?,
            PropertyKey::LifeStatus => self.life_status = value.parse_code(key)?,
            PropertyKey::FirstName => self.first_name = value.as_optional_text(key)?,
            PropertyKey::LastName => self.last_name = value.as_optional_text(key)?,
            PropertyKey::ExternalId => self.external_id = value.as_optional_text(key)?,
            PropertyKey::CarrierStatus => self.carrier_status = value.parse_code(key)?,
            PropertyKey::Evaluated => self.evaluated = value.as_bool(key)?,
            PropertyKey::Disorders => self.disorders = value.as_terms(key)?,
            PropertyKey::Genes => self.genes = value.as_terms(key)?,
            PropertyKey::Phenotypes => self.phenotypes = value.as_terms(key)?,
            PropertyKey::BirthDate => self.birth_date = value.as_optional_text(key)?,
            PropertyKey::DeathDate => self.death_date = value.as_optional_text(key)?,
            PropertyKey::GestationAge => {
                self.gestation_age = match value.as_optional_int(key)? {
                    Some(weeks) if (0..=MAX_GESTATION_WEEKS).contains(&weeks) => {
                        Some(weeks as u32)
                    }
                    Some(weeks) => {
                        return Err(PropertyError::OutOfRange {
                            key: key.as_str(),
                            reason: format!(
                                "{weeks} weeks is not between 0 and {MAX_GESTATION_WEEKS}"
                            ),
                        });
                    }
                    None => None,
                }
            }
            PropertyKey::ChildlessStatus => self.childless_status = value.parse_code(key)?,
            PropertyKey::Adopted => self.adopted = value.as_bool(key)?,
            PropertyKey::TwinGroup => {
                self.twin_group = match value.as_optional_int(key)? {
                    Some(group) if group >= 0 && group <= i64::from(u32::MAX) => {
                        Some(group as u32)
                    }
                    Some(group) => {
                        return Err(PropertyError::OutOfRange {
                            key: key.as_str(),
                            reason: format!("{group} is not a valid twin group"),
                        });
                    }
                    None => None,
                }
            }
            PropertyKey::LostContact => self.lost_contact = value.as_bool(key)?,
            PropertyKey::Placeholder => self.placeholder = value.as_bool(key)?,
            PropertyKey::Proband => self.proband = value.as_bool(key)?,
            PropertyKey::Comments => self.comments = value.as_optional_text(key)?,
            // `get` above already rejected the remaining keys.
            PropertyKey::NumPersons | PropertyKey::Consanguinity | PropertyKey::Broken => {}
        }
        Ok(previous)
    }

    /// Clinical terms recorded under a term-list key.
    pub fn terms(&self, key: PropertyKey) -> &[TermId] {
        match key {
            PropertyKey::Disorders => &self.disorders,
            PropertyKey::Genes => &self.genes,
            PropertyKey::Phenotypes => &self.phenotypes,
            _ => &[],
        }
    }
}

/// Attributes of a partnership.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartnershipProperties {
    #[serde(skip_serializing_if = "is_childless_none")]
    pub childless_status: ChildlessStatus,
    #[serde(rename = "consangr", skip_serializing_if = "is_auto")]
    pub consanguinity: Consanguinity,
    #[serde(skip_serializing_if = "is_false")]
    pub broken: bool,
}

fn is_auto(mode: &Consanguinity) -> bool {
    *mode == Consanguinity::Auto
}

impl PartnershipProperties {
    pub fn get(&self, key: PropertyKey) -> Result<PropertyValue, PropertyError> {
        match key {
            PropertyKey::ChildlessStatus => Ok(self.childless_status.as_str().into()),
            PropertyKey::Consanguinity => Ok(self.consanguinity.as_str().into()),
            PropertyKey::Broken => Ok(self.broken.into()),
            _ => Err(PropertyError::NotApplicable {
                key: key.as_str(),
                target: "a partnership",
            }),
        }
    }

    /// Validates and stores a property, returning the previous value.
    pub fn set(
        &mut self,
        key: PropertyKey,
        value: &PropertyValue,
    ) -> Result<PropertyValue, PropertyError> {
        let previous = self.get(key)?;
        match key {
            PropertyKey::ChildlessStatus => self.childless_status = value.parse_code(key)?,
            PropertyKey::Consanguinity => self.consanguinity = value.parse_code(key)?,
            PropertyKey::Broken => self.broken = value.as_bool(key)?,
            _ => {}
        }
        Ok(previous)
    }
}
