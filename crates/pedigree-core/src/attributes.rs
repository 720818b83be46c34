//! Enumerated attributes of pedigree entities.
//!
//! Each enum has a short *wire code* used in documents and property values
//! (`"M"`, `"deceased"`, `"carrier"`, `"A"`, ...). Parsing also accepts the
//! long, human-readable spellings so that hand-written documents stay easy to
//! author.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::properties::PropertyError;

/// Implements `Display`, `Serialize` and `Deserialize` through the wire code.
macro_rules! wire_code_serde {
    ($ty:ty, $key:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let code = String::deserialize(deserializer)?;
                code.parse().map_err(serde::de::Error::custom)
            }
        }

        impl $ty {
            fn unknown(value: &str) -> PropertyError {
                PropertyError::UnknownValue {
                    key: $key,
                    value: value.to_string(),
                }
            }
        }
    };
}

/// Gender of a person or group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unknown,
}

impl Gender {
    /// Wire code: `"M"`, `"F"` or `"U"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
            Self::Unknown => "U",
        }
    }
}

impl FromStr for Gender {
    type Err = PropertyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "m" | "male" => Ok(Self::Male),
            "f" | "female" => Ok(Self::Female),
            "u" | "unknown" | "" => Ok(Self::Unknown),
            _ => Err(Self::unknown(s)),
        }
    }
}

wire_code_serde!(Gender, "gender");

/// Life status of a person or group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LifeStatus {
    #[default]
    Alive,
    Deceased,
    Stillborn,
    Miscarriage,
    Unborn,
    Aborted,
}

impl LifeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alive => "alive",
            Self::Deceased => "deceased",
            Self::Stillborn => "stillborn",
            Self::Miscarriage => "miscarriage",
            Self::Unborn => "unborn",
            Self::Aborted => "aborted",
        }
    }

    /// Statuses describing a pregnancy rather than a born individual.
    ///
    /// Gestation age is only meaningful for these.
    pub fn is_prenatal(self) -> bool {
        matches!(
            self,
            Self::Stillborn | Self::Miscarriage | Self::Unborn | Self::Aborted
        )
    }

    /// Whether a person group may carry this status.
    pub fn is_allowed_for_group(self) -> bool {
        matches!(
            self,
            Self::Alive | Self::Deceased | Self::Miscarriage | Self::Aborted
        )
    }

    /// Whether a date of death can be recorded with this status.
    pub fn has_death_date(self) -> bool {
        !matches!(self, Self::Alive | Self::Unborn)
    }
}

impl FromStr for LifeStatus {
    type Err = PropertyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "alive" => Ok(Self::Alive),
            "deceased" => Ok(Self::Deceased),
            "stillborn" => Ok(Self::Stillborn),
            "miscarriage" => Ok(Self::Miscarriage),
            "unborn" => Ok(Self::Unborn),
            "aborted" => Ok(Self::Aborted),
            _ => Err(Self::unknown(s)),
        }
    }
}

wire_code_serde!(LifeStatus, "lifeStatus");

/// Carrier status for the disorders recorded on a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CarrierStatus {
    #[default]
    NotAffected,
    Carrier,
    Affected,
    Presymptomatic,
}

impl CarrierStatus {
    /// Wire code. Not-affected is the empty string, as in stored documents.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotAffected => "",
            Self::Carrier => "carrier",
            Self::Affected => "affected",
            Self::Presymptomatic => "presymptomatic",
        }
    }
}

impl FromStr for CarrierStatus {
    type Err = PropertyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "none" | "not affected" => Ok(Self::NotAffected),
            "carrier" => Ok(Self::Carrier),
            "affected" => Ok(Self::Affected),
            "presymptomatic" | "pre-symptomatic" => Ok(Self::Presymptomatic),
            _ => Err(Self::unknown(s)),
        }
    }
}

wire_code_serde!(CarrierStatus, "carrierStatus");

/// Childless marker shared by persons and partnerships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChildlessStatus {
    #[default]
    None,
    Childless,
    Infertile,
}

impl ChildlessStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Childless => "childless",
            Self::Infertile => "infertile",
        }
    }

    pub fn is_set(self) -> bool {
        self != Self::None
    }
}

impl FromStr for ChildlessStatus {
    type Err = PropertyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "childless" => Ok(Self::Childless),
            "infertile" => Ok(Self::Infertile),
            _ => Err(Self::unknown(s)),
        }
    }
}

wire_code_serde!(ChildlessStatus, "childlessStatus");

/// How consanguinity of a partnership is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Consanguinity {
    /// Derived from the pedigree: partners sharing an ancestor are consanguineous.
    #[default]
    Auto,
    Yes,
    No,
}

impl Consanguinity {
    /// Wire code: `"A"`, `"Y"` or `"N"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "A",
            Self::Yes => "Y",
            Self::No => "N",
        }
    }
}

impl FromStr for Consanguinity {
    type Err = PropertyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "a" | "auto" => Ok(Self::Auto),
            "y" | "yes" => Ok(Self::Yes),
            "n" | "no" => Ok(Self::No),
            _ => Err(Self::unknown(s)),
        }
    }
}

wire_code_serde!(Consanguinity, "consangr");
