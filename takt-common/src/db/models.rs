//! Database models

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Candidate gender, stored as the single-letter codes used on the
/// registration form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "f")]
    Female,
    #[serde(rename = "m")]
    Male,
    #[serde(rename = "n")]
    NonBinary,
    #[serde(rename = "x")]
    Undisclosed,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Female => "f",
            Gender::Male => "m",
            Gender::NonBinary => "n",
            Gender::Undisclosed => "x",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "f" => Some(Gender::Female),
            "m" => Some(Gender::Male),
            "n" => Some(Gender::NonBinary),
            "x" => Some(Gender::Undisclosed),
            _ => None,
        }
    }
}

/// Identity documents every candidate must upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    Photo,
    PassportScan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    pub guid: Uuid,
    pub name: String,
}

/// One judging stage for an instrument; owns one or more set lists.
/// Created by staff before the competition opens, immutable during judging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    pub guid: Uuid,
    pub instrument_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetList {
    pub guid: Uuid,
    pub round_id: Uuid,
    pub name: String,
    /// Exact unit total a valid selection must sum to
    pub required_units: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Piece {
    pub guid: Uuid,
    pub set_list_id: Uuid,
    pub title: String,
    pub composer: Option<String>,
    pub value_units: i64,
}

/// A competition registrant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub guid: Uuid,
    pub instrument_id: Uuid,
    /// Opaque token used for blind judging; unique only after renumbering
    pub secret_id: String,
    pub given_name: String,
    pub surname: String,
    pub gender: Gender,
    pub date_of_birth: String,
    pub nationality: String,
    pub email: String,
    pub phone: String,
    pub education: String,
    pub occupation: String,
    pub notes: Option<String>,
    pub photo_path: Option<String>,
    pub passport_path: Option<String>,
    pub is_qualified: bool,
    pub submitted_at: String,
}

/// A named, numbered media requirement scoped to an instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequiredRecording {
    pub guid: Uuid,
    pub instrument_id: Uuid,
    pub name: String,
    pub slug: String,
    pub nr: i64,
}

/// A submitted media artifact binding one candidate to one requirement.
/// The row is created before the payload lands; `is_complete` is the durable
/// signal that the upload actually finished.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub guid: Uuid,
    pub candidate_id: Uuid,
    pub requirement_id: Uuid,
    pub file_path: Option<String>,
    pub is_complete: bool,
    pub created_at: String,
    pub updated_at: String,
}
