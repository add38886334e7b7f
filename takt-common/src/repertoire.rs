//! Repertoire selection validation
//!
//! A candidate picks pieces from one set list; the selection is valid when
//! the piece values sum exactly to the set list's quota and no two chosen
//! pieces are mutually exclusive. Validation is a pure computation over an
//! in-memory catalog snapshot, safe to run concurrently from any number of
//! requests.
//!
//! Quota arithmetic is exact integer arithmetic in units (see
//! [`crate::units`]); floating point never enters the comparison.

use crate::units::units_to_value;
use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

/// One piece in a set-list catalog snapshot
///
/// Exclusion is held as an adjacency set keyed by piece guid rather than
/// references between pieces, so the snapshot has no ownership cycles.
#[derive(Debug, Clone)]
pub struct CatalogPiece {
    pub guid: Uuid,
    pub title: String,
    pub value_units: i64,
    /// Guids of pieces this piece declares itself incompatible with
    pub excludes: HashSet<Uuid>,
}

/// Immutable snapshot of one set list and its pieces
#[derive(Debug, Clone)]
pub struct SetListCatalog {
    pub guid: Uuid,
    pub name: String,
    pub required_units: i64,
    pub pieces: Vec<CatalogPiece>,
}

impl SetListCatalog {
    pub fn piece(&self, guid: Uuid) -> Option<&CatalogPiece> {
        self.pieces.iter().find(|p| p.guid == guid)
    }
}

/// A user-correctable rule violation, reported back to the candidate
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// Chosen values sum to the wrong quota total
    QuotaMismatch {
        total_units: i64,
        required_units: i64,
        total: f64,
        required: f64,
    },
    /// A chosen piece conflicts with other chosen pieces
    ExclusionConflict {
        piece_id: Uuid,
        conflicting: Vec<Uuid>,
    },
}

/// Validation failure for one submitted selection
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionError {
    /// A chosen piece does not belong to the set list being validated.
    /// This is a caller bug or tampering, not a form error.
    InvalidScope { piece_id: Uuid },
    /// The selection breaks quota and/or exclusion rules; every violation
    /// is collected so the candidate sees all problems at once
    Rejected { violations: Vec<Violation> },
}

impl std::fmt::Display for SelectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionError::InvalidScope { piece_id } => {
                write!(f, "piece {} does not belong to this set list", piece_id)
            }
            SelectionError::Rejected { violations } => {
                write!(f, "selection rejected with {} violation(s)", violations.len())
            }
        }
    }
}

impl std::error::Error for SelectionError {}

/// Validate a chosen piece set against one set list's rules
///
/// Checks, in order:
/// 1. Scope: every chosen guid must exist in the catalog snapshot.
/// 2. Quota: chosen `value_units` must sum exactly to `required_units`.
/// 3. Exclusion: for each chosen piece, the intersection of its exclusion
///    set with the other chosen pieces must be empty. Both declaration
///    directions count, so an asymmetric edge still conflicts.
///
/// Quota and exclusion are both evaluated before returning; the `Rejected`
/// variant carries every violation found. An empty choice against a
/// positive quota is an ordinary quota mismatch.
pub fn validate(catalog: &SetListCatalog, chosen: &HashSet<Uuid>) -> Result<(), SelectionError> {
    for guid in chosen {
        if catalog.piece(*guid).is_none() {
            return Err(SelectionError::InvalidScope { piece_id: *guid });
        }
    }

    let mut violations = Vec::new();

    let total_units: i64 = chosen
        .iter()
        .filter_map(|guid| catalog.piece(*guid))
        .map(|p| p.value_units)
        .sum();

    if total_units != catalog.required_units {
        violations.push(Violation::QuotaMismatch {
            total_units,
            required_units: catalog.required_units,
            total: units_to_value(total_units),
            required: units_to_value(catalog.required_units),
        });
    }

    for guid in chosen {
        let piece = match catalog.piece(*guid) {
            Some(p) => p,
            None => continue,
        };

        let mut conflicting: Vec<Uuid> = chosen
            .iter()
            .filter(|other| **other != *guid)
            .filter(|other| {
                piece.excludes.contains(*other)
                    || catalog
                        .piece(**other)
                        .map(|o| o.excludes.contains(guid))
                        .unwrap_or(false)
            })
            .copied()
            .collect();

        if !conflicting.is_empty() {
            conflicting.sort();
            violations.push(Violation::ExclusionConflict {
                piece_id: *guid,
                conflicting,
            });
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(SelectionError::Rejected { violations })
    }
}
