//! Turning a MatchResult into a user-facing outcome.
//!
//! [`classify`] is the single place where the four-way branching lives.
//! The console loop ([`Flow`]) and the HTTP handlers both go through it,
//! and both render the same [`SearchResponse`] codes.
//!
//! # Classification order
//!
//! ```text
//! len == 0                          → NoMatch        (code 1)
//! len >  1 && distinct names >  1   → MultiName      (code 2)
//! len >  1 && distinct names == 1   → DuplicateName  (code 3)
//! len == 1                          → Resolved       (code 4)
//! ```
//!
//! Cardinality is checked before name uniqueness, so a single record is
//! always `Resolved`.
//!
//! # Prompt loop
//!
//! ```text
//! AwaitingQuery ──name──▶ NoMatch ─────────▶ AwaitingQuery
//!               ──name──▶ MultiName ───────▶ AwaitingQuery
//!               ──name──▶ DuplicateName ───▶ AwaitingId
//!               ──name──▶ Resolved
//! AwaitingId    ──id────▶ NoMatch ─────────▶ AwaitingId
//!               ──id────▶ Resolved
//! ```

use serde::Serialize;
use std::collections::HashSet;

use crate::catalog::Catalog;
use crate::models::EquipmentRecord;
use crate::resolve::{resolve_by_id, resolve_by_name, MatchParams};

pub const MSG_NO_MATCH: &str = "Pas de correspondances";
pub const MSG_MULTI_NAME: &str = "Plusieurs équipements correspondent. Vouliez vous dire :";
pub const MSG_DUPLICATE_NAME: &str =
    "Plusieurs éléments avec le même nom, veuillez entrer l'ID de l'équipement :";
pub const MSG_RESOLVED: &str = "Equipement trouvé, que souhaitez vous savoir dessus?";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing matched; the user should try another query.
    NoMatch,
    /// Several different names matched; the user should pick one.
    MultiName { suggestions: Vec<String> },
    /// One name shared by several records; the user should give an ID.
    DuplicateName { name: String, ids: Vec<String> },
    /// Exactly one record.
    Resolved(EquipmentRecord),
}

impl Outcome {
    /// Numeric code used by the HTTP API.
    pub fn code(&self) -> u8 {
        match self {
            Outcome::NoMatch => 1,
            Outcome::MultiName { .. } => 2,
            Outcome::DuplicateName { .. } => 3,
            Outcome::Resolved(_) => 4,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Outcome::NoMatch => MSG_NO_MATCH,
            Outcome::MultiName { .. } => MSG_MULTI_NAME,
            Outcome::DuplicateName { .. } => MSG_DUPLICATE_NAME,
            Outcome::Resolved(_) => MSG_RESOLVED,
        }
    }

    pub fn resolved(&self) -> Option<&EquipmentRecord> {
        match self {
            Outcome::Resolved(r) => Some(r),
            _ => None,
        }
    }
}

/// Classify the result of a name lookup.
pub fn classify(matches: &[EquipmentRecord]) -> Outcome {
    match matches {
        [] => Outcome::NoMatch,
        [only] => Outcome::Resolved(only.clone()),
        [first, ..] => {
            let mut seen = HashSet::new();
            let suggestions: Vec<String> = matches
                .iter()
                .filter(|r| seen.insert(r.name.to_lowercase()))
                .map(|r| r.name.clone())
                .collect();

            if suggestions.len() > 1 {
                Outcome::MultiName { suggestions }
            } else {
                Outcome::DuplicateName {
                    name: first.name.clone(),
                    ids: matches.iter().map(|r| r.equipment_id.clone()).collect(),
                }
            }
        }
    }
}

/// Classify the result of an ID lookup: only `NoMatch` or `Resolved`.
pub fn classify_id(matches: &[EquipmentRecord]) -> Outcome {
    match matches.first() {
        None => Outcome::NoMatch,
        Some(r) => Outcome::Resolved(r.clone()),
    }
}

// ============ Tagged response ============

/// `{code, message, data}` payload shared by the HTTP API and `--json` output.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SearchResponse {
    pub code: u8,
    pub message: String,
    pub data: Option<ResponseData>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ResponseData {
    Suggestions {
        suggestions: Vec<String>,
    },
    Ids {
        ids: Vec<String>,
    },
    Resolved {
        id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        nom: Option<String>,
    },
}

impl SearchResponse {
    /// Response for a name lookup; a resolved record carries only its ID.
    pub fn from_name_outcome(outcome: &Outcome) -> Self {
        Self::build(outcome, false)
    }

    /// Response for an ID lookup; a resolved record carries ID and name.
    pub fn from_id_outcome(outcome: &Outcome) -> Self {
        Self::build(outcome, true)
    }

    fn build(outcome: &Outcome, with_name: bool) -> Self {
        let data = match outcome {
            Outcome::NoMatch => None,
            Outcome::MultiName { suggestions } => Some(ResponseData::Suggestions {
                suggestions: suggestions.clone(),
            }),
            Outcome::DuplicateName { ids, .. } => Some(ResponseData::Ids { ids: ids.clone() }),
            Outcome::Resolved(r) => Some(ResponseData::Resolved {
                id: r.equipment_id.clone(),
                nom: with_name.then(|| r.name.clone()),
            }),
        };

        Self {
            code: outcome.code(),
            message: outcome.message().to_string(),
            data,
        }
    }
}

// ============ Prompt loop ============

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    AwaitingQuery,
    AwaitingId { name: String, ids: Vec<String> },
    Resolved(EquipmentRecord),
}

/// State machine behind the interactive console.
///
/// Each [`submit`](Flow::submit) consumes one line of user input, which is
/// read as a name while awaiting a query and as an equipment ID after a
/// duplicate-name outcome.
pub struct Flow<'a> {
    catalog: &'a Catalog,
    params: MatchParams,
    state: FlowState,
}

impl<'a> Flow<'a> {
    pub fn new(catalog: &'a Catalog, params: MatchParams) -> Self {
        Self {
            catalog,
            params,
            state: FlowState::AwaitingQuery,
        }
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn resolved(&self) -> Option<&EquipmentRecord> {
        match &self.state {
            FlowState::Resolved(r) => Some(r),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.state = FlowState::AwaitingQuery;
    }

    pub fn submit(&mut self, input: &str) -> Outcome {
        let outcome = match &self.state {
            FlowState::AwaitingId { .. } => classify_id(&resolve_by_id(self.catalog, input)),
            FlowState::AwaitingQuery | FlowState::Resolved(_) => {
                classify(&resolve_by_name(self.catalog, input, &self.params))
            }
        };

        let next = match (&self.state, &outcome) {
            (_, Outcome::Resolved(r)) => FlowState::Resolved(r.clone()),
            (_, Outcome::DuplicateName { name, ids }) => FlowState::AwaitingId {
                name: name.clone(),
                ids: ids.clone(),
            },
            (FlowState::AwaitingId { name, ids }, Outcome::NoMatch) => FlowState::AwaitingId {
                name: name.clone(),
                ids: ids.clone(),
            },
            _ => FlowState::AwaitingQuery,
        };
        self.state = next;

        outcome
    }
}
