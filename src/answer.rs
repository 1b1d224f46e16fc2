//! Question answering about one resolved equipment.
//!
//! [`answer`] never fails: an unknown ID and a failing language model are
//! both reported through [`Answer`], and [`Answer::text`] always has
//! something to show the user.

use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::llm::LanguageModel;
use crate::models::{EquipmentRecord, InterventionRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// The model's reply.
    Answered(String),
    /// No equipment with that ID; carries the user-facing message.
    NotFound(String),
    /// The model call failed; carries the error detail.
    ServiceError(String),
}

impl Answer {
    /// User-visible text for any variant.
    pub fn text(&self) -> String {
        match self {
            Answer::Answered(t) | Answer::NotFound(t) => t.clone(),
            Answer::ServiceError(detail) => format!("Erreur lors de la recherche: {}", detail),
        }
    }
}

pub fn not_found_message(equipment_id: &str) -> String {
    format!("Aucun équipement trouvé avec l'ID {}", equipment_id)
}

/// Answer `question` about the equipment with exactly this ID.
pub async fn answer(
    catalog: &Catalog,
    model: &dyn LanguageModel,
    question: &str,
    equipment_id: &str,
) -> Answer {
    let Some(record) = catalog.find_exact(equipment_id) else {
        info!(equipment_id, "answer requested for unknown equipment");
        return Answer::NotFound(not_found_message(equipment_id));
    };

    let interventions = catalog.interventions_for(equipment_id);
    let context = build_context(record, &interventions);
    let prompt = format!(
        "Réponds à la question suivante: {}\n\nAvec ces informations:\n{}",
        question, context
    );

    match model.complete(&prompt).await {
        Ok(text) => Answer::Answered(text.trim().to_string()),
        Err(e) => {
            warn!(equipment_id, model = model.model_name(), error = %e, "answer generation failed");
            Answer::ServiceError(e.to_string())
        }
    }
}

/// Human-readable context block: equipment fields, then intervention history.
pub fn build_context(record: &EquipmentRecord, interventions: &[&InterventionRecord]) -> String {
    let mut out = String::new();

    out.push_str("Information sur l'équipement:\n");
    out.push_str(&format!("  Nom: {}\n", record.name));
    out.push_str(&format!("  ID équipement: {}\n", record.equipment_id));
    if let Some(t) = &record.equipment_type {
        out.push_str(&format!("  Type: {}\n", t));
    }
    if let Some(s) = &record.sector {
        out.push_str(&format!("  Secteur: {}\n", s));
    }

    out.push_str("\nHistorique des interventions:\n");
    if interventions.is_empty() {
        out.push_str("  Aucune intervention enregistrée.\n");
    }
    for (n, intervention) in interventions.iter().enumerate() {
        out.push_str(&format!("  Intervention {}:\n", n + 1));
        for (key, value) in &intervention.fields {
            out.push_str(&format!("    {}: {}\n", key, value));
        }
    }

    out
}
