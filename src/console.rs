//! Interactive console front end (`eqa chat`).
//!
//! Reads one line at a time, feeds it to the disambiguation [`Flow`], and
//! once an equipment is resolved switches to answering questions about it.
//! An empty line in question mode goes back to equipment selection; end of
//! input quits.

use anyhow::Result;
use std::io::{BufRead, Write};

use crate::answer::answer;
use crate::catalog::Catalog;
use crate::disambiguation::{Flow, FlowState, Outcome};
use crate::llm::LanguageModel;
use crate::resolve::MatchParams;

const PROMPT_EQUIPMENT: &str = "Quel équipement voulez-vous intervenir ?";
const PROMPT_ID: &str = "Entrez l'ID de l'équipement :";
const PROMPT_QUESTION: &str = "Votre question (ligne vide pour changer d'équipement) :";

/// Human-readable rendering of an outcome, as printed by the CLI.
pub fn render_outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::NoMatch => "Aucun équipement trouvé. Veuillez réessayer.".to_string(),
        Outcome::MultiName { suggestions } => {
            let mut s = String::from("Plusieurs équipements correspondent. Suggestions :");
            for (i, name) in suggestions.iter().enumerate() {
                s.push_str(&format!("\n  {}. {}", i + 1, name));
            }
            s
        }
        Outcome::DuplicateName { name, ids } => format!(
            "Plusieurs éléments nommés « {} », veuillez entrer l'ID de l'équipement : {}",
            name,
            ids.join(", ")
        ),
        Outcome::Resolved(r) => {
            format!("Équipement sélectionné : {} ({})", r.name, r.equipment_id)
        }
    }
}

fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

pub async fn run_console<R: BufRead, W: Write>(
    catalog: &Catalog,
    model: &dyn LanguageModel,
    params: MatchParams,
    mut input: R,
    mut output: W,
) -> Result<()> {
    let mut flow = Flow::new(catalog, params);

    loop {
        let prompt = match flow.state() {
            FlowState::AwaitingId { .. } => PROMPT_ID,
            _ => PROMPT_EQUIPMENT,
        };
        writeln!(output, "{}", prompt)?;
        output.flush()?;

        let Some(line) = read_line(&mut input)? else {
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }

        let outcome = flow.submit(&line);
        writeln!(output, "{}", render_outcome(&outcome))?;

        let Some(record) = flow.resolved().cloned() else {
            continue;
        };

        loop {
            writeln!(output, "{}", PROMPT_QUESTION)?;
            output.flush()?;

            let Some(question) = read_line(&mut input)? else {
                return Ok(());
            };
            if question.trim().is_empty() {
                flow.reset();
                break;
            }

            let reply = answer(catalog, model, &question, &record.equipment_id).await;
            writeln!(output, "{}", reply.text())?;
        }
    }
}
