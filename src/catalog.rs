//! The in-memory equipment catalog.
//!
//! Both tables are loaded once by [`Catalog::load`] and never mutated
//! afterwards. The catalog is shared behind an `Arc` by the console flow,
//! the answer generator and the HTTP server.
//!
//! # File format
//!
//! Delimited text (`;` by default) with a header row. Files exported from
//! spreadsheet tools are often Windows-1252 / ISO-8859-1 rather than UTF-8;
//! both are accepted.
//!
//! | Table | Required columns | Optional columns |
//! |-------|------------------|------------------|
//! | equipments | `Nom`, `ID équipement` | `Type`, `Secteur` |
//! | interventions | `ID` | any (kept as free-form fields) |

use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use crate::config::DataConfig;
use crate::models::{EquipmentRecord, InterventionRecord};

const COL_NAME: &str = "Nom";
const COL_EQUIPMENT_ID: &str = "ID équipement";
const COL_TYPE: &str = "Type";
const COL_SECTOR: &str = "Secteur";
const COL_INTERVENTION_ID: &str = "ID";

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    equipments: Vec<EquipmentRecord>,
    interventions: Vec<InterventionRecord>,
}

/// Summary counts printed by `eqa stats`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogStats {
    pub equipments: usize,
    pub distinct_names: usize,
    pub duplicated_names: usize,
    pub interventions: usize,
}

impl Catalog {
    pub fn new(equipments: Vec<EquipmentRecord>, interventions: Vec<InterventionRecord>) -> Self {
        Self {
            equipments,
            interventions,
        }
    }

    /// Load both tables from the paths in `[data]`.
    pub fn load(config: &DataConfig) -> Result<Self> {
        let delimiter = config.delimiter_byte()?;

        let content = read_file_as_utf8(&config.equipments)?;
        let equipments = parse_equipments(&content, delimiter)
            .with_context(|| format!("Invalid equipment file: {}", config.equipments.display()))?;

        let content = read_file_as_utf8(&config.interventions)?;
        let interventions = parse_interventions(&content, delimiter).with_context(|| {
            format!(
                "Invalid intervention file: {}",
                config.interventions.display()
            )
        })?;

        info!(
            equipments = equipments.len(),
            interventions = interventions.len(),
            "catalog loaded"
        );

        Ok(Self::new(equipments, interventions))
    }

    /// All equipment records in file order.
    pub fn records(&self) -> &[EquipmentRecord] {
        &self.equipments
    }

    /// First record whose ID is exactly `equipment_id` (case-sensitive).
    pub fn find_exact(&self, equipment_id: &str) -> Option<&EquipmentRecord> {
        self.equipments
            .iter()
            .find(|r| r.equipment_id == equipment_id)
    }

    /// Intervention history for one equipment, in file order.
    pub fn interventions_for(&self, equipment_id: &str) -> Vec<&InterventionRecord> {
        self.interventions
            .iter()
            .filter(|i| i.equipment_id == equipment_id)
            .collect()
    }

    pub fn stats(&self) -> CatalogStats {
        let mut seen = HashSet::new();
        let mut duplicated = HashSet::new();
        for r in &self.equipments {
            let key = r.name.to_lowercase();
            if !seen.insert(key.clone()) {
                duplicated.insert(key);
            }
        }

        CatalogStats {
            equipments: self.equipments.len(),
            distinct_names: seen.len(),
            duplicated_names: duplicated.len(),
            interventions: self.interventions.len(),
        }
    }
}

/// Read a file and convert to UTF-8 if needed (Windows-1252 / Latin-1 fallback).
fn read_file_as_utf8(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open data file: {}", path.display()))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .with_context(|| format!("Failed to read data file: {}", path.display()))?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

fn reader(content: &str, delimiter: u8) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes())
}

fn normalize_header(h: &str) -> String {
    h.trim_start_matches('\u{feff}').trim().to_string()
}

fn column(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

fn required_column(headers: &[String], name: &str) -> Result<usize> {
    match column(headers, name) {
        Some(idx) => Ok(idx),
        None => bail!("missing required column '{}'", name),
    }
}

fn optional_field(record: &csv::StringRecord, idx: Option<usize>) -> Option<String> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn parse_equipments(content: &str, delimiter: u8) -> Result<Vec<EquipmentRecord>> {
    let mut rdr = reader(content, delimiter);
    let headers: Vec<String> = rdr.headers()?.iter().map(normalize_header).collect();

    let name_idx = required_column(&headers, COL_NAME)?;
    let id_idx = required_column(&headers, COL_EQUIPMENT_ID)?;
    let type_idx = column(&headers, COL_TYPE);
    let sector_idx = column(&headers, COL_SECTOR);

    let mut out = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        let name = optional_field(&record, Some(name_idx));
        let id = optional_field(&record, Some(id_idx));

        let (Some(name), Some(equipment_id)) = (name, id) else {
            warn!(row = row + 2, "skipping equipment row without name or ID");
            continue;
        };

        out.push(EquipmentRecord {
            name,
            equipment_id,
            equipment_type: optional_field(&record, type_idx),
            sector: optional_field(&record, sector_idx),
        });
    }

    Ok(out)
}

pub fn parse_interventions(content: &str, delimiter: u8) -> Result<Vec<InterventionRecord>> {
    let mut rdr = reader(content, delimiter);
    let headers: Vec<String> = rdr.headers()?.iter().map(normalize_header).collect();

    let id_idx = required_column(&headers, COL_INTERVENTION_ID)?;

    let mut out = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let Some(equipment_id) = optional_field(&record, Some(id_idx)) else {
            continue;
        };

        let fields = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != id_idx)
            .filter_map(|(i, h)| {
                record
                    .get(i)
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(|v| (h.clone(), v.to_string()))
            })
            .collect();

        out.push(InterventionRecord {
            equipment_id,
            fields,
        });
    }

    Ok(out)
}
