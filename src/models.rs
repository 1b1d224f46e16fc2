//! Core data models: equipment records and their intervention history.

/// One row of the equipment master table.
///
/// `equipment_id` is the only reliable key; several records may share a
/// `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquipmentRecord {
    pub name: String,
    pub equipment_id: String,
    pub equipment_type: Option<String>,
    pub sector: Option<String>,
}

impl EquipmentRecord {
    pub fn new(name: impl Into<String>, equipment_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            equipment_id: equipment_id.into(),
            equipment_type: None,
            sector: None,
        }
    }

    pub fn with_type(mut self, equipment_type: impl Into<String>) -> Self {
        self.equipment_type = Some(equipment_type.into());
        self
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }
}

/// One row of the intervention history table.
///
/// Only the foreign key is interpreted; every other column is kept verbatim
/// in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterventionRecord {
    pub equipment_id: String,
    pub fields: Vec<(String, String)>,
}
