use serde::{Deserialize, Serialize};

use medcamp_core::{Entity, MedicineId};

/// Dosage form / category of a medicine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MedicineKind {
    Tablet,
    Capsule,
    Syrup,
    Injection,
    Topical,
    Drops,
    Consumable,
    #[serde(other)]
    Other,
}

/// Immutable medicine reference data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medicine {
    pub id: MedicineId,
    pub name: String,
    pub kind: MedicineKind,
}

impl Medicine {
    pub fn new(id: MedicineId, name: impl Into<String>, kind: MedicineKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
        }
    }
}

impl Entity for Medicine {
    type Id = MedicineId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
