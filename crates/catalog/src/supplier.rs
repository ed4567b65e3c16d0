use serde::{Deserialize, Serialize};

use medcamp_core::{Entity, MedicineId, SupplierId};

use crate::medicine::Medicine;

/// Supplier reference data and the medicines it can fulfil.
///
/// The medicine set is ordered (catalog order is the editor's display order)
/// and unique by medicine id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    id: SupplierId,
    name: String,
    medicines: Vec<Medicine>,
}

impl Supplier {
    pub fn new(id: SupplierId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            medicines: Vec::new(),
        }
    }

    /// Builder form of [`Supplier::add_medicine`].
    pub fn with_medicine(mut self, medicine: Medicine) -> Self {
        self.add_medicine(medicine);
        self
    }

    pub fn id_typed(&self) -> SupplierId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn medicines(&self) -> &[Medicine] {
        &self.medicines
    }

    pub fn medicine(&self, id: &MedicineId) -> Option<&Medicine> {
        self.medicines.iter().find(|m| &m.id == id)
    }

    pub fn supplies(&self, id: &MedicineId) -> bool {
        self.medicine(id).is_some()
    }

    /// Add a medicine to the supplied set. Returns `false` if already present.
    pub fn add_medicine(&mut self, medicine: Medicine) -> bool {
        if self.supplies(&medicine.id) {
            return false;
        }
        self.medicines.push(medicine);
        true
    }

    /// Remove a medicine from the supplied set.
    pub fn remove_medicine(&mut self, id: &MedicineId) -> Option<Medicine> {
        let idx = self.medicines.iter().position(|m| &m.id == id)?;
        Some(self.medicines.remove(idx))
    }
}

impl Entity for Supplier {
    type Id = SupplierId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MedicineKind;

    fn med(name: &str) -> Medicine {
        Medicine::new(MedicineId::new(), name, MedicineKind::Tablet)
    }

    #[test]
    fn medicine_set_is_unique_and_ordered() {
        let a = med("Amoxicillin");
        let b = med("Paracetamol");
        let mut s = Supplier::new(SupplierId::new(), "Camp Pharma")
            .with_medicine(a.clone())
            .with_medicine(b.clone());

        assert!(!s.add_medicine(a.clone()));
        let names: Vec<_> = s.medicines().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Amoxicillin", "Paracetamol"]);
        assert!(s.supplies(&b.id));
    }

    #[test]
    fn removed_medicine_is_no_longer_supplied() {
        let a = med("ORS");
        let mut s = Supplier::new(SupplierId::new(), "Camp Pharma").with_medicine(a.clone());

        assert_eq!(s.remove_medicine(&a.id), Some(a.clone()));
        assert!(!s.supplies(&a.id));
        assert_eq!(s.remove_medicine(&a.id), None);
    }
}
