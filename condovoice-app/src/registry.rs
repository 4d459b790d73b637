//! Condominium registry: the buildings the administrator manages.
//!
//! Ephemeral like the rest of the application state. The registry owns the
//! building records; the engine state only carries the current selection,
//! which the registry keeps consistent when buildings are removed.

use condovoice_core::domain::CondoSelection;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condominium {
    pub id: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub fiscal_code: String,
    pub total_units: u32,
}

#[derive(Debug, Default)]
pub struct CondoRegistry {
    condos: Vec<Condominium>,
    next_id: u64,
}

impl CondoRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the demo buildings.
    pub fn seeded() -> Self {
        let mut registry = Self::new();
        registry.add(
            "Villa dei Fiori",
            "Via Roma 12",
            "Milano",
            "VDF2023MI",
            24,
        );
        registry.add(
            "Residenza Parco",
            "Corso Italia 5",
            "Monza",
            "RSP2021MB",
            48,
        );
        registry
    }

    pub fn list(&self) -> &[Condominium] {
        &self.condos
    }

    pub fn get(&self, id: &str) -> Option<&Condominium> {
        self.condos.iter().find(|c| c.id == id)
    }

    pub fn add(
        &mut self,
        name: &str,
        address: &str,
        city: &str,
        fiscal_code: &str,
        total_units: u32,
    ) -> Condominium {
        self.next_id += 1;
        let condo = Condominium {
            id: format!("c-{}", self.next_id),
            name: name.trim().to_string(),
            address: address.trim().to_string(),
            city: city.trim().to_string(),
            fiscal_code: fiscal_code.trim().to_string(),
            total_units,
        };
        self.condos.push(condo.clone());
        condo
    }

    /// Update a building's details in place. Returns `false` for unknown ids.
    pub fn update(&mut self, id: &str, edit: impl FnOnce(&mut Condominium)) -> bool {
        match self.condos.iter_mut().find(|c| c.id == id) {
            Some(condo) => {
                edit(condo);
                true
            }
            None => false,
        }
    }

    /// Remove a building. Returns the selection the caller must fall back to:
    /// deleting the selected building resets the scope to all buildings.
    pub fn remove(&mut self, id: &str, current: &CondoSelection) -> Option<CondoSelection> {
        let before = self.condos.len();
        self.condos.retain(|c| c.id != id);
        if self.condos.len() == before {
            return None;
        }
        match current {
            CondoSelection::One(selected) if selected == id => Some(CondoSelection::All),
            _ => Some(current.clone()),
        }
    }

    /// Validate a selection against the registry.
    pub fn select(&self, id: &str) -> Option<CondoSelection> {
        if id == "all" {
            return Some(CondoSelection::All);
        }
        self.get(id).map(|c| CondoSelection::One(c.id.clone()))
    }
}
