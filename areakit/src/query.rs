//! Registre des requêtes: associations (couche, zone) -> inclusion/exclusion

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::QueryEntry;

/// Interface du registre de requêtes consommée par le store et les commandes
pub trait QueryLedger {
    /// Entrées correspondant aux critères (None = pas de filtre sur ce champ)
    fn get_entries(
        &self,
        layer_id: Option<&str>,
        area_id: Option<&str>,
        filter_group: Option<&str>,
        include_negations: bool,
    ) -> Vec<QueryEntry>;

    fn add_entry(
        &mut self,
        layer_id: &str,
        area_id: &str,
        filter_group: Option<&str>,
        include_area: bool,
    );

    fn add_entries(&mut self, entries: &[QueryEntry]);

    /// Supprime les entrées correspondant aux critères (None = toutes)
    fn remove_entries(&mut self, layer_id: Option<&str>, area_id: Option<&str>);

    /// Supprime exactement les entrées données
    fn remove_entries_arr(&mut self, entries: &[QueryEntry]);

    /// La zone a au moins une entrée d'inclusion
    fn is_inclusion(&self, area_id: &str) -> bool;

    /// La zone a au moins une entrée d'exclusion
    fn is_exclusion(&self, area_id: &str) -> bool;

    /// Couches connues: id -> libellé
    fn layer_set(&self) -> BTreeMap<String, String>;

    /// Compteur incrémenté à chaque modification
    fn revision(&self) -> u64;
}

/// Registre en mémoire
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryLedger {
    entries: Vec<QueryEntry>,

    #[serde(default)]
    layers: BTreeMap<String, String>,

    #[serde(skip)]
    revision: u64,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Déclare une couche
    pub fn set_layer(&mut self, layer_id: impl Into<String>, label: impl Into<String>) {
        self.layers.insert(layer_id.into(), label.into());
    }

    /// Toutes les entrées, dans l'ordre d'ajout
    pub fn entries(&self) -> &[QueryEntry] {
        &self.entries
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn upsert(&mut self, entry: QueryEntry) {
        let existing = self.entries.iter_mut().find(|e| {
            e.layer_id == entry.layer_id
                && e.area_id == entry.area_id
                && e.filter_group == entry.filter_group
                && e.negate == entry.negate
        });
        match existing {
            Some(e) => e.include_area = entry.include_area,
            None => self.entries.push(entry),
        }
    }
}

impl QueryLedger for InMemoryLedger {
    fn get_entries(
        &self,
        layer_id: Option<&str>,
        area_id: Option<&str>,
        filter_group: Option<&str>,
        include_negations: bool,
    ) -> Vec<QueryEntry> {
        self.entries
            .iter()
            .filter(|e| layer_id.map_or(true, |l| e.layer_id == l))
            .filter(|e| area_id.map_or(true, |a| e.area_id == a))
            .filter(|e| filter_group.map_or(true, |f| e.filter_group.as_deref() == Some(f)))
            .filter(|e| include_negations || !e.negate)
            .cloned()
            .collect()
    }

    fn add_entry(
        &mut self,
        layer_id: &str,
        area_id: &str,
        filter_group: Option<&str>,
        include_area: bool,
    ) {
        let mut entry = QueryEntry::new(layer_id, area_id, include_area);
        entry.filter_group = filter_group.map(str::to_string);
        self.upsert(entry);
        self.touch();
    }

    fn add_entries(&mut self, entries: &[QueryEntry]) {
        if entries.is_empty() {
            return;
        }
        for entry in entries {
            self.upsert(entry.clone());
        }
        self.touch();
    }

    fn remove_entries(&mut self, layer_id: Option<&str>, area_id: Option<&str>) {
        let before = self.entries.len();
        self.entries.retain(|e| {
            !(layer_id.map_or(true, |l| e.layer_id == l) && area_id.map_or(true, |a| e.area_id == a))
        });
        if self.entries.len() != before {
            self.touch();
        }
    }

    fn remove_entries_arr(&mut self, entries: &[QueryEntry]) {
        let before = self.entries.len();
        self.entries.retain(|e| !entries.contains(e));
        if self.entries.len() != before {
            self.touch();
        }
    }

    fn is_inclusion(&self, area_id: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.area_id == area_id && e.include_area && !e.negate)
    }

    fn is_exclusion(&self, area_id: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.area_id == area_id && !e.include_area && !e.negate)
    }

    fn layer_set(&self) -> BTreeMap<String, String> {
        self.layers.clone()
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}
