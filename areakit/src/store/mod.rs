//! Store des zones
//!
//! Le store possède la liste de référence des zones et leur représentation sur
//! la carte. Il garantit:
//! - chaque zone a une géométrie polygonale validée
//! - les identifiants sont uniques
//! - une zone est rendue sur la carte si et seulement si `shown` et carte prête

pub mod collection;
pub mod debounce;
pub mod persist;

use std::time::Duration;

use geo::Geometry;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::alert::{AlertSeverity, AlertSink, LogAlerts, INVALID_AREA_MESSAGE};
use crate::hash::generate_area_id;
use crate::map::MapView;
use crate::projection::project;
use crate::query::QueryLedger;
use crate::types::{Area, AreaStyle};
use crate::validate::{self, ValidateSettings};
use crate::AreaError;

use collection::OrderedCollection;
use debounce::{Clock, Debouncer, SystemClock};
use persist::{AreaPersistence, NoopPersistence};

/// Suffixe de l'identifiant de la copie mise en surbrillance
const HIGHLIGHT_SUFFIX: &str = "#highlight";

/// Paramètres du store
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Fenêtre de regroupement des sauvegardes (ms)
    pub save_delay_ms: u64,

    /// Préfixe des titres générés
    pub temp_title_prefix: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            save_delay_ms: 100,
            temp_title_prefix: "temp area ".to_string(),
        }
    }
}

/// Notifications émises par le store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AreaEvent {
    Added(String),
    Updated(String),
    Removed(String),
    /// Visibilité changée (distincte d'un ajout/suppression)
    Toggled { id: String, shown: bool },
    Highlighted(Option<String>),
    StyleChanged(String),
    /// Changement global (chargement, import en masse, vidage)
    AreasChanged,
}

/// Store des zones
pub struct AreaStore {
    areas: OrderedCollection<Area>,
    settings: StoreSettings,
    validate_settings: ValidateSettings,
    temp_counter: u64,
    id_salt: u64,
    highlighted: Option<String>,
    map: Option<Box<dyn MapView>>,
    seen_revision: Option<u64>,
    persistence: Box<dyn AreaPersistence>,
    save_timer: Debouncer,
    clock: Box<dyn Clock>,
    alerts: Box<dyn AlertSink>,
    events: Vec<AreaEvent>,
}

impl Default for AreaStore {
    fn default() -> Self {
        Self::new(StoreSettings::default(), ValidateSettings::default())
    }
}

impl AreaStore {
    pub fn new(settings: StoreSettings, validate_settings: ValidateSettings) -> Self {
        let delay = Duration::from_millis(settings.save_delay_ms);
        Self {
            areas: OrderedCollection::new(),
            settings,
            validate_settings,
            temp_counter: 0,
            id_salt: 0,
            highlighted: None,
            map: None,
            seen_revision: None,
            persistence: Box::new(NoopPersistence),
            save_timer: Debouncer::new(delay),
            clock: Box::new(SystemClock),
            alerts: Box::new(LogAlerts),
            events: Vec::new(),
        }
    }

    pub fn with_persistence(mut self, persistence: impl AreaPersistence + 'static) -> Self {
        self.persistence = Box::new(persistence);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_alerts(mut self, alerts: impl AlertSink + 'static) -> Self {
        self.alerts = Box::new(alerts);
        self
    }

    pub fn validate_settings(&self) -> &ValidateSettings {
        &self.validate_settings
    }

    /// Émet une alerte utilisateur
    pub fn alert(&mut self, message: &str, severity: AlertSeverity) {
        self.alerts.alert(message, severity);
    }

    /// Vide et retourne les notifications en attente
    pub fn take_events(&mut self) -> Vec<AreaEvent> {
        std::mem::take(&mut self.events)
    }

    // ------------------------------------------------------------------
    // Lecture
    // ------------------------------------------------------------------

    pub fn get(&self, id: &str) -> Option<&Area> {
        self.areas.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.areas.contains(id)
    }

    pub fn get_all(&self) -> Vec<&Area> {
        self.areas.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn highlighted(&self) -> Option<&str> {
        self.highlighted.as_deref()
    }

    // ------------------------------------------------------------------
    // Ajout
    // ------------------------------------------------------------------

    /// Attribue l'identifiant et le titre par défaut
    pub fn prepare(&mut self, area: &mut Area) {
        if area.id.is_empty() {
            area.id = self.unique_id(area.geometry.as_ref());
        }

        if area.title.is_none() {
            match area.name().map(str::to_string) {
                Some(name) if !name.is_empty() => area.title = Some(name),
                _ => {
                    self.temp_counter += 1;
                    area.title = Some(format!(
                        "{}{}",
                        self.settings.temp_title_prefix, self.temp_counter
                    ));
                    area.temporary = true;
                }
            }
        }
    }

    fn unique_id(&mut self, geometry: Option<&Geometry>) -> String {
        loop {
            self.id_salt += 1;
            let id = generate_area_id(geometry, self.id_salt);
            if !self.areas.contains(&id) {
                return id;
            }
        }
    }

    /// Ajoute une zone; retourne true si elle a été insérée (false si édition
    /// en place ou géométrie invalide, signalée par une alerte).
    pub fn add(&mut self, area: Area) -> bool {
        self.try_add(area).unwrap_or(false)
    }

    /// Comme `add`, mais retourne l'erreur de validation
    pub fn try_add(&mut self, mut area: Area) -> Result<bool, AreaError> {
        self.prepare(&mut area);
        if let Err(e) = validate::validate(&mut area, &self.validate_settings) {
            self.alerts.alert(INVALID_AREA_MESSAGE, AlertSeverity::Warning);
            return Err(e);
        }

        let id = area.id.clone();
        let shown = area.shown;
        let inserted = if self.store_area(area) {
            self.events.push(AreaEvent::Added(id.clone()));
            true
        } else {
            self.events.push(AreaEvent::Updated(id.clone()));
            false
        };

        self.sync_rendering(&id, shown);
        self.schedule_save();
        debug!(area_id = %id, inserted, "Area stored");
        Ok(inserted)
    }

    /// Ajout en masse: une seule notification, pas de bascule par zone.
    ///
    /// Retourne le nombre de zones acceptées.
    pub fn bulk_add(&mut self, areas: Vec<Area>, show: bool) -> usize {
        let total = areas.len();
        let mut accepted = Vec::with_capacity(total);

        for mut area in areas {
            self.prepare(&mut area);
            if let Err(e) = validate::validate(&mut area, &self.validate_settings) {
                warn!(area_id = %area.id, error = %e, "Skipping invalid area in bulk add");
                continue;
            }
            if show {
                area.shown = true;
            }
            accepted.push(area.id.clone());
            self.store_area(area);
        }

        if accepted.len() < total {
            self.alerts.alert(
                &format!(
                    "{} of {} areas are invalid and were not imported.",
                    total - accepted.len(),
                    total
                ),
                AlertSeverity::Warning,
            );
        }

        self.render_ids(&accepted);
        self.events.push(AreaEvent::AreasChanged);
        self.schedule_save();
        info!(accepted = accepted.len(), total, "Bulk add completed");
        accepted.len()
    }

    /// Insère une zone validée; true si l'identifiant était nouveau.
    ///
    /// En cas d'édition en place l'ancienne représentation est retirée de la
    /// carte, le rendu suivant dessine la nouvelle géométrie.
    fn store_area(&mut self, area: Area) -> bool {
        match self.areas.insert(area) {
            Some(previous) => {
                if let Some(map) = self.map.as_deref_mut() {
                    map.remove_feature(&previous.id);
                }
                false
            }
            None => true,
        }
    }

    // ------------------------------------------------------------------
    // Modification
    // ------------------------------------------------------------------

    /// Remplace la géométrie d'une zone (validée) et retourne l'ancienne
    pub fn replace_geometry(&mut self, id: &str, geometry: Geometry) -> Result<Geometry, AreaError> {
        let Some(current) = self.areas.get(id) else {
            return Err(AreaError::NotFound(id.to_string()));
        };

        let mut candidate = current.clone();
        candidate.geometry = Some(geometry);
        candidate.original_geometry = None;
        candidate.normalized = false;
        if let Err(e) = validate::validate(&mut candidate, &self.validate_settings) {
            self.alerts.alert(INVALID_AREA_MESSAGE, AlertSeverity::Warning);
            return Err(e);
        }

        let shown = candidate.shown;
        let previous = self.areas.insert(candidate);
        if let Some(map) = self.map.as_deref_mut() {
            map.remove_feature(id);
        }
        self.sync_rendering(id, shown);
        self.events.push(AreaEvent::Updated(id.to_string()));
        self.schedule_save();

        previous
            .and_then(|p| p.geometry)
            .ok_or_else(|| AreaError::invalid_geometry(id, "previous geometry missing"))
    }

    /// Met à jour titre/description/tags d'une zone existante
    pub fn update_details(
        &mut self,
        id: &str,
        title: Option<String>,
        description: Option<String>,
        tags: Vec<String>,
    ) -> bool {
        let Some(area) = self.areas.get_mut(id) else {
            return false;
        };
        if let Some(title) = title {
            area.title = Some(title);
            area.temporary = false;
        }
        area.description = description;
        area.tags = tags;
        self.events.push(AreaEvent::Updated(id.to_string()));
        self.schedule_save();
        true
    }

    // ------------------------------------------------------------------
    // Suppression
    // ------------------------------------------------------------------

    pub fn remove(&mut self, id: &str) -> Option<Area> {
        let area = self.areas.remove(id)?;
        if let Some(map) = self.map.as_deref_mut() {
            map.remove_feature(id);
        }
        if self.highlighted.as_deref() == Some(id) {
            self.unhighlight(id);
        }
        self.events.push(AreaEvent::Removed(id.to_string()));
        self.schedule_save();
        Some(area)
    }

    /// Supprime toutes les zones et leurs entrées de requête
    pub fn clear(&mut self, ledger: &mut dyn QueryLedger) -> Vec<Area> {
        let removed = self.areas.clear();
        self.forget(&removed, ledger);
        removed
    }

    /// Supprime les zones temporaires et leurs entrées de requête
    pub fn clear_temp(&mut self, ledger: &mut dyn QueryLedger) -> Vec<Area> {
        let removed = self.areas.extract_if(|a| a.temporary);
        self.forget(&removed, ledger);
        removed
    }

    fn forget(&mut self, removed: &[Area], ledger: &mut dyn QueryLedger) {
        if removed.is_empty() {
            return;
        }
        for area in removed {
            ledger.remove_entries(None, Some(&area.id));
            if let Some(map) = self.map.as_deref_mut() {
                map.remove_feature(&area.id);
            }
            if self.highlighted.as_deref() == Some(area.id.as_str()) {
                self.unhighlight(&area.id);
            }
        }
        self.events.push(AreaEvent::AreasChanged);
        self.schedule_save();
        info!(removed = removed.len(), "Areas cleared");
    }

    // ------------------------------------------------------------------
    // Visibilité
    // ------------------------------------------------------------------

    /// Bascule (ou force) la visibilité d'une zone
    pub fn toggle(&mut self, id: &str, show: Option<bool>) {
        let Some(area) = self.areas.get_mut(id) else {
            return;
        };
        let shown = show.unwrap_or(!area.shown);
        area.shown = shown;
        self.sync_rendering(id, shown);
        self.events.push(AreaEvent::Toggled {
            id: id.to_string(),
            shown,
        });
    }

    pub fn toggle_all_features(&mut self, show: bool) {
        for id in self.areas.keys() {
            self.toggle(&id, Some(show));
        }
    }

    // ------------------------------------------------------------------
    // Surbrillance
    // ------------------------------------------------------------------

    /// Met une zone en surbrillance (retire la précédente)
    pub fn highlight(&mut self, id: &str) {
        if let Some(previous) = self.highlighted.clone() {
            if previous == id {
                return;
            }
            self.unhighlight(&previous);
        }

        let Some(area) = self.areas.get(id) else {
            return;
        };

        if let (Some(map), Some(geometry)) = (self.map.as_deref_mut(), area.geometry.as_ref()) {
            let projected = project(geometry, map.epsg());
            map.add_feature(&highlight_id(id), &projected, AreaStyle::Highlight);
        }
        self.highlighted = Some(id.to_string());
        self.events.push(AreaEvent::Highlighted(Some(id.to_string())));
    }

    pub fn unhighlight(&mut self, id: &str) {
        if self.highlighted.as_deref() != Some(id) {
            return;
        }
        if let Some(map) = self.map.as_deref_mut() {
            map.remove_feature(&highlight_id(id));
        }
        self.highlighted = None;
        self.events.push(AreaEvent::Highlighted(None));
    }

    // ------------------------------------------------------------------
    // Styles
    // ------------------------------------------------------------------

    /// Style d'une zone d'après le registre de requêtes
    pub fn compute_style(area_id: &str, ledger: &dyn QueryLedger) -> AreaStyle {
        // Une seule couche: style de l'entrée; plusieurs couches (ambigu):
        // la première entrée trouvée l'emporte.
        match ledger.get_entries(None, Some(area_id), None, false).first() {
            Some(entry) if entry.include_area => AreaStyle::Inclusion,
            Some(_) => AreaStyle::Exclusion,
            None => AreaStyle::Default,
        }
    }

    /// Recalcule le style d'une zone; retourne true s'il a changé
    pub fn update_style(&mut self, id: &str, ledger: &dyn QueryLedger, suppress_redraw: bool) -> bool {
        let style = Self::compute_style(id, ledger);
        let Some(area) = self.areas.get_mut(id) else {
            return false;
        };
        if area.style == style {
            return false;
        }
        area.style = style;

        if let Some(map) = self.map.as_deref_mut() {
            if map.contains_feature(id) {
                map.set_feature_style(id, style);
                if !suppress_redraw {
                    map.redraw();
                }
            }
        }
        self.events.push(AreaEvent::StyleChanged(id.to_string()));
        true
    }

    /// Recalcule tous les styles avec un seul rafraîchissement final
    pub fn update_styles(&mut self, ledger: &dyn QueryLedger) -> usize {
        let mut changed = 0;
        for id in self.areas.keys() {
            if self.update_style(&id, ledger, true) {
                changed += 1;
            }
        }
        if changed > 0 {
            if let Some(map) = self.map.as_deref_mut() {
                map.redraw();
            }
        }
        changed
    }

    /// Resynchronise les styles si le registre a changé depuis la dernière fois
    /// (uniquement quand la carte est prête).
    pub fn sync_with_ledger(&mut self, ledger: &dyn QueryLedger) -> usize {
        if !self.is_map_ready() {
            return 0;
        }
        let revision = ledger.revision();
        if self.seen_revision == Some(revision) {
            return 0;
        }
        self.seen_revision = Some(revision);
        self.update_styles(ledger)
    }

    // ------------------------------------------------------------------
    // Cycle de vie de la carte
    // ------------------------------------------------------------------

    pub fn is_map_ready(&self) -> bool {
        self.map.is_some()
    }

    /// La carte est prête: projette et rend les zones chargées avant elle,
    /// puis commence à suivre le registre de requêtes.
    pub fn on_map_ready(&mut self, map: Box<dyn MapView>, ledger: &dyn QueryLedger) {
        self.map = Some(map);
        for area in self.areas.iter_mut() {
            area.style = Self::compute_style(&area.id, ledger);
        }
        let ids = self.areas.keys();
        self.render_ids(&ids);
        self.seen_revision = Some(ledger.revision());
        info!(areas = ids.len(), "Map ready, areas restored");
    }

    /// La carte disparaît: le store devient inerte vis-à-vis du rendu
    pub fn on_map_not_ready(&mut self) -> Option<Box<dyn MapView>> {
        self.seen_revision = None;
        self.map.take()
    }

    /// Applique `shown` au rendu d'une zone
    fn sync_rendering(&mut self, id: &str, shown: bool) {
        let (Some(map), Some(area)) = (self.map.as_deref_mut(), self.areas.get(id)) else {
            return;
        };
        let rendered = map.contains_feature(id);
        match (shown, rendered) {
            (true, false) => {
                if let Some(geometry) = area.geometry.as_ref() {
                    let projected = project(geometry, map.epsg());
                    map.add_feature(id, &projected, area.style);
                }
            }
            (false, true) => map.remove_feature(id),
            _ => {}
        }
    }

    fn render_ids(&mut self, ids: &[String]) {
        if self.map.is_none() {
            return;
        }
        for id in ids {
            let shown = self.areas.get(id).map_or(false, |a| a.shown);
            self.sync_rendering(id, shown);
        }
        if let Some(map) = self.map.as_deref_mut() {
            map.redraw();
        }
    }

    // ------------------------------------------------------------------
    // Persistance
    // ------------------------------------------------------------------

    fn schedule_save(&mut self) {
        let now = self.clock.now();
        self.save_timer.trigger(now);
    }

    pub fn save_pending(&self) -> bool {
        self.save_timer.is_pending()
    }

    /// À appeler par la boucle d'événements: sauvegarde si la fenêtre est écoulée
    pub fn tick(&mut self) -> Result<bool, AreaError> {
        let now = self.clock.now();
        if self.save_timer.poll(now) {
            self.save()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Force une sauvegarde en attente
    pub fn flush(&mut self) -> Result<bool, AreaError> {
        if self.save_timer.is_pending() {
            self.save_timer.cancel();
            self.save()?;
            return Ok(true);
        }
        Ok(false)
    }

    pub fn save(&mut self) -> Result<(), AreaError> {
        let snapshot: Vec<Area> = self.areas.iter().cloned().collect();
        self.persistence.save(&snapshot)
    }

    /// Charge les zones persistées; notifie toujours `AreasChanged`
    pub fn load(&mut self) -> Result<usize, AreaError> {
        let loaded = match self.persistence.load() {
            Ok(loaded) => loaded,
            Err(e) => {
                self.events.push(AreaEvent::AreasChanged);
                return Err(e);
            }
        };

        let mut ids = Vec::with_capacity(loaded.len());
        for mut area in loaded {
            self.prepare(&mut area);
            match validate::validate(&mut area, &self.validate_settings) {
                Ok(()) => {
                    ids.push(area.id.clone());
                    self.store_area(area);
                }
                Err(e) => warn!(area_id = %area.id, error = %e, "Dropping invalid persisted area"),
            }
        }

        self.render_ids(&ids);
        self.events.push(AreaEvent::AreasChanged);
        info!(loaded = ids.len(), "Areas loaded");
        Ok(ids.len())
    }
}

fn highlight_id(id: &str) -> String {
    format!("{id}{HIGHLIGHT_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::RecordedAlerts;
    use crate::map::MemoryMap;
    use crate::query::InMemoryLedger;
    use debounce::ManualClock;
    use geo::{polygon, Point};
    use persist::MemoryPersistence;

    fn square(x: f64) -> Area {
        Area::new(polygon![
            (x: x, y: 0.0),
            (x: x + 1.0, y: 0.0),
            (x: x + 1.0, y: 1.0),
            (x: x, y: 1.0),
        ])
    }

    fn store_with_map() -> (AreaStore, MemoryMap) {
        let mut store = AreaStore::default();
        let map = MemoryMap::default();
        store.on_map_ready(Box::new(map.clone()), &InMemoryLedger::new());
        (store, map)
    }

    #[test]
    fn test_add_assigns_id_and_temp_title() {
        let mut store = AreaStore::default();
        assert!(store.add(square(0.0)));
        assert!(store.add(square(2.0)));

        let all = store.get_all();
        assert_eq!(all.len(), 2);
        assert_ne!(all[0].id, all[1].id);
        assert_eq!(all[0].title.as_deref(), Some("temp area 1"));
        assert_eq!(all[1].title.as_deref(), Some("temp area 2"));
        assert!(all[0].temporary);
    }

    #[test]
    fn test_title_from_name_attribute() {
        let mut store = AreaStore::default();
        let mut area = square(0.0).with_id("named");
        area.properties
            .insert("name".to_string(), serde_json::Value::from("Lake"));
        store.add(area);
        let stored = store.get("named").unwrap();
        assert_eq!(stored.title.as_deref(), Some("Lake"));
        assert!(!stored.temporary);
    }

    #[test]
    fn test_same_id_is_edit_in_place() {
        let mut store = AreaStore::default();
        assert!(store.add(square(0.0).with_id("a")));
        assert!(!store.add(square(5.0).with_id("a").with_title("moved")));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().title.as_deref(), Some("moved"));
        let events = store.take_events();
        assert_eq!(
            events,
            vec![AreaEvent::Added("a".into()), AreaEvent::Updated("a".into())]
        );
    }

    fn rendered_max_x(map: &MemoryMap, id: &str) -> f64 {
        let Some(Geometry::Polygon(p)) = map.geometry(id) else {
            panic!("expected rendered polygon for {id}");
        };
        p.exterior().0.iter().map(|c| c.x).fold(f64::NEG_INFINITY, f64::max)
    }

    #[test]
    fn test_bulk_add_same_id_redraws_map() {
        let (mut store, map) = store_with_map();
        store.add(square(0.0).with_id("a"));
        assert_eq!(rendered_max_x(&map, "a"), 1.0);

        assert_eq!(store.bulk_add(vec![square(10.0).with_id("a")], false), 1);

        assert_eq!(store.len(), 1);
        assert_eq!(map.feature_ids(), vec!["a"]);
        assert_eq!(rendered_max_x(&map, "a"), 11.0);
    }

    #[test]
    fn test_load_same_id_redraws_map() {
        let persistence = MemoryPersistence::with_areas(vec![square(20.0).with_id("a")]);
        let mut store = AreaStore::default().with_persistence(persistence);
        let map = MemoryMap::default();
        store.on_map_ready(Box::new(map.clone()), &InMemoryLedger::new());
        store.add(square(0.0).with_id("a"));

        assert_eq!(store.load().unwrap(), 1);

        assert_eq!(map.feature_ids(), vec!["a"]);
        assert_eq!(rendered_max_x(&map, "a"), 21.0);
    }

    #[test]
    fn test_extreme_longitude_rejected_without_hanging() {
        let alerts = RecordedAlerts::new();
        let mut store = AreaStore::default().with_alerts(alerts.clone());
        let far = polygon![(x: 0.0, y: 0.0), (x: 1e20, y: 0.0), (x: 1e20, y: 1.0), (x: 0.0, y: 1.0)];

        assert!(!store.add(Area::new(far.clone())));
        assert_eq!(store.bulk_add(vec![Area::new(far), square(0.0)], true), 1);

        assert_eq!(store.len(), 1);
        assert_eq!(alerts.len(), 2);
    }

    #[test]
    fn test_invalid_area_rejected_with_alert() {
        let alerts = RecordedAlerts::new();
        let mut store = AreaStore::default().with_alerts(alerts.clone());
        assert!(!store.add(Area::new(Point::new(0.0, 0.0))));
        assert!(store.is_empty());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts.messages()[0].0, INVALID_AREA_MESSAGE);
    }

    #[test]
    fn test_toggle_idempotent_on_map() {
        let (mut store, map) = store_with_map();
        store.add(square(0.0).with_id("a"));
        assert_eq!(map.add_count(), 1);

        store.toggle("a", Some(true));
        store.toggle("a", Some(true));
        assert!(store.get("a").unwrap().shown);
        assert_eq!(map.add_count(), 1);
        assert_eq!(map.feature_ids(), vec!["a"]);

        store.toggle("a", None);
        assert!(!store.get("a").unwrap().shown);
        assert!(map.feature_ids().is_empty());
    }

    #[test]
    fn test_rendering_deferred_until_map_ready() {
        let mut store = AreaStore::default();
        store.add(square(0.0).with_id("a"));
        let mut hidden = square(3.0).with_id("b");
        hidden.shown = false;
        store.add(hidden);

        let map = MemoryMap::new(crate::projection::EPSG_3857);
        store.on_map_ready(Box::new(map.clone()), &InMemoryLedger::new());
        assert_eq!(map.feature_ids(), vec!["a"]);

        // Géométrie projetée en mètres
        let geometry = map.geometry("a").unwrap();
        let Geometry::Polygon(p) = geometry else {
            panic!("expected polygon");
        };
        assert!(p.exterior().0.iter().any(|c| c.x > 100_000.0));

        store.on_map_not_ready();
        store.toggle("b", Some(true));
        assert_eq!(map.feature_ids(), vec!["a"]);
    }

    #[test]
    fn test_highlight_single() {
        let (mut store, map) = store_with_map();
        store.add(square(0.0).with_id("a"));
        store.add(square(2.0).with_id("b"));

        store.highlight("a");
        store.highlight("b");
        assert_eq!(store.highlighted(), Some("b"));
        let ids = map.feature_ids();
        assert!(ids.contains(&"b#highlight".to_string()));
        assert!(!ids.contains(&"a#highlight".to_string()));

        store.remove("b");
        assert_eq!(store.highlighted(), None);
        assert!(!map.feature_ids().contains(&"b#highlight".to_string()));
    }

    #[test]
    fn test_style_follows_ledger() {
        let (mut store, map) = store_with_map();
        let mut ledger = InMemoryLedger::new();
        store.add(square(0.0).with_id("a"));

        ledger.add_entry("layer1", "a", None, true);
        assert!(store.update_style("a", &ledger, false));
        assert_eq!(store.get("a").unwrap().style, AreaStyle::Inclusion);
        assert_eq!(map.style("a"), Some(AreaStyle::Inclusion));

        // Pas de changement: pas de redraw
        let redraws = map.redraw_count();
        assert!(!store.update_style("a", &ledger, false));
        assert_eq!(map.redraw_count(), redraws);

        ledger.add_entry("layer1", "a", None, false);
        store.update_style("a", &ledger, false);
        assert_eq!(store.get("a").unwrap().style, AreaStyle::Exclusion);

        ledger.remove_entries(None, Some("a"));
        store.update_style("a", &ledger, false);
        assert_eq!(store.get("a").unwrap().style, AreaStyle::Default);
    }

    #[test]
    fn test_update_styles_single_redraw() {
        let (mut store, map) = store_with_map();
        let mut ledger = InMemoryLedger::new();
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            store.add(square(i as f64 * 2.0).with_id(*id));
            ledger.add_entry("*", id, None, true);
        }
        let before = map.redraw_count();
        assert_eq!(store.sync_with_ledger(&ledger), 3);
        assert_eq!(map.redraw_count(), before + 1);
        assert_eq!(store.sync_with_ledger(&ledger), 0);
    }

    #[test]
    fn test_clear_temp_removes_entries() {
        let mut store = AreaStore::default();
        let mut ledger = InMemoryLedger::new();
        store.add(square(0.0).with_id("temp"));
        store.add(square(2.0).with_id("kept").with_title("Kept"));
        ledger.add_entry("*", "temp", None, true);
        ledger.add_entry("*", "kept", None, true);

        let removed = store.clear_temp(&mut ledger);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id, "temp");
        assert_eq!(ledger.entries().len(), 1);

        let removed = store.clear(&mut ledger);
        assert_eq!(removed.len(), 1);
        assert!(ledger.entries().is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_bulk_add_single_notification() {
        let mut store = AreaStore::default();
        let mut hidden = square(0.0);
        hidden.shown = false;
        let count = store.bulk_add(vec![hidden, square(2.0), Area::default()], true);
        assert_eq!(count, 2);
        assert!(store.get_all().iter().all(|a| a.shown));
        assert_eq!(store.take_events(), vec![AreaEvent::AreasChanged]);
    }

    #[test]
    fn test_debounced_save() {
        let clock = ManualClock::new();
        let persistence = MemoryPersistence::new();
        let mut store = AreaStore::default()
            .with_clock(clock.clone())
            .with_persistence(persistence.clone());

        for i in 0..5 {
            store.add(square(i as f64 * 2.0).with_id(format!("a{i}")));
            clock.advance(Duration::from_millis(5));
            store.tick().unwrap();
        }
        for i in 0..5 {
            store.remove(&format!("a{i}"));
            clock.advance(Duration::from_millis(5));
            store.tick().unwrap();
        }
        assert_eq!(persistence.save_count(), 0);

        clock.advance(Duration::from_millis(100));
        assert!(store.tick().unwrap());
        assert_eq!(persistence.save_count(), 1);
        assert!(persistence.saved().is_empty());
    }

    #[test]
    fn test_load_always_notifies() {
        let mut store = AreaStore::default();
        assert_eq!(store.load().unwrap(), 0);
        assert_eq!(store.take_events(), vec![AreaEvent::AreasChanged]);
    }

    #[test]
    fn test_replace_geometry_returns_previous() {
        let mut store = AreaStore::default();
        store.add(square(0.0).with_id("a"));
        let previous = store
            .replace_geometry("a", square(10.0).geometry.unwrap())
            .unwrap();
        assert!(matches!(previous, Geometry::Polygon(_)));
        assert!(store
            .replace_geometry("a", Geometry::Point(Point::new(0.0, 0.0)))
            .is_err());
        assert!(store.replace_geometry("missing", previous).is_err());
    }
}
