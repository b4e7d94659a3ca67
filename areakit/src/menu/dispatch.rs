//! Ouverture du menu et traduction des événements en commandes

use std::cell::RefCell;
use std::rc::Rc;

use geo::Geometry;
use tracing::{debug, info, warn};

use super::layers::{update_temporary_items, LayerCatalog};
use super::predicates::MenuEnv;
use super::tree::MenuItem;
use super::{default_menu, normalize_context, ContextItem, MenuAction, MenuEvent, MenuTarget};
use crate::command::{AddOptions, AreaCommand, Command, CommandProcessor};
use crate::context::SpatialContext;
use crate::types::{Area, ALL_LAYERS};
use crate::AreaError;

/// Lancement de l'outil de modification
#[derive(Debug, Clone, PartialEq)]
pub enum ModifyLaunch {
    /// Zone du store à modifier; l'outil est choisi dans la boîte de dialogue
    Existing { target: Area },
    /// Forme dessinée servant d'outil; la cible est choisie dans la boîte
    WithShape { shape: Geometry },
    /// Entité d'une source modifiable
    Source { layer_id: String, feature: Area },
}

/// Demandes adressées à l'interface (boîtes de dialogue)
#[derive(Debug, Clone, PartialEq)]
pub enum DialogRequest {
    /// Création ou édition des détails d'une zone
    Edit {
        area: Area,
        /// Couche d'origine quand l'entité provient d'une source chargée
        source_layer: Option<String>,
    },
    Modify(ModifyLaunch),
    Merge(Vec<Area>),
    Export(Vec<Area>),
    FeatureInfo(Vec<ContextItem>),
    /// Choix libre des couches avant de rejouer `event`
    ChooseLayers { event: MenuEvent },
}

/// Boîtes de dialogue de l'application
pub trait AreaDialogs {
    fn open(&mut self, request: DialogRequest);
}

/// Actions de sélection sur les entités des couches
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionRequest {
    Select {
        layer_ids: Vec<String>,
        geometry: Geometry,
        exclusive: bool,
    },
    Deselect {
        layer_ids: Vec<String>,
        geometry: Geometry,
    },
    RemoveFeatures {
        layer_ids: Vec<String>,
        geometry: Geometry,
    },
}

pub trait FeatureSelection {
    fn apply(&mut self, request: SelectionRequest);
}

/// Fournisseur de recherche
pub trait SearchProvider {
    fn id(&self) -> &str;

    fn supports_geo_search(&self) -> bool;

    fn search_area(&mut self, geometry: &Geometry);
}

/// Collecteur partagé des demandes émises (interface en ligne de commande, tests)
#[derive(Debug)]
pub struct Recorder<T> {
    requests: Rc<RefCell<Vec<T>>>,
}

impl<T> Default for Recorder<T> {
    fn default() -> Self {
        Self {
            requests: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            requests: Rc::clone(&self.requests),
        }
    }
}

impl<T: Clone> Recorder<T> {
    pub fn requests(&self) -> Vec<T> {
        self.requests.borrow().clone()
    }

    pub fn take(&self) -> Vec<T> {
        std::mem::take(&mut *self.requests.borrow_mut())
    }
}

impl AreaDialogs for Recorder<DialogRequest> {
    fn open(&mut self, request: DialogRequest) {
        self.requests.borrow_mut().push(request);
    }
}

impl FeatureSelection for Recorder<SelectionRequest> {
    fn apply(&mut self, request: SelectionRequest) {
        self.requests.borrow_mut().push(request);
    }
}

/// Collaborateur par défaut: les demandes sont journalisées puis ignorées
#[derive(Debug, Default, Clone, Copy)]
struct Unhandled;

impl AreaDialogs for Unhandled {
    fn open(&mut self, request: DialogRequest) {
        debug!(?request, "No dialog handler registered, request dropped");
    }
}

impl FeatureSelection for Unhandled {
    fn apply(&mut self, request: SelectionRequest) {
        debug!(?request, "No selection handler registered, request dropped");
    }
}

/// Résultat du traitement d'un événement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MenuOutcome {
    pub handled: bool,
    /// Le menu doit être fermé
    pub close_menu: bool,
    /// Une commande a été soumise au processeur
    pub submitted: bool,
}

/// Menu spatial: arbre, contexte courant et collaborateurs
pub struct SpatialMenu {
    root: MenuItem,
    layers: Box<dyn LayerCatalog>,
    dialogs: Box<dyn AreaDialogs>,
    selection: Box<dyn FeatureSelection>,
    search: Vec<Box<dyn SearchProvider>>,
    context: Vec<ContextItem>,
    position: Option<(f64, f64)>,
}

impl SpatialMenu {
    pub fn new(layers: impl LayerCatalog + 'static) -> Self {
        Self {
            root: default_menu(),
            layers: Box::new(layers),
            dialogs: Box::new(Unhandled),
            selection: Box::new(Unhandled),
            search: Vec::new(),
            context: Vec::new(),
            position: None,
        }
    }

    pub fn with_dialogs(mut self, dialogs: impl AreaDialogs + 'static) -> Self {
        self.dialogs = Box::new(dialogs);
        self
    }

    pub fn with_selection(mut self, selection: impl FeatureSelection + 'static) -> Self {
        self.selection = Box::new(selection);
        self
    }

    pub fn add_search_provider(&mut self, provider: impl SearchProvider + 'static) {
        self.search.push(Box::new(provider));
    }

    pub fn root(&self) -> &MenuItem {
        &self.root
    }

    pub fn context(&self) -> &[ContextItem] {
        &self.context
    }

    pub fn position(&self) -> Option<(f64, f64)> {
        self.position
    }

    pub fn is_open(&self) -> bool {
        !self.context.is_empty()
    }

    pub fn close(&mut self) {
        self.context.clear();
        self.position = None;
    }

    fn geo_search(&self) -> bool {
        self.search.iter().any(|p| p.supports_geo_search())
    }

    /// Ouvre le menu sur les cibles données; refuse un contexte vide
    pub fn open(
        &mut self,
        targets: Vec<MenuTarget>,
        position: Option<(f64, f64)>,
        ctx: &SpatialContext,
    ) -> Result<&MenuItem, AreaError> {
        let items = normalize_context(targets, &ctx.store);
        if items.is_empty() {
            return Err(AreaError::EmptyContext);
        }

        update_temporary_items(&mut self.root, &items, self.layers.as_ref());
        let env = MenuEnv {
            items: &items,
            store: &ctx.store,
            layers: self.layers.as_ref(),
            geo_search: self.geo_search(),
        };
        self.root.before_render(&env);

        debug!(items = items.len(), "Spatial menu opened");
        self.context = items;
        self.position = position;
        Ok(&self.root)
    }

    /// Événements visibles pour le contexte courant
    pub fn visible_events(&self) -> Vec<MenuEvent> {
        if self.is_open() {
            self.root.visible_events()
        } else {
            Vec::new()
        }
    }

    /// Déclenche l'action d'un élément du menu
    pub fn activate(
        &mut self,
        action: &MenuAction,
        ctx: &mut SpatialContext,
        processor: &mut dyn CommandProcessor,
    ) -> MenuOutcome {
        match action {
            MenuAction::Event(event) => self.on_menu_event(*event, None, ctx, processor),
            MenuAction::Scoped { event, layer_ids } => {
                self.on_menu_event(*event, Some(layer_ids.clone()), ctx, processor)
            }
            MenuAction::CustomLayers { event } => {
                // Le menu reste ouvert: la réponse arrive par `on_layers_chosen`
                self.dialogs.open(DialogRequest::ChooseLayers { event: *event });
                MenuOutcome {
                    handled: true,
                    close_menu: false,
                    submitted: false,
                }
            }
        }
    }

    /// Suite du choix libre des couches
    pub fn on_layers_chosen(
        &mut self,
        event: MenuEvent,
        layer_ids: Vec<String>,
        ctx: &mut SpatialContext,
        processor: &mut dyn CommandProcessor,
    ) -> MenuOutcome {
        if layer_ids.is_empty() {
            return MenuOutcome::default();
        }
        self.on_menu_event(event, Some(layer_ids), ctx, processor)
    }

    /// Traite un événement sur le contexte courant
    pub fn on_menu_event(
        &mut self,
        event: MenuEvent,
        layer_ids: Option<Vec<String>>,
        ctx: &mut SpatialContext,
        processor: &mut dyn CommandProcessor,
    ) -> MenuOutcome {
        if self.context.is_empty() {
            warn!(event = %event, "Menu event without context");
            return MenuOutcome::default();
        }

        let layer_ids = layer_ids
            .filter(|ids| !ids.is_empty())
            .unwrap_or_else(|| vec![ALL_LAYERS.to_string()]);
        let items = self.context.clone();

        let mut commands: Vec<Command> = Vec::new();
        let mut touched: Vec<Area> = Vec::new();
        let mut features: Vec<Area> = Vec::new();

        for item in &items {
            let Some(geometry) = item.geometry().cloned() else {
                continue;
            };
            let mut feature = item
                .feature
                .clone()
                .unwrap_or_else(|| Area::new(geometry.clone()));
            let in_store = ctx.store.contains(&feature.id);

            match event {
                MenuEvent::Load | MenuEvent::Add | MenuEvent::Exclude | MenuEvent::AddExclude => {
                    if !in_store {
                        ctx.store.prepare(&mut feature);
                        feature.shown = true;
                    }
                    let options = match event {
                        MenuEvent::Load | MenuEvent::Add => AddOptions::include(),
                        _ => AddOptions::exclude(),
                    }
                    .append(matches!(event, MenuEvent::Add | MenuEvent::AddExclude))
                    .layers(layer_ids.clone());
                    commands.push(AreaCommand::add(&feature, options).into());
                    touched.push(feature);
                }
                MenuEvent::Save | MenuEvent::Edit => {
                    let source_layer = item
                        .layer_id
                        .clone()
                        .filter(|id| self.layers.get_layer(id).is_some());
                    self.dialogs.open(DialogRequest::Edit {
                        area: feature,
                        source_layer,
                    });
                }
                MenuEvent::Enable | MenuEvent::Disable if in_store => {
                    commands.push(AreaCommand::toggle(&feature, event == MenuEvent::Enable).into());
                }
                MenuEvent::RemoveArea if in_store => {
                    commands.push(AreaCommand::remove(&feature).into());
                }
                MenuEvent::ModifyArea => {
                    let modifiable = item
                        .layer_id
                        .as_deref()
                        .and_then(|id| self.layers.get_layer(id))
                        .and_then(|l| l.as_modifiable())
                        .map_or(false, |s| s.supports_modify());
                    let launch = match (&item.layer_id, in_store) {
                        (Some(layer_id), false) if modifiable => ModifyLaunch::Source {
                            layer_id: layer_id.clone(),
                            feature,
                        },
                        (_, true) => ModifyLaunch::Existing { target: feature },
                        _ => ModifyLaunch::WithShape { shape: geometry },
                    };
                    self.dialogs.open(DialogRequest::Modify(launch));
                }
                MenuEvent::MergeAreas | MenuEvent::Export => {
                    if in_store {
                        features.push(feature);
                    }
                }
                MenuEvent::FeatureInfo => {}
                MenuEvent::Select | MenuEvent::SelectExclusive => {
                    self.selection.apply(SelectionRequest::Select {
                        layer_ids: layer_ids.clone(),
                        geometry,
                        exclusive: event == MenuEvent::SelectExclusive,
                    });
                }
                MenuEvent::Deselect => {
                    self.selection.apply(SelectionRequest::Deselect {
                        layer_ids: layer_ids.clone(),
                        geometry,
                    });
                }
                MenuEvent::Remove => {
                    self.selection.apply(SelectionRequest::RemoveFeatures {
                        layer_ids: layer_ids.clone(),
                        geometry,
                    });
                }
                MenuEvent::Search => {
                    match self.search.iter_mut().find(|p| p.supports_geo_search()) {
                        Some(provider) => provider.search_area(&geometry),
                        None => warn!("No geographic search provider"),
                    }
                }
                MenuEvent::Enable | MenuEvent::Disable | MenuEvent::RemoveArea => {
                    debug!(area_id = %feature.id, event = %event, "Ignoring item outside the store");
                }
            }
        }

        match event {
            MenuEvent::MergeAreas if !features.is_empty() => {
                self.dialogs.open(DialogRequest::Merge(features));
            }
            MenuEvent::Export if !features.is_empty() => {
                self.dialogs.open(DialogRequest::Export(features));
            }
            MenuEvent::FeatureInfo => self.dialogs.open(DialogRequest::FeatureInfo(items)),
            _ => {}
        }

        if event.is_query() {
            commands = self.with_visibility_updates(event, commands, &touched, ctx);
        }

        let replace = matches!(event, MenuEvent::Load | MenuEvent::Exclude);
        let submitted = match Command::batch(commands, replace) {
            Some(command) => {
                info!(event = %event, title = %command.title(), "Submitting menu command");
                processor.add_command(command, ctx)
            }
            None => false,
        };

        MenuOutcome {
            handled: true,
            close_menu: event != MenuEvent::Export,
            submitted,
        }
    }

    /// Bascules de visibilité accompagnant une requête:
    /// - les zones touchées déjà dans le store et masquées sont affichées
    /// - pour LOAD/EXCLUDE, les autres zones affichées du même type sont masquées
    ///
    /// Les bascules précèdent les ajouts: le titre de la séquence reste celui
    /// du dernier ajout.
    fn with_visibility_updates(
        &self,
        event: MenuEvent,
        adds: Vec<Command>,
        touched: &[Area],
        ctx: &SpatialContext,
    ) -> Vec<Command> {
        let mut commands: Vec<Command> = Vec::new();
        let touched_ids: Vec<&str> = touched.iter().map(|a| a.id.as_str()).collect();

        let hide_inclusions = event == MenuEvent::Load;
        let hide_exclusions = event == MenuEvent::Exclude;
        if hide_inclusions || hide_exclusions {
            for area in ctx.store.get_all() {
                if !area.shown || touched_ids.contains(&area.id.as_str()) {
                    continue;
                }
                let same_kind = (hide_inclusions && ctx.ledger.is_inclusion(&area.id))
                    || (hide_exclusions && ctx.ledger.is_exclusion(&area.id));
                if same_kind {
                    commands.push(AreaCommand::toggle(area, false).into());
                }
            }
        }

        for area in touched {
            if let Some(stored) = ctx.store.get(&area.id) {
                if !stored.shown {
                    commands.push(AreaCommand::toggle(stored, true).into());
                }
            }
        }

        commands.extend(adds);
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::history::CommandHistory;
    use crate::menu::layers::{LayerInfo, StaticLayers};
    use geo::{polygon, Geometry};

    fn square(x: f64) -> Geometry {
        polygon![(x: x, y: 0.0), (x: x + 1.0, y: 0.0), (x: x + 1.0, y: 1.0), (x: x, y: 1.0)].into()
    }

    struct GeoSearch(Rc<RefCell<usize>>);

    impl SearchProvider for GeoSearch {
        fn id(&self) -> &str {
            "geo"
        }

        fn supports_geo_search(&self) -> bool {
            true
        }

        fn search_area(&mut self, _geometry: &Geometry) {
            *self.0.borrow_mut() += 1;
        }
    }

    #[test]
    fn test_open_refuses_empty_context() {
        let ctx = SpatialContext::default();
        let mut menu = SpatialMenu::new(StaticLayers::default());
        assert!(matches!(menu.open(vec![], None, &ctx), Err(AreaError::EmptyContext)));
        assert!(!menu.is_open());
    }

    #[test]
    fn test_drawn_polygon_menu() {
        let ctx = SpatialContext::default();
        let mut menu = SpatialMenu::new(StaticLayers::default());
        menu.open(
            vec![MenuTarget::Item(ContextItem::from_geometry(square(0.0)))],
            Some((10.0, 20.0)),
            &ctx,
        )
        .unwrap();

        let events = menu.visible_events();
        assert!(events.contains(&MenuEvent::Load));
        assert!(events.contains(&MenuEvent::Save));
        assert!(!events.contains(&MenuEvent::RemoveArea));
        assert!(!events.contains(&MenuEvent::Search));
        assert_eq!(menu.position(), Some((10.0, 20.0)));
    }

    #[test]
    fn test_dialog_event_without_handler_submits_nothing() {
        let mut ctx = SpatialContext::default();
        let mut history = CommandHistory::default();
        let mut menu = SpatialMenu::new(StaticLayers::default());
        menu.open(
            vec![MenuTarget::Item(ContextItem::from_geometry(square(0.0)))],
            None,
            &ctx,
        )
        .unwrap();

        let outcome = menu.on_menu_event(MenuEvent::Save, None, &mut ctx, &mut history);
        assert!(outcome.handled);
        assert!(!outcome.submitted);
        assert!(ctx.store.is_empty());
    }

    #[test]
    fn test_add_creates_area_and_entry() {
        let mut ctx = SpatialContext::default();
        let mut history = CommandHistory::default();
        let mut menu = SpatialMenu::new(StaticLayers::default());
        menu.open(
            vec![MenuTarget::Item(ContextItem::from_geometry(square(0.0)))],
            None,
            &ctx,
        )
        .unwrap();

        let outcome = menu.on_menu_event(MenuEvent::Add, None, &mut ctx, &mut history);
        assert!(outcome.submitted);
        assert!(outcome.close_menu);
        assert_eq!(ctx.store.len(), 1);
        let id = ctx.store.get_all()[0].id.clone();
        assert!(ctx.ledger.is_inclusion(&id));
    }

    #[test]
    fn test_scoped_action_uses_layer_ids() {
        let mut ctx = SpatialContext::default();
        let mut history = CommandHistory::default();
        let layers = StaticLayers::new(vec![
            LayerInfo::new("l1", "Roads").of_type("Feature"),
            LayerInfo::new("l2", "Rivers").of_type("Feature"),
        ]);
        let mut menu = SpatialMenu::new(layers);
        menu.open(
            vec![MenuTarget::Item(ContextItem::from_geometry(square(0.0)))],
            None,
            &ctx,
        )
        .unwrap();

        let action = menu
            .root()
            .find("Feature (2)")
            .and_then(|i| i.action.clone())
            .unwrap();
        menu.activate(&action, &mut ctx, &mut history);

        let entries = ctx.ledger.get_entries(None, None, None, true);
        let mut layers: Vec<_> = entries.iter().map(|e| e.layer_id.as_str()).collect();
        layers.sort();
        assert_eq!(layers, vec!["l1", "l2"]);
    }

    #[test]
    fn test_custom_layers_defers_to_dialog() {
        let mut ctx = SpatialContext::default();
        let mut history = CommandHistory::default();
        let dialogs = Recorder::<DialogRequest>::default();
        let mut menu = SpatialMenu::new(StaticLayers::default()).with_dialogs(dialogs.clone());
        menu.open(
            vec![MenuTarget::Item(ContextItem::from_geometry(square(0.0)))],
            None,
            &ctx,
        )
        .unwrap();

        let outcome = menu.activate(
            &MenuAction::CustomLayers {
                event: MenuEvent::AddExclude,
            },
            &mut ctx,
            &mut history,
        );
        assert!(!outcome.close_menu);
        assert_eq!(
            dialogs.requests(),
            vec![DialogRequest::ChooseLayers {
                event: MenuEvent::AddExclude
            }]
        );

        menu.on_layers_chosen(MenuEvent::AddExclude, vec!["l9".to_string()], &mut ctx, &mut history);
        let id = ctx.store.get_all()[0].id.clone();
        assert!(ctx.ledger.is_exclusion(&id));
    }

    #[test]
    fn test_export_keeps_menu_open() {
        let mut ctx = SpatialContext::default();
        assert!(ctx.store.add(Area::new(square(0.0)).with_id("a")));
        let mut history = CommandHistory::default();
        let dialogs = Recorder::<DialogRequest>::default();
        let mut menu = SpatialMenu::new(StaticLayers::default()).with_dialogs(dialogs.clone());
        menu.open(vec![MenuTarget::AreaNode("a".to_string())], None, &ctx)
            .unwrap();

        let outcome = menu.on_menu_event(MenuEvent::Export, None, &mut ctx, &mut history);
        assert!(!outcome.close_menu);
        assert!(matches!(&dialogs.requests()[..], [DialogRequest::Export(areas)] if areas.len() == 1));
    }

    #[test]
    fn test_selection_and_search_collaborators() {
        let mut ctx = SpatialContext::default();
        let mut history = CommandHistory::default();
        let selection = Recorder::<SelectionRequest>::default();
        let hits = Rc::new(RefCell::new(0));
        let mut menu = SpatialMenu::new(StaticLayers::default()).with_selection(selection.clone());
        menu.add_search_provider(GeoSearch(Rc::clone(&hits)));
        menu.open(
            vec![MenuTarget::Item(ContextItem::from_geometry(square(0.0)))],
            None,
            &ctx,
        )
        .unwrap();
        assert!(menu.visible_events().contains(&MenuEvent::Search));

        menu.on_menu_event(MenuEvent::SelectExclusive, None, &mut ctx, &mut history);
        menu.on_menu_event(MenuEvent::Search, None, &mut ctx, &mut history);

        assert!(matches!(
            &selection.requests()[..],
            [SelectionRequest::Select { exclusive: true, .. }]
        ));
        assert_eq!(*hits.borrow(), 1);
        assert!(history.is_empty());
    }

    #[test]
    fn test_disable_enable_store_area() {
        let mut ctx = SpatialContext::default();
        assert!(ctx.store.add(Area::new(square(0.0)).with_id("a")));
        let mut history = CommandHistory::default();
        let mut menu = SpatialMenu::new(StaticLayers::default());

        menu.open(vec![MenuTarget::AreaNode("a".to_string())], None, &ctx)
            .unwrap();
        assert!(menu.visible_events().contains(&MenuEvent::Disable));
        menu.on_menu_event(MenuEvent::Disable, None, &mut ctx, &mut history);
        assert!(!ctx.store.get("a").unwrap().shown);

        menu.open(vec![MenuTarget::AreaNode("a".to_string())], None, &ctx)
            .unwrap();
        let events = menu.visible_events();
        assert!(events.contains(&MenuEvent::Enable));
        assert!(!events.contains(&MenuEvent::Disable));
    }
}
