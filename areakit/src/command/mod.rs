//! Commandes réversibles sur le store et le registre de requêtes
//!
//! Chaque mutation qui touche à la fois le store et le registre passe par une
//! commande, ce qui garantit un `revert` cohérent. Les interactions en
//! plusieurs étapes sont regroupées dans une `SequenceCommand`.

pub mod history;

use std::fmt;

use geo::Geometry;
use tracing::{debug, warn};

use crate::context::SpatialContext;
use crate::hash::same_geometry;
use crate::types::{Area, QueryEntry, ALL_LAYERS};
use crate::AreaError;

pub use history::{CommandHistory, CommandProcessor};

/// Propriétés recopiées depuis une feature importée (le reste est ignoré)
pub const ADD_ALLOWED_PROPERTIES: &[&str] = &["name", "interpolation", "interpolationSegments"];

/// État d'une commande
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    Ready,
    Executing,
    Success,
    Error,
    Reverting,
}

impl fmt::Display for CommandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ready => "ready",
            Self::Executing => "executing",
            Self::Success => "success",
            Self::Error => "error",
            Self::Reverting => "reverting",
        };
        f.write_str(name)
    }
}

/// Options d'ajout d'une zone
#[derive(Debug, Clone)]
pub struct AddOptions {
    /// Some(true) = inclusion, Some(false) = exclusion, None = simple ajout
    pub query: Option<bool>,

    /// false: remplace les zones de même type sur les couches ciblées
    pub append: bool,

    /// Couches ciblées (`*` par défaut)
    pub layer_ids: Vec<String>,
}

impl Default for AddOptions {
    fn default() -> Self {
        Self {
            query: None,
            append: true,
            layer_ids: vec![ALL_LAYERS.to_string()],
        }
    }
}

impl AddOptions {
    pub fn include() -> Self {
        Self {
            query: Some(true),
            ..Default::default()
        }
    }

    pub fn exclude() -> Self {
        Self {
            query: Some(false),
            ..Default::default()
        }
    }

    pub fn append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    pub fn layers(mut self, layer_ids: Vec<String>) -> Self {
        if !layer_ids.is_empty() {
            self.layer_ids = layer_ids;
        }
        self
    }
}

/// Variante de commande et données propres à chaque variante
#[derive(Debug, Clone)]
pub enum AreaCommandKind {
    Toggle {
        show: bool,
    },
    Add {
        options: AddOptions,
        /// Entrées retirées à l'exécution, restaurées au revert
        captured: Vec<QueryEntry>,
        added_entries: Vec<QueryEntry>,
        /// La zone a été insérée par cette commande
        added_area: bool,
    },
    Remove {
        captured: Vec<QueryEntry>,
    },
    Modify {
        geometry: Geometry,
        previous: Option<Geometry>,
    },
}

/// Commande portant sur une zone
#[derive(Debug, Clone)]
pub struct AreaCommand {
    area: Area,
    kind: AreaCommandKind,
    state: CommandState,
}

impl AreaCommand {
    pub fn toggle(area: &Area, show: bool) -> Self {
        Self::with_kind(area.clone(), AreaCommandKind::Toggle { show })
    }

    /// Ajout: la zone est recopiée en ne gardant que les champs sûrs
    pub fn add(area: &Area, options: AddOptions) -> Self {
        Self::with_kind(
            restricted_copy(area),
            AreaCommandKind::Add {
                options,
                captured: Vec::new(),
                added_entries: Vec::new(),
                added_area: false,
            },
        )
    }

    pub fn remove(area: &Area) -> Self {
        Self::with_kind(area.clone(), AreaCommandKind::Remove { captured: Vec::new() })
    }

    pub fn modify(area: &Area, geometry: Geometry) -> Self {
        Self::with_kind(
            area.clone(),
            AreaCommandKind::Modify {
                geometry,
                previous: None,
            },
        )
    }

    fn with_kind(area: Area, kind: AreaCommandKind) -> Self {
        Self {
            area,
            kind,
            state: CommandState::Ready,
        }
    }

    pub fn area(&self) -> &Area {
        &self.area
    }

    pub fn kind(&self) -> &AreaCommandKind {
        &self.kind
    }

    pub fn state(&self) -> CommandState {
        self.state
    }

    pub fn can_execute(&self) -> bool {
        self.state == CommandState::Ready
    }

    pub fn title(&self) -> String {
        let name = self.area.display_title();
        match &self.kind {
            AreaCommandKind::Toggle { show: true } => format!("Show area \"{name}\""),
            AreaCommandKind::Toggle { show: false } => format!("Hide area \"{name}\""),
            AreaCommandKind::Add { options, .. } => match options.query {
                Some(true) => format!("Add inclusion area \"{name}\""),
                Some(false) => format!("Add exclusion area \"{name}\""),
                None => format!("Add area \"{name}\""),
            },
            AreaCommandKind::Remove { .. } => format!("Remove area \"{name}\""),
            AreaCommandKind::Modify { .. } => format!("Modify area \"{name}\""),
        }
    }

    fn check(&self, action: &'static str, expected: CommandState) -> Result<(), AreaError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(AreaError::CommandState {
                title: self.title(),
                action,
                state: self.state.to_string(),
            })
        }
    }

    pub fn execute(&mut self, ctx: &mut SpatialContext) -> bool {
        if let Err(e) = self.check("execute", CommandState::Ready) {
            warn!(error = %e, "Command not executed");
            return false;
        }
        self.state = CommandState::Executing;

        let ok = match &mut self.kind {
            AreaCommandKind::Toggle { show } => toggle_area(ctx, &self.area.id, *show),
            AreaCommandKind::Add {
                options,
                captured,
                added_entries,
                added_area,
            } => execute_add(ctx, &mut self.area, options, captured, added_entries, added_area),
            AreaCommandKind::Remove { captured } => execute_remove(ctx, &mut self.area, captured),
            AreaCommandKind::Modify { geometry, previous } => {
                execute_modify(ctx, &self.area.id, geometry, previous)
            }
        };

        ctx.refresh_styles();
        self.state = if ok {
            CommandState::Success
        } else {
            CommandState::Error
        };
        debug!(title = %self.title(), ok, "Command executed");
        ok
    }

    pub fn revert(&mut self, ctx: &mut SpatialContext) -> bool {
        if let Err(e) = self.check("revert", CommandState::Success) {
            warn!(error = %e, "Command not reverted");
            return false;
        }
        self.state = CommandState::Reverting;

        let ok = match &mut self.kind {
            AreaCommandKind::Toggle { show } => toggle_area(ctx, &self.area.id, !*show),
            AreaCommandKind::Add {
                captured,
                added_entries,
                added_area,
                ..
            } => {
                ctx.ledger.remove_entries_arr(added_entries);
                ctx.ledger.add_entries(captured);
                if *added_area {
                    ctx.store.remove(&self.area.id);
                }
                added_entries.clear();
                captured.clear();
                *added_area = false;
                true
            }
            AreaCommandKind::Remove { captured } => {
                let restored = ctx.store.try_add(self.area.clone()).is_ok();
                if restored {
                    ctx.ledger.add_entries(captured);
                    captured.clear();
                }
                restored
            }
            AreaCommandKind::Modify { previous, .. } => match previous.take() {
                Some(old) => ctx.store.replace_geometry(&self.area.id, old).is_ok(),
                None => true,
            },
        };

        ctx.refresh_styles();
        self.state = if ok {
            CommandState::Ready
        } else {
            CommandState::Error
        };
        debug!(title = %self.title(), ok, "Command reverted");
        ok
    }
}

fn toggle_area(ctx: &mut SpatialContext, id: &str, show: bool) -> bool {
    if !ctx.store.contains(id) {
        warn!(area_id = %id, "Cannot toggle unknown area");
        return false;
    }
    ctx.store.toggle(id, Some(show));
    true
}

fn execute_add(
    ctx: &mut SpatialContext,
    area: &mut Area,
    options: &AddOptions,
    captured: &mut Vec<QueryEntry>,
    added_entries: &mut Vec<QueryEntry>,
    added_area: &mut bool,
) -> bool {
    // Identifiant attribué une fois: il reste stable entre undo et redo
    ctx.store.prepare(area);
    let id = area.id.clone();

    captured.clear();
    added_entries.clear();
    *added_area = false;

    if let Some(include) = options.query {
        captured.extend(ctx.ledger.get_entries(None, Some(&id), None, true));
        if !options.append {
            for layer in &options.layer_ids {
                for entry in ctx.ledger.get_entries(Some(layer), None, None, true) {
                    if entry.area_id != id && entry.include_area == include && !captured.contains(&entry) {
                        captured.push(entry);
                    }
                }
            }
        }
        ctx.ledger.remove_entries_arr(captured);
    }

    if !ctx.store.contains(&id) {
        match ctx.store.try_add(area.clone()) {
            Ok(inserted) => *added_area = inserted,
            Err(e) => {
                warn!(area_id = %id, error = %e, "Area add failed");
                ctx.ledger.add_entries(captured);
                captured.clear();
                return false;
            }
        }
    }

    if let Some(include) = options.query {
        for layer in &options.layer_ids {
            ctx.ledger.add_entry(layer, &id, None, include);
            added_entries.push(QueryEntry::new(layer.as_str(), id.as_str(), include));
        }
    }
    true
}

fn execute_remove(ctx: &mut SpatialContext, area: &mut Area, captured: &mut Vec<QueryEntry>) -> bool {
    let Some(current) = ctx.store.get(&area.id) else {
        warn!(area_id = %area.id, "Cannot remove unknown area");
        return false;
    };
    // Instantané de l'état courant pour le revert
    *area = current.clone();

    *captured = ctx.ledger.get_entries(None, Some(&area.id), None, true);
    ctx.ledger.remove_entries_arr(captured);
    ctx.store.remove(&area.id).is_some()
}

fn execute_modify(
    ctx: &mut SpatialContext,
    id: &str,
    geometry: &Geometry,
    previous: &mut Option<Geometry>,
) -> bool {
    let unchanged = ctx
        .store
        .get(id)
        .and_then(|a| a.geometry.as_ref())
        .map_or(false, |current| same_geometry(current, geometry));
    if unchanged {
        debug!(area_id = %id, "Geometry unchanged, nothing to modify");
        *previous = None;
        return ctx.store.contains(id);
    }

    match ctx.store.replace_geometry(id, geometry.clone()) {
        Ok(old) => {
            *previous = Some(old);
            true
        }
        Err(e) => {
            warn!(area_id = %id, error = %e, "Area modify failed");
            false
        }
    }
}

/// Copie d'une zone limitée aux champs sûrs (pas d'état de la source d'origine)
fn restricted_copy(area: &Area) -> Area {
    Area {
        id: area.id.clone(),
        title: area.title.clone(),
        description: area.description.clone(),
        tags: area.tags.clone(),
        geometry: area.geometry.clone(),
        original_geometry: area.original_geometry.clone(),
        radius: area.radius,
        properties: area
            .properties
            .iter()
            .filter(|(k, _)| ADD_ALLOWED_PROPERTIES.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        temporary: area.temporary,
        shown: area.shown,
        normalized: area.normalized,
        ..Default::default()
    }
}

/// Suite ordonnée de commandes exécutée comme une seule
#[derive(Debug, Clone)]
pub struct SequenceCommand {
    commands: Vec<Command>,
    state: CommandState,
    replace: bool,
}

impl SequenceCommand {
    pub fn new(commands: Vec<Command>) -> Self {
        Self {
            commands,
            state: CommandState::Ready,
            replace: false,
        }
    }

    /// Sémantique "remplacer": le titre passe de "Add" à "Set"
    pub fn with_replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn state(&self) -> CommandState {
        self.state
    }

    pub fn can_execute(&self) -> bool {
        self.state == CommandState::Ready && !self.commands.is_empty()
    }

    pub fn title(&self) -> String {
        let title = self
            .commands
            .last()
            .map(Command::title)
            .unwrap_or_else(|| "Empty sequence".to_string());
        if self.replace && self.commands.len() > 1 {
            title.replacen("Add", "Set", 1)
        } else {
            title
        }
    }

    /// Exécute dans l'ordre; en cas d'échec annule ce qui a déjà été exécuté
    pub fn execute(&mut self, ctx: &mut SpatialContext) -> bool {
        if !self.can_execute() {
            warn!(state = %self.state, "Sequence not executed");
            return false;
        }
        self.state = CommandState::Executing;

        for i in 0..self.commands.len() {
            if !self.commands[i].execute(ctx) {
                warn!(index = i, title = %self.commands[i].title(), "Sequence step failed, rolling back");
                for done in self.commands[..i].iter_mut().rev() {
                    done.revert(ctx);
                }
                self.state = CommandState::Error;
                return false;
            }
        }

        self.state = CommandState::Success;
        true
    }

    pub fn revert(&mut self, ctx: &mut SpatialContext) -> bool {
        if self.state != CommandState::Success {
            warn!(state = %self.state, "Sequence not reverted");
            return false;
        }
        self.state = CommandState::Reverting;

        let mut ok = true;
        for command in self.commands.iter_mut().rev() {
            ok &= command.revert(ctx);
        }

        self.state = if ok {
            CommandState::Ready
        } else {
            CommandState::Error
        };
        ok
    }
}

/// Commande soumise au processeur de commandes
#[derive(Debug, Clone)]
pub enum Command {
    Area(AreaCommand),
    Sequence(SequenceCommand),
}

impl Command {
    /// Une seule commande telle quelle, plusieurs dans une séquence
    pub fn batch(mut commands: Vec<Command>, replace: bool) -> Option<Command> {
        match commands.len() {
            0 => None,
            1 => commands.pop(),
            _ => Some(Command::Sequence(
                SequenceCommand::new(commands).with_replace(replace),
            )),
        }
    }

    pub fn execute(&mut self, ctx: &mut SpatialContext) -> bool {
        match self {
            Self::Area(c) => c.execute(ctx),
            Self::Sequence(c) => c.execute(ctx),
        }
    }

    pub fn revert(&mut self, ctx: &mut SpatialContext) -> bool {
        match self {
            Self::Area(c) => c.revert(ctx),
            Self::Sequence(c) => c.revert(ctx),
        }
    }

    pub fn can_execute(&self) -> bool {
        match self {
            Self::Area(c) => c.can_execute(),
            Self::Sequence(c) => c.can_execute(),
        }
    }

    pub fn state(&self) -> CommandState {
        match self {
            Self::Area(c) => c.state(),
            Self::Sequence(c) => c.state(),
        }
    }

    pub fn title(&self) -> String {
        match self {
            Self::Area(c) => c.title(),
            Self::Sequence(c) => c.title(),
        }
    }
}

impl From<AreaCommand> for Command {
    fn from(c: AreaCommand) -> Self {
        Self::Area(c)
    }
}

impl From<SequenceCommand> for Command {
    fn from(c: SequenceCommand) -> Self {
        Self::Sequence(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Point};

    fn square(id: &str, x: f64) -> Area {
        Area::new(polygon![
            (x: x, y: 0.0),
            (x: x + 1.0, y: 0.0),
            (x: x + 1.0, y: 1.0),
            (x: x, y: 1.0),
        ])
        .with_id(id)
        .with_title(id.to_uppercase())
    }

    fn sorted_entries(ctx: &SpatialContext) -> Vec<QueryEntry> {
        let mut entries = ctx.ledger().get_entries(None, None, None, true);
        entries.sort_by(|a, b| (&a.area_id, &a.layer_id).cmp(&(&b.area_id, &b.layer_id)));
        entries
    }

    #[test]
    fn test_toggle_execute_revert() {
        let mut ctx = SpatialContext::default();
        ctx.store.add(square("a", 0.0));

        let mut cmd = AreaCommand::toggle(&square("a", 0.0), false);
        assert!(cmd.execute(&mut ctx));
        assert!(!ctx.store.get("a").unwrap().shown);
        assert!(!cmd.execute(&mut ctx));

        assert!(cmd.revert(&mut ctx));
        assert!(ctx.store.get("a").unwrap().shown);
        assert!(!cmd.revert(&mut ctx));
    }

    #[test]
    fn test_revert_before_execute_is_noop() {
        let mut ctx = SpatialContext::default();
        let mut cmd = AreaCommand::remove(&square("a", 0.0));
        assert!(!cmd.revert(&mut ctx));
        assert_eq!(cmd.state(), CommandState::Ready);
    }

    #[test]
    fn test_add_include_and_revert_restores_entries() {
        let mut ctx = SpatialContext::default();
        ctx.ledger_mut().add_entry("layer1", "other", None, true);
        let before = sorted_entries(&ctx);

        let mut cmd = AreaCommand::add(&square("a", 0.0), AddOptions::include());
        assert!(cmd.execute(&mut ctx));
        assert!(ctx.store.contains("a"));
        assert!(ctx.ledger().is_inclusion("a"));
        assert_eq!(cmd.title(), "Add inclusion area \"A\"");

        assert!(cmd.revert(&mut ctx));
        assert!(!ctx.store.contains("a"));
        assert_eq!(sorted_entries(&ctx), before);
    }

    #[test]
    fn test_add_never_removes_preexisting_area() {
        let mut ctx = SpatialContext::default();
        ctx.store.add(square("a", 0.0));
        ctx.ledger_mut().add_entry("layer1", "a", None, false);

        let mut cmd = AreaCommand::add(&square("a", 0.0), AddOptions::include());
        assert!(cmd.execute(&mut ctx));
        assert!(ctx.ledger().is_inclusion("a"));
        assert!(!ctx.ledger().is_exclusion("a"));

        assert!(cmd.revert(&mut ctx));
        assert!(ctx.store.contains("a"));
        assert!(ctx.ledger().is_exclusion("a"));
        assert!(!ctx.ledger().is_inclusion("a"));
    }

    #[test]
    fn test_add_replace_clears_other_inclusions() {
        let mut ctx = SpatialContext::default();
        ctx.store.add(square("old", 5.0));
        ctx.ledger_mut().add_entry("*", "old", None, true);
        ctx.ledger_mut().add_entry("*", "excl", None, false);

        let mut cmd = AreaCommand::add(&square("new", 0.0), AddOptions::include().append(false));
        assert!(cmd.execute(&mut ctx));
        assert!(!ctx.ledger().is_inclusion("old"));
        assert!(ctx.ledger().is_exclusion("excl"));

        assert!(cmd.revert(&mut ctx));
        assert!(ctx.ledger().is_inclusion("old"));
    }

    #[test]
    fn test_add_drops_unlisted_properties() {
        let mut area = square("a", 0.0);
        area.properties.insert("name".into(), "n".into());
        area.properties.insert("sourceState".into(), "live".into());
        let cmd = AreaCommand::add(&area, AddOptions::default());
        assert!(cmd.area().properties.contains_key("name"));
        assert!(!cmd.area().properties.contains_key("sourceState"));
    }

    #[test]
    fn test_add_invalid_geometry_fails_cleanly() {
        let mut ctx = SpatialContext::default();
        ctx.ledger_mut().add_entry("*", "bad", None, false);
        let before = sorted_entries(&ctx);

        let bad = Area::new(Point::new(0.0, 0.0)).with_id("bad");
        let mut cmd = AreaCommand::add(&bad, AddOptions::include());
        assert!(!cmd.execute(&mut ctx));
        assert_eq!(cmd.state(), CommandState::Error);
        assert!(ctx.store.is_empty());
        assert_eq!(sorted_entries(&ctx), before);
    }

    #[test]
    fn test_remove_and_revert() {
        let mut ctx = SpatialContext::default();
        ctx.store.add(square("a", 0.0));
        ctx.ledger_mut().add_entry("l1", "a", None, true);

        let mut cmd = AreaCommand::remove(&square("a", 0.0));
        assert!(cmd.execute(&mut ctx));
        assert!(!ctx.store.contains("a"));
        assert!(ctx.ledger().get_entries(None, Some("a"), None, true).is_empty());

        assert!(cmd.revert(&mut ctx));
        assert!(ctx.store.contains("a"));
        assert!(ctx.ledger().is_inclusion("a"));
    }

    #[test]
    fn test_modify_and_revert() {
        let mut ctx = SpatialContext::default();
        ctx.store.add(square("a", 0.0));
        let original = ctx.store.get("a").unwrap().geometry.clone().unwrap();

        let target = square("a", 10.0).geometry.unwrap();
        let mut cmd = AreaCommand::modify(&square("a", 0.0), target);
        assert!(cmd.execute(&mut ctx));
        assert!(!same_geometry(ctx.store.get("a").unwrap().geometry.as_ref().unwrap(), &original));

        assert!(cmd.revert(&mut ctx));
        assert!(same_geometry(ctx.store.get("a").unwrap().geometry.as_ref().unwrap(), &original));
    }

    #[test]
    fn test_sequence_rolls_back_on_failure() {
        let mut ctx = SpatialContext::default();
        let commands: Vec<Command> = vec![
            AreaCommand::add(&square("a", 0.0), AddOptions::include()).into(),
            AreaCommand::toggle(&square("missing", 0.0), true).into(),
        ];
        let mut seq = SequenceCommand::new(commands);
        assert!(!seq.execute(&mut ctx));
        assert!(ctx.store.is_empty());
        assert!(ctx.ledger().get_entries(None, None, None, true).is_empty());
        assert_eq!(seq.state(), CommandState::Error);
    }

    #[test]
    fn test_sequence_title_replace() {
        let commands: Vec<Command> = vec![
            AreaCommand::toggle(&square("b", 0.0), false).into(),
            AreaCommand::add(&square("a", 0.0), AddOptions::include()).into(),
        ];
        let seq = SequenceCommand::new(commands).with_replace(true);
        assert_eq!(seq.title(), "Set inclusion area \"A\"");
    }

    #[test]
    fn test_batch() {
        assert!(Command::batch(vec![], false).is_none());
        let one = Command::batch(vec![AreaCommand::toggle(&square("a", 0.0), true).into()], false);
        assert!(matches!(one, Some(Command::Area(_))));
    }
}
