//! Arbre des éléments de menu

use super::predicates::{MenuEnv, Visibility};
use super::{MenuAction, MenuEvent};

/// Type d'élément
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuItemType {
    Root,
    Item,
    Separator,
    Group,
    Submenu,
    Check,
    Radio,
}

/// Élément de menu; la visibilité est recalculée avant chaque affichage
#[derive(Debug, Clone)]
pub struct MenuItem {
    pub item_type: MenuItemType,
    pub label: String,
    pub action: Option<MenuAction>,
    pub tooltip: Option<String>,
    pub metric_key: Option<String>,
    pub sort: i32,
    pub visible: bool,
    pub enabled: bool,
    pub selected: bool,
    /// Prédicats qui doivent tous être vrais pour afficher l'élément
    pub visibility: Vec<Visibility>,
    pub children: Vec<MenuItem>,
}

/// Clé de dédoublonnage des enfants
type ItemKey<'a> = (
    MenuItemType,
    Option<&'static str>,
    &'a str,
    Option<&'a str>,
    Option<&'a str>,
    i32,
);

impl MenuItem {
    pub fn new(item_type: MenuItemType, label: impl Into<String>) -> Self {
        Self {
            item_type,
            label: label.into(),
            action: None,
            tooltip: None,
            metric_key: None,
            sort: 0,
            visible: true,
            enabled: true,
            selected: false,
            visibility: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn root() -> Self {
        Self::new(MenuItemType::Root, "")
    }

    pub fn group(label: impl Into<String>, sort: i32) -> Self {
        Self::new(MenuItemType::Group, label).sort(sort)
    }

    pub fn submenu(label: impl Into<String>, sort: i32) -> Self {
        Self::new(MenuItemType::Submenu, label).sort(sort)
    }

    pub fn separator(sort: i32) -> Self {
        Self::new(MenuItemType::Separator, "").sort(sort)
    }

    /// Élément déclenchant un événement
    pub fn event(label: impl Into<String>, event: MenuEvent) -> Self {
        let mut item = Self::new(MenuItemType::Item, label);
        item.metric_key = Some(format!("spatial.menu.{}", event.as_str()));
        item.action = Some(MenuAction::Event(event));
        item
    }

    pub fn action(mut self, action: MenuAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    pub fn sort(mut self, sort: i32) -> Self {
        self.sort = sort;
        self
    }

    pub fn visible_if(mut self, predicates: &[Visibility]) -> Self {
        self.visibility.extend_from_slice(predicates);
        self
    }

    pub fn with_children(mut self, children: Vec<MenuItem>) -> Self {
        for child in children {
            self.add_child(child);
        }
        self
    }

    fn key(&self) -> ItemKey<'_> {
        (
            self.item_type,
            self.action.as_ref().map(|a| a.event().as_str()),
            self.label.as_str(),
            self.metric_key.as_deref(),
            self.tooltip.as_deref(),
            self.sort,
        )
    }

    /// Ajoute un enfant; un enfant de même clé est remplacé
    pub fn add_child(&mut self, child: MenuItem) {
        match self.children.iter().position(|c| c.key() == child.key()) {
            Some(i) => self.children[i] = child,
            None => {
                self.children.push(child);
                self.children.sort_by_key(|c| c.sort);
            }
        }
    }

    /// Retire les enfants directs portant ce libellé
    pub fn remove_child(&mut self, label: &str) -> usize {
        let before = self.children.len();
        self.children.retain(|c| c.label != label);
        before - self.children.len()
    }

    /// Recherche en profondeur par libellé
    pub fn find(&self, label: &str) -> Option<&MenuItem> {
        if self.label == label {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(label))
    }

    pub fn find_mut(&mut self, label: &str) -> Option<&mut MenuItem> {
        if self.label == label {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(label))
    }

    /// Recherche l'élément déclenchant directement cet événement
    pub fn find_event(&self, event: MenuEvent) -> Option<&MenuItem> {
        if matches!(self.action, Some(MenuAction::Event(e)) if e == event) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_event(event))
    }

    /// Recalcule `visible` pour tout le sous-arbre.
    ///
    /// Un groupe ou sous-menu sans enfant visible est masqué.
    pub fn before_render(&mut self, env: &MenuEnv<'_>) {
        for child in self.children.iter_mut() {
            child.before_render(env);
        }

        let own = self.visibility.iter().all(|v| v.evaluate(env));
        self.visible = match self.item_type {
            MenuItemType::Group | MenuItemType::Submenu => {
                own && self.children.iter().any(|c| c.visible && c.item_type != MenuItemType::Separator)
            }
            _ => own,
        };
    }

    /// Événements des éléments visibles (ordre d'affichage)
    pub fn visible_events(&self) -> Vec<MenuEvent> {
        let mut events = Vec::new();
        self.collect_visible(&mut events);
        events
    }

    fn collect_visible(&self, events: &mut Vec<MenuEvent>) {
        if !self.visible {
            return;
        }
        if let Some(MenuAction::Event(e)) = &self.action {
            events.push(*e);
        }
        for child in &self.children {
            child.collect_visible(events);
        }
    }
}
