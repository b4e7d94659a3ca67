//! Historique undo/redo des commandes

use std::collections::VecDeque;

use tracing::{debug, warn};

use super::Command;
use crate::context::SpatialContext;

/// Nombre de commandes conservées par défaut
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Processeur de commandes: exécute puis empile dans l'historique
pub trait CommandProcessor {
    fn add_command(&mut self, command: Command, ctx: &mut SpatialContext) -> bool;
}

/// Historique borné
#[derive(Debug)]
pub struct CommandHistory {
    undo_stack: VecDeque<Command>,
    redo_stack: Vec<Command>,
    limit: usize,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl CommandHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            limit: limit.max(1),
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Titres de l'historique, du plus ancien au plus récent
    pub fn titles(&self) -> Vec<String> {
        self.undo_stack.iter().map(Command::title).collect()
    }

    pub fn len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }

    /// Annule la dernière commande
    pub fn undo(&mut self, ctx: &mut SpatialContext) -> bool {
        let Some(mut command) = self.undo_stack.pop_back() else {
            return false;
        };
        if command.revert(ctx) {
            debug!(title = %command.title(), "Undo");
            self.redo_stack.push(command);
            true
        } else {
            warn!(title = %command.title(), "Undo failed, command dropped from history");
            false
        }
    }

    /// Rejoue la dernière commande annulée
    pub fn redo(&mut self, ctx: &mut SpatialContext) -> bool {
        let Some(mut command) = self.redo_stack.pop() else {
            return false;
        };
        if command.execute(ctx) {
            debug!(title = %command.title(), "Redo");
            self.push(command);
            true
        } else {
            warn!(title = %command.title(), "Redo failed, command dropped from history");
            false
        }
    }

    fn push(&mut self, command: Command) {
        self.undo_stack.push_back(command);
        while self.undo_stack.len() > self.limit {
            self.undo_stack.pop_front();
        }
    }
}

impl CommandProcessor for CommandHistory {
    fn add_command(&mut self, mut command: Command, ctx: &mut SpatialContext) -> bool {
        if !command.execute(ctx) {
            return false;
        }
        self.push(command);
        self.redo_stack.clear();
        true
    }
}
