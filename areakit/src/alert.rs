//! Alertes destinées à l'utilisateur (non fatales)

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{error, info, warn};

/// Message affiché pour une zone invalide
pub const INVALID_AREA_MESSAGE: &str =
    "Area is invalid and cannot be used. Please check the geometry and try again.";

/// Message affiché quand la fusion échoue
pub const MERGE_FAILED_MESSAGE: &str =
    "Merging areas failed. The selected areas could not be combined.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertSeverity {
    Info,
    Warning,
    Error,
}

/// Destination des alertes
pub trait AlertSink {
    fn alert(&mut self, message: &str, severity: AlertSeverity);
}

/// Alertes envoyées dans les logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlerts;

impl AlertSink for LogAlerts {
    fn alert(&mut self, message: &str, severity: AlertSeverity) {
        match severity {
            AlertSeverity::Info => info!(alert = message),
            AlertSeverity::Warning => warn!(alert = message),
            AlertSeverity::Error => error!(alert = message),
        }
    }
}

/// Alertes mémorisées (clonable pour les inspecter)
#[derive(Debug, Default, Clone)]
pub struct RecordedAlerts {
    messages: Rc<RefCell<Vec<(String, AlertSeverity)>>>,
}

impl RecordedAlerts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(String, AlertSeverity)> {
        self.messages.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.borrow().is_empty()
    }
}

impl AlertSink for RecordedAlerts {
    fn alert(&mut self, message: &str, severity: AlertSeverity) {
        self.messages.borrow_mut().push((message.to_string(), severity));
    }
}
