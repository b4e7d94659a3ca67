//! Rapport d'opération sur l'espace de travail
//!
//! Agrège les notifications du store et les alertes émises pendant une
//! commande, pour affichage ou sauvegarde JSON.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use areakit::{AlertSeverity, AreaEvent, RecordedAlerts};
use serde::Serialize;

/// Statut global de l'opération
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OperationStatus {
    /// Opération réussie sans alerte
    Success,
    /// Opération réussie avec des zones rejetées
    PartialSuccess,
    /// Rien n'a été appliqué
    Failed,
}

/// Alerte rapportée
#[derive(Debug, Clone, Serialize)]
pub struct ReportedAlert {
    pub level: String,
    pub message: String,
}

/// Rapport d'une commande
#[derive(Debug, Clone, Serialize)]
pub struct OperationReport {
    /// Sous-commande exécutée
    pub operation: String,
    pub duration_secs: f64,
    pub status: OperationStatus,

    pub areas_added: usize,
    pub areas_updated: usize,
    pub areas_removed: usize,
    pub areas_toggled: usize,
    /// Changement global (import en masse, vidage)
    pub bulk_change: bool,

    /// Titre de la commande annulable soumise, le cas échéant
    pub command: Option<String>,

    pub alerts: Vec<ReportedAlert>,
}

impl OperationReport {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            duration_secs: 0.0,
            status: OperationStatus::Success,
            areas_added: 0,
            areas_updated: 0,
            areas_removed: 0,
            areas_toggled: 0,
            bulk_change: false,
            command: None,
            alerts: Vec::new(),
        }
    }

    /// Comptabilise les notifications du store
    pub fn record_events(&mut self, events: &[AreaEvent]) {
        for event in events {
            match event {
                AreaEvent::Added(_) => self.areas_added += 1,
                AreaEvent::Updated(_) => self.areas_updated += 1,
                AreaEvent::Removed(_) => self.areas_removed += 1,
                AreaEvent::Toggled { .. } => self.areas_toggled += 1,
                AreaEvent::AreasChanged => self.bulk_change = true,
                AreaEvent::Highlighted(_) | AreaEvent::StyleChanged(_) => {}
            }
        }
    }

    pub fn record_alerts(&mut self, alerts: &RecordedAlerts) {
        self.alerts.extend(alerts.messages().into_iter().map(|(message, severity)| {
            ReportedAlert {
                level: severity_label(severity).to_string(),
                message,
            }
        }));
    }

    pub fn record_command(&mut self, title: String) {
        self.command = Some(title);
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    fn has_changes(&self) -> bool {
        self.areas_added + self.areas_updated + self.areas_removed + self.areas_toggled > 0
            || self.bulk_change
            || self.command.is_some()
    }

    /// Détermine le statut final
    pub fn finalize(&mut self) {
        let has_alerts = !self.alerts.is_empty();
        self.status = match (has_alerts, self.has_changes()) {
            (false, _) => OperationStatus::Success,
            (true, true) => OperationStatus::PartialSuccess,
            (true, false) => OperationStatus::Failed,
        };
    }

    /// Affichage compact
    pub fn summary(&self) -> String {
        format!(
            "{}: {} added, {} updated, {} removed, {} toggled, {} alerts",
            self.operation,
            self.areas_added,
            self.areas_updated,
            self.areas_removed,
            self.areas_toggled,
            self.alerts.len()
        )
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("{}", self.summary());
        if let Some(command) = &self.command {
            println!("  command: {}", command);
        }
        for alert in &self.alerts {
            println!("  [{}] {}", alert.level, alert.message);
        }
        if self.status != OperationStatus::Success {
            println!("  status: {:?}", self.status);
        }
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

fn severity_label(severity: AlertSeverity) -> &'static str {
    match severity {
        AlertSeverity::Info => "info",
        AlertSeverity::Warning => "warning",
        AlertSeverity::Error => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use areakit::AlertSink;

    #[test]
    fn test_record_events() {
        let mut report = OperationReport::new("import");
        report.record_events(&[
            AreaEvent::Added("a".to_string()),
            AreaEvent::Added("b".to_string()),
            AreaEvent::Removed("a".to_string()),
            AreaEvent::StyleChanged("b".to_string()),
        ]);
        assert_eq!(report.areas_added, 2);
        assert_eq!(report.areas_removed, 1);
        assert!(report.summary().contains("2 added"));
    }

    #[test]
    fn test_finalize_partial_success() {
        let mut alerts = RecordedAlerts::new();
        alerts.alert("1 of 2 areas are invalid", AlertSeverity::Warning);

        let mut report = OperationReport::new("import");
        report.record_events(&[AreaEvent::AreasChanged]);
        report.record_alerts(&alerts);
        report.finalize();
        assert_eq!(report.status, OperationStatus::PartialSuccess);
        assert_eq!(report.alerts[0].level, "warning");
    }

    #[test]
    fn test_finalize_failed() {
        let mut alerts = RecordedAlerts::new();
        alerts.alert("Merging areas failed", AlertSeverity::Error);

        let mut report = OperationReport::new("merge");
        report.record_alerts(&alerts);
        report.finalize();
        assert_eq!(report.status, OperationStatus::Failed);
    }

    #[test]
    fn test_finalize_success() {
        let mut report = OperationReport::new("toggle");
        report.record_events(&[AreaEvent::Toggled {
            id: "a".to_string(),
            shown: false,
        }]);
        report.finalize();
        assert_eq!(report.status, OperationStatus::Success);
    }
}
