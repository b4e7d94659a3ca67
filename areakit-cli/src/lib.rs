//! # areakit-cli
//!
//! Gestion en ligne de commande des zones de requête spatiales.
//!
//! ## Usage CLI
//!
//! ```bash
//! # Import de zones GeoJSON dans l'espace de travail
//! areakit import parcels.geojson
//!
//! # Actions disponibles pour une sélection, puis exécution
//! areakit menu --area parcel-1
//! areakit dispatch load --area parcel-1
//!
//! # Fusion et export
//! areakit merge parcel-1 parcel-2 --replace --title "Fields"
//! areakit export --format wkb
//! ```

pub mod config;
pub mod report;
pub mod state;

pub use config::Config;
pub use report::{OperationReport, OperationStatus};
pub use state::Workspace;
