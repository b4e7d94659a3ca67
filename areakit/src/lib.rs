//! # areakit
//!
//! Gestion des zones spatiales (Areas) et de leur usage dans les requêtes
//! de couches.
//!
//! ## Features
//!
//! - Validation et normalisation des géométries (cercles, lignes tamponnées,
//!   réparation des polygones auto-intersectés, antiméridien)
//! - Store ordonné des zones avec rendu carte et sauvegarde différée
//! - Commandes réversibles (afficher/masquer, ajouter, supprimer, modifier)
//! - Menu contextuel spatial traduisant les actions en commandes
//! - Import/export GeoJSON et WKB
//!
//! ## Usage
//!
//! ```rust,ignore
//! use areakit::{AddOptions, AreaCommand, CommandHistory, CommandProcessor, SpatialContext};
//!
//! let mut ctx = SpatialContext::default();
//! let mut history = CommandHistory::default();
//!
//! let area = areakit::Area::new(polygon);
//! history.add_command(AreaCommand::add(&area, AddOptions::include()).into(), &mut ctx);
//! assert_eq!(ctx.store.len(), 1);
//! history.undo(&mut ctx);
//! ```

pub mod alert;
pub mod command;
pub mod context;
pub mod error;
pub mod geojson;
pub mod hash;
pub mod map;
pub mod menu;
pub mod merge;
pub mod modify;
pub mod projection;
pub mod query;
pub mod store;
pub mod types;
pub mod validate;

pub use alert::{AlertSeverity, AlertSink, LogAlerts, RecordedAlerts};
pub use command::history::{CommandHistory, CommandProcessor};
pub use command::{AddOptions, AreaCommand, AreaCommandKind, Command, CommandState, SequenceCommand};
pub use context::SpatialContext;
pub use error::AreaError;
pub use map::{MapView, MemoryMap};
pub use menu::{ContextItem, MenuEvent, MenuTarget, SpatialMenu};
pub use merge::MergeOptions;
pub use modify::{ModifyOp, ModifyRequest};
pub use query::{InMemoryLedger, QueryLedger};
pub use store::{AreaEvent, AreaStore, StoreSettings};
pub use types::{Area, AreaStyle, QueryEntry, ALL_LAYERS};
pub use validate::ValidateSettings;
