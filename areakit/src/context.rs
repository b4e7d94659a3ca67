//! Racine de composition: store des zones + registre de requêtes
//!
//! Les commandes et le menu reçoivent ce contexte explicitement; aucun état
//! global n'est lu dans la logique métier.

use crate::query::{InMemoryLedger, QueryLedger};
use crate::store::AreaStore;
use crate::types::Area;

pub struct SpatialContext {
    pub store: AreaStore,
    pub ledger: Box<dyn QueryLedger>,
}

impl Default for SpatialContext {
    fn default() -> Self {
        Self::new(AreaStore::default(), InMemoryLedger::new())
    }
}

impl SpatialContext {
    pub fn new(store: AreaStore, ledger: impl QueryLedger + 'static) -> Self {
        Self {
            store,
            ledger: Box::new(ledger),
        }
    }

    pub fn ledger(&self) -> &dyn QueryLedger {
        self.ledger.as_ref()
    }

    pub fn ledger_mut(&mut self) -> &mut dyn QueryLedger {
        self.ledger.as_mut()
    }

    /// Répercute les changements du registre sur les styles (si la carte écoute)
    pub fn refresh_styles(&mut self) -> usize {
        self.store.sync_with_ledger(self.ledger.as_ref())
    }

    pub fn clear(&mut self) -> Vec<Area> {
        self.store.clear(self.ledger.as_mut())
    }

    pub fn clear_temp(&mut self) -> Vec<Area> {
        self.store.clear_temp(self.ledger.as_mut())
    }
}
