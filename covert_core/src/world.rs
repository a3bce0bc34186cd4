//! Handles shared by every actor and manager of a run.

use crate::config::SimParams;
use crate::store::SharedStore;
use covert_env::{CovertContext, ShutdownSignal};
use std::sync::Arc;

/// RNG stream offsets so every actor and manager draws from its own stream.
pub(crate) mod streams {
    /// Members use their own id as the extension (always below this).
    pub const AGENCY: u64 = 1 << 32;
    pub const FORMATION: u64 = 1 << 33;
}

/// Everything an actor needs: context, store, parameters and the run flag.
pub struct World<C> {
    pub ctx: Arc<C>,
    pub store: Arc<SharedStore>,
    pub params: Arc<SimParams>,
    pub shutdown: ShutdownSignal,
}

impl<C> Clone for World<C> {
    fn clone(&self) -> Self {
        Self {
            ctx: Arc::clone(&self.ctx),
            store: Arc::clone(&self.store),
            params: Arc::clone(&self.params),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<C: CovertContext> World<C> {
    /// Creates a world with an empty store sized by `params`.
    pub fn new(ctx: Arc<C>, params: SimParams) -> Self {
        let store = Arc::new(SharedStore::new(&params));
        Self {
            ctx,
            store,
            params: Arc::new(params),
            shutdown: ShutdownSignal::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }
}
