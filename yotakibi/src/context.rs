// SPDX-License-Identifier: AGPL-3.0-or-later

use std::ops::Deref;
use std::sync::Arc;

use crate::clock::Clock;
use crate::config::Configuration;
use crate::db::SqlStore;
use crate::embers::submit::Submitter;
use crate::gate::rate_limit::IdentityLocks;
use crate::generator::EmberGenerator;
use crate::safety::SafetyPolicy;

/// Inner data shared across all services.
#[derive(Debug)]
pub struct Data {
    /// Node configuration.
    pub config: Configuration,

    /// Storage provider with database connection pool.
    pub store: SqlStore,

    /// Source of the current local time.
    pub clock: Arc<dyn Clock>,

    /// Content safety filter.
    pub safety: SafetyPolicy,

    /// Producer of generated embers, not available without API credential.
    pub generator: Option<Arc<dyn EmberGenerator>>,

    /// Locks serialising writes per identity.
    pub locks: IdentityLocks,
}

impl Data {
    pub fn new(
        store: SqlStore,
        config: Configuration,
        clock: Arc<dyn Clock>,
        safety: SafetyPolicy,
        generator: Option<Arc<dyn EmberGenerator>>,
    ) -> Self {
        Self {
            config,
            store,
            clock,
            safety,
            generator,
            locks: IdentityLocks::new(),
        }
    }

    /// Returns everything needed to accept new embers.
    pub fn submitter(&self) -> Submitter<'_, SqlStore> {
        Submitter {
            store: &self.store,
            safety: &self.safety,
            scope: self.config.safety_scope,
            locks: &self.locks,
            clock: self.clock.as_ref(),
        }
    }
}

/// Data shared across all services.
#[derive(Debug)]
pub struct Context(pub Arc<Data>);

impl Context {
    /// Returns a new instance of `Context`.
    pub fn new(
        store: SqlStore,
        config: Configuration,
        clock: Arc<dyn Clock>,
        safety: SafetyPolicy,
        generator: Option<Arc<dyn EmberGenerator>>,
    ) -> Self {
        Self(Arc::new(Data::new(store, config, clock, safety, generator)))
    }
}

impl Clone for Context {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl Deref for Context {
    type Target = Data;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}
