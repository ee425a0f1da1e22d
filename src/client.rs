//! Client library handle.

use crate::engine::memory::MemoryEngine;
use crate::engine::{Engine, TimeZoneRules};
use std::sync::Arc;

/// Entry point shared by every attachment made through it.
///
/// Cloning is cheap; clones share the same engine.
#[derive(Debug, Clone)]
pub struct Client {
    engine: Arc<dyn Engine>,
}

impl Client {
    /// Create a client over an engine backend.
    pub fn new(engine: impl Engine + 'static) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    /// Create a client over an already shared engine.
    pub fn from_engine(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }

    /// Create a client over a fresh in-process engine.
    ///
    /// # Example
    ///
    /// ```
    /// use fbclient_rs::{Attachment, AttachmentOptions, Client};
    ///
    /// let client = Client::memory();
    /// let options = AttachmentOptions::new().with_create_database(true);
    /// let attachment = Attachment::connect(&client, "mem:example", &options).unwrap();
    /// assert!(attachment.is_valid());
    /// ```
    pub fn memory() -> Self {
        Self::new(MemoryEngine::new())
    }

    pub fn engine(&self) -> &dyn Engine {
        self.engine.as_ref()
    }

    /// Zone rules used by zoned time conversions.
    pub fn zone_rules(&self) -> Arc<dyn TimeZoneRules> {
        self.engine.zone_rules()
    }
}
