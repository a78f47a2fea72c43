//! Per-channel health flags.
//!
//! The channel adapter layer (an external collaborator — it owns the
//! actual socket/webhook connection) reports health here via
//! `setChannelHealth`; the orchestrator consults it before enqueueing
//! work so a known-unhealthy channel fails fast instead of queuing a
//! reply nothing will ever deliver.

use std::collections::HashMap;

use parking_lot::RwLock;

#[derive(Default)]
pub struct ChannelHealthRegistry {
    health: RwLock<HashMap<String, bool>>,
}

impl ChannelHealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A channel nothing has reported on yet is assumed healthy.
    pub fn is_healthy(&self, channel_id: &str) -> bool {
        *self.health.read().get(channel_id).unwrap_or(&true)
    }

    pub fn set_channel_health(&self, channel_id: &str, healthy: bool) {
        self.health.write().insert(channel_id.to_string(), healthy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreported_channel_is_healthy() {
        let registry = ChannelHealthRegistry::new();
        assert!(registry.is_healthy("discord:general"));
    }

    #[test]
    fn reported_unhealthy_channel_stays_unhealthy_until_reset() {
        let registry = ChannelHealthRegistry::new();
        registry.set_channel_health("discord:general", false);
        assert!(!registry.is_healthy("discord:general"));
        registry.set_channel_health("discord:general", true);
        assert!(registry.is_healthy("discord:general"));
    }
}
