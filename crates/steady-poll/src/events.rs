//! Recent-event dump for diagnosing a timed-out poll.

use serde::Serialize;
use tracing::warn;

use steady_core::{Service, ServiceId};

/// Events kept per service when a poll times out.
pub const EVENT_DUMP_LIMIT: usize = 10;

/// A service event tagged with the service that emitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentEvent {
    pub service: ServiceId,
    pub message: String,
    pub created_at: u64,
}

/// Log and collect up to `limit` events per service, in the order the API
/// reported them (newest first).
pub fn dump_events(services: &[Service], limit: usize) -> Vec<RecentEvent> {
    let mut dumped = Vec::new();
    for service in services {
        for event in service.events.iter().take(limit) {
            warn!(
                service = %service.name,
                created_at = event.created_at,
                "{}",
                event.message
            );
            dumped.push(RecentEvent {
                service: service.name.clone(),
                message: event.message.clone(),
                created_at: event.created_at,
            });
        }
    }
    dumped
}
