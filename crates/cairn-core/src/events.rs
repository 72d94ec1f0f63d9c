//! Change notifications and the sinks that fan them out.
//!
//! The coordinator publishes one [`PlanEvent`] per mutated step followed by
//! one plan event, in the order operations are applied to a plan. Delivery is
//! best effort: a sink may drop events when nobody listens, and the store
//! remains the source of truth.

use log::trace;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::models::{Plan, Step};

/// A transport-agnostic change notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlanEvent {
    /// A plan was created together with its initial steps
    #[serde(rename = "plan:created")]
    PlanCreated { plan: Plan, steps: Vec<Step> },
    /// A plan changed
    #[serde(rename = "plan:updated")]
    PlanUpdated { plan: Plan },
    /// A step was inserted by a revision
    #[serde(rename = "step:created")]
    StepCreated { step: Step },
    /// A step changed
    #[serde(rename = "step:updated")]
    StepUpdated { step: Step },
}

impl PlanEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            PlanEvent::PlanCreated { .. } => "plan:created",
            PlanEvent::PlanUpdated { .. } => "plan:updated",
            PlanEvent::StepCreated { .. } => "step:created",
            PlanEvent::StepUpdated { .. } => "step:updated",
        }
    }

    /// Id of the plan the event belongs to.
    pub fn plan_id(&self) -> &str {
        match self {
            PlanEvent::PlanCreated { plan, .. } | PlanEvent::PlanUpdated { plan } => &plan.id,
            PlanEvent::StepCreated { step } | PlanEvent::StepUpdated { step } => &step.plan_id,
        }
    }
}

/// Destination for change notifications.
pub trait BroadcastSink: Send + Sync {
    /// Publishes one event. Must not block and must not fail the caller.
    fn publish(&self, event: &PlanEvent);
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl BroadcastSink for NoopSink {
    fn publish(&self, event: &PlanEvent) {
        trace!("dropping {} for plan {}", event.name(), event.plan_id());
    }
}

/// In-process sink backed by a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: broadcast::Sender<PlanEvent>,
}

impl ChannelSink {
    /// Create a sink whose subscribers buffer up to `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<PlanEvent> {
        self.tx.subscribe()
    }
}

impl Default for ChannelSink {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl BroadcastSink for ChannelSink {
    fn publish(&self, event: &PlanEvent) {
        // No receivers is not an error; the store stays authoritative.
        let _ = self.tx.send(event.clone());
    }
}
