//! Separating one-shot queries from fence registrations.

use log::trace;

use crate::glob::is_glob;
use crate::search::target::SearchDescriptor;

/// A roam target: proximity to other moving objects rather than a fixed
/// shape. The geometry is resolved later, by the fence subsystem.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RoamDescriptor {
    pub on: bool,
    pub key: String,
    pub id: String,
    pub pattern: bool,
    pub meters: f64,
    pub scan: Option<String>,
}

impl RoamDescriptor {
    pub fn new(key: String, id: String, meters: f64, scan: Option<String>) -> Self {
        Self {
            on: true,
            pattern: is_glob(&id),
            key,
            id,
            meters,
            scan,
        }
    }
}

/// The signal that a command must become a persistent subscription.
///
/// It owns the resolved descriptor, including any evaluator resources, so
/// the fence subsystem takes over their release.
#[derive(Debug)]
pub struct LiveFence {
    descriptor: SearchDescriptor,
}

impl LiveFence {
    pub fn descriptor(&self) -> &SearchDescriptor {
        &self.descriptor
    }

    pub fn roam(&self) -> Option<&RoamDescriptor> {
        self.descriptor.roam()
    }

    pub fn into_descriptor(self) -> SearchDescriptor {
        self.descriptor
    }
}

/// Where a resolved descriptor goes next.
#[derive(Debug)]
pub enum Classified {
    Immediate(SearchDescriptor),
    Live(LiveFence),
}

/// Routes fence requests away from the executor.
pub fn classify(descriptor: SearchDescriptor) -> Classified {
    if descriptor.is_fence() {
        trace!(
            "{} {} going live (roam: {})",
            descriptor.command(),
            descriptor.key(),
            descriptor.roam().is_some()
        );
        Classified::Live(LiveFence { descriptor })
    } else {
        Classified::Immediate(descriptor)
    }
}
