//! Application health gauge
//!
//! Healthy means the ledger file was readable on the last load and the
//! metrics exporter is not known to have failed.

use std::sync::atomic::{AtomicBool, Ordering};

use super::registry::InstrumentHandle;

/// Health component that can flip the gauge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthComponent {
    Data,
    Exporter,
}

pub struct Health {
    gauge: InstrumentHandle,
    data_ok: AtomicBool,
    exporter_ok: AtomicBool,
}

impl Health {
    /// Start healthy and publish 1
    pub fn new(gauge: InstrumentHandle) -> Self {
        let health = Self {
            gauge,
            data_ok: AtomicBool::new(true),
            exporter_ok: AtomicBool::new(true),
        };
        health.publish();
        health
    }

    pub fn set(&self, component: HealthComponent, ok: bool) {
        let flag = match component {
            HealthComponent::Data => &self.data_ok,
            HealthComponent::Exporter => &self.exporter_ok,
        };
        flag.store(ok, Ordering::SeqCst);
        self.publish();
    }

    pub fn is_healthy(&self) -> bool {
        self.data_ok.load(Ordering::SeqCst) && self.exporter_ok.load(Ordering::SeqCst)
    }

    fn publish(&self) {
        self.gauge.set(&[], if self.is_healthy() { 1.0 } else { 0.0 });
    }
}
