//! Scripted capability used by tests.

use super::{Capability, CapabilityRequest, OutputContract};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

type Responder = Box<dyn Fn(&CapabilityRequest) -> Result<String> + Send + Sync>;
type Latency = Box<dyn Fn(&CapabilityRequest) -> Duration + Send + Sync>;

/// Answers every call through a closure and records what it was asked.
pub(crate) struct ScriptedCapability {
    responder: Responder,
    latency: Option<Latency>,
    calls: Mutex<Vec<CapabilityRequest>>,
}

impl ScriptedCapability {
    pub(crate) fn new<F>(responder: F) -> Self
    where
        F: Fn(&CapabilityRequest) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            latency: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Delay each answer by a per-request duration.
    pub(crate) fn with_latency<F>(mut self, latency: F) -> Self
    where
        F: Fn(&CapabilityRequest) -> Duration + Send + Sync + 'static,
    {
        self.latency = Some(Box::new(latency));
        self
    }

    pub(crate) fn calls(&self) -> Vec<CapabilityRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls whose declared structured output is `name`.
    pub(crate) fn calls_for(&self, name: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| output_name(c) == Some(name))
            .count()
    }
}

/// Name of the structured output a request declares, if any.
pub(crate) fn output_name(request: &CapabilityRequest) -> Option<&str> {
    match &request.output {
        OutputContract::Json { name, .. } => Some(name.as_str()),
        OutputContract::Text => None,
    }
}

#[async_trait]
impl Capability for ScriptedCapability {
    async fn invoke(&self, request: &CapabilityRequest) -> Result<String> {
        self.calls.lock().unwrap().push(request.clone());
        if let Some(latency) = &self.latency {
            tokio::time::sleep(latency(request)).await;
        }
        (self.responder)(request)
    }
}
