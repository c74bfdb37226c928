//! Off-thread plugin instantiation.
//!
//! Construction of a native plugin can take seconds, so `create_async` runs it
//! on a tokio blocking worker and hands exactly one outcome to the completion
//! callback. The callback runs on the worker; callers forward the outcome to
//! their message thread before touching any host state.

use crate::description::PluginDescription;
use crate::error::{PluginError, Result};
use crate::format::FormatRegistry;
use crate::instance::PluginInstance;
use crate::protocol::AudioConfig;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;

/// An instance that has been prepared and had its buses enabled.
///
/// Only a `PreparedInstance` can be installed into the wrapped-instance
/// manager, so the audio path never sees an unprepared instance.
pub struct PreparedInstance {
    instance: Box<dyn PluginInstance>,
    config: AudioConfig,
}

impl PreparedInstance {
    /// Prepare `instance` at `config` and enable all of its buses.
    pub fn prepare(mut instance: Box<dyn PluginInstance>, config: AudioConfig) -> Self {
        instance.prepare(config.sample_rate, config.block_size);
        instance.enable_all_buses();
        Self { instance, config }
    }

    /// Re-run `prepare` with a new configuration.
    pub fn reprepare(&mut self, config: AudioConfig) {
        self.instance.prepare(config.sample_rate, config.block_size);
        self.config = config;
    }

    pub fn config(&self) -> AudioConfig {
        self.config
    }

    pub fn description(&self) -> &PluginDescription {
        self.instance.description()
    }

    pub fn instance(&self) -> &dyn PluginInstance {
        self.instance.as_ref()
    }

    pub fn instance_mut(&mut self) -> &mut dyn PluginInstance {
        self.instance.as_mut()
    }

    pub fn into_parts(self) -> (Box<dyn PluginInstance>, AudioConfig) {
        (self.instance, self.config)
    }
}

impl std::fmt::Debug for PreparedInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedInstance")
            .field("description", self.description())
            .field("config", &self.config)
            .finish()
    }
}

/// Result of one asynchronous instantiation request.
#[derive(Debug)]
pub struct InstantiationOutcome {
    /// Monotonic request id returned by `create_async`
    pub ticket: u64,
    pub description: PluginDescription,
    pub result: Result<PreparedInstance>,
}

pub struct Instantiator {
    registry: Arc<FormatRegistry>,
    runtime: Handle,
    next_ticket: AtomicU64,
}

impl Instantiator {
    pub fn new(registry: Arc<FormatRegistry>, runtime: Handle) -> Self {
        Self {
            registry,
            runtime,
            next_ticket: AtomicU64::new(1),
        }
    }

    pub fn registry(&self) -> &Arc<FormatRegistry> {
        &self.registry
    }

    /// Start instantiating `description` on a blocking worker.
    ///
    /// `on_complete` is invoked exactly once, on the worker thread, with the
    /// outcome. Returns the request's ticket.
    pub fn create_async<F>(
        &self,
        description: PluginDescription,
        sample_rate: f64,
        block_size: usize,
        on_complete: F,
    ) -> u64
    where
        F: FnOnce(InstantiationOutcome) + Send + 'static,
    {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let registry = Arc::clone(&self.registry);
        let config = AudioConfig::new(sample_rate, block_size);

        tracing::info!("Instantiating {} (ticket {})", description, ticket);

        self.runtime.spawn_blocking(move || {
            let result = build(&registry, &description, config);
            on_complete(InstantiationOutcome {
                ticket,
                description,
                result,
            });
        });

        ticket
    }

    /// Instantiate on the calling thread.
    pub fn create_blocking(
        &self,
        description: &PluginDescription,
        sample_rate: f64,
        block_size: usize,
    ) -> Result<PreparedInstance> {
        build(
            &self.registry,
            description,
            AudioConfig::new(sample_rate, block_size),
        )
    }
}

fn build(
    registry: &FormatRegistry,
    description: &PluginDescription,
    config: AudioConfig,
) -> Result<PreparedInstance> {
    // A panicking constructor must still produce an outcome.
    let created = catch_unwind(AssertUnwindSafe(|| {
        registry.instantiate(description, config.sample_rate, config.block_size)
    }));

    match created {
        Ok(Ok(instance)) => Ok(PreparedInstance::prepare(instance, config)),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(PluginError::Instantiation {
            format: description.format.clone(),
            plugin: description.unique_id.clone(),
            reason: "constructor panicked".into(),
        }),
    }
}
