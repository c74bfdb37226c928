//! Ownership of the single wrapped instance.
//!
//! The manager lives on the message thread. It publishes the live instance to
//! the audio thread through an `ArcSwapOption` and is the only place that
//! installs or tears down instances. Old instances are retired rather than
//! dropped immediately, and destroyed once the audio thread no longer holds a
//! reference to them.

use crate::description::PluginDescription;
use crate::instance::{PluginEditor, PluginInstance};
use crate::instantiator::PreparedInstance;
use crate::protocol::{AudioConfig, ParameterInfo};
use arc_swap::ArcSwapOption;
use crossbeam::queue::ArrayQueue;
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const PARAMETER_QUEUE_SIZE: usize = 1024;

/// How long dropping the manager waits for the audio thread to let go of
/// retired slots.
const TEARDOWN_WAIT: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
struct ParameterChange {
    index: usize,
    value: f32,
}

/// Published container for the live instance.
///
/// Parameter writes from the message thread go through a lock-free queue
/// that whoever next holds the instance lock applies, so they never wait on
/// a block in progress.
pub struct InstanceSlot {
    instance: Mutex<Box<dyn PluginInstance>>,
    ready: AtomicBool,
    description: PluginDescription,
    config: Mutex<AudioConfig>,
    parameters: Vec<ParameterInfo>,
    pending: ArrayQueue<ParameterChange>,
}

impl InstanceSlot {
    fn new(instance: Box<dyn PluginInstance>, config: AudioConfig) -> Self {
        let description = instance.description().clone();
        let parameters = instance.parameters();
        Self {
            instance: Mutex::new(instance),
            ready: AtomicBool::new(false),
            description,
            config: Mutex::new(config),
            parameters,
            pending: ArrayQueue::new(PARAMETER_QUEUE_SIZE),
        }
    }

    /// True when the instance is prepared and may be processed.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    pub fn description(&self) -> &PluginDescription {
        &self.description
    }

    pub fn config(&self) -> AudioConfig {
        *self.config.lock()
    }

    /// Non-blocking lock for the audio thread.
    #[inline]
    pub fn try_lock(&self) -> Option<MutexGuard<'_, Box<dyn PluginInstance>>> {
        self.instance.try_lock()
    }

    /// Blocking lock. Queued parameter writes are applied before it returns.
    pub fn lock(&self) -> MutexGuard<'_, Box<dyn PluginInstance>> {
        let mut guard = self.instance.lock();
        self.apply_pending(&mut **guard);
        guard
    }

    /// Parameters reported by the instance when it was installed.
    pub fn parameters(&self) -> &[ParameterInfo] {
        &self.parameters
    }

    /// Index of the first parameter named exactly `name`.
    pub fn parameter_index(&self, name: &str) -> Option<usize> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.index)
    }

    /// Queue a parameter write without touching the instance lock.
    /// Returns false if the queue is full.
    pub fn queue_parameter(&self, index: usize, value: f32) -> bool {
        self.pending.push(ParameterChange { index, value }).is_ok()
    }

    /// Apply queued parameter writes, oldest first. The caller holds the lock.
    #[inline]
    pub fn apply_pending(&self, instance: &mut dyn PluginInstance) {
        while let Some(change) = self.pending.pop() {
            instance.set_parameter(change.index, change.value);
        }
    }
}

struct Retired {
    slot: Arc<InstanceSlot>,
    editor: Option<Box<dyn PluginEditor>>,
}

pub struct WrappedInstanceManager {
    published: Arc<ArcSwapOption<InstanceSlot>>,
    editor: Option<Box<dyn PluginEditor>>,
    retired: Vec<Retired>,
}

impl WrappedInstanceManager {
    pub fn new() -> Self {
        Self {
            published: Arc::new(ArcSwapOption::empty()),
            editor: None,
            retired: Vec::new(),
        }
    }

    /// Shared publication point read by `AudioDispatcher`.
    pub fn published(&self) -> Arc<ArcSwapOption<InstanceSlot>> {
        Arc::clone(&self.published)
    }

    /// Install `prepared` as the live instance, replacing any previous one.
    ///
    /// `config` is the host's current audio configuration; the instance is
    /// prepared again if it was created with a different one.
    pub fn replace(
        &mut self,
        prepared: PreparedInstance,
        editor: Option<Box<dyn PluginEditor>>,
        config: AudioConfig,
    ) {
        let (mut instance, used) = prepared.into_parts();
        if used != config {
            tracing::debug!(
                "Re-preparing {} at {} Hz / {} (was {} Hz / {})",
                instance.description(),
                config.sample_rate,
                config.block_size,
                used.sample_rate,
                used.block_size
            );
            instance.prepare(config.sample_rate, config.block_size);
        }

        let slot = Arc::new(InstanceSlot::new(instance, config));
        slot.set_ready(true);
        tracing::info!("Installed wrapped instance {}", slot.description());

        let old = self.published.swap(Some(slot));
        let old_editor = std::mem::replace(&mut self.editor, editor);
        self.retire(old, old_editor);
        self.collect_retired();
    }

    /// Tear down the live instance, if any.
    pub fn clear(&mut self) {
        let old = self.published.swap(None);
        let old_editor = self.editor.take();
        self.retire(old, old_editor);
        self.collect_retired();
    }

    /// Unpublished slots are released here, on the calling thread, and kept
    /// until the audio thread drops its last reference.
    fn retire(&mut self, slot: Option<Arc<InstanceSlot>>, editor: Option<Box<dyn PluginEditor>>) {
        match slot {
            Some(slot) => {
                slot.set_ready(false);
                slot.lock().release();
                self.retired.push(Retired { slot, editor });
            }
            None => drop(editor),
        }
    }

    /// Destroy retired instances the audio thread no longer references.
    /// Returns the number still pending.
    pub fn collect_retired(&mut self) -> usize {
        let pending = std::mem::take(&mut self.retired);
        for retired in pending {
            if Arc::strong_count(&retired.slot) > 1 {
                self.retired.push(retired);
                continue;
            }
            let Retired { slot, editor } = retired;
            tracing::debug!("Destroying wrapped instance {}", slot.description());
            drop(slot);
            drop(editor);
        }
        self.retired.len()
    }

    pub fn current(&self) -> Option<Arc<InstanceSlot>> {
        self.published.load_full()
    }

    pub fn has_instance(&self) -> bool {
        self.published.load().is_some()
    }

    pub fn description(&self) -> Option<PluginDescription> {
        self.current().map(|slot| slot.description().clone())
    }

    pub fn editor(&self) -> Option<&dyn PluginEditor> {
        self.editor.as_deref()
    }

    /// Run `f` with the live instance locked. Returns `None` without an instance.
    pub fn with_instance<R>(&self, f: impl FnOnce(&mut dyn PluginInstance) -> R) -> Option<R> {
        let slot = self.current()?;
        let mut guard = slot.lock();
        Some(f(&mut **guard))
    }

    /// Set the first parameter named exactly `name` without waiting on the
    /// audio thread. Returns false without an instance or a matching name.
    pub fn set_parameter_by_name(&self, name: &str, value: f32) -> bool {
        let Some(slot) = self.current() else {
            return false;
        };
        let Some(index) = slot.parameter_index(name) else {
            return false;
        };
        if !slot.queue_parameter(index, value) {
            tracing::debug!("Parameter queue full, applying {} directly", name);
            slot.lock().set_parameter(index, value);
        }
        true
    }

    /// Current value of the first parameter named exactly `name`.
    pub fn get_parameter_by_name(&self, name: &str) -> Option<f32> {
        let slot = self.current()?;
        let index = slot.parameter_index(name)?;
        let guard = slot.lock();
        guard.get_parameter(index)
    }

    /// Prepare the live instance for a new configuration and mark it ready.
    pub fn prepare(&self, config: AudioConfig) {
        if let Some(slot) = self.current() {
            slot.set_ready(false);
            slot.lock().prepare(config.sample_rate, config.block_size);
            *slot.config.lock() = config;
            slot.set_ready(true);
        }
    }

    /// Stop processing and release the live instance's resources.
    pub fn release(&self) {
        if let Some(slot) = self.current() {
            slot.set_ready(false);
            slot.lock().release();
        }
    }

    pub fn reset(&self) {
        if let Some(slot) = self.current() {
            slot.lock().reset();
        }
    }

    pub fn retired_count(&self) -> usize {
        self.retired.len()
    }
}

impl Default for WrappedInstanceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WrappedInstanceManager {
    fn drop(&mut self) {
        self.clear();
        let deadline = Instant::now() + TEARDOWN_WAIT;
        while self.collect_retired() > 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        for retired in self.retired.drain(..) {
            tracing::debug!(
                "Wrapped instance {} still referenced at teardown",
                retired.slot.description()
            );
        }
    }
}
