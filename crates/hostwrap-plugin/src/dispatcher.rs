//! Audio-thread entry point.
//!
//! `AudioDispatcher` is the only type the audio callback touches. It reads the
//! published slot, forwards a block to the wrapped instance if it is ready and
//! its lock is free, and otherwise leaves the block untouched. Parameter
//! writes queued by the message thread are applied at the top of the block.
//! It never allocates, blocks, or logs.

use crate::manager::InstanceSlot;
use crate::protocol::{
    AudioBuffer, AudioBuffer64, AudioConfig, ControllerEvent, MidiEventVec, TransportInfo,
};
use arc_swap::ArcSwapOption;
use atomic_float::AtomicF64;
use crossbeam::queue::ArrayQueue;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

const CONTROLLER_QUEUE_SIZE: usize = 1024;

struct DispatcherShared {
    published: Arc<ArcSwapOption<InstanceSlot>>,
    sample_rate: AtomicF64,
    block_size: AtomicUsize,
    prepared: AtomicBool,
    cc_relay: AtomicBool,
    controllers: ArrayQueue<ControllerEvent>,
}

/// Cloneable handle for the audio callback.
#[derive(Clone)]
pub struct AudioDispatcher {
    shared: Arc<DispatcherShared>,
}

impl AudioDispatcher {
    pub fn new(published: Arc<ArcSwapOption<InstanceSlot>>) -> Self {
        Self::with_queue_capacity(published, CONTROLLER_QUEUE_SIZE)
    }

    pub fn with_queue_capacity(
        published: Arc<ArcSwapOption<InstanceSlot>>,
        capacity: usize,
    ) -> Self {
        let config = AudioConfig::default();
        Self {
            shared: Arc::new(DispatcherShared {
                published,
                sample_rate: AtomicF64::new(config.sample_rate),
                block_size: AtomicUsize::new(config.block_size),
                prepared: AtomicBool::new(false),
                cc_relay: AtomicBool::new(false),
                controllers: ArrayQueue::new(capacity.max(1)),
            }),
        }
    }

    /// Record the host's audio configuration. Called from `prepare_to_play`.
    pub fn set_config(&self, config: AudioConfig) {
        self.shared
            .sample_rate
            .store(config.sample_rate, Ordering::Release);
        self.shared
            .block_size
            .store(config.block_size, Ordering::Release);
        self.shared.prepared.store(true, Ordering::Release);
    }

    pub fn mark_released(&self) {
        self.shared.prepared.store(false, Ordering::Release);
    }

    /// Whether the host has been prepared since creation or the last release.
    #[inline]
    pub fn is_prepared(&self) -> bool {
        self.shared.prepared.load(Ordering::Acquire)
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.shared.sample_rate.load(Ordering::Acquire)
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.shared.block_size.load(Ordering::Acquire)
    }

    pub fn config(&self) -> AudioConfig {
        AudioConfig::new(self.sample_rate(), self.block_size())
    }

    pub fn set_cc_relay(&self, enabled: bool) {
        self.shared.cc_relay.store(enabled, Ordering::Release);
    }

    #[inline]
    pub fn cc_relay_enabled(&self) -> bool {
        self.shared.cc_relay.load(Ordering::Acquire)
    }

    /// True when a ready instance is published.
    pub fn is_active(&self) -> bool {
        match &*self.shared.published.load() {
            Some(slot) => slot.is_ready(),
            None => false,
        }
    }

    /// Process one f32 block. Returns false if the block passed through
    /// untouched.
    pub fn process_f32(
        &self,
        buffer: &mut AudioBuffer<'_>,
        midi: &mut MidiEventVec,
        transport: &TransportInfo,
    ) -> bool {
        self.capture_controllers(midi);

        let guard = self.shared.published.load();
        let Some(slot) = &*guard else {
            return false;
        };
        if !slot.is_ready() {
            return false;
        }
        let Some(mut instance) = slot.try_lock() else {
            return false;
        };
        // Release or retirement may have run between the check and the lock
        if !slot.is_ready() {
            return false;
        }

        let result = catch_unwind(AssertUnwindSafe(|| {
            slot.apply_pending(&mut **instance);
            instance.set_transport(transport);
            instance.process_f32(buffer, midi);
        }));

        if result.is_err() {
            slot.set_ready(false);
            return false;
        }
        true
    }

    /// Process one f64 block. Instances without double-precision support are
    /// passed through.
    pub fn process_f64(
        &self,
        buffer: &mut AudioBuffer64<'_>,
        midi: &mut MidiEventVec,
        transport: &TransportInfo,
    ) -> bool {
        self.capture_controllers(midi);

        let guard = self.shared.published.load();
        let Some(slot) = &*guard else {
            return false;
        };
        if !slot.is_ready() {
            return false;
        }
        let Some(mut instance) = slot.try_lock() else {
            return false;
        };
        if !slot.is_ready() || !instance.supports_f64() {
            return false;
        }

        let result = catch_unwind(AssertUnwindSafe(|| {
            slot.apply_pending(&mut **instance);
            instance.set_transport(transport);
            instance.process_f64(buffer, midi)
        }));

        match result {
            Ok(processed) => processed,
            Err(_) => {
                slot.set_ready(false);
                false
            }
        }
    }

    #[inline]
    fn capture_controllers(&self, midi: &MidiEventVec) {
        if !self.cc_relay_enabled() {
            return;
        }
        for event in midi.iter() {
            if let Some(cc) = ControllerEvent::from_midi(event) {
                // Full queue: drop the event rather than block.
                let _ = self.shared.controllers.push(cc);
            }
        }
    }

    /// Drain captured controller events. Message thread only.
    pub fn drain_controllers(&self) -> impl Iterator<Item = ControllerEvent> + '_ {
        std::iter::from_fn(move || self.shared.controllers.pop())
    }
}
