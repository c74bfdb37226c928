//! Best-effort bus layout negotiation.
//!
//! Instances may refuse any bus edit, so reconciliation never fails: it does
//! what the instance allows and reports what happened.

use crate::channels::{BusDirection, ChannelLayout, ChannelSet};
use crate::instance::PluginInstance;

/// What reconciliation did for one direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectionReport {
    pub added: usize,
    pub removed: usize,
    pub assigned: usize,
    /// Channel sets the instance refused
    pub rejected: usize,
    /// False if a bus add or removal was refused
    pub complete: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub inputs: DirectionReport,
    pub outputs: DirectionReport,
}

impl ReconcileReport {
    pub fn direction(&self, direction: BusDirection) -> &DirectionReport {
        match direction {
            BusDirection::Input => &self.inputs,
            BusDirection::Output => &self.outputs,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.inputs.complete && self.outputs.complete
    }

    /// True when no bus was added or removed.
    pub fn is_structurally_unchanged(&self) -> bool {
        self.inputs.added + self.inputs.removed + self.outputs.added + self.outputs.removed == 0
    }
}

/// Bring `instance`'s buses in line with `target`, input direction first.
pub fn reconcile(instance: &mut dyn PluginInstance, target: &ChannelLayout) -> ReconcileReport {
    let report = ReconcileReport {
        inputs: reconcile_direction(instance, BusDirection::Input, &target.inputs),
        outputs: reconcile_direction(instance, BusDirection::Output, &target.outputs),
    };

    if !report.is_complete() {
        tracing::debug!(
            "Layout of {} only partially restored: {:?}",
            instance.description(),
            report
        );
    }
    report
}

fn reconcile_direction(
    instance: &mut dyn PluginInstance,
    direction: BusDirection,
    target: &[ChannelSet],
) -> DirectionReport {
    let mut report = DirectionReport {
        complete: true,
        ..DirectionReport::default()
    };

    for (index, set) in target.iter().enumerate() {
        if index >= instance.bus_count(direction) {
            if !instance.add_bus(direction) || index >= instance.bus_count(direction) {
                report.complete = false;
                return report;
            }
            report.added += 1;
        }

        if set.is_empty() || instance.channel_set(direction, index).as_ref() == Some(set) {
            continue;
        }

        if instance.set_channel_set(direction, index, set) {
            report.assigned += 1;
        } else {
            report.rejected += 1;
        }
    }

    while instance.bus_count(direction) > target.len() {
        let before = instance.bus_count(direction);
        if !instance.remove_bus(direction) || instance.bus_count(direction) >= before {
            report.complete = false;
            break;
        }
        report.removed += 1;
    }

    report
}

/// Read the instance's current layout.
pub fn snapshot(instance: &dyn PluginInstance) -> ChannelLayout {
    let read = |direction: BusDirection| -> Vec<ChannelSet> {
        (0..instance.bus_count(direction))
            .map(|i| instance.channel_set(direction, i).unwrap_or_else(ChannelSet::empty))
            .collect()
    };
    ChannelLayout::new(read(BusDirection::Input), read(BusDirection::Output))
}
