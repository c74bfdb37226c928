//! Persisted host state.
//!
//! The state document is JSON:
//!
//! ```json
//! {
//!   "uiWidth": 400, "uiHeight": 200, "oscPort": 9000, "instanceNumber": 0,
//!   "wrappedInstance": {
//!     "description": { "format": "builtin", "uniqueId": "builtin.gain", "path": "" },
//!     "state": "<base64>",
//!     "layout": {
//!       "inputs":  [{ "index": 0, "layout": "L R" }],
//!       "outputs": [{ "index": 0, "layout": "disabled" }]
//!     }
//!   }
//! }
//! ```
//!
//! Decoding validates the whole document (including the base64 blob) before
//! anything is applied, so a malformed document changes nothing.

use crate::error::Result;
use crate::settings::HostSettings;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hostwrap_plugin::reconcile::snapshot;
use hostwrap_plugin::{ChannelLayout, ChannelSet, PluginDescription, PluginInstance};
use serde::{Deserialize, Serialize};

/// Highest bus index accepted from a persisted layout.
pub const MAX_PERSISTED_BUSES: usize = 64;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostStateDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub osc_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrapped_instance: Option<WrappedInstanceRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrappedInstanceRecord {
    pub description: PluginDescription,
    /// Base64 of the instance's opaque state
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub layout: LayoutRecord,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutRecord {
    #[serde(default)]
    pub inputs: Vec<BusRecord>,
    #[serde(default)]
    pub outputs: Vec<BusRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusRecord {
    pub index: usize,
    /// Abbreviated channel set, or `"disabled"`
    pub layout: String,
}

/// A decoded wrapped-instance record, ready to restore.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoredInstance {
    pub description: PluginDescription,
    pub state: Vec<u8>,
    pub layout: ChannelLayout,
}

impl LayoutRecord {
    pub fn from_layout(layout: &ChannelLayout) -> Self {
        let records = |sets: &[ChannelSet]| -> Vec<BusRecord> {
            sets.iter()
                .enumerate()
                .map(|(index, set)| BusRecord {
                    index,
                    layout: set.to_abbreviated(),
                })
                .collect()
        };
        Self {
            inputs: records(&layout.inputs),
            outputs: records(&layout.outputs),
        }
    }

    /// Place entries by index. The result stops at the first missing index;
    /// unparseable strings become empty sets, which reconciliation skips.
    pub fn to_layout(&self) -> ChannelLayout {
        ChannelLayout::new(dense_sets(&self.inputs), dense_sets(&self.outputs))
    }
}

fn dense_sets(records: &[BusRecord]) -> Vec<ChannelSet> {
    let mut slots: Vec<Option<ChannelSet>> = Vec::new();
    for record in records {
        if record.index >= MAX_PERSISTED_BUSES {
            continue;
        }
        if record.index >= slots.len() {
            slots.resize(record.index + 1, None);
        }
        slots[record.index] =
            Some(ChannelSet::from_abbreviated(&record.layout).unwrap_or_else(ChannelSet::empty));
    }
    slots.into_iter().map_while(|slot| slot).collect()
}

impl HostStateDocument {
    /// Overwrite `settings` with every field present here. The UI size is
    /// clamped to the minimum.
    pub fn apply_settings(&self, settings: &mut HostSettings) {
        let width = self.ui_width.unwrap_or(settings.ui_width);
        let height = self.ui_height.unwrap_or(settings.ui_height);
        settings.set_ui_size(width, height);
        if let Some(port) = self.osc_port {
            settings.osc_port = port;
        }
        if let Some(n) = self.instance_number {
            settings.instance_number = n;
        }
    }

    pub fn restored_instance(&self) -> Result<Option<RestoredInstance>> {
        let Some(record) = &self.wrapped_instance else {
            return Ok(None);
        };
        Ok(Some(RestoredInstance {
            description: record.description.clone(),
            state: BASE64.decode(record.state.as_bytes())?,
            layout: record.layout.to_layout(),
        }))
    }
}

pub struct StateCodec;

impl StateCodec {
    /// Capture identity, opaque state and bus layout of `instance`.
    pub fn capture(instance: &mut dyn PluginInstance) -> Result<WrappedInstanceRecord> {
        let state = instance.get_state()?;
        Ok(WrappedInstanceRecord {
            description: instance.description().clone(),
            state: BASE64.encode(&state),
            layout: LayoutRecord::from_layout(&snapshot(instance)),
        })
    }

    pub fn encode(
        settings: &HostSettings,
        wrapped_instance: Option<WrappedInstanceRecord>,
    ) -> Result<Vec<u8>> {
        let document = HostStateDocument {
            ui_width: Some(settings.ui_width),
            ui_height: Some(settings.ui_height),
            osc_port: Some(settings.osc_port),
            instance_number: Some(settings.instance_number),
            wrapped_instance,
        };
        Ok(serde_json::to_vec_pretty(&document)?)
    }

    /// Parse and validate a state document without applying it.
    pub fn decode(data: &[u8]) -> Result<(HostStateDocument, Option<RestoredInstance>)> {
        let document: HostStateDocument = serde_json::from_slice(data)?;
        let restored = document.restored_instance()?;
        Ok((document, restored))
    }
}
