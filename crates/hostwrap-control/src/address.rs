//! Address scheme and message classification.
//!
//! Every host answers under `/module/{n}/`, where `n` is its instance number:
//!
//! | address | payload | action |
//! |---|---|---|
//! | `/module/{n}/load` | one string | load `<name>.fxp` |
//! | `/module/{n}/{param}` | number first | set parameter `{param}` |
//! | anything else | any | relay |

use rosc::{OscMessage, OscType};

/// Addresses owned by one host instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlAddresses {
    instance: u32,
    prefix: String,
    load: String,
}

/// What to do with one incoming message.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteAction<'a> {
    LoadPreset(&'a str),
    SetParameter { name: &'a str, value: f32 },
    Relay,
    Malformed(&'static str),
}

impl ControlAddresses {
    pub fn for_instance(instance: u32) -> Self {
        let prefix = format!("/module/{}/", instance);
        let load = format!("{}load", prefix);
        Self {
            instance,
            prefix,
            load,
        }
    }

    pub fn instance(&self) -> u32 {
        self.instance
    }

    /// `/module/{n}/`
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `/module/{n}/load`
    pub fn load(&self) -> &str {
        &self.load
    }

    /// Confirmation sent after a successful preset load.
    pub fn loaded(&self) -> String {
        format!("{}loaded", self.prefix)
    }

    /// Address for relayed MIDI controller changes.
    pub fn controller(&self) -> String {
        format!("{}midi/cc", self.prefix)
    }

    pub fn classify<'a>(&self, message: &'a OscMessage) -> RouteAction<'a> {
        let addr = message.addr.as_str();

        if addr == self.load {
            return match message.args.as_slice() {
                [OscType::String(name)] if !name.is_empty() => RouteAction::LoadPreset(name),
                _ => RouteAction::Malformed("load expects a single preset name"),
            };
        }

        let Some(name) = addr.strip_prefix(self.prefix.as_str()) else {
            return RouteAction::Relay;
        };

        if name.is_empty() {
            return RouteAction::Malformed("empty parameter name");
        }

        match message.args.first().and_then(numeric) {
            Some(value) => RouteAction::SetParameter { name, value },
            None => RouteAction::Malformed("parameter value must be numeric"),
        }
    }
}

fn numeric(arg: &OscType) -> Option<f32> {
    match arg {
        OscType::Float(v) => Some(*v),
        OscType::Double(v) => Some(*v as f32),
        OscType::Int(v) => Some(*v as f32),
        OscType::Long(v) => Some(*v as f32),
        _ => None,
    }
}
