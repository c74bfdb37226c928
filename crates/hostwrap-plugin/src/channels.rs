//! Buses, channel sets and channel layouts.
//!
//! A channel set is the speaker arrangement of one bus. Its abbreviated string
//! form (`"L R"`, `"C"`, `"disabled"`) is what the persisted state stores, so
//! `to_abbreviated` and `from_abbreviated` must stay inverse to each other.

use std::fmt;
use std::str::FromStr;

/// Marker written for a disabled bus.
pub const DISABLED_MARKER: &str = "disabled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusDirection {
    Input,
    Output,
}

impl BusDirection {
    pub const ALL: [BusDirection; 2] = [BusDirection::Input, BusDirection::Output];
}

impl fmt::Display for BusDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusDirection::Input => write!(f, "input"),
            BusDirection::Output => write!(f, "output"),
        }
    }
}

/// A single speaker role within a channel set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelRole {
    Left,
    Right,
    Centre,
    Lfe,
    LeftSurround,
    RightSurround,
    LeftCentre,
    RightCentre,
    CentreSurround,
    LeftRearSurround,
    RightRearSurround,
    TopFrontLeft,
    TopFrontRight,
    TopSideLeft,
    TopSideRight,
    WideLeft,
    WideRight,
    /// Channel with no speaker meaning, numbered from 0
    Discrete(u16),
}

const NAMED_ROLES: [(ChannelRole, &str); 17] = [
    (ChannelRole::Left, "L"),
    (ChannelRole::Right, "R"),
    (ChannelRole::Centre, "C"),
    (ChannelRole::Lfe, "LFE"),
    (ChannelRole::LeftSurround, "Ls"),
    (ChannelRole::RightSurround, "Rs"),
    (ChannelRole::LeftCentre, "Lc"),
    (ChannelRole::RightCentre, "Rc"),
    (ChannelRole::CentreSurround, "Cs"),
    (ChannelRole::LeftRearSurround, "Lrs"),
    (ChannelRole::RightRearSurround, "Rrs"),
    (ChannelRole::TopFrontLeft, "Tfl"),
    (ChannelRole::TopFrontRight, "Tfr"),
    (ChannelRole::TopSideLeft, "Tsl"),
    (ChannelRole::TopSideRight, "Tsr"),
    (ChannelRole::WideLeft, "Wl"),
    (ChannelRole::WideRight, "Wr"),
];

impl ChannelRole {
    pub fn abbreviation(&self) -> String {
        match self {
            ChannelRole::Discrete(n) => format!("#{n}"),
            named => NAMED_ROLES
                .iter()
                .find(|(role, _)| role == named)
                .map(|(_, abbr)| (*abbr).to_string())
                .unwrap_or_default(),
        }
    }

    pub fn from_abbreviation(abbr: &str) -> Option<Self> {
        if let Some(index) = abbr.strip_prefix('#') {
            return index.parse().ok().map(ChannelRole::Discrete);
        }
        NAMED_ROLES
            .iter()
            .find(|(_, a)| *a == abbr)
            .map(|(role, _)| *role)
    }
}

/// Speaker arrangement of one bus, or the disabled marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelSet {
    Disabled,
    Channels(Vec<ChannelRole>),
}

impl ChannelSet {
    pub fn mono() -> Self {
        ChannelSet::Channels(vec![ChannelRole::Centre])
    }

    pub fn stereo() -> Self {
        ChannelSet::Channels(vec![ChannelRole::Left, ChannelRole::Right])
    }

    pub fn discrete(count: u16) -> Self {
        ChannelSet::Channels((0..count).map(ChannelRole::Discrete).collect())
    }

    pub fn empty() -> Self {
        ChannelSet::Channels(Vec::new())
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, ChannelSet::Disabled)
    }

    /// True for a set with no roles. A disabled set is *not* empty: it carries
    /// information (the bus was switched off) and is written back on restore.
    pub fn is_empty(&self) -> bool {
        matches!(self, ChannelSet::Channels(roles) if roles.is_empty())
    }

    pub fn num_channels(&self) -> usize {
        match self {
            ChannelSet::Disabled => 0,
            ChannelSet::Channels(roles) => roles.len(),
        }
    }

    pub fn roles(&self) -> &[ChannelRole] {
        match self {
            ChannelSet::Disabled => &[],
            ChannelSet::Channels(roles) => roles,
        }
    }

    pub fn to_abbreviated(&self) -> String {
        match self {
            ChannelSet::Disabled => DISABLED_MARKER.to_string(),
            ChannelSet::Channels(roles) => roles
                .iter()
                .map(ChannelRole::abbreviation)
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    /// Parse the abbreviated form. Returns `None` if any token is unknown.
    pub fn from_abbreviated(text: &str) -> Option<Self> {
        let text = text.trim();
        if text == DISABLED_MARKER {
            return Some(ChannelSet::Disabled);
        }
        text.split_whitespace()
            .map(ChannelRole::from_abbreviation)
            .collect::<Option<Vec<_>>>()
            .map(ChannelSet::Channels)
    }
}

impl Default for ChannelSet {
    fn default() -> Self {
        ChannelSet::stereo()
    }
}

impl fmt::Display for ChannelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_abbreviated())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseChannelSetError(pub String);

impl fmt::Display for ParseChannelSetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognised channel layout '{}'", self.0)
    }
}

impl std::error::Error for ParseChannelSetError {}

impl FromStr for ChannelSet {
    type Err = ParseChannelSetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChannelSet::from_abbreviated(s).ok_or_else(|| ParseChannelSetError(s.to_string()))
    }
}

/// Channel set of every bus, per direction. Bus indices are dense from 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelLayout {
    pub inputs: Vec<ChannelSet>,
    pub outputs: Vec<ChannelSet>,
}

impl ChannelLayout {
    pub fn new(inputs: Vec<ChannelSet>, outputs: Vec<ChannelSet>) -> Self {
        Self { inputs, outputs }
    }

    /// One stereo bus in each direction.
    pub fn stereo() -> Self {
        Self::new(vec![ChannelSet::stereo()], vec![ChannelSet::stereo()])
    }

    pub fn buses(&self, direction: BusDirection) -> &[ChannelSet] {
        match direction {
            BusDirection::Input => &self.inputs,
            BusDirection::Output => &self.outputs,
        }
    }

    pub fn buses_mut(&mut self, direction: BusDirection) -> &mut Vec<ChannelSet> {
        match direction {
            BusDirection::Input => &mut self.inputs,
            BusDirection::Output => &mut self.outputs,
        }
    }

    pub fn bus_count(&self, direction: BusDirection) -> usize {
        self.buses(direction).len()
    }

    /// Channel set of bus 0. A missing bus reads as disabled.
    pub fn main_bus(&self, direction: BusDirection) -> &ChannelSet {
        static DISABLED: ChannelSet = ChannelSet::Disabled;
        self.buses(direction).first().unwrap_or(&DISABLED)
    }
}
