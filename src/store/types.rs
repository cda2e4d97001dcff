use serde::{Serialize, Deserialize};
use smallvec::SmallVec;
use std::fmt;

/// Dense index of a key inside one `Registry`. Only meaningful for the run
/// that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct KeyId(pub u32);

impl KeyId {
    #[inline(always)]
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }
}

/// Temporal variant of a key: the latest snapshot or a historical one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Context {
    Current,
    /// Written as `pf` inside formulas and full keys.
    PointInTime,
}

impl Context {
    pub fn from_is_current(is_current: bool) -> Self {
        if is_current { Context::Current } else { Context::PointInTime }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "current" => Some(Context::Current),
            "pf" => Some(Context::PointInTime),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Context::Current => "current",
            Context::PointInTime => "pf",
        }
    }

    pub fn is_current(&self) -> bool { matches!(self, Context::Current) }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One calculated-field definition as delivered by the metadata source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    pub fund_id: String,
    pub datagroup_id: String,
    pub key: String,
    /// `FUND!DATAGROUP!KEY!context`, unique within a run.
    pub full_key: String,
    pub calculation_level: u32,
    pub is_current: bool,
    #[serde(default)]
    pub formula: Option<String>,
}

impl KeyRecord {
    pub fn context(&self) -> Context { Context::from_is_current(self.is_current) }

    pub fn is_raw(&self) -> bool { self.calculation_level == 0 }
}

/// A reference to another key found inside a formula.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyRef {
    pub target: String,
    pub expected: Context,
}

/// Most formulas reference a handful of keys.
pub type DependencyList = SmallVec<[DependencyRef; 4]>;
