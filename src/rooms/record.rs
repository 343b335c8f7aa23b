use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;
use std::fmt::Formatter;
use std::str::FromStr;

/// Floor of a room as the floor-plan front-end names it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Floor {
    /// Basement or socle, `floor-0`
    #[serde(rename = "floor-0")]
    Basement,
    #[default]
    #[serde(rename = "floor-1")]
    First,
    #[serde(rename = "floor-2")]
    Second,
    #[serde(rename = "floor-3")]
    Third,
    #[serde(rename = "floor-4")]
    Fourth,
}

impl Floor {
    pub const ALL: [Floor; 5] = [Floor::Basement, Floor::First, Floor::Second, Floor::Third, Floor::Fourth];

    pub const fn from_level(level: u8) -> Option<Floor> {
        match level {
            0 => Some(Floor::Basement),
            1 => Some(Floor::First),
            2 => Some(Floor::Second),
            3 => Some(Floor::Third),
            4 => Some(Floor::Fourth),
            _ => None,
        }
    }

    pub const fn level(&self) -> u8 {
        match self {
            Floor::Basement => 0,
            Floor::First => 1,
            Floor::Second => 2,
            Floor::Third => 3,
            Floor::Fourth => 4,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Floor::Basement => "floor-0",
            Floor::First => "floor-1",
            Floor::Second => "floor-2",
            Floor::Third => "floor-3",
            Floor::Fourth => "floor-4",
        }
    }
}

impl Display for Floor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts both `floor-3` and a bare `3`.
impl FromStr for Floor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let level = trimmed.strip_prefix("floor-").unwrap_or(trimmed);
        level
            .parse::<u8>()
            .ok()
            .and_then(Floor::from_level)
            .ok_or_else(|| format!("Unknown floor '{s}', expected floor-0 to floor-4"))
    }
}

/// One leasable room recognised in the uploaded sheet.
///
/// Serialized with the exact field names the floor-plan front-end reads; absent values are
/// written as `null` rather than omitted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    /// Digits plus an optional Cyrillic letter, e.g. `12а`
    pub number: String,
    /// `19` unless the label names another building, `7-1` for `строение 7/1`
    pub building: String,
    pub floor: Floor,
    pub tenant: Option<String>,
    pub contract: Option<String>,
    pub rent: Option<String>,
    pub area: Option<String>,
    pub contract_area: Option<String>,
}

impl RoomRecord {
    /// Whether the record carries tenancy details, i.e. the room was judged occupied.
    pub fn is_occupied(&self) -> bool {
        self.tenant.is_some() || self.contract.is_some() || self.rent.is_some()
    }
}
