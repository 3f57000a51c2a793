//! Track identifiers.
//!
//! Waveform tracks are named with SEED-style ids `NET.STA.LOC.CHA`, e.g.
//! `CI.PAS.00.HHZ`. The location code may be empty (`CI.PAS..HHZ`). Picks are
//! stored per station, keyed by `NET.STA`.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

fn track_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([A-Z0-9]{1,2})\.([A-Z0-9]{1,5})\.([A-Z0-9]{0,2}|--)\.([A-Z0-9]{3})$")
            .expect("track id pattern is valid")
    })
}

/// A parsed track identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrackId {
    pub network: String,
    pub station: String,
    pub location: String,
    pub channel: String,
}

impl TrackId {
    /// Station key `NET.STA` used to group picks.
    pub fn station_id(&self) -> String {
        format!("{}.{}", self.network, self.station)
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.network, self.station, self.location, self.channel
        )
    }
}

impl FromStr for TrackId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = track_id_pattern()
            .captures(s.trim())
            .ok_or_else(|| format!("Invalid track id {:?}, expected NET.STA.LOC.CHA", s))?;

        let location = match &caps[3] {
            "--" => String::new(),
            loc => loc.to_string(),
        };

        Ok(Self {
            network: caps[1].to_string(),
            station: caps[2].to_string(),
            location,
            channel: caps[4].to_string(),
        })
    }
}

impl TryFrom<String> for TrackId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TrackId> for String {
    fn from(id: TrackId) -> Self {
        id.to_string()
    }
}
