use serde_derive::Serialize;

/// Reading reported when the host has no wireless connection.
pub const NO_SIGNAL_DBM: i32 = -100;

/// Signal quality buckets, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Tier {
    Excellent,
    Good,
    Fair,
    Weak,
    NoConnection,
}

/// Buckets a signal strength in dBm. Each threshold is exclusive.
pub fn classify(strength_dbm: i32) -> Tier {
    match strength_dbm {
        s if s > -45 => Tier::Excellent,
        s if s > -67 => Tier::Good,
        s if s > -72 => Tier::Fair,
        s if s > -80 => Tier::Weak,
        _ => Tier::NoConnection,
    }
}

impl Tier {
    pub fn icon(self) -> &'static str {
        match self {
            Tier::Excellent => "images/wifi-3.png",
            Tier::Good => "images/wifi-2.png",
            Tier::Fair => "images/wifi-1.png",
            Tier::Weak => "images/wifi-0.png",
            Tier::NoConnection => "images/wifi-nc.png",
        }
    }
}
