use convert_case::{Case, Casing};

pub mod door;
pub mod panel;
pub mod signal;

pub use door::{DoorState, DoorView};
pub use panel::IndicatorPanel;
pub use signal::{classify, Tier};

/// The status icons shown in the panel header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    PrinterStatus,
    DoorCheck,
    DialogueDoorCheck,
    Wifi,
}

impl Indicator {
    pub const ALL: [Indicator; 4] = [Indicator::PrinterStatus, Indicator::DoorCheck, Indicator::DialogueDoorCheck, Indicator::Wifi];

    /// Key of the last known value in the state store. Wifi keeps the dBm reading, the others the icon.
    pub fn store_key(self) -> &'static str {
        match self {
            Indicator::PrinterStatus => "printerstatus",
            Indicator::DoorCheck => "doorcheck",
            Indicator::DialogueDoorCheck => "dialogue_doorcheck",
            Indicator::Wifi => "lastwifi",
        }
    }

    /// Topic segment, e.g. `dialogue-door-check`.
    pub fn name(self) -> String {
        format!("{:?}", self).to_case(Case::Kebab)
    }
}

/// A new icon for one indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconUpdate {
    pub indicator: Indicator,
    pub icon: String,
    /// Value kept under [`Indicator::store_key`] once the icon is shown.
    pub stored: String,
}

impl IconUpdate {
    pub fn new(indicator: Indicator, icon: impl Into<String>) -> Self {
        let icon = icon.into();
        Self { indicator, stored: icon.clone(), icon }
    }

    /// The wifi icon for a reading; the store keeps the reading itself.
    pub fn wifi(strength_dbm: i32) -> Self {
        Self { indicator: Indicator::Wifi, icon: classify(strength_dbm).icon().to_owned(), stored: strength_dbm.to_string() }
    }
}

pub fn printer_icon(started: bool) -> &'static str {
    if started {
        "images/printer-on.png"
    } else {
        "images/printer-off.png"
    }
}
