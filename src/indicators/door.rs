use serde_derive::Serialize;

use super::Indicator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DoorState {
    Open,
    Closed,
}

impl DoorState {
    /// Bit 1 of the endstop field is the door switch. Codes outside 0..=7 are not understood.
    pub fn from_endstops(code: i64) -> Option<DoorState> {
        match code {
            0 | 1 | 4 | 5 => Some(DoorState::Open),
            2 | 3 | 6 | 7 => Some(DoorState::Closed),
            _ => None,
        }
    }
}

/// Where the door state is shown. The print dialogue uses its own artwork.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorView {
    Idle,
    Dialogue,
}

impl DoorView {
    pub fn indicator(self) -> Indicator {
        match self {
            DoorView::Idle => Indicator::DoorCheck,
            DoorView::Dialogue => Indicator::DialogueDoorCheck,
        }
    }

    pub fn icon(self, state: DoorState) -> &'static str {
        match (self, state) {
            (DoorView::Idle, DoorState::Open) => "images/open.png",
            (DoorView::Idle, DoorState::Closed) => "images/closed.png",
            (DoorView::Dialogue, DoorState::Open) => "images/open_with_msg.png",
            (DoorView::Dialogue, DoorState::Closed) => "images/closed_without_msg.png",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_every_known_code() {
        for code in [0, 1, 4, 5] {
            assert_eq!(DoorState::from_endstops(code), Some(DoorState::Open), "code {}", code);
        }
        for code in [2, 3, 6, 7] {
            assert_eq!(DoorState::from_endstops(code), Some(DoorState::Closed), "code {}", code);
        }
    }

    #[test]
    fn unknown_codes_are_ignored() {
        assert_eq!(DoorState::from_endstops(8), None);
        assert_eq!(DoorState::from_endstops(-1), None);
    }

    #[test]
    fn dialogue_uses_its_own_icons() {
        assert_eq!(DoorView::Idle.icon(DoorState::Open), "images/open.png");
        assert_eq!(DoorView::Dialogue.icon(DoorState::Closed), "images/closed_without_msg.png");
        assert_eq!(DoorView::Dialogue.indicator(), Indicator::DialogueDoorCheck);
    }
}
