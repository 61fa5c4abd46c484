//! Addressable motion components

use std::fmt;

/// Motion subsystems, in the order of the motion controller array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    HexapodLeft = 0,
    /// Present in the station layout but not reachable from any target name
    HexapodBottom = 1,
    HexapodRight = 2,
    Gantry = 3,
}

impl Component {
    pub const ALL: [Component; 4] = [
        Component::HexapodLeft,
        Component::HexapodBottom,
        Component::HexapodRight,
        Component::Gantry,
    ];

    /// Resolve a command target (case-insensitive, surrounding whitespace ignored)
    pub fn resolve(target: &str) -> Option<Component> {
        match target.trim().to_ascii_uppercase().as_str() {
            "GANTRY" => Some(Component::Gantry),
            "HEXAPOD_LEFT" | "HEXAPODLEFT" => Some(Component::HexapodLeft),
            "HEXAPOD_RIGHT" | "HEXAPODRIGHT" => Some(Component::HexapodRight),
            _ => None,
        }
    }

    /// Index into the motion controller array
    pub fn index(self) -> usize {
        self as usize
    }

    /// Canonical target name
    pub fn name(self) -> &'static str {
        match self {
            Component::HexapodLeft => "HEXAPOD_LEFT",
            Component::HexapodBottom => "HEXAPOD_BOTTOM",
            Component::HexapodRight => "HEXAPOD_RIGHT",
            Component::Gantry => "GANTRY",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Integer form of [`Component::resolve`]: the controller index, or `-1`
pub fn resolve_index(target: &str) -> i32 {
    Component::resolve(target).map_or(-1, |component| component.index() as i32)
}
