use std::fmt::{self, Display};

/// The search commands this layer resolves and executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Command {
    Nearby,
    Within,
    Intersects,
    Search,
}

impl Command {
    pub fn parse(token: &str) -> Option<Command> {
        match token.to_ascii_lowercase().as_str() {
            "nearby" => Some(Command::Nearby),
            "within" => Some(Command::Within),
            "intersects" => Some(Command::Intersects),
            "search" => Some(Command::Search),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Nearby => "nearby",
            Command::Within => "within",
            Command::Intersects => "intersects",
            Command::Search => "search",
        }
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The encodings a search target can be given in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum TargetKind {
    Point,
    Circle,
    Object,
    Sector,
    Bounds,
    Hash,
    Tile,
    Mvt,
    Quadkey,
    Get,
    Roam,
}

const SPATIAL: &[Command] = &[Command::Within, Command::Intersects];
const ALL_SPATIAL: &[Command] = &[Command::Nearby, Command::Within, Command::Intersects];

/// Which commands accept each kind.
///
/// `Roam` is listed for no command; it is admitted for `NEARBY` only when
/// the command runs in fence mode.
static CAPABILITIES: &[(TargetKind, &str, &[Command])] = &[
    (TargetKind::Point, "point", ALL_SPATIAL),
    (TargetKind::Circle, "circle", SPATIAL),
    (TargetKind::Object, "object", SPATIAL),
    (TargetKind::Sector, "sector", SPATIAL),
    (TargetKind::Bounds, "bounds", SPATIAL),
    (TargetKind::Hash, "hash", SPATIAL),
    (TargetKind::Tile, "tile", SPATIAL),
    (TargetKind::Mvt, "mvt", SPATIAL),
    (TargetKind::Quadkey, "quadkey", SPATIAL),
    (TargetKind::Get, "get", SPATIAL),
    (TargetKind::Roam, "roam", &[]),
];

impl TargetKind {
    /// Recognizes a kind tag, ignoring case.
    pub fn parse(token: &str) -> Option<TargetKind> {
        CAPABILITIES
            .iter()
            .find(|(_, name, _)| token.eq_ignore_ascii_case(name))
            .map(|(kind, _, _)| *kind)
    }

    pub fn name(&self) -> &'static str {
        CAPABILITIES
            .iter()
            .find(|(kind, _, _)| kind == self)
            .map(|(_, name, _)| *name)
            .unwrap_or("unknown")
    }

    /// Returns true if `command` accepts this kind, given the fence flag.
    pub fn permitted(&self, command: Command, fence: bool) -> bool {
        if *self == TargetKind::Roam && fence && command == Command::Nearby {
            return true;
        }
        CAPABILITIES
            .iter()
            .any(|(kind, _, commands)| kind == self && commands.contains(&command))
    }

    /// Kinds resolved by the tile-rectangle resolver.
    pub fn is_rect(&self) -> bool {
        matches!(
            self,
            TargetKind::Bounds
                | TargetKind::Hash
                | TargetKind::Tile
                | TargetKind::Mvt
                | TargetKind::Quadkey
        )
    }

    /// Kinds a `CLIPBY` clause may name.
    pub fn is_clip_rect(&self) -> bool {
        self.is_rect() && *self != TargetKind::Mvt
    }

    /// Kinds that refuse a clip request on the resolved target.
    pub fn rejects_clip(&self) -> bool {
        matches!(
            self,
            TargetKind::Circle
                | TargetKind::Object
                | TargetKind::Sector
                | TargetKind::Get
                | TargetKind::Roam
        )
    }
}

impl Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
