use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::collider::Collider;
use crate::error::CollisionError;
use crate::slope::SlopeContext;

/// User-defined key identifying an entity across ticks (e.g., pack your entity id).
pub type ColKey = u64;

/// Frame-local handle for bodies pushed this frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(pub u32);

/// Axis-aligned rectangle stored as min/max corners (y grows upwards).
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
        Self {
            min: origin,
            max: origin + size,
        }
    }

    pub fn centered(center: Vec2, size: Vec2) -> Self {
        Self::from_origin_size(center - size * 0.5, size)
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Overlapping region with positive area, if any. Rects sharing only an
    /// edge do not intersect.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        if max.x > min.x && max.y > min.y {
            Some(Rect { min, max })
        } else {
            None
        }
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.intersection(other).is_some()
    }
}

/// Side of a collider that touched something.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ContactSide {
    Top,
    Bottom,
    Left,
    Right,
}

impl ContactSide {
    pub const ALL: [ContactSide; 4] = [
        ContactSide::Top,
        ContactSide::Bottom,
        ContactSide::Left,
        ContactSide::Right,
    ];

    pub fn is_vertical(self) -> bool {
        matches!(self, ContactSide::Top | ContactSide::Bottom)
    }
}

/// A contact side together with the correction it asks for along its axis.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SideOffset {
    pub side: ContactSide,
    pub offset: f32,
}

/// Per-side contact flags, recomputed every tick.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ContactSides {
    pub top: bool,
    pub bottom: bool,
    pub left: bool,
    pub right: bool,
}

impl ContactSides {
    pub fn insert(&mut self, side: ContactSide) {
        match side {
            ContactSide::Top => self.top = true,
            ContactSide::Bottom => self.bottom = true,
            ContactSide::Left => self.left = true,
            ContactSide::Right => self.right = true,
        }
    }

    pub fn contains(&self, side: ContactSide) -> bool {
        match side {
            ContactSide::Top => self.top,
            ContactSide::Bottom => self.bottom,
            ContactSide::Left => self.left,
            ContactSide::Right => self.right,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.top || self.bottom || self.left || self.right)
    }

    pub fn blocks_vertical(&self) -> bool {
        self.top || self.bottom
    }

    pub fn blocks_horizontal(&self) -> bool {
        self.left || self.right
    }

    pub fn union(self, other: ContactSides) -> ContactSides {
        ContactSides {
            top: self.top || other.top,
            bottom: self.bottom || other.bottom,
            left: self.left || other.left,
            right: self.right || other.right,
        }
    }

    pub fn iter(self) -> impl Iterator<Item = ContactSide> {
        ContactSide::ALL.into_iter().filter(move |s| self.contains(*s))
    }

    /// The same contact seen from the other party.
    pub fn mirrored(self) -> ContactSides {
        ContactSides {
            top: self.bottom,
            bottom: self.top,
            left: self.right,
            right: self.left,
        }
    }

    /// Opposite sides at once: the body is squeezed.
    pub fn is_crushing(&self) -> bool {
        (self.top && self.bottom) || (self.left && self.right)
    }
}

impl FromIterator<ContactSide> for ContactSides {
    fn from_iter<I: IntoIterator<Item = ContactSide>>(iter: I) -> Self {
        let mut sides = ContactSides::default();
        for side in iter {
            sides.insert(side);
        }
        sides
    }
}

/// Column/row address of a tile in the collision map.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub column: i32,
    pub row: i32,
}

impl TileCoord {
    pub fn new(column: i32, row: i32) -> Self {
        Self { column, row }
    }
}

/// Inclusive range of tile columns and rows.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TileRange {
    pub left: i32,
    pub right: i32,
    pub bottom: i32,
    pub top: i32,
}

/// What a body made contact with.
#[derive(Clone, Debug, PartialEq)]
pub enum ContactedObject {
    /// Solid, one-way or jump-wall tiles of the collision map.
    Ground,
    /// A group of slope tiles.
    Slope(SlopeContext),
    /// Another body pushed this frame.
    Body(ColKey),
    /// A run of empty tiles the body is about to fall or walk into.
    Gap,
}

/// One contact produced during a tick.
#[derive(Clone, Debug, PartialEq)]
pub struct Contact {
    pub body: ColKey,
    pub other: ContactedObject,
    /// `false` for sense-only contacts that did not move the body.
    pub is_collision: bool,
    pub sides: ContactSides,
    /// Sides of the other body, when the other object is a body.
    pub other_sides: ContactSides,
    pub intersection: Rect,
    /// Tile that produced a ground contact.
    pub tile: Option<TileCoord>,
}

impl Contact {
    /// Two contacts describe the same relation if body, other object and kind match.
    pub fn same_relation(&self, other: &Contact) -> bool {
        self.body == other.body
            && self.other == other.other
            && self.is_collision == other.is_collision
    }
}

/// A contact that moved the body, with the position it moved it to.
#[derive(Clone, Debug, PartialEq)]
pub struct Correction {
    pub position: Vec2,
    pub contact: Contact,
}

/// Lifecycle of a contact relative to the previous tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ContactState {
    Entered,
    Stayed,
}

/// How a body treats the tile map.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileResponse {
    /// Tiles block movement.
    #[default]
    Block,
    /// Tile contacts are reported but never move the body.
    Sense,
    /// Tiles are not tested at all.
    Ignore,
}

/// Marks a body others can stand on or be pushed by (platforms, crates).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Snappable {
    /// Only blocks bodies landing on its top.
    pub one_way: bool,
}

/// Explicit capability flags queried by the resolver.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub tile_response: TileResponse,
    /// Collides with snappable bodies.
    pub snapper: bool,
    pub snappable: Option<Snappable>,
    /// Drops through one-way tiles and one-way snappables this tick.
    pub pushes_down: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            tile_response: TileResponse::Block,
            snapper: true,
            snappable: None,
            pushes_down: false,
        }
    }
}

/// One body to be resolved **this frame**.
#[derive(Copy, Clone, Debug)]
pub struct BodyDesc {
    pub key: ColKey,
    pub collider: Collider,
    pub current: Vec2,
    pub proposed: Vec2,
    pub caps: Capabilities,
}

/// Resolved position and contact flags for one body.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    pub id: FrameId,
    pub key: ColKey,
    pub position: Vec2,
    pub sides: ContactSides,
    pub on_slope: Option<SlopeContext>,
    pub pushes_left_jump_wall: bool,
    pub pushes_right_jump_wall: bool,
    /// Touching an empty tile that is part of a gap below the body.
    pub on_gap: bool,
    /// Inside the grace area beside a ledge it just walked off.
    pub on_corner_jump: bool,
    pub outside_map_bounds: bool,
    /// Opposite sides collided in the same tick.
    pub crushed: bool,
}

impl Resolution {
    pub fn on_ground(&self) -> bool {
        self.sides.bottom
    }

    pub fn at_ceiling(&self) -> bool {
        self.sides.top
    }

    pub fn pushes_left_wall(&self) -> bool {
        self.sides.left
    }

    pub fn pushes_right_wall(&self) -> bool {
        self.sides.right
    }

    pub fn is_on_air(&self) -> bool {
        !self.sides.bottom && self.on_slope.is_none()
    }
}

/// Flags accumulated for one body while its tick is being resolved.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickState {
    pub sides: ContactSides,
    pub on_slope: Option<SlopeContext>,
    /// The body ended the previous tick on a slope.
    pub was_on_slope: bool,
    pub pushes_left_jump_wall: bool,
    pub pushes_right_jump_wall: bool,
    /// A sense-only tile contact was already reported this tick.
    pub ground_sensed: bool,
    pub tile_tests: usize,

    pub on_gap: bool,
    pub on_corner_jump: bool,
    /// A corner jump area was touched without qualifying; ignore the rest.
    pub discards_corner_jump: bool,
    pub was_on_ground: bool,
    pub was_on_corner_jump: bool,
}

impl TickState {
    pub fn crushed(&self) -> bool {
        self.sides.is_crushing()
    }
}

/// World-level configuration for the resolver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Largest displacement of one interpolation step.
    pub interpolation_max_delta: f32,
    /// Upper bound on interpolation steps per move; longer moves take
    /// coarser steps.
    pub max_interpolation_steps: usize,
    /// Correction passes allowed per body per tick.
    pub max_resolution_passes: u32,
    /// Keep previous-tick contacts to report entered/stayed/exited.
    pub track_contact_states: bool,
    /// Maximum number of contacts recorded per tick; extra are dropped.
    pub max_contacts: usize,
    /// Enable internal timing instrumentation (adds small overhead when true).
    pub enable_timing: bool,
    /// Cell size of the uniform grid pairing sensing bodies.
    pub sense_cell_size: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            interpolation_max_delta: 8.0,
            max_interpolation_steps: 256,
            max_resolution_passes: 16,
            track_contact_states: true,
            max_contacts: 4096,
            enable_timing: false,
            sense_cell_size: 64.0,
        }
    }
}

impl WorldConfig {
    pub fn from_json_str(json: &str) -> Result<Self, CollisionError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Debug/performance statistics for the last resolved frame.
#[derive(Copy, Clone, Debug, Default)]
pub struct WorldStats {
    pub bodies: usize,
    pub snappables: usize,
    /// Tile cells inspected across all passes.
    pub tile_tests: usize,
    pub resolution_passes: usize,
    pub contacts: usize,
    /// Bodies that hit `max_resolution_passes`.
    pub capped_bodies: usize,
    /// Body pairs sharing a grid cell, tested for sensing.
    pub sense_candidate_pairs: usize,
}

/// Timing breakdown for the last completed resolve.
#[derive(Copy, Clone, Debug, Default)]
pub struct WorldTiming {
    pub resolve_ms: f64,
    pub snappables_ms: f64,
    pub bodies_ms: f64,
    pub sense_ms: f64,
}
