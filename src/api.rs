use glam::Vec2;

use crate::collider::{ColliderMovement, HitPoints, HorizontalInsets, VerticalInsets};
use crate::filter::CollisionPolicy;
use crate::tilemap::CollisionTileMap;
use crate::types::*;

/// Public API contract for the per-tick collision resolver.
pub trait CollisionsApi {
    /// Construct a controller over an optional tile map and a pair policy.
    fn new(cfg: WorldConfig, tile_map: Option<CollisionTileMap>, policy: CollisionPolicy) -> Self
    where
        Self: Sized;

    // --- Frame lifecycle ---------------------------------------------------

    /// Begin a new tick. Clears last tick's bodies and resolutions and rolls
    /// contacts over to the previous-contact set.
    fn begin_frame(&mut self);

    /// Insert a body proposing a move this tick and return its frame-local handle.
    fn push(&mut self, desc: BodyDesc) -> FrameId;

    /// Resolve every pushed body against the tiles and each other.
    fn resolve(&mut self);

    // --- Results -----------------------------------------------------------

    /// Resolutions in push order.
    fn resolutions(&self) -> &[Resolution];

    fn resolution(&self, id: FrameId) -> Option<&Resolution>;

    fn resolution_by_key(&self, key: ColKey) -> Option<&Resolution>;

    /// Contacts of this tick, without clearing them.
    fn contacts(&self) -> &[Contact];

    /// Drain and return the contacts recorded this tick.
    fn drain_contacts(&mut self) -> Vec<Contact>;

    /// `Entered` or `Stayed` for a contact recorded this tick.
    fn contact_state(&self, contact: &Contact) -> Option<ContactState>;

    /// Contacts of the previous tick that did not happen again.
    fn exit_contacts(&self) -> Vec<Contact>;
}

/// Side classification primitives over hit points.
pub trait NarrowphaseApi {
    // Per-edge rules --------------------------------------------------------

    fn top_contact_sides(
        intersection: &Rect,
        insets: HorizontalInsets,
        current: &HitPoints,
        proposed: &HitPoints,
        other: &Rect,
    ) -> Vec<SideOffset>;

    fn bottom_contact_sides(
        intersection: &Rect,
        insets: HorizontalInsets,
        current: &HitPoints,
        proposed: &HitPoints,
        other: &Rect,
        was_on_slope: bool,
    ) -> Vec<SideOffset>;

    fn left_contact_sides(
        intersection: &Rect,
        insets: VerticalInsets,
        current: &HitPoints,
        proposed: &HitPoints,
        other: &Rect,
        contacts_bottom: bool,
    ) -> Vec<SideOffset>;

    fn right_contact_sides(
        intersection: &Rect,
        insets: VerticalInsets,
        current: &HitPoints,
        proposed: &HitPoints,
        other: &Rect,
        contacts_bottom: bool,
    ) -> Vec<SideOffset>;

    // Combined --------------------------------------------------------------

    /// All four edges, reduced to the strongest offset per side.
    fn contact_sides(
        movement: &ColliderMovement<'_>,
        intersection: &Rect,
        other: &Rect,
        was_on_slope: bool,
    ) -> Vec<SideOffset>;

    /// Shift `position` by every offset and collect the sides.
    fn apply_side_offsets(position: Vec2, offsets: &[SideOffset]) -> (Vec2, ContactSides);
}
