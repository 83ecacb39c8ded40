use glam::Vec2;

use crate::api::NarrowphaseApi;
use crate::collider::{ColliderMovement, HitPoints, HorizontalInsets, VerticalInsets};
use crate::types::*;

/// Contact side classification from edge hit points.
///
/// A hit point touching the other frame at the proposed position is
/// attributed to a side by comparing where the same hit point was at the
/// current position.
pub struct Narrowphase;

impl NarrowphaseApi for Narrowphase {
    fn top_contact_sides(
        intersection: &Rect,
        insets: HorizontalInsets,
        current: &HitPoints,
        proposed: &HitPoints,
        other: &Rect,
    ) -> Vec<SideOffset> {
        let mut out = Vec::new();
        if intersection.intersects(&proposed.top.left) {
            let hp = current.top.left;
            if hp.max.y <= other.min.y {
                out.push(SideOffset { side: ContactSide::Top, offset: -intersection.height() });
            } else if hp.min.x >= other.max.x {
                out.push(SideOffset { side: ContactSide::Left, offset: intersection.width() - insets.left });
            }
        }
        if intersection.intersects(&proposed.top.right) {
            let hp = current.top.right;
            if hp.max.y <= other.min.y {
                out.push(SideOffset { side: ContactSide::Top, offset: -intersection.height() });
            } else if hp.max.x <= other.min.x {
                out.push(SideOffset { side: ContactSide::Right, offset: -(intersection.width() - insets.right) });
            }
        }
        out
    }

    fn bottom_contact_sides(
        intersection: &Rect,
        insets: HorizontalInsets,
        current: &HitPoints,
        proposed: &HitPoints,
        other: &Rect,
        was_on_slope: bool,
    ) -> Vec<SideOffset> {
        let mut out = Vec::new();
        if intersection.intersects(&proposed.bottom.left) {
            let hp = current.bottom.left;
            if hp.min.y >= other.max.y || was_on_slope {
                out.push(SideOffset { side: ContactSide::Bottom, offset: intersection.height() });
            } else if hp.min.x >= other.max.x {
                out.push(SideOffset { side: ContactSide::Left, offset: intersection.width() - insets.left });
            }
        }
        if intersection.intersects(&proposed.bottom.right) {
            let hp = current.bottom.right;
            if hp.min.y >= other.max.y || was_on_slope {
                out.push(SideOffset { side: ContactSide::Bottom, offset: intersection.height() });
            } else if hp.max.x <= other.min.x {
                out.push(SideOffset { side: ContactSide::Right, offset: -(intersection.width() - insets.right) });
            }
        }
        out
    }

    fn left_contact_sides(
        intersection: &Rect,
        insets: VerticalInsets,
        current: &HitPoints,
        proposed: &HitPoints,
        other: &Rect,
        contacts_bottom: bool,
    ) -> Vec<SideOffset> {
        let mut out = Vec::new();
        if intersection.intersects(&proposed.left.top) {
            let hp = current.left.top;
            if hp.min.x >= other.max.x {
                out.push(SideOffset { side: ContactSide::Left, offset: intersection.width() });
            } else if hp.max.y <= other.min.y {
                out.push(SideOffset { side: ContactSide::Top, offset: -(intersection.height() - insets.top) });
            }
        }
        if intersection.intersects(&proposed.left.bottom) {
            let hp = current.left.bottom;
            if hp.min.x >= other.max.x || (hp.min.y >= other.max.y && !contacts_bottom) {
                out.push(SideOffset { side: ContactSide::Left, offset: intersection.width() });
            }
        }
        out
    }

    fn right_contact_sides(
        intersection: &Rect,
        insets: VerticalInsets,
        current: &HitPoints,
        proposed: &HitPoints,
        other: &Rect,
        contacts_bottom: bool,
    ) -> Vec<SideOffset> {
        let mut out = Vec::new();
        if intersection.intersects(&proposed.right.top) {
            let hp = current.right.top;
            if hp.max.x <= other.min.x {
                out.push(SideOffset { side: ContactSide::Right, offset: -intersection.width() });
            } else if hp.max.y <= other.min.y {
                out.push(SideOffset { side: ContactSide::Top, offset: -(intersection.height() - insets.top) });
            }
        }
        if intersection.intersects(&proposed.right.bottom) {
            let hp = current.right.bottom;
            if hp.max.x <= other.min.x || (hp.min.y >= other.max.y && !contacts_bottom) {
                out.push(SideOffset { side: ContactSide::Right, offset: -intersection.width() });
            }
        }
        out
    }

    fn contact_sides(
        movement: &ColliderMovement<'_>,
        intersection: &Rect,
        other: &Rect,
        was_on_slope: bool,
    ) -> Vec<SideOffset> {
        let c = movement.collider;
        let cur = &movement.current_hit_points;
        let prop = &movement.proposed_hit_points;

        let mut all = Self::top_contact_sides(intersection, c.top_insets(), cur, prop, other);
        all.extend(Self::bottom_contact_sides(
            intersection,
            c.bottom_insets(),
            cur,
            prop,
            other,
            was_on_slope,
        ));
        let contacts_bottom = all.iter().any(|s| s.side == ContactSide::Bottom);
        all.extend(Self::left_contact_sides(intersection, c.left_insets(), cur, prop, other, contacts_bottom));
        all.extend(Self::right_contact_sides(intersection, c.right_insets(), cur, prop, other, contacts_bottom));

        strongest_per_side(&all)
    }

    fn apply_side_offsets(position: Vec2, offsets: &[SideOffset]) -> (Vec2, ContactSides) {
        let mut p = position;
        let mut sides = ContactSides::default();
        for so in offsets {
            if so.side.is_vertical() {
                p.y += so.offset;
            } else {
                p.x += so.offset;
            }
            sides.insert(so.side);
        }
        (p, sides)
    }
}

/// Keep the largest correction (by magnitude) for each side.
pub fn strongest_per_side(offsets: &[SideOffset]) -> Vec<SideOffset> {
    ContactSide::ALL
        .iter()
        .filter_map(|side| {
            offsets
                .iter()
                .filter(|so| so.side == *side)
                .copied()
                .reduce(|best, so| if so.offset.abs() > best.offset.abs() { so } else { best })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collider::Collider;
    use crate::filter::CategoryMask;

    fn collider() -> Collider {
        Collider::uniform(CategoryMask::bit(0), Vec2::splat(20.0), 5.0).unwrap()
    }

    fn tile(col: f32, row: f32) -> Rect {
        Rect::from_origin_size(Vec2::new(col * 16.0, row * 16.0), Vec2::splat(16.0))
    }

    fn sides_for(current: Vec2, proposed: Vec2, other: Rect) -> Vec<SideOffset> {
        let c = collider();
        let m = ColliderMovement::new(&c, current, proposed);
        let i = m.proposed_frame.intersection(&other).unwrap();
        Narrowphase::contact_sides(&m, &i, &other, false)
    }

    #[test]
    fn test_landing_is_bottom_contact() {
        // falling onto tile (3,1) whose top is y = 32
        let out = sides_for(Vec2::new(56.0, 45.0), Vec2::new(56.0, 39.0), tile(3.0, 1.0));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].side, ContactSide::Bottom);
        assert!((out[0].offset - 3.0).abs() < 1e-5);
        let (p, sides) = Narrowphase::apply_side_offsets(Vec2::new(56.0, 39.0), &out);
        assert!((p.y - 42.0).abs() < 1e-5);
        assert!(sides.bottom && !sides.top && !sides.left && !sides.right);
    }

    #[test]
    fn test_head_bump_is_top_contact() {
        // jumping into the underside of tile (2,4), bottom at y = 64
        let out = sides_for(Vec2::new(40.0, 50.0), Vec2::new(40.0, 57.0), tile(2.0, 4.0));
        assert_eq!(out, vec![SideOffset { side: ContactSide::Top, offset: -3.0 }]);
    }

    #[test]
    fn test_walking_into_wall_is_right_contact() {
        // wall tile (4,2) starts at x = 64; body on the left of it
        let out = sides_for(Vec2::new(53.0, 40.0), Vec2::new(56.0, 40.0), tile(4.0, 2.0));
        assert_eq!(out, vec![SideOffset { side: ContactSide::Right, offset: -2.0 }]);
        let out = sides_for(Vec2::new(53.0, 40.0), Vec2::new(56.0, 40.0), tile(4.0, 2.0));
        let (p, _) = Narrowphase::apply_side_offsets(Vec2::new(56.0, 40.0), &out);
        assert!((p.x - 54.0).abs() < 1e-5);
    }

    #[test]
    fn test_walking_into_wall_on_left() {
        // wall tile (1,2) ends at x = 32
        let out = sides_for(Vec2::new(43.0, 40.0), Vec2::new(40.0, 40.0), tile(1.0, 2.0));
        assert_eq!(out, vec![SideOffset { side: ContactSide::Left, offset: 2.0 }]);
    }

    #[test]
    fn test_strongest_offset_wins_per_side() {
        let offsets = [
            SideOffset { side: ContactSide::Bottom, offset: 1.0 },
            SideOffset { side: ContactSide::Left, offset: 2.0 },
            SideOffset { side: ContactSide::Bottom, offset: 4.0 },
        ];
        let out = strongest_per_side(&offsets);
        assert_eq!(
            out,
            vec![
                SideOffset { side: ContactSide::Bottom, offset: 4.0 },
                SideOffset { side: ContactSide::Left, offset: 2.0 },
            ]
        );
    }

    #[test]
    fn test_was_on_slope_accepts_bottom_from_inside() {
        let c = collider();
        // current bottom (y = 30) already below the tile top (y = 32)
        let m = ColliderMovement::new(&c, Vec2::new(56.0, 40.0), Vec2::new(58.0, 40.0));
        let other = tile(3.0, 1.0);
        let i = m.proposed_frame.intersection(&other).unwrap();
        let without = Narrowphase::contact_sides(&m, &i, &other, false);
        assert!(without.iter().all(|s| s.side != ContactSide::Bottom));
        let with = Narrowphase::contact_sides(&m, &i, &other, true);
        assert!(with.iter().any(|s| s.side == ContactSide::Bottom && (s.offset - 2.0).abs() < 1e-5));
    }
}
