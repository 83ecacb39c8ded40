//! Contacts between bodies: snappables, rigid blockers and sensors.

use crate::api::NarrowphaseApi;
use crate::collider::ColliderMovement;
use crate::filter::{CategoryMask, CollisionPolicy, Interaction};
use crate::narrowphase::Narrowphase;
use crate::types::*;
use glam::Vec2;

/// A body already resolved this tick, seen as an obstacle by later bodies.
#[derive(Copy, Clone, Debug)]
pub struct Obstacle {
    pub key: ColKey,
    pub category: CategoryMask,
    /// Frame at the resolved position.
    pub frame: Rect,
    /// Frame at the position the tick started from.
    pub current_frame: Rect,
    pub snappable: Option<Snappable>,
}

impl Obstacle {
    pub fn new(body: &BodyDesc, resolved: Vec2) -> Self {
        Self {
            key: body.key,
            category: body.collider.category(),
            frame: body.collider.frame(resolved),
            current_frame: body.collider.frame(body.current),
            snappable: body.caps.snappable,
        }
    }
}

/// How `body` treats `other` once the policy has spoken.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Treatment {
    Pass,
    Collide { one_way: bool },
    SenseOnly,
}

fn treatment(policy: &CollisionPolicy, body: &BodyDesc, other: &Obstacle) -> Treatment {
    match policy.interaction(body.collider.category(), other.category) {
        Interaction::Ignore | Interaction::Sense => Treatment::Pass,
        Interaction::Block => Treatment::Collide { one_way: false },
        Interaction::Snap => match other.snappable {
            Some(s) if body.caps.snapper => Treatment::Collide { one_way: s.one_way },
            Some(_) => Treatment::SenseOnly,
            // neither side can be stood on; fall back to rigid blocking
            None => Treatment::Collide { one_way: false },
        },
    }
}

/// First obstacle contact that corrects the body, if any. Non-collision
/// contacts with snappables the body may not stand on go to `contacts`.
///
/// With no correction, the tile-sized areas beside every snappable the body
/// can stand on are checked for corner jumps.
pub fn body_contact(
    body: &BodyDesc,
    movement: &ColliderMovement<'_>,
    obstacles: &[Obstacle],
    policy: &CollisionPolicy,
    tile_size: Option<Vec2>,
    state: &mut TickState,
    contacts: &mut Vec<Contact>,
) -> Option<Correction> {
    for other in obstacles {
        if other.key == body.key {
            continue;
        }
        let Some(intersection) = movement.proposed_frame.intersection(&other.frame) else {
            continue;
        };
        let treat = treatment(policy, body, other);
        if treat == Treatment::Pass {
            continue;
        }

        let mut offsets =
            Narrowphase::contact_sides(movement, &intersection, &other.current_frame, state.was_on_slope);
        let sense = Contact {
            body: body.key,
            other: ContactedObject::Body(other.key),
            is_collision: false,
            sides: offsets.iter().map(|so| so.side).collect(),
            other_sides: ContactSides::default(),
            intersection,
            tile: None,
        };

        let Treatment::Collide { one_way } = treat else {
            contacts.push(sense);
            continue;
        };
        if one_way {
            let lands = offsets.iter().any(|so| so.side == ContactSide::Bottom);
            if !lands || body.caps.pushes_down {
                contacts.push(sense);
                continue;
            }
            offsets.retain(|so| so.side == ContactSide::Bottom);
        }
        if offsets.is_empty() {
            continue;
        }

        let (position, sides) = Narrowphase::apply_side_offsets(movement.proposed_position, &offsets);
        log::trace!("body {} blocked by body {} on {:?}", body.key, other.key, sides);
        return Some(Correction {
            position,
            contact: Contact {
                body: body.key,
                other: ContactedObject::Body(other.key),
                is_collision: true,
                sides,
                other_sides: sides.mirrored(),
                intersection,
                tile: None,
            },
        });
    }

    if let Some(tile_size) = tile_size {
        for other in obstacles.iter().filter(|o| o.key != body.key && o.snappable.is_some()) {
            if matches!(treatment(policy, body, other), Treatment::Collide { .. }) {
                snappable_corner_jump(movement, other, tile_size, state);
            }
        }
    }
    None
}

/// Corner jump areas are one tile wide, on both sides of the snappable,
/// topped one unit above its top edge.
fn snappable_corner_jump(movement: &ColliderMovement<'_>, snappable: &Obstacle, tile_size: Vec2, state: &mut TickState) {
    if state.on_corner_jump || state.discards_corner_jump {
        return;
    }
    let f = snappable.frame;
    let y = f.max.y - tile_size.y + 1.0;
    let left = Rect::from_origin_size(Vec2::new(f.min.x - tile_size.x, y), tile_size);
    let right = Rect::from_origin_size(Vec2::new(f.max.x, y), tile_size);

    let Some(intersection) = movement
        .proposed_frame
        .intersection(&left)
        .or_else(|| movement.proposed_frame.intersection(&right))
    else {
        return;
    };
    let bottom = &movement.proposed_hit_points.bottom;
    if !intersection.intersects(&bottom.left) && !intersection.intersects(&bottom.right) {
        return;
    }

    if state.was_on_corner_jump || state.was_on_ground {
        state.on_corner_jump = true;
    } else {
        state.discards_corner_jump = true;
    }
}

/// Sense contact between two resolved bodies whose categories are paired as
/// `Sense`. Sides are classified for both parties.
pub fn sense_contact(
    a: &BodyDesc,
    a_resolved: Vec2,
    b: &BodyDesc,
    b_resolved: Vec2,
) -> Option<Contact> {
    let ma = ColliderMovement::new(&a.collider, a.current, a_resolved);
    let mb = ColliderMovement::new(&b.collider, b.current, b_resolved);
    let intersection = ma.proposed_frame.intersection(&mb.proposed_frame)?;

    let a_sides = Narrowphase::contact_sides(&ma, &intersection, &mb.current_frame(), false);
    let b_sides = Narrowphase::contact_sides(&mb, &intersection, &ma.current_frame(), false);
    Some(Contact {
        body: a.key,
        other: ContactedObject::Body(b.key),
        is_collision: false,
        sides: a_sides.iter().map(|so| so.side).collect(),
        other_sides: b_sides.iter().map(|so| so.side).collect(),
        intersection,
        tile: None,
    })
}
