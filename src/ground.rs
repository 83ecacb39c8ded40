//! Contacts between a moving collider and the tiles of the collision map.

use glam::Vec2;

use crate::api::NarrowphaseApi;
use crate::collider::ColliderMovement;
use crate::narrowphase::Narrowphase;
use crate::slope::{SlopeContext, SlopeProfile};
use crate::tilemap::CollisionTileMap;
use crate::tiles::{ColliderTile, TileRepresentation};
use crate::types::*;

/// Slope corrections smaller than this count as standing on the surface.
pub const SLOPE_REST_EPSILON: f32 = 1e-3;

/// Width of the face strip of a jump wall tile that reports wall contact.
const JUMP_WALL_STRIP: f32 = 1.0;

/// A grid cell overlapping the proposed frame. `tile` is `None` for empty cells.
#[derive(Clone, Debug)]
pub struct TileIntersection<'m> {
    pub coord: TileCoord,
    pub tile: Option<&'m TileRepresentation>,
    pub frame: Rect,
    pub intersection: Rect,
}

/// Cells overlapping the proposed frame, nearest to the current position
/// first. Also returns the number of grid cells inspected.
pub fn tile_intersections<'m>(
    map: &'m CollisionTileMap,
    movement: &ColliderMovement<'_>,
) -> (Vec<TileIntersection<'m>>, usize) {
    let Some(range) = map.tile_range_around_frame(&movement.proposed_frame) else {
        return (Vec::new(), 0);
    };

    let mut tested = 0;
    let mut out = Vec::new();
    for column in range.left..=range.right {
        for row in range.bottom..=range.top {
            tested += 1;
            let coord = TileCoord::new(column, row);
            let frame = map.tile_frame(coord);
            if let Some(intersection) = frame.intersection(&movement.proposed_frame) {
                out.push(TileIntersection {
                    coord,
                    tile: map.tile_at(column, row),
                    frame,
                    intersection,
                });
            }
        }
    }

    let from = movement.current_position;
    out.sort_by(|a, b| {
        let da = a.frame.center().distance_squared(from);
        let db = b.frame.center().distance_squared(from);
        da.total_cmp(&db)
    });
    (out, tested)
}

/// First tile contact that corrects the body, if any.
///
/// Sense-only contacts and contacts that leave the body where it is (standing
/// exactly on a slope) are pushed to `contacts` and recorded in `state`.
pub fn ground_contact(
    map: &CollisionTileMap,
    body: &BodyDesc,
    movement: &ColliderMovement<'_>,
    state: &mut TickState,
    contacts: &mut Vec<Contact>,
) -> Option<Correction> {
    let collide = match body.caps.tile_response {
        TileResponse::Ignore => return None,
        TileResponse::Sense if state.ground_sensed => return None,
        TileResponse::Sense => false,
        TileResponse::Block => true,
    };

    let (intersections, tested) = tile_intersections(map, movement);
    state.tile_tests += tested;
    let (occupied, empty): (Vec<_>, Vec<_>) = intersections.into_iter().partition(|ti| ti.tile.is_some());

    for ti in &occupied {
        let Some(tile) = ti.tile else {
            continue;
        };
        let found = match tile.tile {
            ColliderTile::Ground => rect_contact(body, movement, ti, state, false, collide),
            ColliderTile::OneWay => rect_contact(body, movement, ti, state, true, collide),
            ColliderTile::JumpWallLeft | ColliderTile::JumpWallRight => {
                if collide && !state.sides.bottom {
                    flag_jump_wall(ti, state);
                }
                rect_contact(body, movement, ti, state, false, collide)
            }
            ColliderTile::Slope(profile) => {
                let Some(context) = map.slope_context_at(ti.coord) else {
                    continue;
                };
                if collide {
                    slope_contact(body, movement, ti, profile, context, state, contacts)
                } else {
                    rect_contact(body, movement, ti, state, false, false).map(|mut c| {
                        c.contact.other = ContactedObject::Slope(context.clone());
                        c
                    })
                }
            }
        };

        let Some(found) = found else {
            continue;
        };
        if found.contact.is_collision {
            log::trace!(
                "body {} hits tile ({}, {}) on {:?}",
                body.key,
                ti.coord.column,
                ti.coord.row,
                found.contact.sides
            );
            return Some(found);
        }
        state.ground_sensed = true;
        contacts.push(found.contact);
        break;
    }

    empty_tiles_contact(map, body, movement, &empty, state, contacts);
    None
}

/// Flag corner jump areas and gaps among the empty cells the body overlaps.
/// Gap contacts go to `contacts`, at most one per tick.
pub fn empty_tiles_contact(
    map: &CollisionTileMap,
    body: &BodyDesc,
    movement: &ColliderMovement<'_>,
    empty: &[TileIntersection<'_>],
    state: &mut TickState,
    contacts: &mut Vec<Contact>,
) {
    let bottom = &movement.proposed_hit_points.bottom;
    for ti in empty.iter().filter(|ti| ti.tile.is_none()) {
        if map.is_corner_jump(ti.coord) {
            if state.on_corner_jump || state.discards_corner_jump {
                continue;
            }
            let feet_inside = ti.intersection.intersects(&bottom.left) || ti.intersection.intersects(&bottom.right);
            if state.was_on_corner_jump || (feet_inside && state.was_on_ground) {
                state.on_corner_jump = true;
            } else {
                state.discards_corner_jump = true;
            }
        }

        if state.on_gap || !map.contacts_gap(ti.coord, &movement.proposed_frame) {
            continue;
        }
        state.on_gap = true;
        let sides: ContactSides = Narrowphase::contact_sides(movement, &ti.intersection, &ti.frame, false)
            .iter()
            .map(|so| so.side)
            .collect();
        log::trace!("body {} over gap at ({}, {})", body.key, ti.coord.column, ti.coord.row);
        contacts.push(Contact {
            body: body.key,
            other: ContactedObject::Gap,
            is_collision: false,
            sides,
            other_sides: sides.mirrored(),
            intersection: ti.intersection,
            tile: Some(ti.coord),
        });
    }
}

/// A bottom hit point of `body` at `position` rests exactly on a tile
/// top or a slope surface, within [`SLOPE_REST_EPSILON`].
pub fn touches_ground(map: &CollisionTileMap, body: &BodyDesc, position: Vec2) -> bool {
    let size = map.tile_size();
    let bottom = body.collider.hit_points(position).bottom;
    [bottom.left, bottom.right].iter().any(|corner| {
        let x = corner.center().x;
        let y = corner.min.y;
        let coord = TileCoord::new(
            (x / size.x).floor() as i32,
            ((y - SLOPE_REST_EPSILON) / size.y).floor() as i32,
        );
        let Some(tile) = map.tile_at(coord.column, coord.row) else {
            return false;
        };
        let frame = map.tile_frame(coord);
        let surface = match tile.tile {
            ColliderTile::OneWay if body.caps.pushes_down => return false,
            ColliderTile::Slope(profile) => profile.surface_y(x, &frame),
            _ => frame.max.y,
        };
        (y - surface).abs() <= SLOPE_REST_EPSILON
    })
}

/// Solid, one-way and jump wall tiles behave as plain rectangles.
fn rect_contact(
    body: &BodyDesc,
    movement: &ColliderMovement<'_>,
    ti: &TileIntersection<'_>,
    state: &TickState,
    one_way: bool,
    collide: bool,
) -> Option<Correction> {
    // slope memory must not pull a rising body onto a one-way top
    let was_on_slope = state.was_on_slope && !one_way;
    let mut offsets = Narrowphase::contact_sides(movement, &ti.intersection, &ti.frame, was_on_slope);
    if one_way {
        if body.caps.pushes_down || movement.vertical_delta() > 0.0 {
            return None;
        }
        offsets.retain(|so| so.side == ContactSide::Bottom);
    }
    if offsets.is_empty() {
        return None;
    }

    let (position, sides) = if collide {
        Narrowphase::apply_side_offsets(movement.proposed_position, &offsets)
    } else {
        let sides = offsets.iter().map(|so| so.side).collect();
        (movement.proposed_position, sides)
    };

    Some(Correction {
        position,
        contact: Contact {
            body: body.key,
            other: ContactedObject::Ground,
            is_collision: collide,
            sides,
            other_sides: sides.mirrored(),
            intersection: ti.intersection,
            tile: Some(ti.coord),
        },
    })
}

fn flag_jump_wall(ti: &TileIntersection<'_>, state: &mut TickState) {
    let Some(tile) = ti.tile else {
        return;
    };
    let f = ti.frame;
    match tile.tile {
        ColliderTile::JumpWallLeft => {
            let strip = Rect::new(f.min, Vec2::new(f.min.x + JUMP_WALL_STRIP, f.max.y));
            if ti.intersection.intersects(&strip) {
                state.pushes_left_jump_wall = true;
            }
        }
        ColliderTile::JumpWallRight => {
            let strip = Rect::new(Vec2::new(f.max.x - JUMP_WALL_STRIP, f.min.y), f.max);
            if ti.intersection.intersects(&strip) {
                state.pushes_right_jump_wall = true;
            }
        }
        _ => {}
    }
}

/// Test the uphill bottom hit point against the slope surface.
fn slope_contact(
    body: &BodyDesc,
    movement: &ColliderMovement<'_>,
    ti: &TileIntersection<'_>,
    profile: SlopeProfile,
    context: &SlopeContext,
    state: &mut TickState,
    contacts: &mut Vec<Contact>,
) -> Option<Correction> {
    let hp = &movement.proposed_hit_points.bottom;
    let corner = if profile.rises_to_right() { hp.right } else { hp.left };
    let corner_hit = ti.intersection.intersection(&corner)?;

    let offset = profile.contact_offset(&corner, &ti.frame);
    // only snap down onto the surface while not moving up
    if offset < 0.0 && movement.vertical_delta() > 0.0 {
        return None;
    }

    state.on_slope = Some(context.clone());
    let sides: ContactSides = [ContactSide::Bottom].into_iter().collect();
    let contact = Contact {
        body: body.key,
        other: ContactedObject::Slope(context.clone()),
        is_collision: true,
        sides,
        other_sides: sides.mirrored(),
        intersection: corner_hit,
        tile: Some(ti.coord),
    };

    if offset.abs() <= SLOPE_REST_EPSILON {
        state.sides.insert(ContactSide::Bottom);
        contacts.push(contact);
        return None;
    }

    let mut position = movement.proposed_position;
    position.y += offset;
    Some(Correction { position, contact })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collider::Collider;
    use crate::filter::CategoryMask;

    const TILE: f32 = 16.0;

    /// 8 x 8 map with a ground row at row 1 and the given extra tiles.
    fn map_with(extra: &[(usize, usize, ColliderTile)]) -> CollisionTileMap {
        let mut grid = vec![vec![None; 8]; 8];
        for column in grid.iter_mut() {
            column[1] = Some(TileRepresentation::new(ColliderTile::Ground));
        }
        for (c, r, t) in extra {
            grid[*c][*r] = Some(TileRepresentation::new(*t));
        }
        CollisionTileMap::new(grid, Vec2::splat(TILE)).unwrap()
    }

    fn body(current: Vec2, proposed: Vec2) -> BodyDesc {
        BodyDesc {
            key: 7,
            collider: Collider::uniform(CategoryMask::bit(0), Vec2::splat(20.0), 5.0).unwrap(),
            current,
            proposed,
            caps: Capabilities::default(),
        }
    }

    fn run(map: &CollisionTileMap, b: &BodyDesc, state: &mut TickState) -> (Option<Correction>, Vec<Contact>) {
        let m = ColliderMovement::new(&b.collider, b.current, b.proposed);
        let mut contacts = Vec::new();
        let c = ground_contact(map, b, &m, state, &mut contacts);
        (c, contacts)
    }

    #[test]
    fn test_nearest_tile_first() {
        let map = map_with(&[]);
        let b = body(Vec2::new(40.0, 45.0), Vec2::new(40.0, 38.0));
        let m = ColliderMovement::new(&b.collider, b.current, b.proposed);
        let (cells, tested) = tile_intersections(&map, &m);
        assert!(tested > 0);
        let tiles: Vec<_> = cells.iter().filter(|t| t.tile.is_some()).collect();
        assert_eq!(tiles.len(), 3);
        assert_eq!(tiles[0].coord, TileCoord::new(2, 1));
        assert!(tiles.iter().all(|t| t.coord.row == 1));
        // the frame spans y 28..48: the rest are empty cells of rows 2
        assert_eq!(cells.len(), 6);
        assert!(cells.iter().filter(|t| t.tile.is_none()).all(|t| t.coord.row == 2));
    }

    #[test]
    fn test_one_way_blocks_only_from_above() {
        let map = map_with(&[(3, 3, ColliderTile::OneWay)]);
        // tile (3,3) spans y 48..64
        let mut state = TickState::default();
        let above = body(Vec2::new(56.0, 76.0), Vec2::new(56.0, 72.0));
        let (c, _) = run(&map, &above, &mut state);
        let c = c.unwrap();
        assert!((c.position.y - 74.0).abs() < 1e-5);
        assert!(c.contact.sides.bottom);

        let mut state = TickState::default();
        let below = body(Vec2::new(56.0, 40.0), Vec2::new(56.0, 46.0));
        assert!(run(&map, &below, &mut state).0.is_none());

        let mut dropping = above;
        dropping.caps.pushes_down = true;
        let mut state = TickState::default();
        assert!(run(&map, &dropping, &mut state).0.is_none());
    }

    #[test]
    fn test_sense_response_reports_once_without_moving() {
        let map = map_with(&[]);
        let mut b = body(Vec2::new(40.0, 45.0), Vec2::new(40.0, 38.0));
        b.caps.tile_response = TileResponse::Sense;
        let mut state = TickState::default();
        let (c, contacts) = run(&map, &b, &mut state);
        assert!(c.is_none());
        assert_eq!(contacts.len(), 1);
        assert!(!contacts[0].is_collision);
        assert!(contacts[0].sides.bottom);
        assert!(state.ground_sensed);
        let (_, again) = run(&map, &b, &mut state);
        assert!(again.is_empty());
    }

    #[test]
    fn test_ignore_response_skips_tiles() {
        let map = map_with(&[]);
        let mut b = body(Vec2::new(40.0, 45.0), Vec2::new(40.0, 38.0));
        b.caps.tile_response = TileResponse::Ignore;
        let mut state = TickState::default();
        let (c, contacts) = run(&map, &b, &mut state);
        assert!(c.is_none() && contacts.is_empty());
        assert_eq!(state.tile_tests, 0);
    }

    #[test]
    fn test_jump_wall_sets_flag_while_airborne() {
        // wall tile (4,3) spans x 64..80; body pushes into its left face
        let map = map_with(&[(4, 3, ColliderTile::JumpWallLeft)]);
        let b = body(Vec2::new(53.0, 56.0), Vec2::new(56.0, 55.0));
        let mut state = TickState::default();
        let (c, _) = run(&map, &b, &mut state);
        assert!(state.pushes_left_jump_wall);
        assert!(!state.pushes_right_jump_wall);
        let c = c.unwrap();
        assert!(c.contact.sides.right);
        assert!((c.position.x - 54.0).abs() < 1e-5);

        let mut grounded = TickState::default();
        grounded.sides.bottom = true;
        run(&map, &b, &mut grounded);
        assert!(!grounded.pushes_left_jump_wall);
    }

    #[test]
    fn test_slope_lifts_uphill_corner_to_surface() {
        // rising slope at (3,2): y 32..48, surface at local x 8.5 is 32 + 9 = 41
        let slope = ColliderTile::Slope(SlopeProfile::new(15, 0).unwrap());
        let map = map_with(&[(3, 2, slope)]);
        // bottom.right hit point sits at x 56..57, y 34..35 for p = (52, 44)
        let b = body(Vec2::new(50.0, 46.0), Vec2::new(52.0, 44.0));
        let mut state = TickState::default();
        let (c, _) = run(&map, &b, &mut state);
        let c = c.unwrap();
        assert!(matches!(c.contact.other, ContactedObject::Slope(_)));
        assert!((c.position.y - 51.0).abs() < 1e-4);
        assert!(state.on_slope.is_some());

        // standing exactly on the surface does not move the body
        let resting = body(Vec2::new(52.0, 51.0), Vec2::new(52.0, 51.0));
        let mut state = TickState::default();
        let (c, contacts) = run(&map, &resting, &mut state);
        assert!(c.is_none());
        assert!(state.sides.bottom);
        // the empty column left of the slope also reports a gap
        let slopes: Vec<_> = contacts.iter().filter(|c| c.other != ContactedObject::Gap).collect();
        assert_eq!(slopes.len(), 1);
        assert!(state.on_gap);
    }

    #[test]
    fn test_one_way_ignores_slope_memory() {
        let map = map_with(&[(3, 3, ColliderTile::OneWay)]);
        let mut state = TickState { was_on_slope: true, ..Default::default() };
        // jumping up from a slope into the one-way tile
        let rising = body(Vec2::new(56.0, 50.0), Vec2::new(56.0, 60.0));
        assert!(run(&map, &rising, &mut state).0.is_none());
        assert!(!state.sides.bottom);

        // already inside it and sinking: still no landing from below
        let sinking = body(Vec2::new(56.0, 60.0), Vec2::new(56.0, 59.0));
        let mut state = TickState { was_on_slope: true, ..Default::default() };
        assert!(run(&map, &sinking, &mut state).0.is_none());
    }

    fn empty_run(map: &CollisionTileMap, b: &BodyDesc, state: &mut TickState) -> Vec<Contact> {
        let m = ColliderMovement::new(&b.collider, b.current, b.proposed);
        let (cells, _) = tile_intersections(map, &m);
        let empty: Vec<_> = cells.into_iter().filter(|t| t.tile.is_none()).collect();
        let mut contacts = Vec::new();
        empty_tiles_contact(map, b, &m, &empty, state, &mut contacts);
        contacts
    }

    fn ground_tile() -> Option<TileRepresentation> {
        Some(TileRepresentation::new(ColliderTile::Ground))
    }

    #[test]
    fn test_gap_reported_once() {
        let map = CollisionTileMap::new(vec![vec![ground_tile()], vec![None]], Vec2::splat(TILE)).unwrap();
        let b = body(Vec2::new(16.0, 30.0), Vec2::new(16.0, 24.0));
        let mut state = TickState::default();
        let contacts = empty_run(&map, &b, &mut state);
        assert!(state.on_gap);
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].other, ContactedObject::Gap);
        assert!(!contacts[0].is_collision);
        assert_eq!(contacts[0].tile, Some(TileCoord::new(1, 0)));
        assert!(empty_run(&map, &b, &mut state).is_empty());
    }

    fn ledge_map() -> CollisionTileMap {
        CollisionTileMap::new(vec![vec![ground_tile(), None], vec![None, None]], Vec2::splat(TILE)).unwrap()
    }

    #[test]
    fn test_corner_jump_after_ground_or_corner_jump() {
        let map = ledge_map();
        let b = body(Vec2::new(16.0, 24.0), Vec2::new(16.0, 24.0));

        let mut state = TickState { was_on_ground: true, ..Default::default() };
        empty_run(&map, &b, &mut state);
        assert!(state.on_corner_jump);

        let mut state = TickState { was_on_corner_jump: true, ..Default::default() };
        empty_run(&map, &b, &mut state);
        assert!(state.on_corner_jump);

        // never stood on the ledge
        let mut state = TickState::default();
        empty_run(&map, &b, &mut state);
        assert!(!state.on_corner_jump);
        assert!(state.discards_corner_jump);
    }

    #[test]
    fn test_corner_jump_discarded() {
        let map = ledge_map();
        let falling = body(Vec2::new(16.0, 24.0), Vec2::new(16.0, 0.0));
        let mut state = TickState { was_on_ground: true, ..Default::default() };
        let contacts = empty_run(&map, &falling, &mut state);
        assert!(state.discards_corner_jump);
        assert!(!state.on_corner_jump);
        assert!(contacts.is_empty());

        let standing = body(Vec2::new(16.0, 24.0), Vec2::new(16.0, 24.0));
        let mut state = TickState { was_on_ground: true, discards_corner_jump: true, ..Default::default() };
        empty_run(&map, &standing, &mut state);
        assert!(!state.on_corner_jump);
    }

    #[test]
    fn test_touches_ground_on_tile_tops_and_slopes() {
        let slope = ColliderTile::Slope(SlopeProfile::new(15, 0).unwrap());
        let map = map_with(&[(3, 2, slope), (6, 3, ColliderTile::OneWay)]);
        assert!(touches_ground(&map, &body(Vec2::ZERO, Vec2::ZERO), Vec2::new(20.0, 42.0)));
        assert!(!touches_ground(&map, &body(Vec2::ZERO, Vec2::ZERO), Vec2::new(20.0, 42.5)));
        // slope surface under the uphill corner is y = 41
        assert!(touches_ground(&map, &body(Vec2::ZERO, Vec2::ZERO), Vec2::new(52.0, 51.0)));
        assert!(!touches_ground(&map, &body(Vec2::ZERO, Vec2::ZERO), Vec2::new(52.0, 52.0)));

        // one-way top at y = 64
        let mut b = body(Vec2::ZERO, Vec2::ZERO);
        assert!(touches_ground(&map, &b, Vec2::new(104.0, 74.0)));
        b.caps.pushes_down = true;
        assert!(!touches_ground(&map, &b, Vec2::new(104.0, 74.0)));
    }
}
