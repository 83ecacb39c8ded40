use glam::Vec2;

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use crate::api::CollisionsApi;
use crate::collider::ColliderMovement;
use crate::dynamic::{body_contact, sense_contact, Obstacle};
use crate::filter::{CollisionPolicy, Interaction};
use crate::ground::{ground_contact, touches_ground};
use crate::tilemap::CollisionTileMap;
use crate::types::*;

/// Per-tick movement resolver over a tile map and the bodies pushed this frame.
///
/// Bodies are resolved one after another: snappable bodies first, then the
/// rest, each group in push order. A body only collides with bodies resolved
/// before it, seen at their resolved position.
pub struct CollisionsController {
    pub cfg: WorldConfig,
    pub frame_counter: u32,

    tile_map: Option<CollisionTileMap>,
    policy: CollisionPolicy,

    // Frame-local storage
    bodies: Vec<BodyDesc>,
    key_to_id: HashMap<ColKey, FrameId>,
    resolutions: Vec<Resolution>,

    // Contact record of this tick and the previous one
    contacts: Vec<Contact>,
    previous_contacts: Vec<Contact>,
    // Drainable copy of `contacts`
    events: Vec<Contact>,

    // Keys of bodies that ended the last tick on a slope, on the ground or
    // inside a corner jump area
    slope_memory: HashSet<ColKey>,
    ground_memory: HashSet<ColKey>,
    corner_jump_memory: HashSet<ColKey>,

    stats: WorldStats,
    last_timing: Option<WorldTiming>,
}

impl CollisionsApi for CollisionsController {
    fn new(cfg: WorldConfig, tile_map: Option<CollisionTileMap>, policy: CollisionPolicy) -> Self {
        Self {
            cfg,
            frame_counter: 0,
            tile_map,
            policy,
            bodies: Vec::new(),
            key_to_id: HashMap::new(),
            resolutions: Vec::new(),
            contacts: Vec::new(),
            previous_contacts: Vec::new(),
            events: Vec::new(),
            slope_memory: HashSet::new(),
            ground_memory: HashSet::new(),
            corner_jump_memory: HashSet::new(),
            stats: WorldStats::default(),
            last_timing: None,
        }
    }

    fn begin_frame(&mut self) {
        if self.cfg.track_contact_states {
            self.previous_contacts = std::mem::take(&mut self.contacts);
        } else {
            self.previous_contacts.clear();
            self.contacts.clear();
        }
        self.bodies.clear();
        self.key_to_id.clear();
        self.resolutions.clear();
        self.events.clear();
        self.stats = WorldStats::default();
        self.last_timing = None;
        self.frame_counter = self.frame_counter.wrapping_add(1);
    }

    fn push(&mut self, desc: BodyDesc) -> FrameId {
        let id = FrameId(self.bodies.len() as u32);
        debug_assert!(
            !self.key_to_id.contains_key(&desc.key),
            "Duplicate body key encountered within a frame"
        );
        self.key_to_id.insert(desc.key, id);
        self.bodies.push(desc);
        id
    }

    fn resolve(&mut self) {
        let t_all = if self.cfg.enable_timing { Some(Instant::now()) } else { None };
        let mut stats = WorldStats {
            bodies: self.bodies.len(),
            ..Default::default()
        };

        let (snappables, others): (Vec<usize>, Vec<usize>) =
            (0..self.bodies.len()).partition(|&i| self.bodies[i].caps.snappable.is_some());
        stats.snappables = snappables.len();

        let mut slots: Vec<Option<Resolution>> = vec![None; self.bodies.len()];
        let mut obstacles: Vec<Obstacle> = Vec::with_capacity(self.bodies.len());
        let mut raw_contacts = Vec::new();

        let t0 = if self.cfg.enable_timing { Some(Instant::now()) } else { None };
        for &i in &snappables {
            let r = self.resolve_body(i, &obstacles, &mut raw_contacts, &mut stats);
            obstacles.push(Obstacle::new(&self.bodies[i], r.position));
            slots[i] = Some(r);
        }
        let snappables_ms = t0.map(|t| t.elapsed().as_secs_f64() * 1000.0).unwrap_or(0.0);

        let t1 = if self.cfg.enable_timing { Some(Instant::now()) } else { None };
        for &i in &others {
            let r = self.resolve_body(i, &obstacles, &mut raw_contacts, &mut stats);
            obstacles.push(Obstacle::new(&self.bodies[i], r.position));
            slots[i] = Some(r);
        }
        let bodies_ms = t1.map(|t| t.elapsed().as_secs_f64() * 1000.0).unwrap_or(0.0);

        let resolutions: Vec<Resolution> = slots.into_iter().flatten().collect();

        let t2 = if self.cfg.enable_timing { Some(Instant::now()) } else { None };
        self.sense_pairs(&resolutions, &mut raw_contacts, &mut stats);
        let sense_ms = t2.map(|t| t.elapsed().as_secs_f64() * 1000.0).unwrap_or(0.0);

        let keys_where = |f: fn(&Resolution) -> bool| -> HashSet<ColKey> {
            resolutions.iter().filter(|r| f(r)).map(|r| r.key).collect()
        };
        self.slope_memory = keys_where(|r| r.on_slope.is_some());
        self.ground_memory = keys_where(Resolution::on_ground);
        self.corner_jump_memory = keys_where(|r| r.on_corner_jump);
        self.resolutions = resolutions;
        self.contacts = merge_contacts(raw_contacts, self.cfg.max_contacts);
        self.events = self.contacts.clone();
        stats.contacts = self.contacts.len();
        self.stats = stats;

        log::debug!(
            "frame {}: {} bodies resolved in {} passes, {} contacts",
            self.frame_counter,
            stats.bodies,
            stats.resolution_passes,
            stats.contacts
        );

        if let Some(t_all) = t_all {
            self.last_timing = Some(WorldTiming {
                resolve_ms: t_all.elapsed().as_secs_f64() * 1000.0,
                snappables_ms,
                bodies_ms,
                sense_ms,
            });
        }
    }

    fn resolutions(&self) -> &[Resolution] {
        &self.resolutions
    }

    fn resolution(&self, id: FrameId) -> Option<&Resolution> {
        self.resolutions.get(id.0 as usize)
    }

    fn resolution_by_key(&self, key: ColKey) -> Option<&Resolution> {
        let id = *self.key_to_id.get(&key)?;
        self.resolution(id)
    }

    fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    fn drain_contacts(&mut self) -> Vec<Contact> {
        std::mem::take(&mut self.events)
    }

    fn contact_state(&self, contact: &Contact) -> Option<ContactState> {
        if !self.contacts.iter().any(|c| c.same_relation(contact)) {
            return None;
        }
        if self.previous_contacts.iter().any(|c| c.same_relation(contact)) {
            Some(ContactState::Stayed)
        } else {
            Some(ContactState::Entered)
        }
    }

    fn exit_contacts(&self) -> Vec<Contact> {
        self.previous_contacts
            .iter()
            .filter(|p| !self.contacts.iter().any(|c| c.same_relation(p)))
            .cloned()
            .collect()
    }
}

impl CollisionsController {
    pub fn tile_map(&self) -> Option<&CollisionTileMap> {
        self.tile_map.as_ref()
    }

    /// Swap the level. Memory of the previous tick belongs to the old map
    /// and is dropped.
    pub fn set_tile_map(&mut self, tile_map: Option<CollisionTileMap>) {
        self.tile_map = tile_map;
        self.slope_memory.clear();
        self.ground_memory.clear();
        self.corner_jump_memory.clear();
    }

    pub fn policy(&self) -> &CollisionPolicy {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut CollisionPolicy {
        &mut self.policy
    }

    fn resolve_body(
        &self,
        index: usize,
        obstacles: &[Obstacle],
        contacts: &mut Vec<Contact>,
        stats: &mut WorldStats,
    ) -> Resolution {
        let body = &self.bodies[index];
        let mut state = TickState {
            was_on_slope: self.slope_memory.contains(&body.key),
            was_on_ground: self.ground_memory.contains(&body.key),
            was_on_corner_jump: self.corner_jump_memory.contains(&body.key),
            ..Default::default()
        };
        let outside_map_bounds = self
            .tile_map
            .as_ref()
            .is_some_and(|m| m.is_outside(&body.collider.frame(body.current)));

        let mut from = body.current;
        let mut target = body.proposed;
        let mut passes = 0u32;
        let position = loop {
            let mut last = from;
            let mut hit = None;
            let steps = interpolated_positions(
                from,
                target,
                self.cfg.interpolation_max_delta,
                self.cfg.max_interpolation_steps,
            );
            for step in steps {
                let movement = ColliderMovement::new(&body.collider, last, step);
                hit = self.correction_at(body, &movement, obstacles, outside_map_bounds, &mut state, contacts);
                if hit.is_some() {
                    break;
                }
                last = step;
            }
            let Some(correction) = hit else {
                break target;
            };

            passes += 1;
            let sides = correction.contact.sides;
            state.sides = state.sides.union(sides);
            contacts.push(correction.contact);

            if state.crushed() {
                log::debug!("body {} crushed ({:?})", body.key, state.sides);
                break correction.position;
            }
            if passes >= self.cfg.max_resolution_passes {
                log::warn!(
                    "body {} still colliding after {} passes, keeping last correction",
                    body.key,
                    passes
                );
                stats.capped_bodies += 1;
                break correction.position;
            }
            // keep moving along the axes that were not blocked
            if sides.blocks_vertical() {
                target.y = correction.position.y;
            }
            if sides.blocks_horizontal() {
                target.x = correction.position.x;
            }
            from = correction.position;
        };

        stats.resolution_passes += passes as usize;
        stats.tile_tests += state.tile_tests;
        let crushed = state.crushed();

        // landing exactly on a surface produces no overlap, hence no contact
        let settles = !state.sides.bottom
            && !outside_map_bounds
            && body.caps.tile_response == TileResponse::Block
            && body.proposed.y <= body.current.y;
        if settles && self.tile_map.as_ref().is_some_and(|m| touches_ground(m, body, position)) {
            state.sides.insert(ContactSide::Bottom);
        }

        Resolution {
            id: FrameId(index as u32),
            key: body.key,
            position,
            sides: state.sides,
            crushed,
            on_slope: state.on_slope,
            pushes_left_jump_wall: state.pushes_left_jump_wall,
            pushes_right_jump_wall: state.pushes_right_jump_wall,
            on_gap: state.on_gap,
            on_corner_jump: state.on_corner_jump,
            outside_map_bounds,
        }
    }

    /// Tiles first, then bodies resolved earlier this tick.
    fn correction_at(
        &self,
        body: &BodyDesc,
        movement: &ColliderMovement<'_>,
        obstacles: &[Obstacle],
        outside_map_bounds: bool,
        state: &mut TickState,
        contacts: &mut Vec<Contact>,
    ) -> Option<Correction> {
        if !outside_map_bounds {
            if let Some(map) = &self.tile_map {
                if let Some(c) = ground_contact(map, body, movement, state, contacts) {
                    return Some(c);
                }
            }
        }
        let tile_size = self.tile_map.as_ref().map(CollisionTileMap::tile_size);
        body_contact(body, movement, obstacles, &self.policy, tile_size, state, contacts)
    }

    /// Report overlaps of body pairs whose categories only sense each other.
    /// Candidates are bodies sharing a cell of a uniform grid over the
    /// resolved frames, tested in push order.
    fn sense_pairs(&self, resolutions: &[Resolution], contacts: &mut Vec<Contact>, stats: &mut WorldStats) {
        let cs = self.cfg.sense_cell_size.max(1e-5);
        let cell = |p: Vec2| ((p.x / cs).floor() as i32, (p.y / cs).floor() as i32);

        let mut grid: HashMap<(i32, i32), Vec<usize>> = HashMap::new();
        for (i, (b, r)) in self.bodies.iter().zip(resolutions).enumerate() {
            let frame = b.collider.frame(r.position);
            let (ix0, iy0) = cell(frame.min);
            let (ix1, iy1) = cell(frame.max);
            for iy in iy0..=iy1 {
                for ix in ix0..=ix1 {
                    grid.entry((ix, iy)).or_default().push(i);
                }
            }
        }

        let mut seen: HashSet<(usize, usize)> = HashSet::new();
        for indices in grid.values() {
            for (n, &a) in indices.iter().enumerate() {
                for &b in &indices[n + 1..] {
                    seen.insert(if a < b { (a, b) } else { (b, a) });
                }
            }
        }
        let mut pairs: Vec<(usize, usize)> = seen.into_iter().collect();
        pairs.sort_unstable();
        stats.sense_candidate_pairs = pairs.len();

        for (i, j) in pairs {
            let (a, b) = (&self.bodies[i], &self.bodies[j]);
            if self.policy.interaction(a.collider.category(), b.collider.category()) != Interaction::Sense {
                continue;
            }
            let Some(c) = sense_contact(a, resolutions[i].position, b, resolutions[j].position) else {
                continue;
            };
            let reverse = Contact {
                body: b.key,
                other: ContactedObject::Body(a.key),
                sides: c.other_sides,
                other_sides: c.sides,
                ..c.clone()
            };
            contacts.push(c);
            contacts.push(reverse);
        }
    }

    /// Return debug/perf stats for the last resolve.
    pub fn debug_stats(&self) -> WorldStats {
        self.stats
    }

    /// Return timing breakdown for the last `resolve` run.
    pub fn timing(&self) -> Option<WorldTiming> {
        self.last_timing
    }
}

/// Positions from `from` (exclusive) to `to` (inclusive), no two consecutive
/// ones more than `max_delta` apart on either axis, unless that would take
/// more than `max_steps` positions.
pub fn interpolated_positions(from: Vec2, to: Vec2, max_delta: f32, max_steps: usize) -> Vec<Vec2> {
    let delta = to - from;
    let largest = delta.x.abs().max(delta.y.abs());
    if !largest.is_finite() || !max_delta.is_finite() || max_delta <= 0.0 || largest <= max_delta {
        return vec![to];
    }
    let mut steps = (largest / max_delta).ceil() as usize;
    let cap = max_steps.max(1);
    if steps > cap {
        log::warn!(
            "move of {} needs {} steps of {}, interpolating in {} instead",
            largest,
            steps,
            max_delta,
            cap
        );
        steps = cap;
    }
    (1..=steps)
        .map(|i| {
            if i == steps {
                to
            } else {
                from + delta * (i as f32 / steps as f32)
            }
        })
        .collect()
}

/// Fold contacts describing the same relation into one, union of sides.
fn merge_contacts(raw: Vec<Contact>, max: usize) -> Vec<Contact> {
    let mut out: Vec<Contact> = Vec::new();
    let mut dropped = 0usize;
    for c in raw {
        if let Some(existing) = out.iter_mut().find(|e| e.same_relation(&c)) {
            existing.sides = existing.sides.union(c.sides);
            existing.other_sides = existing.other_sides.union(c.other_sides);
        } else if out.len() < max {
            out.push(c);
        } else {
            dropped += 1;
        }
    }
    if dropped > 0 {
        log::warn!("dropped {} contacts over the limit of {}", dropped, max);
    }
    out
}
