use glam::Vec2;
use glidebox::*;

const LEVEL: &str = r#"{
    "name": "ground",
    "columns": 8, "rows": 4,
    "tile_width": 16, "tile_height": 16,
    "cells": [
        [{ "name": "ground" }, null, null, null],
        [{ "name": "ground" }, null, null, null],
        [{ "name": "ground" }, { "name": "slope_15_0" }, null, null],
        [{ "name": "ground" }, { "name": "ground" }, null, null],
        [{ "name": "ground" }, null, { "name": "one_way" }, null],
        [{ "name": "ground" }, null, null, null],
        [{ "name": "ground" }, { "name": "jump_wall_left" }, { "name": "jump_wall_left" }, null],
        [{ "name": "ground" }, { "name": "ground" }, { "name": "ground" }, null]
    ]
}"#;

const POLICY: &str = r#"[
    { "a": "player", "b": "crate", "interaction": "snap" },
    { "a": "player", "b": "coin", "interaction": "sense" }
]"#;

fn main() -> Result<(), CollisionError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut registry = CategoryRegistry::new();
    let player = registry.register("player")?;
    let crate_ = registry.register("crate")?;
    let coin = registry.register("coin")?;

    let map = CollisionTileMap::from_json_str(LEVEL)?;
    let policy = CollisionPolicy::from_json_str(&registry, POLICY)?;
    let mut world = CollisionsController::new(
        WorldConfig { enable_timing: true, ..Default::default() },
        Some(map),
        policy,
    );

    let hero = Collider::uniform(player, Vec2::new(10.0, 14.0), 2.0)?;
    let box_ = Collider::uniform(crate_, Vec2::splat(12.0), 2.0)?;
    let pickup = Collider::uniform(coin, Vec2::splat(6.0), 0.0)?;

    let mut hero_pos = Vec2::new(40.0, 60.0);
    let mut hero_vel = Vec2::new(30.0, 0.0);
    let mut box_pos = Vec2::new(88.0, 56.0);
    let coin_pos = Vec2::new(70.0, 40.0);
    let dt = 1.0 / 60.0;
    let gravity = -400.0;

    for tick in 0..90 {
        hero_vel.y += gravity * dt;
        world.begin_frame();
        world.push(BodyDesc {
            key: 1,
            collider: hero,
            current: hero_pos,
            proposed: hero_pos + hero_vel * dt,
            caps: Capabilities::default(),
        });
        world.push(BodyDesc {
            key: 2,
            collider: box_,
            current: box_pos,
            proposed: box_pos + Vec2::new(0.0, gravity * dt * 0.5),
            caps: Capabilities { snappable: Some(Snappable::default()), ..Default::default() },
        });
        world.push(BodyDesc {
            key: 3,
            collider: pickup,
            current: coin_pos,
            proposed: coin_pos,
            caps: Capabilities { tile_response: TileResponse::Ignore, ..Default::default() },
        });
        world.resolve();

        if let Some(r) = world.resolution_by_key(1) {
            hero_pos = r.position;
            if r.on_ground() {
                hero_vel.y = 0.0;
            }
            if r.pushes_left_wall() || r.pushes_right_wall() {
                hero_vel.x = -hero_vel.x;
            }
            if tick % 10 == 0 {
                println!(
                    "tick {:>2}: hero at ({:.2}, {:.2}) ground={} slope={} wall_jump={}",
                    tick,
                    r.position.x,
                    r.position.y,
                    r.on_ground(),
                    r.on_slope.is_some(),
                    r.pushes_left_jump_wall || r.pushes_right_jump_wall
                );
            }
        }
        if let Some(r) = world.resolution_by_key(2) {
            box_pos = r.position;
        }

        let entered: Vec<Contact> = world
            .contacts()
            .iter()
            .filter(|c| world.contact_state(c) == Some(ContactState::Entered))
            .cloned()
            .collect();
        for c in entered {
            println!("tick {:>2}: body {} entered {:?} on {:?}", tick, c.body, c.other, c.sides);
        }
        for c in world.exit_contacts() {
            println!("tick {:>2}: body {} left {:?}", tick, c.body, c.other);
        }
        world.drain_contacts();
    }

    let s = world.debug_stats();
    println!(
        "last frame: bodies={} passes={} tile_tests={} contacts={}",
        s.bodies, s.resolution_passes, s.tile_tests, s.contacts
    );
    if let Some(t) = world.timing() {
        println!("timing: resolve={:.3}ms bodies={:.3}ms", t.resolve_ms, t.bodies_ms);
    }
    Ok(())
}
