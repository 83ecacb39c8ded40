use glam::Vec2;
use glidebox::*;
use std::time::Instant;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // Build a 256x64 map: floor, scattered one-way ledges and slopes
    let w = 256usize; let h = 64usize;
    let mut grid: Vec<Vec<Option<RawTile>>> = vec![vec![None; h]; w];
    for x in 0..w {
        grid[x][0] = Some(RawTile::named("ground"));
        if (x ^ 7) % 5 == 0 { grid[x][3] = Some(RawTile::named("one_way")); }
        if x % 16 == 8 { grid[x][1] = Some(RawTile::named("slope_15_0")); }
    }
    let map = match CollisionTileMap::new(tile_representations(&grid), Vec2::splat(16.0)) {
        Ok(m) => m,
        Err(e) => { eprintln!("bad map: {e}"); return; }
    };

    let mut world = CollisionsController::new(
        WorldConfig { enable_timing: true, ..Default::default() },
        Some(map),
        CollisionPolicy::new(),
    );
    let collider = match Collider::uniform(CategoryMask::bit(0), Vec2::new(12.0, 20.0), 2.0) {
        Ok(c) => c,
        Err(e) => { eprintln!("bad collider: {e}"); return; }
    };

    let n_bodies = 2_000usize;
    let mut pos: Vec<Vec2> = (0..n_bodies)
        .map(|i| Vec2::new(8.0 + (i % 250) as f32 * 16.0, 40.0 + (i / 250) as f32 * 24.0))
        .collect();

    let frames = 200;
    let t0 = Instant::now();
    let mut passes = 0usize;
    let mut resolve_ms = 0.0f64;
    for f in 0..frames {
        world.begin_frame();
        for (i, p) in pos.iter().enumerate() {
            let vx = if (i + f / 50) % 2 == 0 { 1.5 } else { -1.5 };
            world.push(BodyDesc {
                key: i as ColKey,
                collider,
                current: *p,
                proposed: *p + Vec2::new(vx, -3.0),
                caps: Capabilities::default(),
            });
        }
        world.resolve();
        for r in world.resolutions() { pos[r.id.0 as usize] = r.position; }
        passes += world.debug_stats().resolution_passes;
        if let Some(t) = world.timing() { resolve_ms += t.resolve_ms; }
        world.drain_contacts();
    }
    let dt = t0.elapsed().as_secs_f64();
    let moves = (n_bodies * frames) as f64;
    println!(
        "resolve: bodies={} frames={} secs={:.3} throughput={:.0} moves/s passes={} resolve_ms/frame={:.3}",
        n_bodies, frames, dt, moves / dt, passes, resolve_ms / frames as f64
    );
}
