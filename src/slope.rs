//! Slope tile geometry and grouping of consecutive slope tiles.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::types::{Rect, TileCoord};

/// Resolution of the slope grammar: tiles are described in sixteenths.
pub const SLOPE_STEPS: u8 = 16;

/// Empty sixteenths on the left and right edge of a slope tile.
///
/// `left > right` rises to the right, `left < right` declines to the right.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlopeProfile {
    pub left: u8,
    pub right: u8,
}

impl SlopeProfile {
    /// `None` when either value is outside `0..=15`.
    pub fn new(left: u8, right: u8) -> Option<Self> {
        (left < SLOPE_STEPS && right < SLOPE_STEPS).then_some(Self { left, right })
    }

    pub fn rises_to_right(&self) -> bool {
        self.left > self.right
    }

    /// Slope goes down from left to right.
    pub fn is_inverse(&self) -> bool {
        self.left < self.right
    }

    /// Empty sixteenths above the surface at `local_x` (0..tile_width),
    /// linearly interpolated between pixel centres and clamped at the edges.
    pub fn empty_at(&self, local_x: f32, tile_width: f32) -> f32 {
        let last = f32::from(SLOPE_STEPS - 1);
        let t = (f32::from(SLOPE_STEPS) * local_x / tile_width - 0.5).clamp(0.0, last) / last;
        let l = f32::from(self.left);
        let r = f32::from(self.right);
        l + (r - l) * t
    }

    /// Height of the solid part at `local_x`, measured from the tile bottom.
    pub fn surface_height(&self, local_x: f32, tile_size: Vec2) -> f32 {
        let steps = f32::from(SLOPE_STEPS);
        (steps - self.empty_at(local_x, tile_size.x)) * tile_size.y / steps
    }

    /// World y of the surface above world `x` on the tile at `tile_frame`.
    pub fn surface_y(&self, x: f32, tile_frame: &Rect) -> f32 {
        tile_frame.min.y + self.surface_height(x - tile_frame.min.x, tile_frame.size())
    }

    /// Vertical correction moving a hit point to the surface: positive when
    /// the point is below the surface, negative when it floats above it.
    pub fn contact_offset(&self, hit_point: &Rect, tile_frame: &Rect) -> f32 {
        self.surface_y(hit_point.center().x, tile_frame) - hit_point.min.y
    }
}

/// Consecutive slope tiles forming one incline.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SlopeContext {
    pub tile_positions: Vec<TileCoord>,
    /// Declining from left to right.
    pub is_inverse: bool,
}

impl SlopeContext {
    /// Number of tiles composing the slope.
    pub fn inclination(&self) -> usize {
        self.tile_positions.len()
    }

    pub fn contains(&self, coord: TileCoord) -> bool {
        self.tile_positions.contains(&coord)
    }

    pub fn leftmost(&self) -> Option<TileCoord> {
        self.tile_positions.first().copied()
    }

    pub fn rightmost(&self) -> Option<TileCoord> {
        self.tile_positions.last().copied()
    }
}

/// Group slope tiles, given in column-major order, into contexts.
///
/// A tile that starts an incline (fully empty on its low edge for a rising
/// slope, fully solid on its left edge for a declining one) closes the
/// running context and opens a new one; every other slope tile extends it.
pub fn group_slope_contexts<I>(tiles: I) -> Vec<SlopeContext>
where
    I: IntoIterator<Item = (TileCoord, SlopeProfile)>,
{
    let mut out = Vec::new();
    let mut running: Option<SlopeContext> = None;

    for (coord, profile) in tiles {
        let inverse = profile.is_inverse();
        let starts = (!inverse && profile.left == SLOPE_STEPS - 1) || (inverse && profile.left == 0);
        match running.as_mut() {
            Some(ctx) if !starts => ctx.tile_positions.push(coord),
            _ => {
                if let Some(done) = running.take() {
                    out.push(done);
                }
                running = Some(SlopeContext {
                    tile_positions: vec![coord],
                    is_inverse: inverse,
                });
            }
        }
    }
    if let Some(done) = running {
        out.push(done);
    }
    out
}
