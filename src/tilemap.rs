//! Immutable collision grid built from typed tiles.

use glam::Vec2;

use crate::error::CollisionError;
use crate::slope::{group_slope_contexts, SlopeContext};
use crate::tiles::{tile_representations, RawTileLayer, TileGrid, TileRepresentation};
use crate::types::{Rect, TileCoord, TileRange};

/// Typed tile grid of one level. Tile `(c, r)` covers
/// `[c*w, (c+1)*w) x [r*h, (r+1)*h)`, row 0 at the bottom.
#[derive(Clone, Debug)]
pub struct CollisionTileMap {
    tiles: TileGrid,
    tile_size: Vec2,
    rows: usize,
    slope_contexts: Vec<SlopeContext>,
    /// Empty tiles beside the exposed top corner of a ground or one-way tile.
    corner_jumps: Vec<TileCoord>,
    /// Per column, inclusive row runs of empty tiles.
    gaps: Vec<Vec<(i32, i32)>>,
}

impl CollisionTileMap {
    pub fn new(tiles: TileGrid, tile_size: Vec2) -> Result<Self, CollisionError> {
        if !tile_size.is_finite() || tile_size.x <= 0.0 || tile_size.y <= 0.0 {
            return Err(CollisionError::InvalidTileSize {
                width: tile_size.x,
                height: tile_size.y,
            });
        }
        let rows = tiles.first().map_or(0, Vec::len);
        if let Some((column, col)) = tiles.iter().enumerate().find(|(_, c)| c.len() != rows) {
            return Err(CollisionError::RaggedGrid {
                column,
                expected: rows,
                found: col.len(),
            });
        }

        let slopes = tiles.iter().enumerate().flat_map(|(c, column)| {
            column.iter().enumerate().filter_map(move |(r, cell)| {
                let profile = cell.as_ref()?.tile.slope()?;
                Some((TileCoord::new(c as i32, r as i32), profile))
            })
        });
        let slope_contexts = group_slope_contexts(slopes);
        let corner_jumps = find_corner_jumps(&tiles, rows);
        let gaps = tiles.iter().map(|column| column_gaps(column)).collect();

        log::debug!(
            "collision map {}x{} tiles of {}x{}, {} slope group(s), {} corner jump(s)",
            tiles.len(),
            rows,
            tile_size.x,
            tile_size.y,
            slope_contexts.len(),
            corner_jumps.len()
        );

        Ok(Self {
            tiles,
            tile_size,
            rows,
            slope_contexts,
            corner_jumps,
            gaps,
        })
    }

    pub fn from_raw_layer(layer: &RawTileLayer) -> Result<Self, CollisionError> {
        let columns = layer.cells.len();
        let rows = layer.cells.first().map_or(0, Vec::len);
        if columns != layer.columns || rows != layer.rows {
            return Err(CollisionError::LayerSizeMismatch {
                declared_columns: layer.columns,
                declared_rows: layer.rows,
                columns,
                rows,
            });
        }
        Self::new(
            tile_representations(&layer.cells),
            Vec2::new(layer.tile_width, layer.tile_height),
        )
    }

    /// Parse a [`RawTileLayer`] serialized as JSON.
    pub fn from_json_str(json: &str) -> Result<Self, CollisionError> {
        let layer: RawTileLayer = serde_json::from_str(json)?;
        Self::from_raw_layer(&layer)
    }

    pub fn number_of_columns(&self) -> usize {
        self.tiles.len()
    }

    pub fn number_of_rows(&self) -> usize {
        self.rows
    }

    pub fn tile_size(&self) -> Vec2 {
        self.tile_size
    }

    pub fn map_size(&self) -> Vec2 {
        Vec2::new(self.number_of_columns() as f32, self.rows as f32) * self.tile_size
    }

    pub fn map_rect(&self) -> Rect {
        Rect::from_origin_size(Vec2::ZERO, self.map_size())
    }

    /// Tile at `(column, row)`; out of range reads as empty.
    pub fn tile_at(&self, column: i32, row: i32) -> Option<&TileRepresentation> {
        if column < 0 || row < 0 {
            return None;
        }
        self.tiles.get(column as usize)?.get(row as usize)?.as_ref()
    }

    pub fn tile_frame(&self, coord: TileCoord) -> Rect {
        let origin = Vec2::new(coord.column as f32, coord.row as f32) * self.tile_size;
        Rect::from_origin_size(origin, self.tile_size)
    }

    /// Tiles covered by `frame` plus one ring around it, clamped to the grid.
    /// `None` when the grid is empty.
    pub fn tile_range_around_frame(&self, frame: &Rect) -> Option<TileRange> {
        if self.tiles.is_empty() || self.rows == 0 {
            return None;
        }
        let max_col = self.tiles.len() as i32 - 1;
        let max_row = self.rows as i32 - 1;
        let col = |x: f32| (x / self.tile_size.x).floor() as i32;
        let row = |y: f32| (y / self.tile_size.y).floor() as i32;
        Some(TileRange {
            left: (col(frame.min.x) - 1).clamp(0, max_col),
            right: (col(frame.max.x) + 1).clamp(0, max_col),
            bottom: (row(frame.min.y) - 1).clamp(0, max_row),
            top: (row(frame.max.y) + 1).clamp(0, max_row),
        })
    }

    pub fn slope_contexts(&self) -> &[SlopeContext] {
        &self.slope_contexts
    }

    pub fn slope_context_at(&self, coord: TileCoord) -> Option<&SlopeContext> {
        self.slope_contexts.iter().find(|c| c.contains(coord))
    }

    pub fn corner_jumps(&self) -> &[TileCoord] {
        &self.corner_jumps
    }

    pub fn is_corner_jump(&self, coord: TileCoord) -> bool {
        self.corner_jumps.contains(&coord)
    }

    /// Inclusive row runs of empty tiles in `column`, bottom first.
    pub fn gaps_in_column(&self, column: i32) -> &[(i32, i32)] {
        usize::try_from(column)
            .ok()
            .and_then(|c| self.gaps.get(c))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The empty tile at `coord` belongs to a gap whose lowest tile starts
    /// below the bottom of `proposed_frame`.
    pub fn contacts_gap(&self, coord: TileCoord, proposed_frame: &Rect) -> bool {
        self.gaps_in_column(coord.column)
            .iter()
            .filter(|(start, end)| (*start..=*end).contains(&coord.row))
            .any(|&(start, _)| {
                let start_frame = self.tile_frame(TileCoord::new(coord.column, start));
                start_frame.min.y < proposed_frame.min.y
            })
    }

    /// `true` when `frame` lies entirely outside the map.
    pub fn is_outside(&self, frame: &Rect) -> bool {
        let size = self.map_size();
        frame.max.x < 0.0 || frame.min.x > size.x || frame.max.y < 0.0 || frame.min.y > size.y
    }
}

fn is_ledge(tiles: &TileGrid, column: usize, row: usize) -> bool {
    tiles[column][row]
        .as_ref()
        .is_some_and(|t| t.tile.is_ground_or_one_way())
}

/// Empty neighbours left and right of every ground or one-way tile whose top
/// is open, in discovery order.
fn find_corner_jumps(tiles: &TileGrid, rows: usize) -> Vec<TileCoord> {
    let mut out = Vec::new();
    for column in 0..tiles.len() {
        for row in 0..rows.saturating_sub(1) {
            if !is_ledge(tiles, column, row) || tiles[column][row + 1].is_some() {
                continue;
            }
            let left = column.checked_sub(1);
            let right = Some(column + 1).filter(|c| *c < tiles.len());
            for side in [left, right].into_iter().flatten() {
                let coord = TileCoord::new(side as i32, row as i32);
                if tiles[side][row].is_none() && !out.contains(&coord) {
                    out.push(coord);
                }
            }
        }
    }
    out
}

fn column_gaps(column: &[Option<TileRepresentation>]) -> Vec<(i32, i32)> {
    let mut out = Vec::new();
    let mut start = None;
    for (row, cell) in column.iter().enumerate() {
        match (cell, start) {
            (None, None) => start = Some(row as i32),
            (Some(_), Some(s)) => {
                out.push((s, row as i32 - 1));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push((s, column.len() as i32 - 1));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::{ColliderTile, RawTile};

    fn ground() -> Option<TileRepresentation> {
        Some(TileRepresentation::new(ColliderTile::Ground))
    }

    #[test]
    fn test_lookup_is_bounds_safe() {
        let map = CollisionTileMap::new(vec![vec![ground(), None], vec![None, ground()]], Vec2::splat(16.0)).unwrap();
        assert_eq!(map.map_size(), Vec2::new(32.0, 32.0));
        assert_eq!(map.map_rect().max, Vec2::splat(32.0));
        assert_eq!((map.number_of_columns(), map.number_of_rows()), (2, 2));
        assert!(map.tile_at(0, 0).is_some());
        assert!(map.tile_at(1, 0).is_none());
        assert!(map.tile_at(-1, 0).is_none());
        assert!(map.tile_at(0, 7).is_none());
        assert!(map.tile_at(2, 1).is_none());
        assert_eq!(map.tile_frame(TileCoord::new(1, 1)).min, Vec2::splat(16.0));
    }

    #[test]
    fn test_rejects_bad_dimensions() {
        assert!(matches!(
            CollisionTileMap::new(vec![vec![None]], Vec2::new(0.0, 16.0)),
            Err(CollisionError::InvalidTileSize { .. })
        ));
        assert!(matches!(
            CollisionTileMap::new(vec![vec![None, None], vec![None]], Vec2::splat(16.0)),
            Err(CollisionError::RaggedGrid { column: 1, expected: 2, found: 1 })
        ));
    }

    #[test]
    fn test_tile_range_is_clamped() {
        let grid = vec![vec![None; 10]; 10];
        let map = CollisionTileMap::new(grid, Vec2::splat(16.0)).unwrap();
        let r = map
            .tile_range_around_frame(&Rect::from_origin_size(Vec2::new(40.0, 40.0), Vec2::splat(20.0)))
            .unwrap();
        assert_eq!((r.left, r.right, r.bottom, r.top), (1, 4, 1, 4));
        let edge = map
            .tile_range_around_frame(&Rect::from_origin_size(Vec2::new(-30.0, 150.0), Vec2::splat(20.0)))
            .unwrap();
        assert_eq!((edge.left, edge.right, edge.bottom, edge.top), (0, 0, 8, 9));
    }

    #[test]
    fn test_from_json_layer_builds_slope_contexts() {
        let json = r#"{
            "name": "ground",
            "columns": 3, "rows": 1,
            "tile_width": 16, "tile_height": 16,
            "cells": [
                [{ "name": "slope_15_8" }],
                [{ "name": "slope_7_0", "properties": { "k": "v" } }],
                [{ "name": "ground" }]
            ]
        }"#;
        let map = CollisionTileMap::from_json_str(json).unwrap();
        assert_eq!(map.slope_contexts().len(), 1);
        let ctx = map.slope_context_at(TileCoord::new(1, 0)).unwrap();
        assert_eq!(ctx.inclination(), 2);
        assert!(map.slope_context_at(TileCoord::new(2, 0)).is_none());
        assert_eq!(map.tile_at(1, 0).unwrap().user_data.get("k").map(String::as_str), Some("v"));
    }

    #[test]
    fn test_layer_size_mismatch() {
        let layer = RawTileLayer {
            name: None,
            columns: 2,
            rows: 1,
            tile_width: 16.0,
            tile_height: 16.0,
            cells: vec![vec![Some(RawTile::named("ground"))]],
        };
        assert!(matches!(
            CollisionTileMap::from_raw_layer(&layer),
            Err(CollisionError::LayerSizeMismatch { .. })
        ));
    }

    #[test]
    fn test_corner_jumps_beside_open_ledges() {
        let one_way = Some(TileRepresentation::new(ColliderTile::OneWay));
        let slope = Some(TileRepresentation::new(ColliderTile::parse("slope_15_0").unwrap()));
        let grid = vec![
            vec![ground(), None],
            vec![ground(), None],
            vec![None, None],
            vec![ground(), None],
            vec![None, None],
            vec![one_way, None],
            vec![slope, None],
        ];
        let map = CollisionTileMap::new(grid, Vec2::splat(16.0)).unwrap();
        assert_eq!(map.corner_jumps(), &[TileCoord::new(2, 0), TileCoord::new(4, 0)]);
        assert!(map.is_corner_jump(TileCoord::new(4, 0)));
        assert!(!map.is_corner_jump(TileCoord::new(2, 1)));

        // a covered ledge offers no corner
        let covered = CollisionTileMap::new(vec![vec![ground(), ground()], vec![None, None]], Vec2::splat(16.0)).unwrap();
        assert!(covered.corner_jumps().is_empty());
    }

    #[test]
    fn test_gaps_are_runs_of_empty_rows() {
        let grid = vec![vec![None, None, ground(), None], vec![None; 4], vec![ground(); 4]];
        let map = CollisionTileMap::new(grid, Vec2::splat(16.0)).unwrap();
        assert_eq!(map.gaps_in_column(0), &[(0, 1), (3, 3)]);
        assert_eq!(map.gaps_in_column(1), &[(0, 3)]);
        assert!(map.gaps_in_column(2).is_empty());
        assert!(map.gaps_in_column(-1).is_empty());
        assert!(map.gaps_in_column(9).is_empty());
    }

    #[test]
    fn test_gap_contact_needs_frame_above_gap_start() {
        let map = CollisionTileMap::new(vec![vec![ground()], vec![None]], Vec2::splat(16.0)).unwrap();
        let above = Rect::centered(Vec2::new(16.0, 24.0), Vec2::splat(20.0));
        assert!(map.contacts_gap(TileCoord::new(1, 0), &above));
        let below = Rect::centered(Vec2::new(16.0, 0.0), Vec2::splat(20.0));
        assert!(!map.contacts_gap(TileCoord::new(1, 0), &below));
        // ground is never part of a gap
        assert!(!map.contacts_gap(TileCoord::new(0, 0), &above));
    }

    #[test]
    fn test_outside_detection() {
        let map = CollisionTileMap::new(vec![vec![None; 4]; 4], Vec2::splat(16.0)).unwrap();
        assert!(!map.is_outside(&Rect::from_origin_size(Vec2::new(-5.0, 10.0), Vec2::splat(10.0))));
        assert!(map.is_outside(&Rect::from_origin_size(Vec2::new(-15.0, 10.0), Vec2::splat(10.0))));
        assert!(map.is_outside(&Rect::from_origin_size(Vec2::new(10.0, 70.0), Vec2::splat(10.0))));
    }
}
