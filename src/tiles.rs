//! Tile names, typed tile descriptors and the raw layer handed over by a map loader.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::slope::SlopeProfile;

const SLOPE_PREFIX: &str = "slope";

/// Collidable tile kinds recognised by name.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ColliderTile {
    Ground,
    OneWay,
    JumpWallLeft,
    JumpWallRight,
    Slope(SlopeProfile),
}

impl ColliderTile {
    /// Look up a tile name. Unknown and malformed names are non-collidable.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "ground" => Some(ColliderTile::Ground),
            "one_way" => Some(ColliderTile::OneWay),
            "jump_wall_left" => Some(ColliderTile::JumpWallLeft),
            "jump_wall_right" => Some(ColliderTile::JumpWallRight),
            _ if name.starts_with(SLOPE_PREFIX) => {
                let parsed = parse_slope(name);
                if parsed.is_none() {
                    log::warn!("malformed slope tile name `{name}`, treating it as empty");
                }
                parsed.map(ColliderTile::Slope)
            }
            _ => None,
        }
    }

    pub fn name(&self) -> String {
        match self {
            ColliderTile::Ground => "ground".to_string(),
            ColliderTile::OneWay => "one_way".to_string(),
            ColliderTile::JumpWallLeft => "jump_wall_left".to_string(),
            ColliderTile::JumpWallRight => "jump_wall_right".to_string(),
            ColliderTile::Slope(p) => format!("{SLOPE_PREFIX}_{}_{}", p.left, p.right),
        }
    }

    pub fn is_ground_or_one_way(&self) -> bool {
        matches!(self, ColliderTile::Ground | ColliderTile::OneWay)
    }

    pub fn is_slope(&self) -> bool {
        matches!(self, ColliderTile::Slope(_))
    }

    pub fn slope(&self) -> Option<SlopeProfile> {
        match self {
            ColliderTile::Slope(p) => Some(*p),
            _ => None,
        }
    }
}

fn parse_slope(name: &str) -> Option<SlopeProfile> {
    let mut parts = name.split('_');
    if parts.next() != Some(SLOPE_PREFIX) {
        return None;
    }
    let left = parts.next()?.parse::<u8>().ok()?;
    let right = parts.next()?.parse::<u8>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    SlopeProfile::new(left, right)
}

/// A collidable tile together with the metadata it was authored with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileRepresentation {
    pub tile: ColliderTile,
    pub user_data: BTreeMap<String, String>,
}

impl TileRepresentation {
    pub fn new(tile: ColliderTile) -> Self {
        Self {
            tile,
            user_data: BTreeMap::new(),
        }
    }
}

/// One cell as produced by a map loader.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTile {
    pub name: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl RawTile {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            properties: BTreeMap::new(),
        }
    }
}

/// Grid indexed `[column][row]`, row 0 at the bottom.
pub type RawGrid = Vec<Vec<Option<RawTile>>>;

/// Typed counterpart of [`RawGrid`].
pub type TileGrid = Vec<Vec<Option<TileRepresentation>>>;

/// Collision layer as handed over by a map loader.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawTileLayer {
    #[serde(default)]
    pub name: Option<String>,
    pub columns: usize,
    pub rows: usize,
    pub tile_width: f32,
    pub tile_height: f32,
    pub cells: RawGrid,
}

/// Map every raw cell to a typed tile. Absent and unrecognised tiles become `None`.
pub fn tile_representations(grid: &[Vec<Option<RawTile>>]) -> TileGrid {
    grid.iter()
        .map(|column| {
            column
                .iter()
                .map(|cell| {
                    let raw = cell.as_ref()?;
                    let tile = ColliderTile::parse(&raw.name)?;
                    Some(TileRepresentation {
                        tile,
                        user_data: raw.properties.clone(),
                    })
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_names() {
        assert_eq!(ColliderTile::parse("ground"), Some(ColliderTile::Ground));
        assert_eq!(ColliderTile::parse("one_way"), Some(ColliderTile::OneWay));
        assert_eq!(ColliderTile::parse("jump_wall_left"), Some(ColliderTile::JumpWallLeft));
        assert_eq!(ColliderTile::parse("jump_wall_right"), Some(ColliderTile::JumpWallRight));
        let slope = ColliderTile::parse("slope_15_0").unwrap();
        assert_eq!(slope.slope(), SlopeProfile::new(15, 0));
        assert_eq!(slope.name(), "slope_15_0");
        assert!(slope.is_slope() && !slope.is_ground_or_one_way());
        assert!(ColliderTile::OneWay.is_ground_or_one_way());
        assert!(!ColliderTile::JumpWallLeft.is_ground_or_one_way());
    }

    #[test]
    fn test_unknown_and_malformed_names_are_not_collidable() {
        for name in ["", "lava", "Ground", "slope", "slope_15", "slope_a_0", "slope_16_0", "slope_1_2_3", "slopes_1_2"] {
            assert_eq!(ColliderTile::parse(name), None, "{name}");
        }
    }

    #[test]
    fn test_representations_keep_shape_and_metadata() {
        let mut with_props = RawTile::named("one_way");
        with_props.properties.insert("angle".into(), "0".into());
        let grid = vec![
            vec![Some(RawTile::named("ground")), None],
            vec![Some(RawTile::named("water")), Some(with_props)],
        ];
        let out = tile_representations(&grid);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|c| c.len() == 2));
        assert_eq!(out[0][0].as_ref().map(|t| t.tile), Some(ColliderTile::Ground));
        assert!(out[0][1].is_none());
        assert!(out[1][0].is_none());
        let one_way = out[1][1].as_ref().unwrap();
        assert_eq!(one_way.tile, ColliderTile::OneWay);
        assert_eq!(one_way.user_data.get("angle").map(String::as_str), Some("0"));
    }
}
