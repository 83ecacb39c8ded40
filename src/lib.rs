//! glidebox: tile and body movement resolution for 2D platformers (per-tick, y-up)

pub mod types;
pub mod error;
pub mod api;
pub mod filter;
pub mod collider;
pub mod slope;
pub mod tiles;
pub mod tilemap;
pub mod narrowphase;
pub mod ground;
pub mod dynamic;
pub mod world;

pub use crate::types::*;
pub use crate::api::*;
pub use crate::error::CollisionError;
pub use crate::filter::{CategoryMask, CategoryRegistry, CollisionPolicy, Interaction, PolicyRule};
pub use crate::collider::{Collider, ColliderMovement, HitPoints, HorizontalInsets, VerticalInsets};
pub use crate::slope::{SlopeContext, SlopeProfile};
pub use crate::tiles::{tile_representations, ColliderTile, RawTile, RawTileLayer, TileRepresentation};
pub use crate::tilemap::CollisionTileMap;
pub use crate::world::{interpolated_positions, CollisionsController};
