use thiserror::Error;

/// Errors raised while building colliders, tile maps, policies and configs.
///
/// Resolution itself never fails; these only surface at construction time.
#[derive(Debug, Error)]
pub enum CollisionError {
    #[error("collider size must be finite and positive, got {width}x{height}")]
    InvalidColliderSize { width: f32, height: f32 },

    #[error("hit point inset on the {edge} edge is negative ({value})")]
    NegativeInset { edge: &'static str, value: f32 },

    #[error("hit point insets on the {edge} edge need {total} units but the edge is {extent}")]
    InsetsExceedEdge {
        edge: &'static str,
        total: f32,
        extent: f32,
    },

    #[error("tile size must be strictly positive, got {width}x{height}")]
    InvalidTileSize { width: f32, height: f32 },

    #[error("tile column {column} has {found} rows, expected {expected}")]
    RaggedGrid {
        column: usize,
        expected: usize,
        found: usize,
    },

    #[error("tile layer declares {declared_columns}x{declared_rows} but holds {columns}x{rows}")]
    LayerSizeMismatch {
        declared_columns: usize,
        declared_rows: usize,
        columns: usize,
        rows: usize,
    },

    #[error("unknown collision category `{0}`")]
    UnknownCategory(String),

    #[error("collision category `{0}` is already registered")]
    DuplicateCategory(String),

    #[error("category registry is full (32 categories)")]
    RegistryFull,

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}
