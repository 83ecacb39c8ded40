//! Axis-aligned colliders and the hit points sampled along their edges.

use glam::Vec2;

use crate::error::CollisionError;
use crate::filter::CategoryMask;
use crate::types::Rect;

/// Side length of a single hit point square.
pub const HIT_POINT_SIZE: f32 = 1.0;

/// Insets of the two hit points on a vertical (left or right) edge.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct VerticalInsets {
    pub bottom: f32,
    pub top: f32,
}

impl VerticalInsets {
    pub fn new(bottom: f32, top: f32) -> Self {
        Self { bottom, top }
    }
}

/// Insets of the two hit points on a horizontal (top or bottom) edge.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct HorizontalInsets {
    pub left: f32,
    pub right: f32,
}

impl HorizontalInsets {
    pub fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }
}

/// Hit points at the two ends of a horizontal edge.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HorizontalEdge {
    pub left: Rect,
    pub right: Rect,
}

/// Hit points at the two ends of a vertical edge.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VerticalEdge {
    pub bottom: Rect,
    pub top: Rect,
}

/// Eight 1x1 sample squares, two per edge of the collider frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HitPoints {
    pub top: HorizontalEdge,
    pub bottom: HorizontalEdge,
    pub left: VerticalEdge,
    pub right: VerticalEdge,
}

impl HitPoints {
    pub fn all(&self) -> [Rect; 8] {
        [
            self.top.left,
            self.top.right,
            self.bottom.left,
            self.bottom.right,
            self.left.bottom,
            self.left.top,
            self.right.bottom,
            self.right.top,
        ]
    }
}

/// Collision box of one entity. Immutable after construction.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Collider {
    category: CategoryMask,
    size: Vec2,
    offset: Vec2,
    left: VerticalInsets,
    right: VerticalInsets,
    top: HorizontalInsets,
    bottom: HorizontalInsets,
}

impl Collider {
    /// Build a collider, rejecting sizes and insets that cannot hold two hit
    /// points per edge.
    pub fn new(
        category: CategoryMask,
        size: Vec2,
        offset: Vec2,
        left: VerticalInsets,
        right: VerticalInsets,
        top: HorizontalInsets,
        bottom: HorizontalInsets,
    ) -> Result<Self, CollisionError> {
        if !size.is_finite() || size.x <= 0.0 || size.y <= 0.0 {
            return Err(CollisionError::InvalidColliderSize {
                width: size.x,
                height: size.y,
            });
        }

        let vertical = [("left", left), ("right", right)];
        for (edge, insets) in vertical {
            check_inset_pair(edge, insets.bottom, insets.top, size.y)?;
        }
        let horizontal = [("top", top), ("bottom", bottom)];
        for (edge, insets) in horizontal {
            check_inset_pair(edge, insets.left, insets.right, size.x)?;
        }

        Ok(Self {
            category,
            size,
            offset,
            left,
            right,
            top,
            bottom,
        })
    }

    /// Collider with the same inset on every hit point and no offset.
    pub fn uniform(category: CategoryMask, size: Vec2, inset: f32) -> Result<Self, CollisionError> {
        Self::new(
            category,
            size,
            Vec2::ZERO,
            VerticalInsets::new(inset, inset),
            VerticalInsets::new(inset, inset),
            HorizontalInsets::new(inset, inset),
            HorizontalInsets::new(inset, inset),
        )
    }

    pub fn category(&self) -> CategoryMask {
        self.category
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn left_insets(&self) -> VerticalInsets {
        self.left
    }

    pub fn right_insets(&self) -> VerticalInsets {
        self.right
    }

    pub fn top_insets(&self) -> HorizontalInsets {
        self.top
    }

    pub fn bottom_insets(&self) -> HorizontalInsets {
        self.bottom
    }

    /// Collider frame centered on `position + offset`.
    pub fn frame(&self, position: Vec2) -> Rect {
        Rect::centered(position + self.offset, self.size)
    }

    pub fn hit_points(&self, position: Vec2) -> HitPoints {
        let f = self.frame(position);
        let hp = Vec2::splat(HIT_POINT_SIZE);
        let square = |x: f32, y: f32| Rect::from_origin_size(Vec2::new(x, y), hp);

        let top_y = f.max.y - HIT_POINT_SIZE;
        let right_x = f.max.x - HIT_POINT_SIZE;

        HitPoints {
            top: HorizontalEdge {
                left: square(f.min.x + self.top.left, top_y),
                right: square(right_x - self.top.right, top_y),
            },
            bottom: HorizontalEdge {
                left: square(f.min.x + self.bottom.left, f.min.y),
                right: square(right_x - self.bottom.right, f.min.y),
            },
            left: VerticalEdge {
                bottom: square(f.min.x, f.min.y + self.left.bottom),
                top: square(f.min.x, top_y - self.left.top),
            },
            right: VerticalEdge {
                bottom: square(right_x, f.min.y + self.right.bottom),
                top: square(right_x, top_y - self.right.top),
            },
        }
    }
}

fn check_inset_pair(edge: &'static str, a: f32, b: f32, extent: f32) -> Result<(), CollisionError> {
    for value in [a, b] {
        if value.is_nan() || value < 0.0 {
            return Err(CollisionError::NegativeInset { edge, value });
        }
    }
    let total = a + b + 2.0 * HIT_POINT_SIZE;
    if total > extent {
        return Err(CollisionError::InsetsExceedEdge {
            edge,
            total,
            extent,
        });
    }
    Ok(())
}

/// One tentative move of a collider: where it is and where it wants to be.
#[derive(Copy, Clone, Debug)]
pub struct ColliderMovement<'a> {
    pub collider: &'a Collider,
    pub current_position: Vec2,
    pub current_hit_points: HitPoints,
    pub proposed_position: Vec2,
    pub proposed_frame: Rect,
    pub proposed_hit_points: HitPoints,
}

impl<'a> ColliderMovement<'a> {
    pub fn new(collider: &'a Collider, current_position: Vec2, proposed_position: Vec2) -> Self {
        Self {
            collider,
            current_position,
            current_hit_points: collider.hit_points(current_position),
            proposed_position,
            proposed_frame: collider.frame(proposed_position),
            proposed_hit_points: collider.hit_points(proposed_position),
        }
    }

    pub fn current_frame(&self) -> Rect {
        self.collider.frame(self.current_position)
    }

    pub fn vertical_delta(&self) -> f32 {
        self.proposed_position.y - self.current_position.y
    }
}
