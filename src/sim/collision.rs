//! Collision detection between bullets and the tracked target
//!
//! Each pool resolves its collider shape once, at construction, into a
//! [`Collider`] holding precomputed parameters and a plain function pointer
//! taken from a dispatch table. The per-bullet hot loop then makes a single
//! indirect call with no shape matching.

use glam::Vec2;

use crate::config::ColliderDef;
use crate::derotate_by;
use crate::error::{PoolError, Result};

/// The tracked target's hit and graze circles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hurtbox {
    pub location: Vec2,
    pub radius: f32,
    pub graze_radius: f32,
    radius2: f32,
    graze_radius2: f32,
}

impl Hurtbox {
    pub fn new(location: Vec2, radius: f32, graze_radius: f32) -> Self {
        Self {
            location,
            radius,
            graze_radius,
            radius2: radius * radius,
            graze_radius2: graze_radius * graze_radius,
        }
    }

    #[inline]
    pub fn radius2(&self) -> f32 {
        self.radius2
    }

    #[inline]
    pub fn graze_radius2(&self) -> f32 {
        self.graze_radius2
    }
}

/// Result of a collision check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CollisionResult {
    /// The hit circle overlaps the bullet
    pub collide: bool,
    /// The graze circle overlaps the bullet
    pub graze: bool,
}

impl CollisionResult {
    pub const fn miss() -> Self {
        Self {
            collide: false,
            graze: false,
        }
    }

    pub const fn new(collide: bool, graze: bool) -> Self {
        Self { collide, graze }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    None = 0,
    Circle = 1,
    Rectangle = 2,
    Line = 3,
}

/// Shape parameters in the bullet's local frame at scale 1
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ColliderParams {
    pub radius: f32,
    pub half_extents: Vec2,
    /// Segment start
    pub start: Vec2,
    /// Segment end minus start
    pub delta: Vec2,
    pub delta_mag2: f32,
    /// Squared distance from the origin to the farthest point of the shape
    pub max_dist2: f32,
}

/// Shape test signature shared by every entry of the dispatch table
pub type CollisionFn =
    fn(&ColliderParams, &Hurtbox, loc: Vec2, direction: Vec2, scale: f32) -> CollisionResult;

const DISPATCH: [CollisionFn; 4] = [
    no_collision,
    circle_collision,
    rectangle_collision,
    line_collision,
];

#[derive(Debug, Clone, Copy)]
pub struct Collider {
    pub kind: ShapeKind,
    pub params: ColliderParams,
    test: CollisionFn,
}

impl Collider {
    pub fn new(kind: ShapeKind, params: ColliderParams) -> Self {
        Self {
            kind,
            params,
            test: DISPATCH[kind as usize],
        }
    }

    pub fn none() -> Self {
        Self::new(ShapeKind::None, ColliderParams::default())
    }

    /// Precompute the collider for a style definition
    pub fn from_def(def: &ColliderDef, style: &str) -> Result<Self> {
        let collider = match *def {
            ColliderDef::None => Self::none(),
            ColliderDef::Circle { radius } => Self::new(
                ShapeKind::Circle,
                ColliderParams {
                    radius,
                    max_dist2: radius * radius,
                    ..Default::default()
                },
            ),
            ColliderDef::Rectangle {
                half_width,
                half_height,
            } => {
                let half_extents = Vec2::new(half_width, half_height);
                Self::new(
                    ShapeKind::Rectangle,
                    ColliderParams {
                        half_extents,
                        max_dist2: half_extents.length_squared(),
                        ..Default::default()
                    },
                )
            }
            ColliderDef::Line { start, end, radius } => {
                let delta = end - start;
                let max_dist = start.length().max(end.length()) + radius;
                Self::new(
                    ShapeKind::Line,
                    ColliderParams {
                        radius,
                        start,
                        delta,
                        delta_mag2: delta.length_squared(),
                        max_dist2: max_dist * max_dist,
                        ..Default::default()
                    },
                )
            }
            ColliderDef::Segments { .. } => {
                return Err(PoolError::UnsupportedShape {
                    style: style.to_string(),
                    shape: def.shape_name(),
                });
            }
        };
        Ok(collider)
    }

    #[inline]
    pub fn collides(&self) -> bool {
        self.kind != ShapeKind::None
    }

    #[inline]
    pub fn check(&self, hurtbox: &Hurtbox, loc: Vec2, direction: Vec2, scale: f32) -> CollisionResult {
        (self.test)(&self.params, hurtbox, loc, direction, scale)
    }
}

pub fn no_collision(_: &ColliderParams, _: &Hurtbox, _: Vec2, _: Vec2, _: f32) -> CollisionResult {
    CollisionResult::miss()
}

pub fn circle_collision(
    p: &ColliderParams,
    h: &Hurtbox,
    loc: Vec2,
    _direction: Vec2,
    scale: f32,
) -> CollisionResult {
    let dist2 = (h.location - loc).length_squared();
    let r = p.radius * scale;
    let hit = r + h.radius;
    let graze = r + h.graze_radius;
    CollisionResult::new(dist2 <= hit * hit, dist2 <= graze * graze)
}

/// Far enough that no part of the shape can reach the graze circle
#[inline]
fn beyond_reach(p: &ColliderParams, h: &Hurtbox, dist2: f32, scale: f32) -> bool {
    dist2 > 2.0 * (p.max_dist2 * scale * scale + h.graze_radius2)
}

pub fn rectangle_collision(
    p: &ColliderParams,
    h: &Hurtbox,
    loc: Vec2,
    direction: Vec2,
    scale: f32,
) -> CollisionResult {
    let offset = h.location - loc;
    if beyond_reach(p, h, offset.length_squared(), scale) {
        return CollisionResult::miss();
    }
    let local = derotate_by(offset, direction.normalize_or(Vec2::X)).abs();
    let half = p.half_extents * scale;
    let dist2 = if local.x <= half.x {
        // Facing a horizontal edge (or inside)
        let dy = (local.y - half.y).max(0.0);
        dy * dy
    } else if local.y <= half.y {
        let dx = local.x - half.x;
        dx * dx
    } else {
        (local - half).length_squared()
    };
    CollisionResult::new(dist2 <= h.radius2, dist2 <= h.graze_radius2)
}

pub fn line_collision(
    p: &ColliderParams,
    h: &Hurtbox,
    loc: Vec2,
    direction: Vec2,
    scale: f32,
) -> CollisionResult {
    let offset = h.location - loc;
    if beyond_reach(p, h, offset.length_squared(), scale) {
        return CollisionResult::miss();
    }
    let local = derotate_by(offset, direction.normalize_or(Vec2::X));
    let rel = local - p.start * scale;
    let seg = p.delta * scale;
    let seg2 = p.delta_mag2 * scale * scale;
    let dot = rel.dot(seg);
    let dist2 = if dot <= 0.0 {
        rel.length_squared()
    } else if dot >= seg2 {
        (rel - seg).length_squared()
    } else {
        (rel.length_squared() - dot * dot / seg2).max(0.0)
    };
    let r = p.radius * scale;
    let hit = r + h.radius;
    let graze = r + h.graze_radius;
    CollisionResult::new(dist2 <= hit * hit, dist2 <= graze * graze)
}

/// Circle overlap test used for player bullets against enemies
#[inline]
pub fn circle_on_circle(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    let r = ra + rb;
    (a - b).length_squared() <= r * r
}
