//! Bullet records and their motion
//!
//! A [`BulletRecord`] is one live instance stored by value in its pool. Its
//! motion is owned by a [`Velocity`] integrator; scale and direction may be
//! driven by externally supplied closures.

use std::fmt;
use std::rc::Rc;

use glam::Vec2;

use crate::consts::MAG_ERR;
use crate::rotate_by;

/// Per-instance scale, evaluated after every integration step
pub type ScaleFn = Rc<dyn Fn(&ParametricInfo) -> f32>;
/// Per-instance heading, replacing the displacement-derived direction
pub type DirectionFn = Rc<dyn Fn(&BulletRecord) -> Vec2>;
/// Local-frame velocity at the instance's current time
pub type VelocityFn = Rc<dyn Fn(&ParametricInfo) -> Vec2>;

/// The parametric state external functions are evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParametricInfo {
    /// Authoritative world location
    pub loc: Vec2,
    /// Instance-local age in seconds
    pub t: f32,
    /// Stable id keying auxiliary state
    pub id: u32,
    /// Firing index within the spawning pattern
    pub index: i32,
}

#[derive(Clone, Default)]
pub enum VelocityKind {
    /// Motionless
    #[default]
    None,
    Constant(Vec2),
    Function(VelocityFn),
}

impl fmt::Debug for VelocityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VelocityKind::None => write!(f, "None"),
            VelocityKind::Constant(v) => write!(f, "Constant({v})"),
            VelocityKind::Function(_) => write!(f, "Function(..)"),
        }
    }
}

/// Motion integrator: a local-frame velocity rotated and optionally mirrored
#[derive(Debug, Clone)]
pub struct Velocity {
    /// Spawn location
    pub root: Vec2,
    /// (cos, sin) of the frame rotation
    pub rotation: Vec2,
    pub flip_x: bool,
    pub flip_y: bool,
    pub kind: VelocityKind,
}

impl Default for Velocity {
    fn default() -> Self {
        Self::none(Vec2::ZERO)
    }
}

impl Velocity {
    pub fn none(root: Vec2) -> Self {
        Self {
            root,
            rotation: Vec2::X,
            flip_x: false,
            flip_y: false,
            kind: VelocityKind::None,
        }
    }

    pub fn constant(root: Vec2, velocity: Vec2) -> Self {
        Self {
            kind: VelocityKind::Constant(velocity),
            ..Self::none(root)
        }
    }

    pub fn function(root: Vec2, f: VelocityFn) -> Self {
        Self {
            kind: VelocityKind::Function(f),
            ..Self::none(root)
        }
    }

    /// Motionless velocity facing `direction`
    pub fn facing(root: Vec2, direction: Vec2) -> Self {
        Self {
            rotation: direction.normalize_or(Vec2::X),
            ..Self::none(root)
        }
    }

    /// Rotate the local frame by `degrees`
    pub fn rotated(mut self, degrees: f32) -> Self {
        self.rotation = rotate_by(crate::cos_sin_deg(degrees), self.rotation);
        self
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, VelocityKind::None)
    }

    /// World-frame velocity at `info`
    pub fn current(&self, info: &ParametricInfo) -> Vec2 {
        let local = match &self.kind {
            VelocityKind::None => return Vec2::ZERO,
            VelocityKind::Constant(v) => *v,
            VelocityKind::Function(f) => f(info),
        };
        let mut v = rotate_by(local, self.rotation);
        if self.flip_x {
            v.x = -v.x;
        }
        if self.flip_y {
            v.y = -v.y;
        }
        v
    }

    /// Place `info` at the root and return the initial heading
    pub fn update_zero(&self, info: &mut ParametricInfo) -> Vec2 {
        info.loc = self.root;
        let v = self.current(info);
        if v.length_squared() > MAG_ERR {
            v.normalize()
        } else {
            self.rotation
        }
    }

    /// Advance time and location by `dt`, returning the frame displacement
    #[inline]
    pub fn update(&self, info: &mut ParametricInfo, dt: f32) -> Vec2 {
        info.t += dt;
        let delta = self.current(info) * dt;
        info.loc += delta;
        delta
    }
}

/// One live bullet
#[derive(Clone)]
pub struct BulletRecord {
    pub info: ParametricInfo,
    pub time_offset: f32,
    /// Unit-ish heading used for rendering and oriented collision
    pub direction: Vec2,
    pub scale: f32,
    /// Displacement applied this frame
    pub acc_delta: Vec2,
    pub velocity: Velocity,
    pub scale_fn: Option<ScaleFn>,
    pub dir_fn: Option<DirectionFn>,
    /// Frames until graze is checked again; 0 means eligible
    pub graze_frame_counter: u16,
    pub cull_frame_counter: u16,
}

impl fmt::Debug for BulletRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulletRecord")
            .field("info", &self.info)
            .field("direction", &self.direction)
            .field("scale", &self.scale)
            .field("velocity", &self.velocity)
            .field("graze_frame_counter", &self.graze_frame_counter)
            .field("cull_frame_counter", &self.cull_frame_counter)
            .finish_non_exhaustive()
    }
}

impl BulletRecord {
    /// Build a record, evaluating direction and scale once at `t = time_offset`
    pub fn new(
        velocity: Velocity,
        scale_fn: Option<ScaleFn>,
        dir_fn: Option<DirectionFn>,
        time_offset: f32,
        id: u32,
        index: i32,
    ) -> Self {
        let mut info = ParametricInfo {
            loc: velocity.root,
            t: time_offset,
            id,
            index,
        };
        let direction = velocity.update_zero(&mut info);
        let scale = scale_fn.as_ref().map_or(1.0, |f| f(&info));
        let mut record = Self {
            info,
            time_offset,
            direction,
            scale,
            acc_delta: Vec2::ZERO,
            velocity,
            scale_fn,
            dir_fn,
            graze_frame_counter: 0,
            cull_frame_counter: 0,
        };
        if let Some(dir) = record.evaluate_dir_fn() {
            record.direction = dir;
        }
        record
    }

    /// Motionless record at `loc` facing `direction`
    pub fn null(loc: Vec2, direction: Vec2, id: u32) -> Self {
        let mut record = Self::new(Velocity::facing(loc, direction), None, None, 0.0, id, 0);
        record.direction = direction;
        record
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.info.id
    }

    #[inline]
    pub fn loc(&self) -> Vec2 {
        self.info.loc
    }

    /// Integrate one step and refresh the scale
    #[inline]
    pub fn integrate(&mut self, dt: f32) {
        self.acc_delta = self.velocity.update(&mut self.info, dt);
        if let Some(f) = &self.scale_fn {
            self.scale = f(&self.info);
        }
    }

    /// Point along this frame's displacement, or defer to the direction function
    #[inline]
    pub fn update_direction(&mut self) {
        if let Some(dir) = self.evaluate_dir_fn() {
            self.direction = dir;
        } else if self.acc_delta.length_squared() > MAG_ERR {
            self.direction = self.acc_delta.normalize();
        }
    }

    fn evaluate_dir_fn(&self) -> Option<Vec2> {
        self.dir_fn.as_ref().map(|f| f(self))
    }

    /// Reflect the position across `x = wall` and mirror horizontal motion
    pub fn flip_x_about(&mut self, wall: f32) {
        self.info.loc.x = 2.0 * wall - self.info.loc.x;
        self.velocity.flip_x = !self.velocity.flip_x;
        self.direction.x = -self.direction.x;
    }

    /// Reflect the position across `y = wall` and mirror vertical motion
    pub fn flip_y_about(&mut self, wall: f32) {
        self.info.loc.y = 2.0 * wall - self.info.loc.y;
        self.velocity.flip_y = !self.velocity.flip_y;
        self.direction.y = -self.direction.y;
    }
}
