use rand::Rng;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Location {
    pub x: i32,
    pub y: i32,
}

impl Location {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn top_left() -> Self {
        Self::new(0, 0)
    }

    pub fn top_center(resolution: Resolution, bounds: Rect) -> Self {
        Self::new(half_gap(resolution.width, bounds.w), 0)
    }

    pub fn top_right(resolution: Resolution, bounds: Rect) -> Self {
        Self::new(resolution.width as i32 - bounds.w, 0)
    }

    pub fn center_left(resolution: Resolution, bounds: Rect) -> Self {
        Self::new(0, half_gap(resolution.height, bounds.h))
    }

    pub fn center(resolution: Resolution, bounds: Rect) -> Self {
        Self::new(
            half_gap(resolution.width, bounds.w),
            half_gap(resolution.height, bounds.h),
        )
    }

    pub fn center_right(resolution: Resolution, bounds: Rect) -> Self {
        Self::new(
            resolution.width as i32 - bounds.w,
            half_gap(resolution.height, bounds.h),
        )
    }

    pub fn bottom_left(resolution: Resolution, bounds: Rect) -> Self {
        Self::new(0, resolution.height as i32 - bounds.h)
    }

    pub fn bottom_center(resolution: Resolution, bounds: Rect) -> Self {
        Self::new(
            half_gap(resolution.width, bounds.w),
            resolution.height as i32 - bounds.h,
        )
    }

    pub fn bottom_right(resolution: Resolution, bounds: Rect) -> Self {
        Self::new(
            resolution.width as i32 - bounds.w,
            resolution.height as i32 - bounds.h,
        )
    }

    /// Uniform location that keeps `bounds` inside the frame. Objects larger
    /// than the frame pin to the top-left corner.
    pub fn random(resolution: Resolution, bounds: Rect) -> Self {
        Self::random_with(&mut rand::thread_rng(), resolution, bounds)
    }

    pub fn random_with<R: Rng + ?Sized>(rng: &mut R, resolution: Resolution, bounds: Rect) -> Self {
        let max_x = (resolution.width as i32 - bounds.w).max(0);
        let max_y = (resolution.height as i32 - bounds.h).max(0);
        Self::new(rng.gen_range(0..=max_x), rng.gen_range(0..=max_y))
    }

    /// Offsets both axes with wrapping arithmetic, so `sub` always undoes it.
    pub fn add(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.wrapping_add(dx), self.y.wrapping_add(dy))
    }

    pub fn sub(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.wrapping_sub(dx), self.y.wrapping_sub(dy))
    }

    pub fn translate(&mut self, dx: i32, dy: i32) {
        *self = self.add(dx, dy);
    }

    /// Scales both axes, truncating toward zero.
    pub fn mul(self, scalar: f32) -> Self {
        Self::new(
            (self.x as f32 * scalar) as i32,
            (self.y as f32 * scalar) as i32,
        )
    }

    pub fn dist(self, other: Self) -> f64 {
        (self.dist_sqr(other) as f64).sqrt()
    }

    pub fn dist_sqr(self, other: Self) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        dx * dx + dy * dy
    }

    pub fn dist_x(self, other: Self) -> u32 {
        self.x.abs_diff(other.x)
    }

    pub fn dist_y(self, other: Self) -> u32 {
        self.y.abs_diff(other.y)
    }

    pub fn midpoint(self, other: Self) -> Self {
        let x = (f64::from(self.x) + f64::from(other.x)) / 2.0;
        let y = (f64::from(self.y) + f64::from(other.y)) / 2.0;
        Self::new(x.round_ties_even() as i32, y.round_ties_even() as i32)
    }

    pub fn as_tuple(self) -> (i32, i32) {
        (self.x, self.y)
    }
}

impl From<(i32, i32)> for Location {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

fn half_gap(frame: u32, extent: i32) -> i32 {
    ((frame as f64 / 2.0) - (f64::from(extent) / 2.0)) as i32
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn at(location: Location, w: i32, h: i32) -> Self {
        Self::new(location.x, location.y, w, h)
    }

    pub fn location(&self) -> Location {
        Location::new(self.x, self.y)
    }

    /// Exclusive right edge, clamped at `i32::MAX`.
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.w)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.h)
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    pub fn contains_point(&self, point: Location) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_scalar")]
    pub scalar: f32,
}

fn default_scalar() -> f32 {
    1.0
}

impl Resolution {
    pub const P576: Resolution = Resolution::new(1024, 576, 1.0);
    pub const P648: Resolution = Resolution::new(1152, 648, 1.125);
    pub const P720: Resolution = Resolution::new(1280, 720, 1.25);
    pub const P900: Resolution = Resolution::new(1600, 900, 1.5625);
    pub const P1080: Resolution = Resolution::new(1920, 1080, 1.875);
    pub const P1440: Resolution = Resolution::new(2560, 1440, 2.5);
    pub const P2160: Resolution = Resolution::new(3840, 2160, 3.75);

    pub const PRESETS: [Resolution; 7] = [
        Self::P576,
        Self::P648,
        Self::P720,
        Self::P900,
        Self::P1080,
        Self::P1440,
        Self::P2160,
    ];

    pub const fn new(width: u32, height: u32, scalar: f32) -> Self {
        Self {
            width,
            height,
            scalar,
        }
    }

    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frame(self) -> Rect {
        Rect::new(0, 0, self.width as i32, self.height as i32)
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::P720
    }
}
