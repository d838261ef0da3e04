use glam::DVec3;
use std::ops::Neg;

/// Relative lattice position of a neighbouring block.
///
/// The components are the translation a particle undergoes when it is handed
/// to that neighbour: zero for a neighbour in the same periodic image, `±n`
/// along an axis whose periodic face is crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SpatialOffset {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl SpatialOffset {
    pub const ZERO: SpatialOffset = SpatialOffset { x: 0, y: 0, z: 0 };

    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        SpatialOffset { x, y, z }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Per-axis direction of the crossing: -1, 0 or 1.
    pub fn signum(&self) -> (i64, i64, i64) {
        (self.x.signum(), self.y.signum(), self.z.signum())
    }

    /// The real-valued translation implied by this offset.
    pub fn displacement(&self) -> DVec3 {
        DVec3::new(self.x as f64, self.y as f64, self.z as f64)
    }
}

impl Neg for SpatialOffset {
    type Output = SpatialOffset;

    fn neg(self) -> Self::Output {
        SpatialOffset::new(-self.x, -self.y, -self.z)
    }
}

/// Axis-aligned box, closed at `min` and open at `max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub min: DVec3,
    pub max: DVec3,
}

impl Region {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        assert!(
            min.x <= max.x && min.y <= max.y && min.z <= max.z,
            "region min {:?} exceeds max {:?}",
            min,
            max
        );
        Region { min, max }
    }

    /// Region covering the lattice cells `lo..hi` on every axis.
    pub fn from_lattice(lo: [i64; 3], hi: [i64; 3]) -> Self {
        Region::new(
            DVec3::new(lo[0] as f64, lo[1] as f64, lo[2] as f64),
            DVec3::new(hi[0] as f64, hi[1] as f64, hi[2] as f64),
        )
    }

    #[inline]
    pub fn contains(&self, point: DVec3) -> bool {
        point.x >= self.min.x
            && point.x < self.max.x
            && point.y >= self.min.y
            && point.y < self.max.y
            && point.z >= self.min.z
            && point.z < self.max.z
    }

    /// True when `other` lies entirely inside this region.
    pub fn contains_region(&self, other: &Region) -> bool {
        other.min.x >= self.min.x
            && other.max.x <= self.max.x
            && other.min.y >= self.min.y
            && other.max.y <= self.max.y
            && other.min.z >= self.min.z
            && other.max.z <= self.max.z
    }

    pub fn translated(&self, by: DVec3) -> Region {
        Region {
            min: self.min + by,
            max: self.max + by,
        }
    }

    pub fn extent(&self) -> DVec3 {
        self.max - self.min
    }
}

/// Folds `value` into `[0, period)`.
///
/// Returns the folded value and how many periods were added to reach it.
/// The result stays strictly below `period` even where plain `rem_euclid`
/// would round a tiny negative value up to `period` itself.
pub fn wrap_periodic(value: f64, period: f64) -> (f64, i64) {
    let turns = -(value / period).floor();
    let mut wrapped = value + turns * period;
    if wrapped >= period {
        wrapped = period * (1.0 - f64::EPSILON);
    } else if wrapped < 0.0 {
        wrapped = 0.0;
    }
    (wrapped, turns as i64)
}
