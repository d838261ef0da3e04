use migrant_core::SpatialOffset;

/// Read-only view of the sliding z-boundary for one exchange.
///
/// The driver updates the displacement once per step, before any block
/// exchanges, and hands every exchange the same value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShearContext {
    displacement: f64,
    domain_height: i64,
}

impl ShearContext {
    /// No sliding boundary: every correction is zero.
    pub const NONE: ShearContext = ShearContext {
        displacement: 0.0,
        domain_height: 0,
    };

    pub fn new(displacement: f64, domain_height: i64) -> Self {
        ShearContext {
            displacement,
            domain_height,
        }
    }

    pub fn displacement(&self) -> f64 {
        self.displacement
    }

    pub fn domain_height(&self) -> i64 {
        self.domain_height
    }

    /// Extra x translation for a particle moved by `offset`.
    ///
    /// Only the pair of extremal z faces slides. A particle leaving through
    /// the top arrives at the bottom (`offset.z == -height`) and is carried
    /// forward by the displacement; leaving through the bottom carries it back.
    pub fn streamwise_shift(&self, offset: SpatialOffset) -> f64 {
        if self.domain_height == 0 {
            return 0.0;
        }
        if offset.z == -self.domain_height {
            self.displacement
        } else if offset.z == self.domain_height {
            -self.displacement
        } else {
            0.0
        }
    }
}

impl Default for ShearContext {
    fn default() -> Self {
        ShearContext::NONE
    }
}
