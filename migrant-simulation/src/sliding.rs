use migrant_config::{DomainSettings, ShearSettings};
use migrant_core::wrap_periodic;
use migrant_transfer::ShearContext;

/// Owner of the sliding z-boundary displacement.
///
/// The displacement grows by `velocity * dt` each step and is kept inside
/// one streamwise period, `[0, nx)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SlidingBoundary {
    velocity: f64,
    streamwise_period: i64,
    height: i64,
    displacement: f64,
}

impl SlidingBoundary {
    pub fn new(velocity: f64, streamwise_period: i64, height: i64) -> Self {
        SlidingBoundary {
            velocity,
            streamwise_period,
            height,
            displacement: 0.0,
        }
    }

    /// `None` when the configuration has no sliding boundary.
    pub fn from_settings(shear: &ShearSettings, domain: &DomainSettings) -> Option<Self> {
        shear
            .enabled
            .then(|| SlidingBoundary::new(shear.velocity, domain.nx, domain.nz))
    }

    pub fn advance(&mut self, dt: f64) {
        self.displacement = wrap_periodic(self.displacement + self.velocity * dt, self.streamwise_period as f64).0;
    }

    pub fn displacement(&self) -> f64 {
        self.displacement
    }

    pub fn streamwise_period(&self) -> i64 {
        self.streamwise_period
    }

    /// The value every exchange of the current step reads.
    pub fn context(&self) -> ShearContext {
        ShearContext::new(self.displacement, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migrant_core::SpatialOffset;

    #[test]
    fn displacement_wraps_into_one_period() {
        let mut boundary = SlidingBoundary::new(3.0, 8, 4);
        boundary.advance(1.0);
        boundary.advance(1.0);
        assert_eq!(boundary.displacement(), 6.0);
        boundary.advance(1.0);
        assert_eq!(boundary.displacement(), 1.0);

        let mut backwards = SlidingBoundary::new(-3.0, 8, 4);
        backwards.advance(1.0);
        assert_eq!(backwards.displacement(), 5.0);
    }

    #[test]
    fn context_reflects_current_displacement() {
        let mut boundary = SlidingBoundary::new(0.5, 16, 8);
        boundary.advance(2.0);
        let context = boundary.context();
        assert_eq!(context.streamwise_shift(SpatialOffset::new(0, 0, -8)), 1.0);
        assert_eq!(context.streamwise_shift(SpatialOffset::new(0, 0, 8)), -1.0);
    }

    #[test]
    fn disabled_shear_has_no_boundary() {
        let domain = DomainSettings {
            nx: 8,
            ny: 8,
            nz: 8,
            periodic: [true; 3],
            blocks: [1, 1, 1],
        };
        assert!(SlidingBoundary::from_settings(&ShearSettings::default(), &domain).is_none());
        let enabled = ShearSettings {
            enabled: true,
            velocity: 0.1,
        };
        assert!(SlidingBoundary::from_settings(&enabled, &domain).is_some());
    }
}
