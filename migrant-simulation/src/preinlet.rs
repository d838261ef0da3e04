use log::debug;
use migrant_config::{DomainSettings, PreInletSettings};
use migrant_core::{ParticleField, ParticleRecord, ParticleStore, Region, SpatialOffset, TransferKind};
use migrant_transfer::{ParticleTransfer, ReplicaLayout, TransferStats};

use crate::error::SimulationError;
use crate::exchange::Block;

/// Reservoir slab upstream of the x = 0 inlet.
///
/// The reservoir is periodic along x on its own: particles that drift past
/// x = 0 are copied into the inlet blocks on feed steps and then re-enter the
/// slab from its upstream face, so the feed never runs dry.
#[derive(Debug, Clone)]
pub struct PreInlet {
    reservoir: ParticleField,
    period: u64,
    thickness: f64,
}

impl PreInlet {
    pub fn new(settings: &PreInletSettings, domain: &DomainSettings) -> Self {
        let region = Region::from_lattice([-settings.thickness, 0, 0], [0, domain.ny, domain.nz]);
        PreInlet {
            reservoir: ParticleField::new(region),
            period: settings.period,
            thickness: settings.thickness as f64,
        }
    }

    pub fn reservoir(&self) -> &ParticleField {
        &self.reservoir
    }

    pub fn len(&self) -> usize {
        self.reservoir.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reservoir.is_empty()
    }

    pub fn insert(&mut self, record: ParticleRecord) -> Result<(), SimulationError> {
        if !self.reservoir.bounding_box().contains(record.position) {
            return Err(SimulationError::OutsideDomain(record.position));
        }
        self.reservoir.add_particle(record);
        Ok(())
    }

    pub fn is_feed_step(&self, step: u64) -> bool {
        step % self.period == 0
    }

    pub(crate) fn advance(&mut self, dt: f64) {
        for particle in self.reservoir.particles_mut() {
            let next = particle.position() + particle.state.velocity * dt;
            particle.set_position(next);
        }
        self.reservoir.advance_residence();
    }

    /// Hands every reservoir particle inside `block`'s bulk to the block as a
    /// fresh arrival. Returns how many entered.
    pub(crate) fn feed(
        &mut self,
        block: &mut Block,
        layout: ReplicaLayout,
        stats: &TransferStats,
    ) -> Result<usize, SimulationError> {
        let buffer = ParticleTransfer::attach(&mut self.reservoir, layout)?
            .with_stats(stats)
            .send_preinlet(&block.spec.bulk, TransferKind::ParticleRebuild);

        ParticleTransfer::attach(&mut block.field, layout)?.with_stats(stats).receive_preinlet(
            &buffer,
            TransferKind::ParticleRebuild,
            SpatialOffset::ZERO,
        );
        let released = block.field.release_preinlet();
        if released > 0 {
            debug!("Pre-inlet fed {} particles into block {}", released, block.id());
        }
        Ok(released)
    }

    /// Moves particles that left through x = 0 back to the upstream face.
    pub(crate) fn recycle(&mut self) -> usize {
        let mut recycled = 0;
        for particle in self.reservoir.particles_mut() {
            let mut position = particle.position();
            if position.x >= 0.0 {
                position.x -= self.thickness;
                particle.set_position(position);
                recycled += 1;
            }
        }
        recycled
    }
}
