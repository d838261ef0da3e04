use std::collections::BTreeSet;

use crate::geometry::Region;
use crate::particle::Particle;
use crate::record::{CellId, ParticleRecord};
use crate::store::{AtomicBlock, ParticleStore};

/// Particle storage for one block.
///
/// Holds the particles the block owns plus a pre-inlet reservoir of particles
/// that have been handed over but not yet released into the main set.
/// Insertion never removes anything: dropping particles that have migrated
/// away is the owner's job (see [`ParticleField::remove_particles_outside`]).
#[derive(Debug, Clone)]
pub struct ParticleField {
    bounding_box: Region,
    particles: Vec<Particle>,
    preinlet: Vec<Particle>,
}

impl ParticleField {
    pub fn new(bounding_box: Region) -> Self {
        ParticleField {
            bounding_box,
            particles: Vec::new(),
            preinlet: Vec::new(),
        }
    }

    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn preinlet_particles(&self) -> &[Particle] {
        &self.preinlet
    }

    pub fn preinlet_len(&self) -> usize {
        self.preinlet.len()
    }

    /// Distinct body ids with at least one particle in the main set.
    pub fn cell_ids(&self) -> BTreeSet<CellId> {
        self.particles.iter().map(Particle::cell_id).collect()
    }

    /// Drops every particle inside `region`. Returns how many were removed.
    pub fn remove_particles(&mut self, region: &Region) -> usize {
        let before = self.particles.len();
        self.particles.retain(|p| !region.contains(p.position()));
        before - self.particles.len()
    }

    /// Drops every particle that has left `bulk`. Returns how many were removed.
    pub fn remove_particles_outside(&mut self, bulk: &Region) -> usize {
        let before = self.particles.len();
        self.particles.retain(|p| bulk.contains(p.position()));
        before - self.particles.len()
    }

    /// Moves the pre-inlet reservoir into the main set, flagging each
    /// particle as having come from the pre-inlet. Returns how many moved.
    pub fn release_preinlet(&mut self) -> usize {
        let released = self.preinlet.len();
        for mut particle in self.preinlet.drain(..) {
            particle.state.from_preinlet = true;
            self.particles.push(particle);
        }
        released
    }

    /// Ages every particle, main set and reservoir alike, by one step.
    pub fn advance_residence(&mut self) {
        for particle in self.particles.iter_mut().chain(self.preinlet.iter_mut()) {
            particle.state.residence_time = particle.state.residence_time.saturating_add(1);
        }
    }
}

impl ParticleStore for ParticleField {
    fn bounding_box(&self) -> Region {
        self.bounding_box
    }

    fn find_particles(&self, region: &Region) -> Vec<&Particle> {
        self.particles
            .iter()
            .filter(|p| region.contains(p.position()))
            .collect()
    }

    fn particles(&self) -> &[Particle] {
        &self.particles
    }

    fn add_particle(&mut self, record: ParticleRecord) {
        self.particles.push(Particle::from_record(record));
    }

    fn add_particle_preinlet(&mut self, record: ParticleRecord) {
        self.preinlet.push(Particle::from_record(record));
    }
}

impl AtomicBlock for ParticleField {
    fn as_particle_store(&self) -> Option<&dyn ParticleStore> {
        Some(self)
    }

    fn as_particle_store_mut(&mut self) -> Option<&mut dyn ParticleStore> {
        Some(self)
    }
}
