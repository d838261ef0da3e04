use crate::geometry::Region;
use crate::particle::Particle;
use crate::record::ParticleRecord;

/// Storage the transfer layer reads from and inserts into.
pub trait ParticleStore {
    /// The region this store owns.
    fn bounding_box(&self) -> Region;

    /// Live particles inside `region`, in insertion order.
    fn find_particles(&self, region: &Region) -> Vec<&Particle>;

    fn particles(&self) -> &[Particle];

    /// Reconstructs a live particle from `record` in the main set.
    fn add_particle(&mut self, record: ParticleRecord);

    /// Reconstructs a live particle from `record` in the pre-inlet reservoir.
    fn add_particle_preinlet(&mut self, record: ParticleRecord);

    fn len(&self) -> usize {
        self.particles().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A block of the decomposed domain.
///
/// Only some blocks carry particles; the others (fluid lattices, scalar
/// fields) answer `None`. Callers check the capability once, when they bind
/// to the block, rather than on every exchange.
pub trait AtomicBlock {
    fn as_particle_store(&self) -> Option<&dyn ParticleStore>;

    fn as_particle_store_mut(&mut self) -> Option<&mut dyn ParticleStore>;
}
