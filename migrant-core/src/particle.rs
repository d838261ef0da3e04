use crate::record::{CellId, ParticleRecord};
use glam::DVec3;

/// A particle living in a store.
///
/// Only `state` crosses block boundaries. Everything else is derived from it
/// and recomputed when the particle is reconstructed on the receiving side.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub state: ParticleRecord,
    /// Lattice node the particle currently sits in, refreshed on every move.
    pub anchor: [i64; 3],
}

impl Particle {
    pub fn from_record(state: ParticleRecord) -> Self {
        Particle {
            anchor: anchor_of(state.position),
            state,
        }
    }

    /// The serialization copy handed to the transfer layer.
    pub fn to_record(&self) -> ParticleRecord {
        self.state
    }

    pub fn position(&self) -> DVec3 {
        self.state.position
    }

    pub fn cell_id(&self) -> CellId {
        self.state.cell_id
    }

    /// Moves the particle and refreshes its derived state.
    pub fn set_position(&mut self, position: DVec3) {
        self.state.position = position;
        self.anchor = anchor_of(position);
    }
}

impl From<ParticleRecord> for Particle {
    fn from(state: ParticleRecord) -> Self {
        Particle::from_record(state)
    }
}

fn anchor_of(position: DVec3) -> [i64; 3] {
    let floor = position.floor();
    [floor.x as i64, floor.y as i64, floor.z as i64]
}
