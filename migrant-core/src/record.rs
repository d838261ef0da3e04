use glam::DVec3;

use crate::wire::WireRecord;

/// Identifier of the deformable body a particle belongs to.
///
/// Ids are distinct per periodic replica: the same body seen through a
/// periodic face carries a shifted id.
pub type CellId = i32;

/// Layout revision of [`ParticleRecord`] on the wire. Both ends of an
/// exchange must agree on it; it is not transmitted.
pub const WIRE_VERSION: u16 = 1;

/// Encoded size of one [`ParticleRecord`].
pub const RECORD_SIZE: usize = <ParticleRecord as WireRecord>::WIRE_SIZE;

/// The transferable state of one particle.
///
/// Field order is the wire order. Changing it, or any field type, requires
/// bumping [`WIRE_VERSION`].
#[derive(Debug, Clone, Copy, PartialEq, Default, crate::WireRecord)]
pub struct ParticleRecord {
    pub position: DVec3,
    pub velocity: DVec3,
    pub force: DVec3,
    pub cell_id: CellId,
    /// Index of the particle within its body's mesh.
    pub vertex_id: u32,
    pub cell_type: u8,
    /// Steps spent in the current store.
    pub residence_time: u32,
    pub from_preinlet: bool,
}

impl ParticleRecord {
    pub fn new(position: DVec3, cell_id: CellId, vertex_id: u32) -> Self {
        ParticleRecord {
            position,
            cell_id,
            vertex_id,
            ..Default::default()
        }
    }

    pub fn with_velocity(mut self, velocity: DVec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_cell_type(mut self, cell_type: u8) -> Self {
        self.cell_type = cell_type;
        self
    }
}
