//! Same-worker exchange.
//!
//! When both blocks live with the same worker there is nothing to transport:
//! records are copied straight out of the source store and inserted into the
//! bound one, with the same frame change a remote receive would apply.

use log::trace;
use migrant_core::{ParticleRecord, ParticleStore, Region, SpatialOffset, TransferKind};

use crate::engine::{Correction, ParticleTransfer};
use crate::shear::ShearContext;
use crate::stats::TransferPhase;

impl<'a> ParticleTransfer<'a> {
    /// Moves copies of the particles of `source` inside `region` into the
    /// bound store, as seen from the neighbour at `offset`.
    ///
    /// Returns how many particles were inserted. Removing them from `source`
    /// is left to the caller.
    pub fn attribute_local(
        &mut self,
        source: &dyn ParticleStore,
        region: &Region,
        offset: SpatialOffset,
        kind: TransferKind,
        shear: &ShearContext,
    ) -> usize {
        let records = snapshot(source, region, kind);
        self.attribute_records(records, offset, kind, shear)
    }

    /// [`ParticleTransfer::attribute_local`] where the source is the bound
    /// store itself, as for a block that is its own periodic neighbour.
    pub fn attribute_within(
        &mut self,
        region: &Region,
        offset: SpatialOffset,
        kind: TransferKind,
        shear: &ShearContext,
    ) -> usize {
        // All records are copied out before the first insertion grows the store.
        let records = self.snapshot(region, kind);
        self.attribute_records(records, offset, kind, shear)
    }

    /// Copies of the bound store's particles inside `region`, ready for
    /// [`ParticleTransfer::attribute_records`] on another store.
    pub fn snapshot(&self, region: &Region, kind: TransferKind) -> Vec<ParticleRecord> {
        snapshot(&*self.store, region, kind)
    }

    /// Inserts records taken earlier by [`ParticleTransfer::snapshot`] from
    /// the neighbour at `offset`.
    pub fn attribute_records(
        &mut self,
        records: Vec<ParticleRecord>,
        offset: SpatialOffset,
        kind: TransferKind,
        shear: &ShearContext,
    ) -> usize {
        if !kind.is_structural() {
            self.count(TransferPhase::LocalCommunication, 0);
            return 0;
        }
        let moved = records.len();
        if offset.is_zero() {
            for record in records {
                self.store.add_particle(record);
            }
        } else {
            let correction = Correction::new(&self.layout, offset, shear);
            for mut record in records {
                correction.apply(&self.layout, &mut record, self.stats);
                self.store.add_particle(record);
            }
        }

        trace!("Attributed {} particles locally from offset {:?}", moved, offset);
        self.count(TransferPhase::LocalCommunication, moved);
        moved
    }
}

fn snapshot(source: &dyn ParticleStore, region: &Region, kind: TransferKind) -> Vec<ParticleRecord> {
    if !kind.is_structural() {
        return Vec::new();
    }
    source
        .find_particles(region)
        .into_iter()
        .map(|particle| particle.to_record())
        .collect()
}
