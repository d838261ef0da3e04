//! Cross-process particle exchange.
//!
//! The sending side encodes the particles of a region into a flat buffer; the
//! transport moves that buffer (exactly once) to the receiving side, which
//! decodes it into its own store. When the two blocks sit in different
//! periodic images, the receiver moves each particle into its own frame and
//! shifts its body id into the matching replica band.

use log::trace;
use migrant_core::{AtomicBlock, DVec3, ParticleRecord, ParticleStore, Region, SpatialOffset, TransferKind};

use crate::codec;
use crate::error::TransferError;
use crate::identity::ReplicaLayout;
use crate::shear::ShearContext;
use crate::stats::{TransferPhase, TransferStats};

/// Which set of the bound store decoded particles go into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Destination {
    Main,
    Preinlet,
}

/// Particle transfer bound to one block's store.
///
/// Binding checks the block's particle capability once; every later call
/// works on the typed store.
pub struct ParticleTransfer<'a> {
    pub(crate) store: &'a mut dyn ParticleStore,
    pub(crate) layout: ReplicaLayout,
    pub(crate) stats: Option<&'a TransferStats>,
}

impl<'a> ParticleTransfer<'a> {
    pub fn attach(block: &'a mut dyn AtomicBlock, layout: ReplicaLayout) -> Result<Self, TransferError> {
        let store = block.as_particle_store_mut().ok_or(TransferError::NotAParticleBlock)?;
        Ok(ParticleTransfer {
            store,
            layout,
            stats: None,
        })
    }

    pub fn with_stats(mut self, stats: &'a TransferStats) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn store(&self) -> &dyn ParticleStore {
        &*self.store
    }

    pub fn layout(&self) -> &ReplicaLayout {
        &self.layout
    }

    /// Particle blocks carry no static data; everything is rebuilt on transfer.
    pub fn static_cell_size(&self) -> usize {
        0
    }

    /// Encodes the particles in `region` into a fresh buffer.
    pub fn send(&self, region: &Region, kind: TransferKind) -> Vec<u8> {
        let mut buffer = Vec::new();
        self.send_into(region, kind, false, &mut buffer);
        buffer
    }

    /// Encodes the particles in `region` for a pre-inlet reservoir: the
    /// outbound copies start with a residence time of zero.
    pub fn send_preinlet(&self, region: &Region, kind: TransferKind) -> Vec<u8> {
        let mut buffer = Vec::new();
        self.send_into(region, kind, true, &mut buffer);
        buffer
    }

    /// Clears and refills a reusable buffer.
    pub fn send_into(&self, region: &Region, kind: TransferKind, as_preinlet: bool, buffer: &mut Vec<u8>) {
        let sent = codec::encode_into(&*self.store, region, kind, as_preinlet, buffer);
        trace!("Encoded {} particles ({} bytes) for {:?}", sent, buffer.len(), kind);
        self.count(TransferPhase::Send, sent);
    }

    /// Decodes `buffer` as-is; sender and receiver share a periodic image.
    pub fn receive(&mut self, buffer: &[u8], kind: TransferKind) -> usize {
        let store = &mut *self.store;
        let received = codec::decode(buffer, kind, |record| store.add_particle(record));
        trace!("Received {} particles", received);
        self.count(TransferPhase::Receive, received);
        received
    }

    /// Decodes `buffer` sent from the neighbour at `offset`, moving positions
    /// and body ids into this block's frame.
    pub fn receive_with_offset(&mut self, buffer: &[u8], kind: TransferKind, offset: SpatialOffset) -> usize {
        self.receive_sheared(buffer, kind, offset, &ShearContext::NONE)
    }

    /// Like [`ParticleTransfer::receive_with_offset`], also applying the
    /// sliding-boundary correction when `offset` crosses the sheared z faces.
    pub fn receive_sheared(
        &mut self,
        buffer: &[u8],
        kind: TransferKind,
        offset: SpatialOffset,
        shear: &ShearContext,
    ) -> usize {
        if offset.is_zero() {
            return self.receive(buffer, kind);
        }
        self.receive_corrected(buffer, kind, offset, shear, Destination::Main)
    }

    /// Like [`ParticleTransfer::receive_with_offset`], but `region` must lie
    /// inside the bound store's bounding box.
    pub fn receive_in(&mut self, region: &Region, buffer: &[u8], kind: TransferKind, offset: SpatialOffset) -> usize {
        let bounds = self.store.bounding_box();
        assert!(
            bounds.contains_region(region),
            "receive region {:?} lies outside the block {:?}",
            region,
            bounds
        );
        self.receive_with_offset(buffer, kind, offset)
    }

    /// Decodes `buffer` into the pre-inlet reservoir of the bound store.
    pub fn receive_preinlet(&mut self, buffer: &[u8], kind: TransferKind, offset: SpatialOffset) -> usize {
        self.receive_corrected(buffer, kind, offset, &ShearContext::NONE, Destination::Preinlet)
    }

    fn receive_corrected(
        &mut self,
        buffer: &[u8],
        kind: TransferKind,
        offset: SpatialOffset,
        shear: &ShearContext,
        destination: Destination,
    ) -> usize {
        let correction = Correction::new(&self.layout, offset, shear);
        let layout = self.layout;
        let stats = self.stats;
        let store = &mut *self.store;

        let received = codec::decode(buffer, kind, |mut record| {
            correction.apply(&layout, &mut record, stats);
            match destination {
                Destination::Main => store.add_particle(record),
                Destination::Preinlet => store.add_particle_preinlet(record),
            }
        });

        trace!("Received {} particles from offset {:?} into {:?}", received, offset, destination);
        let phase = match destination {
            Destination::Main => TransferPhase::Receive,
            Destination::Preinlet => TransferPhase::ReceivePreinlet,
        };
        self.count(phase, received);
        received
    }

    pub(crate) fn count(&self, phase: TransferPhase, records: usize) {
        if let Some(stats) = self.stats {
            stats.record(phase, records);
        }
    }
}

/// Frame change for particles arriving from one neighbour.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Correction {
    displacement: DVec3,
    identity_offset: i64,
}

impl Correction {
    pub(crate) fn new(layout: &ReplicaLayout, offset: SpatialOffset, shear: &ShearContext) -> Self {
        let mut displacement = offset.displacement();
        displacement.x += shear.streamwise_shift(offset);
        Correction {
            displacement,
            identity_offset: layout.identity_offset(offset),
        }
    }

    pub(crate) fn apply(&self, layout: &ReplicaLayout, record: &mut ParticleRecord, stats: Option<&TransferStats>) {
        record.position += self.displacement;
        let rebased = layout.rebase(record.cell_id, self.identity_offset);
        if rebased.overflowed() {
            if let Some(stats) = stats {
                stats.record_overflow();
            }
        }
        record.cell_id = rebased.id();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migrant_core::{CellId, ParticleField};

    struct FluidBlock;

    impl AtomicBlock for FluidBlock {
        fn as_particle_store(&self) -> Option<&dyn ParticleStore> {
            None
        }

        fn as_particle_store_mut(&mut self) -> Option<&mut dyn ParticleStore> {
            None
        }
    }

    fn layout() -> ReplicaLayout {
        ReplicaLayout::new(100, 3, 9)
    }

    fn source_field() -> ParticleField {
        let mut field = ParticleField::new(Region::from_lattice([0, 0, 0], [16, 16, 16]));
        for i in 0..4 {
            let mut record = ParticleRecord::new(DVec3::new(14.0 + 0.5 * i as f64, 3.0, 3.0), 10 + i as CellId, i as u32);
            record.residence_time = 5;
            field.add_particle(record);
        }
        field
    }

    fn empty_field() -> ParticleField {
        ParticleField::new(Region::from_lattice([0, 0, 0], [16, 16, 16]))
    }

    #[test]
    fn attach_rejects_blocks_without_particles() {
        let mut fluid = FluidBlock;
        let result = ParticleTransfer::attach(&mut fluid, layout());
        assert!(matches!(result, Err(TransferError::NotAParticleBlock)));
    }

    #[test]
    fn particle_blocks_have_no_static_data() {
        let mut field = empty_field();
        let transfer = ParticleTransfer::attach(&mut field, layout()).unwrap();
        assert_eq!(transfer.static_cell_size(), 0);
    }

    #[test]
    fn periodic_receive_shifts_position_and_id() {
        let mut source = source_field();
        let buffer = ParticleTransfer::attach(&mut source, layout())
            .unwrap()
            .send(&Region::from_lattice([14, 0, 0], [16, 16, 16]), TransferKind::ParticleRebuild);

        let mut destination = empty_field();
        let mut transfer = ParticleTransfer::attach(&mut destination, layout()).unwrap();
        let received = transfer.receive_with_offset(&buffer, TransferKind::ParticleRebuild, SpatialOffset::new(-16, 0, 0));
        assert_eq!(received, 4);

        let first = &destination.particles()[0];
        assert_eq!(first.position(), DVec3::new(-2.0, 3.0, 3.0));
        assert_eq!(first.cell_id(), 10 - 100);
        assert_eq!(first.anchor, [-2, 3, 3]);
    }

    #[test]
    fn zero_offset_matches_plain_receive() {
        let mut source = source_field();
        let buffer = ParticleTransfer::attach(&mut source, layout())
            .unwrap()
            .send(&Region::from_lattice([0, 0, 0], [16, 16, 16]), TransferKind::DataStructure);

        let mut plain = empty_field();
        ParticleTransfer::attach(&mut plain, layout())
            .unwrap()
            .receive(&buffer, TransferKind::DataStructure);

        let mut offset = empty_field();
        ParticleTransfer::attach(&mut offset, layout())
            .unwrap()
            .receive_with_offset(&buffer, TransferKind::DataStructure, SpatialOffset::ZERO);

        assert_eq!(plain.particles(), offset.particles());
    }

    #[test]
    fn preinlet_receive_lands_in_reservoir() {
        let mut source = source_field();
        let buffer = ParticleTransfer::attach(&mut source, layout())
            .unwrap()
            .send_preinlet(&Region::from_lattice([0, 0, 0], [16, 16, 16]), TransferKind::ParticleRebuild);
        assert_eq!(source.particles()[0].state.residence_time, 5);

        let mut destination = empty_field();
        let received = ParticleTransfer::attach(&mut destination, layout())
            .unwrap()
            .receive_preinlet(&buffer, TransferKind::ParticleRebuild, SpatialOffset::new(16, 0, 0));

        assert_eq!(received, 4);
        assert_eq!(destination.len(), 0);
        assert_eq!(destination.preinlet_len(), 4);
        let arrived = &destination.preinlet_particles()[1];
        assert_eq!(arrived.position(), DVec3::new(30.5, 3.0, 3.0));
        assert_eq!(arrived.cell_id(), 111);
        assert_eq!(arrived.state.residence_time, 0);
    }

    #[test]
    fn overflowing_id_is_canonicalized_and_counted() {
        let layout = layout();
        let shift = layout.identity_offset(SpatialOffset::new(0, 0, 16));
        let near_max = (i64::from(CellId::MAX) - shift + 1) as CellId;

        let mut source = empty_field();
        source.add_particle(ParticleRecord::new(DVec3::new(1.0, 1.0, 15.5), near_max, 0));
        source.add_particle(ParticleRecord::new(DVec3::new(2.0, 1.0, 15.5), 42, 0));
        let buffer = ParticleTransfer::attach(&mut source, layout)
            .unwrap()
            .send(&Region::from_lattice([0, 0, 15], [16, 16, 16]), TransferKind::ParticleRebuild);

        let stats = TransferStats::new();
        let mut destination = empty_field();
        ParticleTransfer::attach(&mut destination, layout)
            .unwrap()
            .with_stats(&stats)
            .receive_with_offset(&buffer, TransferKind::ParticleRebuild, SpatialOffset::new(0, 0, 16));

        assert_eq!(destination.particles()[0].cell_id(), layout.canonical_id(near_max));
        assert_eq!(destination.particles()[1].cell_id(), 942);
        assert_eq!(stats.identity_overflows(), 1);
        assert_eq!(stats.records(TransferPhase::Receive), 2);
    }

    #[test]
    fn non_structural_receive_ignores_buffer() {
        let mut destination = empty_field();
        let mut transfer = ParticleTransfer::attach(&mut destination, layout()).unwrap();
        let received = transfer.receive_with_offset(&[0u8; 5], TransferKind::StaticVariables, SpatialOffset::new(16, 0, 0));
        assert_eq!(received, 0);
        assert!(destination.is_empty());
    }

    #[test]
    fn sheared_receive_adds_displacement_across_upper_face() {
        let mut source = empty_field();
        source.add_particle(ParticleRecord::new(DVec3::new(4.0, 2.0, 15.5), 3, 0));
        let buffer = ParticleTransfer::attach(&mut source, layout())
            .unwrap()
            .send(&Region::from_lattice([0, 0, 15], [16, 16, 16]), TransferKind::ParticleRebuild);

        let mut destination = empty_field();
        ParticleTransfer::attach(&mut destination, layout())
            .unwrap()
            .receive_sheared(&buffer, TransferKind::ParticleRebuild, SpatialOffset::new(0, 0, -16), &ShearContext::new(1.5, 16));

        assert_eq!(destination.particles()[0].position(), DVec3::new(5.5, 2.0, -0.5));
    }

    #[test]
    fn receive_in_accepts_region_inside_block() {
        let mut source = source_field();
        let buffer = ParticleTransfer::attach(&mut source, layout())
            .unwrap()
            .send(&Region::from_lattice([0, 0, 0], [16, 16, 16]), TransferKind::ParticleRebuild);

        let mut destination = empty_field();
        let received = ParticleTransfer::attach(&mut destination, layout())
            .unwrap()
            .receive_in(&Region::from_lattice([0, 0, 0], [2, 16, 16]), &buffer, TransferKind::ParticleRebuild, SpatialOffset::ZERO);
        assert_eq!(received, 4);
    }

    #[test]
    #[should_panic(expected = "outside the block")]
    fn receive_in_rejects_foreign_region() {
        let mut destination = empty_field();
        ParticleTransfer::attach(&mut destination, layout()).unwrap().receive_in(
            &Region::from_lattice([12, 0, 0], [20, 16, 16]),
            &[],
            TransferKind::ParticleRebuild,
            SpatialOffset::ZERO,
        );
    }
}
