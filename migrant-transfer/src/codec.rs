//! Flat record buffers.
//!
//! A buffer is `n` [`ParticleRecord`]s back to back, `n * RECORD_SIZE` bytes,
//! with no header. Non-structural transfer kinds carry no particles: encoding
//! yields an empty buffer and decoding ignores whatever it is given.

use migrant_core::{ParticleRecord, ParticleStore, Region, TransferKind, WireRecord, RECORD_SIZE};

/// Number of records in `buffer`.
///
/// Panics if the length is not a whole number of records; such a buffer can
/// only come from a caller bug.
pub fn record_count(buffer: &[u8]) -> usize {
    assert!(
        buffer.len() % RECORD_SIZE == 0,
        "particle buffer of {} bytes is not a multiple of the {}-byte record size",
        buffer.len(),
        RECORD_SIZE
    );
    buffer.len() / RECORD_SIZE
}

/// Clears `buffer` and fills it with the particles of `store` inside `region`,
/// in discovery order. Returns how many records were written.
///
/// With `as_preinlet`, each outbound copy has its residence time reset; the
/// particles in `store` are untouched.
pub fn encode_into(
    store: &dyn ParticleStore,
    region: &Region,
    kind: TransferKind,
    as_preinlet: bool,
    buffer: &mut Vec<u8>,
) -> usize {
    buffer.clear();
    if !kind.is_structural() {
        return 0;
    }

    let found = store.find_particles(region);
    buffer.reserve(found.len() * RECORD_SIZE);
    for particle in &found {
        let mut record = particle.to_record();
        if as_preinlet {
            record.residence_time = 0;
        }
        record.put(buffer);
    }
    found.len()
}

pub fn encode(store: &dyn ParticleStore, region: &Region, kind: TransferKind, as_preinlet: bool) -> Vec<u8> {
    let mut buffer = Vec::new();
    encode_into(store, region, kind, as_preinlet, &mut buffer);
    buffer
}

/// Walks `buffer` record by record and hands each one to `insert`.
/// Returns how many records were decoded.
///
/// Decoding is not idempotent: feeding the same buffer twice inserts every
/// particle twice.
pub fn decode<F>(buffer: &[u8], kind: TransferKind, mut insert: F) -> usize
where
    F: FnMut(ParticleRecord),
{
    if !kind.is_structural() {
        return 0;
    }

    let count = record_count(buffer);
    for mut chunk in buffer.chunks_exact(RECORD_SIZE) {
        insert(ParticleRecord::get(&mut chunk));
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use migrant_core::{CellId, DVec3, ParticleField};

    fn populated_field() -> ParticleField {
        let mut field = ParticleField::new(Region::from_lattice([0, 0, 0], [8, 8, 8]));
        for i in 0..6 {
            let mut record = ParticleRecord::new(DVec3::new(i as f64 + 0.5, 1.0, 1.0), i as CellId, i as u32)
                .with_velocity(DVec3::new(0.1, 0.0, 0.0));
            record.residence_time = 10 + i as u32;
            field.add_particle(record);
        }
        field
    }

    fn decode_all(buffer: &[u8], kind: TransferKind) -> Vec<ParticleRecord> {
        let mut out = Vec::new();
        decode(buffer, kind, |record| out.push(record));
        out
    }

    #[test]
    fn encodes_only_particles_in_region() {
        let field = populated_field();
        let buffer = encode(&field, &Region::from_lattice([2, 0, 0], [4, 8, 8]), TransferKind::ParticleRebuild, false);
        assert_eq!(record_count(&buffer), 2);

        let ids: Vec<CellId> = decode_all(&buffer, TransferKind::ParticleRebuild).iter().map(|r| r.cell_id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn records_survive_unchanged() {
        let field = populated_field();
        let buffer = encode(&field, &field.bounding_box(), TransferKind::DataStructure, false);
        let decoded = decode_all(&buffer, TransferKind::DataStructure);
        let original: Vec<ParticleRecord> = field.particles().iter().map(|p| p.to_record()).collect();
        assert_eq!(decoded, original);
    }

    #[test]
    fn preinlet_copy_resets_residence_but_not_source() {
        let field = populated_field();
        let buffer = encode(&field, &field.bounding_box(), TransferKind::ParticleRebuild, true);

        assert!(decode_all(&buffer, TransferKind::ParticleRebuild).iter().all(|r| r.residence_time == 0));
        assert_eq!(field.particles()[3].state.residence_time, 13);
    }

    #[test]
    fn non_structural_kinds_move_nothing() {
        let field = populated_field();
        let full = encode(&field, &field.bounding_box(), TransferKind::ParticleRebuild, false);
        for kind in [
            TransferKind::Nothing,
            TransferKind::StaticVariables,
            TransferKind::DynamicVariables,
            TransferKind::AllVariables,
        ] {
            assert!(encode(&field, &field.bounding_box(), kind, false).is_empty());
            assert!(decode_all(&full, kind).is_empty());
        }
    }

    #[test]
    fn encode_into_clears_previous_contents() {
        let field = populated_field();
        let mut buffer = vec![0xAB; 7];
        let written = encode_into(&field, &Region::from_lattice([0, 0, 0], [1, 8, 8]), TransferKind::ParticleRebuild, false, &mut buffer);
        assert_eq!(written, 1);
        assert_eq!(buffer.len(), RECORD_SIZE);

        encode_into(&field, &field.bounding_box(), TransferKind::Nothing, false, &mut buffer);
        assert!(buffer.is_empty());
    }

    #[test]
    #[should_panic(expected = "not a multiple")]
    fn truncated_buffer_is_a_contract_violation() {
        let field = populated_field();
        let mut buffer = encode(&field, &field.bounding_box(), TransferKind::ParticleRebuild, false);
        buffer.pop();
        decode_all(&buffer, TransferKind::ParticleRebuild);
    }

    #[test]
    fn malformed_buffer_is_ignored_for_non_structural_kind() {
        assert!(decode_all(&[1, 2, 3], TransferKind::AllVariables).is_empty());
    }
}
