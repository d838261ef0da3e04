//! Identity bookkeeping across periodic replicas.
//!
//! Every periodic image of the domain owns its own band of body ids, so body
//! `k` seen through the +x face is a different id from body `k` seen directly.
//! Crossing a face shifts the id by a whole number of bands; the canonical id
//! (`id mod bodies_per_replica`) maps any replica back to the original body.

use log::warn;
use migrant_config::ReplicaSettings;
use migrant_core::{CellId, SpatialOffset};

/// Simulation-wide, read-only identity constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaLayout {
    bodies_per_replica: i32,
    stride_y: i32,
    stride_z: i32,
}

/// Outcome of applying an identity shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rebased {
    /// The shift fit in the id range and was applied.
    Shifted(CellId),
    /// The shift would have overflowed; the id fell back to its canonical form.
    Canonicalized(CellId),
}

impl Rebased {
    pub fn id(self) -> CellId {
        match self {
            Rebased::Shifted(id) | Rebased::Canonicalized(id) => id,
        }
    }

    pub fn overflowed(self) -> bool {
        matches!(self, Rebased::Canonicalized(_))
    }
}

impl ReplicaLayout {
    pub fn new(bodies_per_replica: i32, stride_y: i32, stride_z: i32) -> Self {
        assert!(bodies_per_replica > 0, "bodies_per_replica must be positive, got {}", bodies_per_replica);
        assert!(stride_y > 0 && stride_z > 0, "replica strides must be positive, got {} / {}", stride_y, stride_z);
        ReplicaLayout {
            bodies_per_replica,
            stride_y,
            stride_z,
        }
    }

    pub fn from_settings(settings: &ReplicaSettings) -> Self {
        ReplicaLayout::new(settings.bodies_per_replica, settings.stride_y, settings.stride_z)
    }

    pub fn bodies_per_replica(&self) -> i32 {
        self.bodies_per_replica
    }

    /// Id shift for a particle handed to the neighbour at `offset`.
    ///
    /// Only the direction of the crossing on each axis matters. Saturates
    /// instead of wrapping for absurd strides; a saturated shift always takes
    /// the overflow branch of [`ReplicaLayout::rebase`].
    pub fn identity_offset(&self, offset: SpatialOffset) -> i64 {
        let (sx, sy, sz) = offset.signum();
        let shift = sx + sy * i64::from(self.stride_y) + sz * i64::from(self.stride_z);
        shift.saturating_mul(i64::from(self.bodies_per_replica))
    }

    /// The replica-independent id of `id`, always in `0..bodies_per_replica`.
    pub fn canonical_id(&self, id: CellId) -> CellId {
        id.rem_euclid(self.bodies_per_replica)
    }

    /// Applies `identity_offset` to `id` without ever wrapping.
    ///
    /// If the shifted id does not fit a [`CellId`], the canonical id is used
    /// instead. Two replica ids can then collapse into one, which downstream
    /// bookkeeping may treat as a duplicate body.
    pub fn rebase(&self, id: CellId, identity_offset: i64) -> Rebased {
        match i64::from(id)
            .checked_add(identity_offset)
            .and_then(|shifted| CellId::try_from(shifted).ok())
        {
            Some(shifted) => Rebased::Shifted(shifted),
            None => {
                let canonical = self.canonical_id(id);
                warn!(
                    "Identity shift {} on cell {} overflows, falling back to base id {}; the particle will most likely be deleted",
                    identity_offset, id, canonical
                );
                Rebased::Canonicalized(canonical)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> ReplicaLayout {
        ReplicaLayout::new(100, 3, 9)
    }

    #[test]
    fn zero_offset_has_no_shift() {
        assert_eq!(layout().identity_offset(SpatialOffset::ZERO), 0);
    }

    #[test]
    fn only_sign_of_offset_matters() {
        let layout = layout();
        assert_eq!(layout.identity_offset(SpatialOffset::new(64, 0, 0)), 100);
        assert_eq!(layout.identity_offset(SpatialOffset::new(1, 0, 0)), 100);
        assert_eq!(layout.identity_offset(SpatialOffset::new(0, -16, 0)), -300);
        assert_eq!(layout.identity_offset(SpatialOffset::new(0, 0, 8)), 900);
        assert_eq!(layout.identity_offset(SpatialOffset::new(-1, 1, -1)), (-1 + 3 - 9) * 100);
    }

    #[test]
    fn opposite_crossings_cancel() {
        let layout = layout();
        let there = layout.identity_offset(SpatialOffset::new(32, 0, 0));
        let back = layout.identity_offset(SpatialOffset::new(-32, 0, 0));

        let id = 17;
        let moved = layout.rebase(id, there).id();
        assert_eq!(moved, 117);
        assert_eq!(layout.rebase(moved, back), Rebased::Shifted(id));
    }

    #[test]
    fn canonical_id_is_non_negative() {
        let layout = layout();
        assert_eq!(layout.canonical_id(17), 17);
        assert_eq!(layout.canonical_id(917), 17);
        assert_eq!(layout.canonical_id(-283), 17);
        assert_eq!(layout.canonical_id(CellId::MIN), CellId::MIN.rem_euclid(100));
    }

    #[test]
    fn overflow_above_max_falls_back_to_canonical() {
        let layout = layout();
        let shift = layout.identity_offset(SpatialOffset::new(0, 0, 1));
        let id = (i64::from(CellId::MAX) - shift + 1) as CellId;

        let rebased = layout.rebase(id, shift);
        assert!(rebased.overflowed());
        assert_eq!(rebased.id(), layout.canonical_id(id));
    }

    #[test]
    fn overflow_below_min_falls_back_to_canonical() {
        let layout = layout();
        let shift = layout.identity_offset(SpatialOffset::new(0, -1, 0));
        let id = (i64::from(CellId::MIN) - shift - 1) as CellId;

        let rebased = layout.rebase(id, shift);
        assert_eq!(rebased, Rebased::Canonicalized(layout.canonical_id(id)));
    }

    #[test]
    fn shift_landing_exactly_on_max_is_kept() {
        let layout = layout();
        let shift = layout.identity_offset(SpatialOffset::new(1, 0, 0));
        let id = (i64::from(CellId::MAX) - shift) as CellId;
        assert_eq!(layout.rebase(id, shift), Rebased::Shifted(CellId::MAX));
    }

    #[test]
    fn huge_shift_never_wraps() {
        let layout = ReplicaLayout::new(i32::MAX, i32::MAX, i32::MAX);
        let shift = layout.identity_offset(SpatialOffset::new(1, 1, 1));
        assert!(layout.rebase(0, shift).overflowed());
    }

    #[test]
    fn built_from_settings() {
        let settings = ReplicaSettings {
            bodies_per_replica: 40,
            stride_y: 5,
            stride_z: 25,
        };
        let layout = ReplicaLayout::from_settings(&settings);
        assert_eq!(layout.identity_offset(SpatialOffset::new(0, 0, -2)), -1000);
    }
}
