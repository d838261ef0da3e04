//! Shared data model for particle migration between blocks.
//!
//! Defines the transferable [`ParticleRecord`], the geometry types used to
//! address regions and periodic neighbours, the synchronization
//! [`TransferKind`] tag, and the store capabilities the transfer layer
//! writes into.

// Lets `#[derive(WireRecord)]` refer to `::migrant_core` from inside this crate.
extern crate self as migrant_core;

pub mod field;
pub mod geometry;
pub mod kind;
pub mod particle;
pub mod record;
pub mod store;
pub mod wire;

pub use bytes;
pub use glam::DVec3;
pub use migrant_macros::WireRecord;

pub use field::ParticleField;
pub use geometry::{wrap_periodic, Region, SpatialOffset};
pub use kind::TransferKind;
pub use particle::Particle;
pub use record::{CellId, ParticleRecord, RECORD_SIZE, WIRE_VERSION};
pub use store::{AtomicBlock, ParticleStore};
pub use wire::{WireField, WireRecord};
