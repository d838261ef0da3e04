//! Particle migration between the blocks of a decomposed domain.
//!
//! - [`codec`] turns the particles of a region into a flat record buffer and back.
//! - [`identity`] shifts body ids into the id band of the periodic replica a
//!   particle moves into, without ever overflowing.
//! - [`ParticleTransfer`] binds to one block's store and runs both exchange
//!   paths: remote (`send` / `receive*`) and same-worker (`attribute_*`).
//!
//! Every operation only inserts. Particles that left a block are dropped by
//! whoever owns that block.

pub mod codec;
mod engine;
mod error;
pub mod identity;
mod local;
mod shear;
pub mod stats;

pub use engine::ParticleTransfer;
pub use error::TransferError;
pub use identity::{Rebased, ReplicaLayout};
pub use shear::ShearContext;
pub use stats::{TransferPhase, TransferStats};
