//! Per-worker boundary exchange.
//!
//! Every worker first takes all of its outgoing particles: record copies for
//! sibling blocks it owns too, encoded buffers in the destination worker's
//! mailbox otherwise. No block receives anything before every outgoing
//! region of the worker has been read, so an arrival is never sent on again
//! in the same step. The worker then inserts the copies, drops its mailbox
//! senders and drains its own mailbox until every other worker is done.

use crossbeam_channel::{Receiver, Sender};
use log::trace;
use migrant_core::{wrap_periodic, ParticleField, ParticleRecord, ParticleStore, SpatialOffset, TransferKind};
use migrant_transfer::{codec, ParticleTransfer, ReplicaLayout, ShearContext, TransferStats};

use crate::decomposition::{BlockId, BlockSpec, Neighbour};
use crate::error::SimulationError;

/// A block and the particles it owns.
#[derive(Debug, Clone)]
pub struct Block {
    pub spec: BlockSpec,
    pub field: ParticleField,
    /// Length of `field` before the current exchange; later entries arrived.
    arrivals_from: usize,
}

impl Block {
    pub fn new(spec: BlockSpec) -> Self {
        let field = ParticleField::new(spec.bulk);
        Block {
            spec,
            field,
            arrivals_from: 0,
        }
    }

    pub fn id(&self) -> BlockId {
        self.spec.id
    }

    pub(crate) fn integrate(&mut self, dt: f64) {
        for particle in self.field.particles_mut() {
            let next = particle.position() + particle.state.velocity * dt;
            particle.set_position(next);
        }
        self.field.advance_residence();
    }

    /// Wraps the x of newly arrived particles into `[0, period)` and drops
    /// every particle that has left the bulk. Returns how many were dropped.
    ///
    /// A wrapped arrival moves into another x image, so its body id moves
    /// into that image's band as well.
    pub(crate) fn settle(&mut self, streamwise_period: Option<i64>, layout: &ReplicaLayout, stats: &TransferStats) -> usize {
        if let Some(period) = streamwise_period {
            let arrivals_from = self.arrivals_from.min(self.field.len());
            for particle in &mut self.field.particles_mut()[arrivals_from..] {
                let mut position = particle.position();
                let (x, turns) = wrap_periodic(position.x, period as f64);
                if turns == 0 {
                    continue;
                }
                position.x = x;
                particle.set_position(position);

                let shift = layout.identity_offset(SpatialOffset::new(turns * period, 0, 0));
                let rebased = layout.rebase(particle.cell_id(), shift);
                if rebased.overflowed() {
                    stats.record_overflow();
                }
                particle.state.cell_id = rebased.id();
            }
        }
        let bulk = self.spec.bulk;
        self.field.remove_particles_outside(&bulk)
    }
}

/// A buffer in flight to another worker.
#[derive(Debug)]
pub(crate) struct Parcel {
    destination: BlockId,
    offset: SpatialOffset,
    buffer: Vec<u8>,
}

/// Read-only inputs shared by every worker for one step.
pub(crate) struct ExchangeContext<'a> {
    pub layout: ReplicaLayout,
    pub kind: TransferKind,
    pub shear: ShearContext,
    pub stats: &'a TransferStats,
    pub workers: usize,
}

impl ExchangeContext<'_> {
    pub fn owner_of(&self, block: BlockId) -> usize {
        block % self.workers
    }

    pub fn slot_of(&self, block: BlockId) -> usize {
        block / self.workers
    }
}

/// Particles moved by one exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExchangeTally {
    pub local: usize,
    pub sent: usize,
    pub received: usize,
}

impl std::ops::Add for ExchangeTally {
    type Output = ExchangeTally;

    fn add(self, other: ExchangeTally) -> ExchangeTally {
        ExchangeTally {
            local: self.local + other.local,
            sent: self.sent + other.sent,
            received: self.received + other.received,
        }
    }
}

/// One execution context and the blocks dealt to it.
#[derive(Debug, Clone)]
pub(crate) struct Worker {
    pub id: usize,
    pub blocks: Vec<Block>,
}

impl Worker {
    pub fn new(id: usize) -> Self {
        Worker { id, blocks: Vec::new() }
    }

    pub fn exchange(
        &mut self,
        context: &ExchangeContext,
        outboxes: Vec<Sender<Parcel>>,
        inbox: Receiver<Parcel>,
    ) -> Result<ExchangeTally, SimulationError> {
        let mut tally = ExchangeTally::default();
        let mut copies: Vec<(Neighbour, Vec<ParticleRecord>)> = Vec::new();

        for block in &mut self.blocks {
            block.arrivals_from = block.field.len();
            let transfer = ParticleTransfer::attach(&mut block.field, context.layout)?.with_stats(context.stats);
            for neighbour in &block.spec.neighbours {
                let owner = context.owner_of(neighbour.block);
                if owner == self.id {
                    copies.push((*neighbour, transfer.snapshot(&neighbour.outgoing, context.kind)));
                    continue;
                }

                let buffer = transfer.send(&neighbour.outgoing, context.kind);
                if buffer.is_empty() {
                    continue;
                }
                tally.sent += codec::record_count(&buffer);
                outboxes[owner]
                    .send(Parcel {
                        destination: neighbour.block,
                        offset: neighbour.offset,
                        buffer,
                    })
                    .map_err(|_| SimulationError::MailboxClosed(owner))?;
            }
        }
        drop(outboxes);

        for (neighbour, records) in copies {
            let block = self.block_mut(context, neighbour.block)?;
            tally.local += ParticleTransfer::attach(&mut block.field, context.layout)?
                .with_stats(context.stats)
                .attribute_records(records, neighbour.offset, context.kind, &context.shear);
        }

        for parcel in inbox.iter() {
            let block = self.block_mut(context, parcel.destination)?;
            tally.received += ParticleTransfer::attach(&mut block.field, context.layout)?
                .with_stats(context.stats)
                .receive_sheared(&parcel.buffer, context.kind, parcel.offset, &context.shear);
        }

        trace!("Worker {} exchanged {:?}", self.id, tally);
        Ok(tally)
    }

    fn block_mut(&mut self, context: &ExchangeContext, id: BlockId) -> Result<&mut Block, SimulationError> {
        self.blocks
            .get_mut(context.slot_of(id))
            .ok_or(SimulationError::UnknownBlock(id))
    }
}
