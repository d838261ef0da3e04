//! Block-decomposed driver for the particle migration layer.
//!
//! Deals the blocks of a [`Decomposition`] round-robin to workers and, every
//! step, moves particles, slides the sheared boundary, exchanges boundary
//! crossers between blocks and drops what each block no longer owns.

pub mod decomposition;
mod error;
mod exchange;
pub mod preinlet;
pub mod sliding;

use std::sync::Arc;
use std::thread;

use crossbeam_channel::unbounded;
use log::{debug, info};
use migrant_config::Config;
use migrant_core::{ParticleRecord, ParticleStore, TransferKind};
use migrant_transfer::{ReplicaLayout, TransferStats};
use rayon::prelude::*;

pub use decomposition::{BlockId, BlockSpec, Decomposition, Neighbour};
pub use error::SimulationError;
pub use exchange::{Block, ExchangeTally};
pub use preinlet::PreInlet;
pub use sliding::SlidingBoundary;

use exchange::{ExchangeContext, Worker};

/// What one step did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    pub step: u64,
    pub exchanged: ExchangeTally,
    pub removed: usize,
    pub fed: usize,
}

pub struct Simulation {
    decomposition: Decomposition,
    workers: Vec<Worker>,
    layout: ReplicaLayout,
    sliding: Option<SlidingBoundary>,
    preinlet: Option<PreInlet>,
    stats: Arc<TransferStats>,
    dt: f64,
    step: u64,
}

impl Simulation {
    pub fn new(config: &Config) -> Result<Self, SimulationError> {
        if config.workers == 0 {
            return Err(SimulationError::NoWorkers);
        }
        let decomposition = Decomposition::from_settings(&config.domain)?;

        // Nothing may cross more than one block per step.
        let smallest = decomposition.block_size().iter().copied().min().unwrap_or(0) as f64;
        if config.run.max_speed * config.run.dt >= smallest {
            return Err(SimulationError::Layout(format!(
                "max_speed * dt = {} reaches the smallest block extent {}",
                config.run.max_speed * config.run.dt,
                smallest
            )));
        }
        let preinlet = match &config.preinlet {
            Some(settings) => {
                let reach = settings.inflow_speed * config.run.dt * settings.period as f64;
                if reach >= decomposition.block_size()[0] as f64 {
                    return Err(SimulationError::Layout(format!(
                        "Pre-inlet particles travel {} between feeds, beyond the first block column",
                        reach
                    )));
                }
                Some(PreInlet::new(settings, &config.domain))
            }
            None => None,
        };

        let workers = config.workers;
        let mut pool: Vec<Worker> = (0..workers).map(Worker::new).collect();
        for spec in decomposition.blocks() {
            pool[spec.id % workers].blocks.push(Block::new(spec.clone()));
        }

        info!(
            "Decomposed {:?} into {} blocks over {} workers",
            decomposition.extent(),
            decomposition.len(),
            workers
        );

        Ok(Simulation {
            decomposition,
            workers: pool,
            layout: ReplicaLayout::from_settings(&config.replica),
            sliding: SlidingBoundary::from_settings(&config.shear, &config.domain),
            preinlet,
            stats: Arc::new(TransferStats::new()),
            dt: config.run.dt,
            step: 0,
        })
    }

    pub fn decomposition(&self) -> &Decomposition {
        &self.decomposition
    }

    pub fn layout(&self) -> &ReplicaLayout {
        &self.layout
    }

    pub fn stats(&self) -> Arc<TransferStats> {
        Arc::clone(&self.stats)
    }

    pub fn steps_taken(&self) -> u64 {
        self.step
    }

    pub fn sliding(&self) -> Option<&SlidingBoundary> {
        self.sliding.as_ref()
    }

    pub fn preinlet(&self) -> Option<&PreInlet> {
        self.preinlet.as_ref()
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.workers.iter().flat_map(|worker| worker.blocks.iter())
    }

    pub fn block(&self, id: BlockId) -> Result<&Block, SimulationError> {
        self.workers
            .get(id % self.workers.len())
            .and_then(|worker| worker.blocks.get(id / self.workers.len()))
            .ok_or(SimulationError::UnknownBlock(id))
    }

    fn block_mut(&mut self, id: BlockId) -> Result<&mut Block, SimulationError> {
        let workers = self.workers.len();
        self.workers
            .get_mut(id % workers)
            .and_then(|worker| worker.blocks.get_mut(id / workers))
            .ok_or(SimulationError::UnknownBlock(id))
    }

    /// Places `record` in the block that owns its position.
    pub fn insert(&mut self, record: ParticleRecord) -> Result<BlockId, SimulationError> {
        let id = self
            .decomposition
            .locate(record.position)
            .ok_or(SimulationError::OutsideDomain(record.position))?;
        self.block_mut(id)?.field.add_particle(record);
        Ok(id)
    }

    pub fn insert_preinlet(&mut self, record: ParticleRecord) -> Result<(), SimulationError> {
        self.preinlet
            .as_mut()
            .ok_or(SimulationError::NoPreinlet)?
            .insert(record)
    }

    /// Particles owned by the blocks, reservoir excluded.
    pub fn total_particles(&self) -> usize {
        self.blocks().map(|block| block.field.len()).sum()
    }

    pub fn step(&mut self) -> Result<StepReport, SimulationError> {
        let dt = self.dt;
        self.workers
            .par_iter_mut()
            .flat_map(|worker| worker.blocks.par_iter_mut())
            .for_each(|block| block.integrate(dt));
        if let Some(preinlet) = &mut self.preinlet {
            preinlet.advance(dt);
        }

        // Every worker must see the same displacement for the whole exchange.
        if let Some(sliding) = &mut self.sliding {
            sliding.advance(dt);
        }

        let exchanged = self.exchange()?;

        let streamwise_period = self.sliding.as_ref().map(SlidingBoundary::streamwise_period);
        let (layout, stats) = (&self.layout, &*self.stats);
        let removed: usize = self
            .workers
            .par_iter_mut()
            .flat_map(|worker| worker.blocks.par_iter_mut())
            .map(|block| block.settle(streamwise_period, layout, stats))
            .sum();

        let fed = self.feed_preinlet()?;

        let report = StepReport {
            step: self.step,
            exchanged,
            removed,
            fed,
        };
        debug!("{:?}", report);
        self.step += 1;
        Ok(report)
    }

    fn exchange(&mut self) -> Result<ExchangeTally, SimulationError> {
        let context = ExchangeContext {
            layout: self.layout,
            kind: TransferKind::ParticleRebuild,
            shear: self.sliding.as_ref().map(SlidingBoundary::context).unwrap_or_default(),
            stats: &self.stats,
            workers: self.workers.len(),
        };
        let context = &context;

        let (outboxes, inboxes): (Vec<_>, Vec<_>) = (0..self.workers.len()).map(|_| unbounded()).unzip();
        let results: Vec<Result<ExchangeTally, SimulationError>> = thread::scope(|scope| {
            let handles: Vec<_> = self
                .workers
                .iter_mut()
                .zip(inboxes)
                .map(|(worker, inbox)| {
                    let outboxes = outboxes.clone();
                    scope.spawn(move || worker.exchange(context, outboxes, inbox))
                })
                .collect();
            drop(outboxes);

            handles
                .into_iter()
                .enumerate()
                .map(|(id, handle)| handle.join().unwrap_or(Err(SimulationError::WorkerPanicked(id))))
                .collect()
        });

        let mut total = ExchangeTally::default();
        for result in results {
            total = total + result?;
        }
        Ok(total)
    }

    fn feed_preinlet(&mut self) -> Result<usize, SimulationError> {
        let Some(preinlet) = self.preinlet.as_mut() else {
            return Ok(0);
        };
        if !preinlet.is_feed_step(self.step) {
            return Ok(0);
        }

        let mut fed = 0;
        for worker in &mut self.workers {
            for block in worker.blocks.iter_mut().filter(|block| block.spec.on_inlet()) {
                fed += preinlet.feed(block, self.layout, &self.stats)?;
            }
        }
        preinlet.recycle();
        Ok(fed)
    }
}
