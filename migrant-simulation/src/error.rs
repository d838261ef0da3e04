use migrant_core::DVec3;
use migrant_transfer::TransferError;
use thiserror::Error;

use crate::decomposition::BlockId;

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("Invalid block layout: {0}")]
    Layout(String),

    #[error("Worker count must be positive")]
    NoWorkers,

    #[error("Unknown block {0}")]
    UnknownBlock(BlockId),

    #[error("Position {0:?} lies outside the domain")]
    OutsideDomain(DVec3),

    #[error("No pre-inlet is configured")]
    NoPreinlet,

    #[error("Mailbox of worker {0} closed before the exchange finished")]
    MailboxClosed(usize),

    #[error("Exchange worker {0} panicked")]
    WorkerPanicked(usize),

    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),
}
