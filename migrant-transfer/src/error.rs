use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("block carries no particle store and cannot take part in particle transfer")]
    NotAParticleBlock,
}
