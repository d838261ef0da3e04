/// What a block synchronization is meant to update.
///
/// Particles are dynamic data: they are rebuilt wholesale whenever block
/// membership changes, and never patched variable by variable. Only the
/// structural kinds move particle records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferKind {
    Nothing,
    StaticVariables,
    DynamicVariables,
    AllVariables,
    /// Any change to which particles a block owns.
    DataStructure,
    /// Full rebuild of particle membership after a migration step.
    ParticleRebuild,
}

impl TransferKind {
    pub fn is_structural(self) -> bool {
        matches!(self, TransferKind::DataStructure | TransferKind::ParticleRebuild)
    }
}
