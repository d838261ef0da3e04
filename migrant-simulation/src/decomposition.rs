//! Splitting the lattice into blocks and wiring up their neighbours.

use migrant_config::DomainSettings;
use migrant_core::{DVec3, Region, SpatialOffset};
use smallvec::SmallVec;

use crate::error::SimulationError;

pub type BlockId = usize;

/// One link from a block to an adjacent block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbour {
    pub block: BlockId,
    /// Translation from the source frame into the neighbour's frame.
    pub offset: SpatialOffset,
    /// The part of the source frame that belongs to the neighbour.
    pub outgoing: Region,
}

#[derive(Debug, Clone)]
pub struct BlockSpec {
    pub id: BlockId,
    pub coords: [i64; 3],
    pub bulk: Region,
    pub neighbours: SmallVec<[Neighbour; 26]>,
}

impl BlockSpec {
    /// True for blocks whose bulk starts at the x = 0 face.
    pub fn on_inlet(&self) -> bool {
        self.coords[0] == 0
    }
}

/// Equal-sized blocks tiling the lattice, x fastest.
#[derive(Debug, Clone)]
pub struct Decomposition {
    extent: [i64; 3],
    grid: [i64; 3],
    block_size: [i64; 3],
    blocks: Vec<BlockSpec>,
}

impl Decomposition {
    pub fn new(extent: [i64; 3], grid: [i64; 3], periodic: [bool; 3]) -> Result<Self, SimulationError> {
        let mut block_size = [0; 3];
        for axis in 0..3 {
            if extent[axis] <= 0 || grid[axis] <= 0 || extent[axis] % grid[axis] != 0 {
                return Err(SimulationError::Layout(format!(
                    "{} blocks cannot tile an extent of {} along axis {}",
                    grid[axis], extent[axis], axis
                )));
            }
            block_size[axis] = extent[axis] / grid[axis];
        }

        let mut decomposition = Decomposition {
            extent,
            grid,
            block_size,
            blocks: Vec::new(),
        };

        let count = (grid[0] * grid[1] * grid[2]) as usize;
        for id in 0..count {
            let coords = decomposition.coords_of(id);
            let neighbours = decomposition.neighbours_of(coords, periodic);
            decomposition.blocks.push(BlockSpec {
                id,
                coords,
                bulk: decomposition.bulk_of(coords),
                neighbours,
            });
        }
        Ok(decomposition)
    }

    pub fn from_settings(domain: &DomainSettings) -> Result<Self, SimulationError> {
        Decomposition::new(domain.extent(), domain.blocks, domain.periodic)
    }

    pub fn blocks(&self) -> &[BlockSpec] {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> Result<&BlockSpec, SimulationError> {
        self.blocks.get(id).ok_or(SimulationError::UnknownBlock(id))
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn extent(&self) -> [i64; 3] {
        self.extent
    }

    pub fn block_size(&self) -> [i64; 3] {
        self.block_size
    }

    pub fn domain(&self) -> Region {
        Region::from_lattice([0, 0, 0], self.extent)
    }

    /// The block whose bulk holds `position`, if any.
    pub fn locate(&self, position: DVec3) -> Option<BlockId> {
        if !self.domain().contains(position) {
            return None;
        }
        let p = position.to_array();
        let mut coords = [0; 3];
        for axis in 0..3 {
            let c = (p[axis] / self.block_size[axis] as f64).floor() as i64;
            coords[axis] = c.clamp(0, self.grid[axis] - 1);
        }
        Some(self.index_of(coords))
    }

    fn index_of(&self, coords: [i64; 3]) -> BlockId {
        (coords[0] + self.grid[0] * (coords[1] + self.grid[1] * coords[2])) as BlockId
    }

    fn coords_of(&self, id: BlockId) -> [i64; 3] {
        let id = id as i64;
        [
            id % self.grid[0],
            (id / self.grid[0]) % self.grid[1],
            id / (self.grid[0] * self.grid[1]),
        ]
    }

    fn bulk_of(&self, coords: [i64; 3]) -> Region {
        let lo = [
            coords[0] * self.block_size[0],
            coords[1] * self.block_size[1],
            coords[2] * self.block_size[2],
        ];
        let hi = [
            lo[0] + self.block_size[0],
            lo[1] + self.block_size[1],
            lo[2] + self.block_size[2],
        ];
        Region::from_lattice(lo, hi)
    }

    fn neighbours_of(&self, coords: [i64; 3], periodic: [bool; 3]) -> SmallVec<[Neighbour; 26]> {
        let mut neighbours = SmallVec::new();
        for dz in -1..=1 {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    if (dx, dy, dz) == (0, 0, 0) {
                        continue;
                    }
                    let delta = [dx, dy, dz];
                    let mut target = [0; 3];
                    let mut shift = [0; 3];
                    let mut closed = false;
                    for axis in 0..3 {
                        let c = coords[axis] + delta[axis];
                        if (0..self.grid[axis]).contains(&c) {
                            target[axis] = c;
                        } else if periodic[axis] {
                            target[axis] = c.rem_euclid(self.grid[axis]);
                            shift[axis] = -delta[axis] * self.extent[axis];
                        } else {
                            closed = true;
                        }
                    }
                    if closed {
                        continue;
                    }

                    let offset = SpatialOffset::new(shift[0], shift[1], shift[2]);
                    neighbours.push(Neighbour {
                        block: self.index_of(target),
                        offset,
                        outgoing: self.bulk_of(target).translated(-offset.displacement()),
                    });
                }
            }
        }
        neighbours
    }
}
