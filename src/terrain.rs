//! Block lookup and foothold predicates.
//!
//! World generation is external; the core only needs to ask which block sits
//! at an integer coordinate and whether that block can be walked through.

use std::collections::{HashMap, HashSet};

use glam::IVec3;

/// Block type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u16);

impl BlockId {
    pub const AIR: BlockId = BlockId(0);
    pub const GRASS: BlockId = BlockId(1);
    pub const DIRT: BlockId = BlockId(2);
    pub const STONE: BlockId = BlockId(3);
    pub const TALL_GRASS: BlockId = BlockId(4);
    pub const WATER: BlockId = BlockId(5);
}

/// Block lookup capability provided by the host world.
pub trait BlockLookup {
    fn block_at(&self, pos: IVec3) -> BlockId;
    fn is_penetrable(&self, block: BlockId) -> bool;
}

/// Decides whether an animal can stand at a position.
pub trait FootholdPredicate {
    fn is_valid(&self, pos: IVec3, blocks: &dyn BlockLookup) -> bool;
}

impl<F> FootholdPredicate for F
where
    F: Fn(IVec3, &dyn BlockLookup) -> bool,
{
    fn is_valid(&self, pos: IVec3, blocks: &dyn BlockLookup) -> bool {
        self(pos, blocks)
    }
}

/// Designated ground block below, penetrable block at, designated open-air
/// block above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroundFoothold {
    pub ground: BlockId,
    pub air: BlockId,
}

impl Default for GroundFoothold {
    fn default() -> Self {
        Self {
            ground: BlockId::GRASS,
            air: BlockId::AIR,
        }
    }
}

impl FootholdPredicate for GroundFoothold {
    fn is_valid(&self, pos: IVec3, blocks: &dyn BlockLookup) -> bool {
        if blocks.block_at(pos - IVec3::Y) != self.ground {
            return false;
        }
        if !blocks.is_penetrable(blocks.block_at(pos)) {
            return false;
        }
        blocks.block_at(pos + IVec3::Y) == self.air
    }
}

/// Any solid block below and a penetrable block at the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SolidGroundFoothold;

impl FootholdPredicate for SolidGroundFoothold {
    fn is_valid(&self, pos: IVec3, blocks: &dyn BlockLookup) -> bool {
        blocks.is_penetrable(blocks.block_at(pos))
            && !blocks.is_penetrable(blocks.block_at(pos - IVec3::Y))
    }
}

/// Sparse in-memory voxel store. Unset coordinates read as air.
pub struct VoxelGrid {
    blocks: HashMap<IVec3, BlockId>,
    penetrable: HashSet<BlockId>,
}

impl VoxelGrid {
    pub fn new() -> Self {
        let penetrable = [BlockId::AIR, BlockId::TALL_GRASS, BlockId::WATER]
            .into_iter()
            .collect();
        Self {
            blocks: HashMap::new(),
            penetrable,
        }
    }

    pub fn set(&mut self, pos: IVec3, block: BlockId) {
        if block == BlockId::AIR {
            self.blocks.remove(&pos);
        } else {
            self.blocks.insert(pos, block);
        }
    }

    /// Dirt from y = 0 up to `height`, with `top` placed at `height`.
    pub fn fill_column(&mut self, x: i32, z: i32, height: i32, top: BlockId) {
        for y in 0..height {
            self.set(IVec3::new(x, y, z), BlockId::DIRT);
        }
        self.set(IVec3::new(x, height, z), top);
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl Default for VoxelGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockLookup for VoxelGrid {
    fn block_at(&self, pos: IVec3) -> BlockId {
        self.blocks.get(&pos).copied().unwrap_or(BlockId::AIR)
    }

    fn is_penetrable(&self, block: BlockId) -> bool {
        self.penetrable.contains(&block)
    }
}
