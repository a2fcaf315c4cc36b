use glam::{IVec3, Vec3};

/// Snapshot of a character's position for proximity queries.
/// Stored alongside the spatial hash to avoid ECS lookups in the hot path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterSnapshot {
    pub entity: hecs::Entity,
    pub pos: Vec3,
}

/// Spatial hash grid over world space for radius queries.
///
/// Uses multiplicative hash for even distribution. Hash collisions can put
/// far-away entries in a queried bucket, so callers filter by distance.
pub struct SpatialHash {
    inv_cell_size: f32,
    table_size: usize,
    /// Each bucket holds snapshot indices. Pre-allocated, cleared each tick.
    buckets: Vec<Vec<u32>>,
}

impl SpatialHash {
    pub fn new(cell_size: f32, table_size: usize) -> Self {
        let table_size = table_size.max(1);
        let mut buckets = Vec::with_capacity(table_size);
        for _ in 0..table_size {
            buckets.push(Vec::with_capacity(8));
        }
        Self {
            inv_cell_size: 1.0 / cell_size.max(f32::EPSILON),
            table_size,
            buckets,
        }
    }

    /// Clear all buckets. Call at start of each rebuild.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear(); // Keeps allocation.
        }
    }

    pub fn insert(&mut self, pos: Vec3, index: u32) {
        let hash = self.hash_cell(self.cell_coords(pos));
        self.buckets[hash].push(index);
    }

    /// Collect every index stored in cells overlapping the sphere, sorted
    /// ascending and deduplicated. Sorting restores insertion (scan) order.
    pub fn query_radius(&self, pos: Vec3, radius: f32, out: &mut Vec<u32>) {
        out.clear();
        let reach = (radius.max(0.0) * self.inv_cell_size).ceil() as i32;
        let span = 2 * reach as usize + 1;
        if span.saturating_pow(3) >= self.table_size {
            // Sphere covers more cells than there are buckets.
            for bucket in &self.buckets {
                out.extend_from_slice(bucket);
            }
        } else {
            let center = self.cell_coords(pos);
            for dz in -reach..=reach {
                for dy in -reach..=reach {
                    for dx in -reach..=reach {
                        let cell = center + IVec3::new(dx, dy, dz);
                        out.extend_from_slice(&self.buckets[self.hash_cell(cell)]);
                    }
                }
            }
        }
        out.sort_unstable();
        out.dedup();
    }

    fn cell_coords(&self, pos: Vec3) -> IVec3 {
        (pos * self.inv_cell_size).floor().as_ivec3()
    }

    fn hash_cell(&self, cell: IVec3) -> usize {
        let h = (cell.x as u32).wrapping_mul(73856093)
            ^ (cell.y as u32).wrapping_mul(19349663)
            ^ (cell.z as u32).wrapping_mul(83492791);
        (h as usize) % self.table_size
    }
}
