use crate::grid::{Grid, MAX_SIZE, NUM_CELL_KINDS};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Zobrist hashing for grid states: one random value per (cell kind,
/// position), XOR-folded over the whole grid. Two structurally identical
/// grids always hash to the same fingerprint, independent of the move
/// sequence that produced them.
pub struct Zobrist {
    cell_hashes: [[[u64; MAX_SIZE]; MAX_SIZE]; NUM_CELL_KINDS],
}

impl Zobrist {
    pub fn new() -> Self {
        // Seeded PRNG so fingerprints are reproducible across runs and
        // never consume generation randomness.
        let mut rng = ChaCha8Rng::seed_from_u64(0x5b0c_a97d_3e41_88f2);

        let mut cell_hashes = [[[0u64; MAX_SIZE]; MAX_SIZE]; NUM_CELL_KINDS];
        for kind in cell_hashes.iter_mut() {
            for row in kind.iter_mut() {
                for cell in row.iter_mut() {
                    *cell = rng.next_u64();
                }
            }
        }

        Zobrist { cell_hashes }
    }

    /// Fingerprint of the full grid contents.
    pub fn fingerprint(&self, grid: &Grid) -> u64 {
        let mut hash = 0u64;
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                let cell = grid.get((x as u8, y as u8));
                hash ^= self.cell_hashes[cell.index()][y][x];
            }
        }
        hash
    }
}
