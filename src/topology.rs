use crate::grid::{ALL_DIRECTIONS, Cell, Grid, MAX_SIZE};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// The five 3x3 floor masks stamped along the walk: straight corridor,
/// T-junction, L-junction, block, and elbow. Ones mark cells carved to
/// floor.
const MASKS: [[[u8; 3]; 3]; 5] = [
    [[0, 0, 0], [1, 1, 1], [0, 0, 0]],
    [[0, 1, 0], [0, 1, 0], [0, 1, 0]],
    [[0, 0, 0], [1, 1, 0], [0, 1, 0]],
    [[0, 0, 0], [1, 1, 0], [1, 1, 0]],
    [[0, 0, 0], [0, 1, 1], [0, 1, 0]],
];

/// Generate a wall/floor layout via a seeded random walk.
///
/// The walk starts at a random interior cell, re-picks its cardinal
/// direction with probability `p_change_directions` each step, advances
/// one cell clamped to stay inside the border, and stamps a randomly
/// chosen mask centered on the new position. Any cell touched by a mask
/// becomes floor; the outer ring always stays wall.
pub fn generate_topology(
    dim: (usize, usize),
    p_change_directions: f64,
    num_steps: usize,
    rng: &mut ChaCha8Rng,
) -> Grid {
    let (rows, cols) = dim;
    let mut room = Grid::new(cols, rows);

    let mut direction = ALL_DIRECTIONS[rng.gen_range(0..ALL_DIRECTIONS.len())];
    let mut y = rng.gen_range(1..rows) as i32;
    let mut x = rng.gen_range(1..cols) as i32;

    let mut marks = [[false; MAX_SIZE]; MAX_SIZE];
    for _ in 0..num_steps {
        if rng.gen_bool(p_change_directions) {
            direction = ALL_DIRECTIONS[rng.gen_range(0..ALL_DIRECTIONS.len())];
        }

        let (dx, dy) = direction.delta();
        x = (x + dx as i32).clamp(1, cols as i32 - 2);
        y = (y + dy as i32).clamp(1, rows as i32 - 2);

        let mask = &MASKS[rng.gen_range(0..MASKS.len())];
        for (mask_y, mask_row) in mask.iter().enumerate() {
            for (mask_x, &marked) in mask_row.iter().enumerate() {
                if marked == 1 {
                    marks[(y as usize - 1) + mask_y][(x as usize - 1) + mask_x] = true;
                }
            }
        }
    }

    // Carving only interior cells leaves the border ring walled.
    for y in 1..rows - 1 {
        for x in 1..cols - 1 {
            if marks[y][x] {
                room.set((x as u8, y as u8), Cell::Floor);
            }
        }
    }

    room
}
