use crate::generator::GenerationError;
use crate::grid::{Cell, Grid};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Place player marker(s) and box targets on the floor cells of a
/// topology, sampled without replacement.
///
/// Fails with `PlacementCapacity` when the topology does not hold
/// strictly more floor cells than entities to place; the caller must
/// regenerate the topology (or give up) rather than retry placement.
pub fn place_entities(
    topology: &Grid,
    num_boxes: usize,
    second_player: bool,
    rng: &mut ChaCha8Rng,
) -> Result<Grid, GenerationError> {
    let mut room = topology.clone();
    let mut free = room.positions_of(Cell::Floor);
    let num_players = if second_player { 2 } else { 1 };

    if free.len() <= num_boxes + num_players {
        return Err(GenerationError::PlacementCapacity {
            free_cells: free.len(),
            num_players,
            num_boxes,
        });
    }

    for _ in 0..num_players {
        let pos = free.remove(rng.gen_range(0..free.len()));
        room.set(pos, Cell::Player);
    }

    for _ in 0..num_boxes {
        let pos = free.remove(rng.gen_range(0..free.len()));
        room.set(pos, Cell::Target);
    }

    Ok(room)
}
