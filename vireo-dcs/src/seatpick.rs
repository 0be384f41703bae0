use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::Mutex;
use vireo_catalog::seatmap::{Cabin, Seat};

/// How many of the best-scoring seats stay in the draw. Picking uniformly
/// among the top few spreads unseated passengers instead of stacking them
/// all on the single best seat.
const TOP_K: usize = 5;

/// Scores free seats in a cabin and picks one at random among the top
/// five. The RNG is injected and seedable so the draw is reproducible
/// under test.
pub struct SeatPicker {
    rng: Mutex<StdRng>,
}

impl SeatPicker {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Picks a seat from the cabin, avoiding occupied and blocked seats.
    /// Returns None when the cabin is full.
    pub fn pick(&self, cabin: &Cabin, occupied: &HashSet<Seat>) -> Option<Seat> {
        let mut scored: Vec<(i32, Seat)> = cabin
            .seats()
            .filter(|seat| !occupied.contains(seat) && !cabin.is_blocked(seat))
            .map(|seat| (Self::score(cabin, &seat), seat))
            .collect();

        if scored.is_empty() {
            return None;
        }

        // Highest score first; row/letter as tie-break keeps the candidate
        // list stable across runs.
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        scored.truncate(TOP_K);

        let mut rng = self.rng.lock().expect("seat picker rng poisoned");
        let index = rng.gen_range(0..scored.len());
        Some(scored[index].1)
    }

    /// Comfort heuristic: windows and aisles beat middles, central rows
    /// beat the extremes, forward rows get a slight edge, exits earn a
    /// bonus, bulkheads and galley rows lose points.
    fn score(cabin: &Cabin, seat: &Seat) -> i32 {
        let mut score = 0i32;

        if cabin.is_window(seat.letter) {
            score += 3;
        }
        if cabin.is_aisle(seat.letter) {
            score += 2;
        }
        if cabin.is_middle(seat.letter) {
            score -= 2;
        }

        let midpoint = cabin.midpoint_row() as i32;
        score -= (seat.row as i32 - midpoint).abs();
        score += cabin.last_row as i32 - seat.row as i32;

        if cabin.exit_rows.contains(&seat.row) {
            score += 2;
        }
        if cabin.bulkhead_rows.contains(&seat.row) {
            score -= 1;
        }
        if cabin.galley_rows.contains(&seat.row) {
            score -= 2;
        }

        score
    }
}

impl Default for SeatPicker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vireo_catalog::seatmap::SeatMapCatalog;

    fn economy() -> Cabin {
        SeatMapCatalog::with_standard_fleet()
            .get("B738")
            .unwrap()
            .cabin_for_class('Y')
            .unwrap()
            .clone()
    }

    #[test]
    fn test_window_beats_middle() {
        let cabin = economy();
        let row = cabin.midpoint_row();
        let window = SeatPicker::score(&cabin, &Seat::new(row, 'A'));
        let aisle = SeatPicker::score(&cabin, &Seat::new(row, 'C'));
        let middle = SeatPicker::score(&cabin, &Seat::new(row, 'B'));

        assert!(window > aisle);
        assert!(aisle > middle);
    }

    #[test]
    fn test_galley_row_penalized() {
        let cabin = economy();
        let quiet = SeatPicker::score(&cabin, &Seat::new(20, 'A'));
        let galley = SeatPicker::score(&cabin, &Seat::new(29, 'A'));
        assert!(quiet > galley);
    }

    #[test]
    fn test_seeded_pick_is_deterministic() {
        let cabin = economy();
        let occupied = HashSet::new();

        let a = SeatPicker::seeded(3);
        let b = SeatPicker::seeded(3);
        for _ in 0..20 {
            assert_eq!(a.pick(&cabin, &occupied), b.pick(&cabin, &occupied));
        }
    }

    #[test]
    fn test_never_picks_occupied_or_blocked() {
        let cabin = economy();
        let picker = SeatPicker::seeded(9);

        let mut occupied = HashSet::new();
        for _ in 0..200 {
            match picker.pick(&cabin, &occupied) {
                Some(seat) => {
                    assert!(!occupied.contains(&seat));
                    assert!(!cabin.is_blocked(&seat));
                    occupied.insert(seat);
                }
                None => break,
            }
        }

        // 26 rows x 6 letters minus 2 blocked seats.
        assert_eq!(occupied.len(), 154);
        assert!(picker.pick(&cabin, &occupied).is_none());
    }

    #[test]
    fn test_pick_lands_in_top_candidates() {
        let cabin = economy();
        let picker = SeatPicker::seeded(1);
        let occupied = HashSet::new();

        // With an empty cabin the best seats cluster around the midpoint
        // window/aisle positions; any draw must score within the top five.
        let mut all: Vec<i32> = cabin
            .seats()
            .filter(|s| !cabin.is_blocked(s))
            .map(|s| SeatPicker::score(&cabin, &s))
            .collect();
        all.sort_unstable_by(|a, b| b.cmp(a));
        let floor = all[TOP_K - 1];

        for _ in 0..50 {
            let seat = picker.pick(&cabin, &occupied).unwrap();
            assert!(SeatPicker::score(&cabin, &seat) >= floor);
        }
    }
}
