use rand::rngs::SmallRng;
use smallvec::{SmallVec, smallvec};

use super::*;

/// Seeded generator: uniform winner from the eligible pool, uniform fillers from the rest, then a full shuffle.
#[derive(Clone, Debug)]
pub struct RandomGridGenerator {
    rng: SmallRng,
}

impl RandomGridGenerator {
    pub fn new(seed: u64) -> Self {
        use rand::SeedableRng;

        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl GridGenerator for RandomGridGenerator {
    fn generate(
        &mut self,
        catalog: &SymbolCatalog,
        eligible_range: Option<ValueRange>,
        filler: FillerPolicy,
    ) -> Result<GeneratedGrid> {
        use rand::prelude::*;
        use FillerPolicy::*;

        let pool: SmallVec<[Symbol; GRID_CELLS]> = catalog.eligible(eligible_range).collect();
        if pool.is_empty() {
            return Err(GameError::NoEligibleSymbol);
        }
        let winner = pool[self.rng.random_range(0..pool.len())];

        let fillers: SmallVec<[Symbol; GRID_CELLS]> = catalog.excluding(winner.value).collect();
        let required = filler.required_filler_values();
        if fillers.len() < required {
            return Err(GameError::DegenerateCatalog {
                distinct: fillers.len(),
                required,
            });
        }

        let mut cells = [winner; GRID_CELLS];
        match filler {
            Unguarded => {
                for cell in &mut cells[WINNING_COUNT..] {
                    *cell = fillers[self.rng.random_range(0..fillers.len())];
                }
            }
            Capped => {
                let mut uses: SmallVec<[u8; GRID_CELLS]> = smallvec![0; fillers.len()];
                for cell in &mut cells[WINNING_COUNT..] {
                    let open: SmallVec<[usize; GRID_CELLS]> = (0..fillers.len())
                        .filter(|&i| uses[i] < MAX_FILLER_REPEATS)
                        .collect();
                    let pick = open[self.rng.random_range(0..open.len())];
                    uses[pick] += 1;
                    *cell = fillers[pick];
                }
            }
        }

        cells.shuffle(&mut self.rng);

        log::debug!(
            "generated card with winning value {} ({:?} fillers)",
            winner.value,
            filler
        );
        Ok(GeneratedGrid {
            grid: Grid::from_cells(cells),
            winning_value: winner.value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_range() -> Option<ValueRange> {
        Some(ValueRange::new(50, 200))
    }

    fn value_counts(grid: &Grid) -> SmallVec<[(Amount, usize); GRID_CELLS]> {
        let mut counts: SmallVec<[(Amount, usize); GRID_CELLS]> = SmallVec::new();
        for symbol in grid.cells() {
            match counts.iter_mut().find(|(value, _)| *value == symbol.value) {
                Some((_, count)) => *count += 1,
                None => counts.push((symbol.value, 1)),
            }
        }
        counts
    }

    #[test]
    fn capped_cards_have_exactly_one_triple() {
        let catalog = SymbolCatalog::default();
        let mut generator = RandomGridGenerator::new(7);

        for _ in 0..2_000 {
            let generated = generator
                .generate(&catalog, reference_range(), FillerPolicy::Capped)
                .unwrap();
            let counts = value_counts(&generated.grid);

            let triples: SmallVec<[Amount; 3]> = counts
                .iter()
                .filter(|(_, count)| *count == 3)
                .map(|(value, _)| *value)
                .collect();
            assert_eq!(triples.as_slice(), &[generated.winning_value]);
            assert!(counts.iter().all(|(_, count)| *count < 4));
        }
    }

    #[test]
    fn unguarded_cards_always_carry_the_designated_triple() {
        let catalog = SymbolCatalog::default();
        let mut generator = RandomGridGenerator::new(11);

        for _ in 0..2_000 {
            let generated = generator
                .generate(&catalog, reference_range(), FillerPolicy::Unguarded)
                .unwrap();
            assert_eq!(generated.grid.count_of(generated.winning_value), 3);
        }
    }

    #[test]
    fn winner_is_drawn_from_the_eligible_range() {
        let catalog = SymbolCatalog::default();
        let mut generator = RandomGridGenerator::new(3);
        let mut seen = [false; 3];

        for _ in 0..500 {
            let generated = generator
                .generate(&catalog, reference_range(), FillerPolicy::Capped)
                .unwrap();
            let slot = match generated.winning_value {
                50 => 0,
                100 => 1,
                200 => 2,
                other => panic!("winning value {} outside of [50, 200]", other),
            };
            seen[slot] = true;
        }

        assert_eq!(seen, [true; 3]);
    }

    #[test]
    fn winning_positions_are_spread_evenly() {
        let catalog = SymbolCatalog::default();
        let mut generator = RandomGridGenerator::new(42);
        let mut hits = [0u32; GRID_CELLS];
        let trials = 9_000;

        for _ in 0..trials {
            let generated = generator
                .generate(&catalog, reference_range(), FillerPolicy::Capped)
                .unwrap();
            for (index, symbol) in generated.grid.iter_indexed() {
                if symbol.value == generated.winning_value {
                    hits[usize::from(index)] += 1;
                }
            }
        }

        // each cell holds a winning slot a third of the time
        for count in hits {
            assert!((2_700..=3_300).contains(&count), "skewed cell count {}", count);
        }
    }

    #[test]
    fn same_seed_same_cards() {
        let catalog = SymbolCatalog::default();
        let mut a = RandomGridGenerator::new(99);
        let mut b = RandomGridGenerator::new(99);

        for _ in 0..10 {
            assert_eq!(
                a.generate(&catalog, reference_range(), FillerPolicy::Capped),
                b.generate(&catalog, reference_range(), FillerPolicy::Capped)
            );
        }
    }

    #[test]
    fn degenerate_and_empty_pools_are_rejected() {
        let mut generator = RandomGridGenerator::new(1);

        let catalog = SymbolCatalog::from_values(&[1, 100]).unwrap();
        assert_eq!(
            generator.generate(&catalog, reference_range(), FillerPolicy::Capped),
            Err(GameError::DegenerateCatalog {
                distinct: 1,
                required: 3
            })
        );

        let catalog = SymbolCatalog::from_values(&[1, 2, 5, 10]).unwrap();
        assert_eq!(
            generator.generate(&catalog, reference_range(), FillerPolicy::Capped),
            Err(GameError::NoEligibleSymbol)
        );
    }
}
