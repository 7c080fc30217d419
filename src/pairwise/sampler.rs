//! Weight-proportional pair sampling over a loaded table.
//!
//! This mirrors how a consumer of the weight file picks the next pair to
//! mutate, so a table can be previewed before a campaign uses it.

#![allow(missing_docs)]

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;

use crate::core::errors::{Result, SrhError};
use crate::pairwise::generator::WeightedPair;
use crate::pairwise::table::WeightTable;

/// Draws table entries with probability proportional to their weight.
#[derive(Debug, Clone)]
pub struct WeightedPairSampler<'a> {
    entries: &'a [WeightedPair],
    index: WeightedIndex<u64>,
    total: u64,
}

impl<'a> WeightedPairSampler<'a> {
    /// Fails on an empty or weightless table: there is nothing to draw.
    pub fn new(table: &'a WeightTable) -> Result<Self> {
        let entries = table.entries();
        if entries.is_empty() {
            return Err(SrhError::InvalidConfig {
                details: "cannot sample from an empty weight table".to_string(),
            });
        }
        let total = table.total_weight();
        if total == 0 {
            return Err(SrhError::InvalidConfig {
                details: "weight table has zero total weight".to_string(),
            });
        }
        let index = WeightedIndex::new(entries.iter().map(|e| u64::from(e.weight))).map_err(
            |e| SrhError::InvalidConfig {
                details: format!("cannot sample weight table: {e}"),
            },
        )?;
        Ok(Self {
            entries,
            index,
            total,
        })
    }

    pub fn total_weight(&self) -> u64 {
        self.total
    }

    /// Probability that a single draw returns entry `index`.
    #[allow(clippy::cast_precision_loss)]
    pub fn probability(&self, index: usize) -> Option<f64> {
        let w = self.entries.get(index)?.weight;
        Some(f64::from(w) / self.total as f64)
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> &'a WeightedPair {
        &self.entries[self.index.sample(rng)]
    }

    pub fn sample_n<R: Rng>(&self, rng: &mut R, n: usize) -> Vec<&'a WeightedPair> {
        (0..n).map(|_| self.sample(rng)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairwise::generator::OptionPair;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn table(weights: &[(&str, &str, u32)]) -> WeightTable {
        WeightTable::new(
            weights
                .iter()
                .map(|(a, b, w)| WeightedPair {
                    pair: OptionPair::new(*a, *b),
                    weight: *w,
                })
                .collect(),
        )
    }

    #[test]
    fn empty_or_weightless_table_rejected() {
        assert!(WeightedPairSampler::new(&WeightTable::default()).is_err());
        assert!(WeightedPairSampler::new(&table(&[("a", "b", 0)])).is_err());
    }

    #[test]
    fn zero_weight_entries_are_never_drawn() {
        let t = table(&[("a", "b", 0), ("a", "c", 3), ("b", "c", 0)]);
        let sampler = WeightedPairSampler::new(&t).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for wp in sampler.sample_n(&mut rng, 200) {
            assert_eq!(wp.pair, OptionPair::new("a", "c"));
        }
    }

    #[test]
    fn draws_follow_weights() {
        let t = table(&[("a", "b", 1), ("a", "c", 9)]);
        let sampler = WeightedPairSampler::new(&t).unwrap();
        assert_eq!(sampler.total_weight(), 10);
        assert_eq!(sampler.probability(1), Some(0.9));
        assert_eq!(sampler.probability(2), None);

        let mut rng = StdRng::seed_from_u64(11);
        let heavy = sampler
            .sample_n(&mut rng, 5_000)
            .iter()
            .filter(|wp| wp.weight == 9)
            .count();
        // Expected 4500; allow a wide margin.
        assert!((4_200..=4_800).contains(&heavy), "heavy draws: {heavy}");
    }

    #[test]
    fn totals_beyond_u32_still_sample() {
        let t = table(&[("a", "b", u32::MAX), ("a", "c", u32::MAX), ("b", "c", 1)]);
        let sampler = WeightedPairSampler::new(&t).unwrap();
        assert_eq!(sampler.total_weight(), 2 * u64::from(u32::MAX) + 1);
        let mut rng = StdRng::seed_from_u64(4);
        for wp in sampler.sample_n(&mut rng, 100) {
            assert!(t.entries().contains(wp));
        }
    }
}
