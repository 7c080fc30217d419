//! Pair enumeration and weight assignment.
//!
//! Pair order is fixed by the catalog (`(names[i], names[j])` for `i < j`);
//! weights are fresh uniform draws on every run unless a seed is supplied.

#![allow(missing_docs)]

use rand::Rng;
use serde::Serialize;

use crate::core::errors::{Result, SrhError};
use crate::pairwise::catalog::OptionCatalog;

/// Unordered pair of distinct options, stored in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OptionPair {
    pub first: String,
    pub second: String,
}

impl OptionPair {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }

    /// Whether `self` and `other` name the same two options in any order.
    pub fn same_options(&self, other: &Self) -> bool {
        (self.first == other.first && self.second == other.second)
            || (self.first == other.second && self.second == other.first)
    }
}

/// Inclusive bounds for pair weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeightRange {
    min: u32,
    max: u32,
}

impl WeightRange {
    pub const DEFAULT_MIN: u32 = 1;
    pub const DEFAULT_MAX: u32 = 100;

    /// Weights are sampling priorities, so zero is not allowed.
    pub fn new(min: u32, max: u32) -> Result<Self> {
        if min == 0 {
            return Err(SrhError::InvalidConfig {
                details: "weights.min_weight must be >= 1".to_string(),
            });
        }
        if min > max {
            return Err(SrhError::InvalidConfig {
                details: format!("weights.min_weight ({min}) must be <= max_weight ({max})"),
            });
        }
        Ok(Self { min, max })
    }

    pub const fn min(&self) -> u32 {
        self.min
    }

    pub const fn max(&self) -> u32 {
        self.max
    }

    pub const fn contains(&self, weight: u32) -> bool {
        weight >= self.min && weight <= self.max
    }
}

impl Default for WeightRange {
    fn default() -> Self {
        Self {
            min: Self::DEFAULT_MIN,
            max: Self::DEFAULT_MAX,
        }
    }
}

/// A pair with its sampling weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeightedPair {
    pub pair: OptionPair,
    pub weight: u32,
}

/// Every 2-combination of the catalog, once, in nested forward-index order.
pub fn generate_pairs(catalog: &OptionCatalog) -> Vec<OptionPair> {
    let names = catalog.names();
    let mut pairs = Vec::with_capacity(catalog.pair_count());
    for (i, first) in names.iter().enumerate() {
        for second in &names[i + 1..] {
            pairs.push(OptionPair::new(first.as_str(), second.as_str()));
        }
    }
    pairs
}

/// Uniform draw from `range`, independent of every other draw.
pub fn assign_weight<R: Rng>(rng: &mut R, range: WeightRange) -> u32 {
    rng.random_range(range.min..=range.max)
}

/// Enumerate pairs and weight each one.
pub fn generate_weighted<R: Rng>(
    catalog: &OptionCatalog,
    range: WeightRange,
    rng: &mut R,
) -> Vec<WeightedPair> {
    generate_pairs(catalog)
        .into_iter()
        .map(|pair| WeightedPair {
            pair,
            weight: assign_weight(&mut *rng, range),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn catalog(names: &[&str]) -> OptionCatalog {
        OptionCatalog::new(names.iter().copied()).unwrap()
    }

    #[test]
    fn three_option_catalog_in_forward_order() {
        let pairs = generate_pairs(&catalog(&["a", "b", "c"]));
        assert_eq!(
            pairs,
            vec![
                OptionPair::new("a", "b"),
                OptionPair::new("a", "c"),
                OptionPair::new("b", "c"),
            ]
        );
    }

    #[test]
    fn tiny_catalogs_yield_nothing() {
        assert!(generate_pairs(&catalog(&[])).is_empty());
        assert!(generate_pairs(&catalog(&["only"])).is_empty());
    }

    #[test]
    fn order_follows_catalog_not_alphabet() {
        let pairs = generate_pairs(&catalog(&["zeta", "alpha", "mid"]));
        assert_eq!(pairs[0], OptionPair::new("zeta", "alpha"));
        assert_eq!(pairs[2], OptionPair::new("alpha", "mid"));
    }

    #[test]
    fn default_catalog_pair_count() {
        let pairs = generate_pairs(&OptionCatalog::mysql_default());
        assert_eq!(pairs.len(), 1035);
        assert_eq!(pairs[0], OptionPair::new("big_tables", "completion_type"));
        assert_eq!(
            pairs.last().unwrap(),
            &OptionPair::new("tmp_table_size", "unique_checks")
        );
    }

    #[test]
    fn weight_range_validation() {
        assert!(WeightRange::new(0, 10).is_err());
        assert!(WeightRange::new(11, 10).is_err());
        let single = WeightRange::new(7, 7).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            assert_eq!(assign_weight(&mut rng, single), 7);
        }
    }

    #[test]
    fn same_seed_same_weights() {
        let cat = catalog(&["a", "b", "c", "d"]);
        let a = generate_weighted(&cat, WeightRange::default(), &mut StdRng::seed_from_u64(9));
        let b = generate_weighted(&cat, WeightRange::default(), &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn same_options_ignores_order() {
        let ab = OptionPair::new("a", "b");
        assert!(ab.same_options(&OptionPair::new("b", "a")));
        assert!(!ab.same_options(&OptionPair::new("a", "c")));
    }

    proptest! {
        #[test]
        fn pair_set_is_complete_and_distinct(n in 0usize..40) {
            let names: Vec<String> = (0..n).map(|i| format!("opt_{i}")).collect();
            let cat = OptionCatalog::new(names).unwrap();
            let pairs = generate_pairs(&cat);

            prop_assert_eq!(pairs.len(), n * n.saturating_sub(1) / 2);
            let mut seen = HashSet::new();
            for p in &pairs {
                prop_assert_ne!(&p.first, &p.second);
                let mut key = [p.first.clone(), p.second.clone()];
                key.sort();
                prop_assert!(seen.insert(key), "duplicate pair {:?}", p);
            }
        }

        #[test]
        fn weights_stay_in_bounds(min in 1u32..50, span in 0u32..60, seed in any::<u64>()) {
            let range = WeightRange::new(min, min + span).unwrap();
            let cat = catalog(&["a", "b", "c", "d", "e", "f"]);
            let mut rng = StdRng::seed_from_u64(seed);
            for wp in generate_weighted(&cat, range, &mut rng) {
                prop_assert!(range.contains(wp.weight), "{} outside {:?}", wp.weight, range);
            }
        }
    }
}
