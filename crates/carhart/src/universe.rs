//! Security universes.

use carhart_data::{Result, TimeSeriesStore};

/// Trait for security universes.
pub trait Universe {
    /// Get all symbols in the universe.
    fn symbols(&self) -> Vec<String>;

    /// Check if a symbol is in the universe.
    fn contains(&self, symbol: &str) -> bool {
        self.symbols().iter().any(|s| s == symbol)
    }

    /// Get the number of constituents.
    fn size(&self) -> usize {
        self.symbols().len()
    }
}

impl Universe for [String] {
    fn symbols(&self) -> Vec<String> {
        self.to_vec()
    }
}

impl Universe for Vec<String> {
    fn symbols(&self) -> Vec<String> {
        self.clone()
    }
}

/// Every security a store holds.
#[derive(Debug, Clone)]
pub struct StoreUniverse {
    symbols: Vec<String>,
}

impl StoreUniverse {
    /// List the securities of `store`.
    pub fn new(store: &dyn TimeSeriesStore) -> Result<Self> {
        Ok(Self {
            symbols: store.securities()?,
        })
    }

    /// Drop symbols that are also listed in `exclude`, e.g. the market index.
    pub fn without(mut self, exclude: &[&str]) -> Self {
        self.symbols.retain(|s| !exclude.contains(&s.as_str()));
        self
    }
}

impl Universe for StoreUniverse {
    fn symbols(&self) -> Vec<String> {
        self.symbols.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carhart_data::{InMemoryStore, PricePoint, PriceSeries};
    use chrono::NaiveDate;

    fn store() -> InMemoryStore {
        let date = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let mut store = InMemoryStore::new();
        for symbol in ["BBB", "AAA", "CCC"] {
            store.insert_prices(PriceSeries::new(
                symbol,
                vec![PricePoint::from_close(date, 10.0)],
            ));
        }
        store
    }

    #[test]
    fn test_store_universe() {
        let universe = StoreUniverse::new(&store()).unwrap();
        assert_eq!(universe.symbols(), vec!["AAA", "BBB", "CCC"]);
        assert!(universe.contains("BBB"));
        assert!(!universe.contains("ZZZ"));
        assert_eq!(universe.without(&["BBB"]).size(), 2);
    }

    #[test]
    fn test_vec_universe() {
        let universe = vec!["X".to_string(), "Y".to_string()];
        assert_eq!(universe.size(), 2);
        assert!(Universe::contains(universe.as_slice(), "Y"));
    }
}
