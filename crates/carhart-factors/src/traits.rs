//! Factor traits.

use crate::error::Result;
use carhart_data::{FactorKind, FactorSeries, ReportingPeriod, TimeSeriesStore};

/// A factor computed once for the whole market in a period.
pub trait MarketFactor {
    /// Factor name.
    fn name(&self) -> &str;

    /// Series kind produced.
    fn kind(&self) -> FactorKind;

    /// Compute the factor series for `period`.
    fn compute(&self, store: &dyn TimeSeriesStore, period: ReportingPeriod)
    -> Result<FactorSeries>;
}

/// A factor computed separately for every security.
pub trait SecurityFactor {
    /// Factor name.
    fn name(&self) -> &str;

    /// Series kind produced.
    fn kind(&self) -> FactorKind;

    /// Compute the factor series of `symbol` for `period`.
    fn compute(
        &self,
        store: &dyn TimeSeriesStore,
        symbol: &str,
        period: ReportingPeriod,
    ) -> Result<FactorSeries>;
}

/// Factors parameterized by a configuration struct.
pub trait StyleFactor: Sized {
    /// Configuration type.
    type Config: Default;

    /// Create the factor with the given configuration.
    fn with_config(config: Self::Config) -> Self;

    /// Active configuration.
    fn config(&self) -> &Self::Config;
}
