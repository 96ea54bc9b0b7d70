//! Gainers normalization pipeline
//!
//! Removes stablecoins and low-signal movers from a provider's top gainers.
//! The pipeline only filters: provider order is kept and nothing is sorted or
//! truncated here.

use std::collections::HashSet;

use rust_decimal::Decimal;

use kemi_core::MarketAsset;

/// Stablecoin tickers, compared case-insensitively
pub const STABLECOIN_SYMBOLS: &[&str] = &[
    "USDT", "USDC", "BUSD", "DAI", "FRAX", "TUSD", "USDP", "USDE", "FDUSD",
];

/// Name fragments that mark a stablecoin, matched as case-insensitive substrings.
///
/// "Dai" also matches unrelated names containing those letters.
pub const STABLECOIN_NAME_FRAGMENTS: &[&str] = &[
    "Tether",
    "USD Coin",
    "Binance USD",
    "Dai",
    "Frax",
    "TrueUSD",
    "Pax Dollar",
    "Ethena USDe",
    "First Digital USD",
];

/// Thresholds and denylists for the gainers pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct GainersFilterConfig {
    pub stable_symbols: Vec<String>,
    pub stable_name_fragments: Vec<String>,
    /// Movers below this 24h change (percent) are dropped
    pub min_change_percent: Decimal,
    /// Price a stablecoin is pegged to
    pub peg_price: Decimal,
    /// Prices strictly within this distance of the peg are dropped
    pub peg_tolerance: Decimal,
}

impl Default for GainersFilterConfig {
    fn default() -> Self {
        Self {
            stable_symbols: STABLECOIN_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            stable_name_fragments: STABLECOIN_NAME_FRAGMENTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_change_percent: Decimal::new(5, 0),
            peg_price: Decimal::ONE,
            peg_tolerance: Decimal::new(1, 3),
        }
    }
}

/// Compiled form of [`GainersFilterConfig`]
#[derive(Debug, Clone)]
pub struct GainersFilter {
    symbols: HashSet<String>,
    name_fragments: Vec<String>,
    min_change_percent: Decimal,
    peg_price: Decimal,
    peg_tolerance: Decimal,
}

impl GainersFilter {
    pub fn new(config: &GainersFilterConfig) -> Self {
        Self {
            symbols: config
                .stable_symbols
                .iter()
                .map(|s| s.to_lowercase())
                .collect(),
            name_fragments: config
                .stable_name_fragments
                .iter()
                .map(|s| s.to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            min_change_percent: config.min_change_percent,
            peg_price: config.peg_price,
            peg_tolerance: config.peg_tolerance,
        }
    }

    pub fn is_stable_symbol(&self, asset: &MarketAsset) -> bool {
        self.symbols.contains(&asset.symbol.to_lowercase())
    }

    pub fn is_stable_name(&self, asset: &MarketAsset) -> bool {
        let name = asset.name.to_lowercase();
        self.name_fragments.iter().any(|f| name.contains(f.as_str()))
    }

    pub fn is_low_signal(&self, asset: &MarketAsset) -> bool {
        asset.change_24h_percent < self.min_change_percent
    }

    pub fn is_pegged(&self, asset: &MarketAsset) -> bool {
        asset.price_usd == self.peg_price
            || (asset.price_usd - self.peg_price).abs() < self.peg_tolerance
    }

    /// Whether an asset survives every rule
    pub fn accepts(&self, asset: &MarketAsset) -> bool {
        !(self.is_stable_symbol(asset)
            || self.is_stable_name(asset)
            || self.is_low_signal(asset)
            || self.is_pegged(asset))
    }
}

impl Default for GainersFilter {
    fn default() -> Self {
        Self::new(&GainersFilterConfig::default())
    }
}

/// Order-preserving subsequence of `raw` that passes `filter`
pub fn filter_valid_gainers(raw: &[MarketAsset], filter: &GainersFilter) -> Vec<MarketAsset> {
    raw.iter().filter(|a| filter.accepts(a)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn asset(symbol: &str, name: &str, price: Decimal, change: Decimal) -> MarketAsset {
        MarketAsset {
            id: symbol.to_lowercase(),
            symbol: symbol.to_string(),
            name: name.to_string(),
            image: None,
            market_cap_rank: None,
            price_usd: price,
            volume_24h_usd: dec!(1000000),
            change_24h_percent: change,
        }
    }

    #[test]
    fn test_stablecoin_symbol_excluded() {
        let filter = GainersFilter::default();
        let raw = vec![asset("USDT", "Some Token", dec!(1.2), dec!(50))];
        assert!(filter_valid_gainers(&raw, &filter).is_empty());

        let raw = vec![asset("usdc", "Other", dec!(3), dec!(20))];
        assert!(filter_valid_gainers(&raw, &filter).is_empty());
    }

    #[test]
    fn test_real_gainer_included() {
        let filter = GainersFilter::default();
        let raw = vec![asset("ZORA", "Zora", dec!(0.0516), dec!(137.08))];
        let result = filter_valid_gainers(&raw, &filter);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].symbol, "ZORA");
    }

    #[test]
    fn test_below_threshold_excluded() {
        let filter = GainersFilter::default();
        let raw = vec![asset("XYZ", "Xyz", dec!(2), dec!(4.99))];
        assert!(filter_valid_gainers(&raw, &filter).is_empty());

        // Exactly at the threshold is kept
        let raw = vec![asset("XYZ", "Xyz", dec!(2), dec!(5))];
        assert_eq!(filter_valid_gainers(&raw, &filter).len(), 1);
    }

    #[test]
    fn test_stablecoin_name_excluded() {
        let filter = GainersFilter::default();
        let raw = vec![
            asset("ABC", "Bridged TETHER", dec!(2), dec!(10)),
            asset("DEF", "First Digital USD", dec!(2), dec!(10)),
            asset("GHI", "Daisy", dec!(2), dec!(10)),
        ];
        assert!(filter_valid_gainers(&raw, &filter).is_empty());
    }

    #[test]
    fn test_peg_window() {
        let filter = GainersFilter::default();
        let raw = vec![
            asset("A", "A", dec!(1.0), dec!(10)),
            asset("B", "B", dec!(0.9995), dec!(10)),
            asset("C", "C", dec!(1.0009), dec!(10)),
            asset("D", "D", dec!(0.999), dec!(10)),
            asset("E", "E", dec!(1.001), dec!(10)),
        ];
        let kept: Vec<String> = filter_valid_gainers(&raw, &filter)
            .into_iter()
            .map(|a| a.symbol)
            .collect();
        assert_eq!(kept, vec!["D", "E"]);
    }

    #[test]
    fn test_preserves_provider_order() {
        let filter = GainersFilter::default();
        let raw = vec![
            asset("LOW", "Low", dec!(3), dec!(8)),
            asset("USDE", "Ethena", dec!(1), dec!(40)),
            asset("HIGH", "High", dec!(3), dec!(90)),
            asset("MID", "Mid", dec!(3), dec!(30)),
        ];
        let kept: Vec<String> = filter_valid_gainers(&raw, &filter)
            .into_iter()
            .map(|a| a.symbol)
            .collect();
        assert_eq!(kept, vec!["LOW", "HIGH", "MID"]);
    }

    #[test]
    fn test_custom_config() {
        let config = GainersFilterConfig {
            stable_symbols: vec!["PYUSD".to_string()],
            stable_name_fragments: vec![],
            min_change_percent: dec!(20),
            ..GainersFilterConfig::default()
        };
        let filter = GainersFilter::new(&config);
        let raw = vec![
            asset("pyusd", "PayPal USD", dec!(3), dec!(50)),
            asset("USDT", "Tether", dec!(3), dec!(50)),
            asset("SMALL", "Small", dec!(3), dec!(10)),
        ];
        let kept: Vec<String> = filter_valid_gainers(&raw, &filter)
            .into_iter()
            .map(|a| a.symbol)
            .collect();
        assert_eq!(kept, vec!["USDT"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(filter_valid_gainers(&[], &GainersFilter::default()).is_empty());
    }

    fn arb_symbol() -> impl Strategy<Value = String> {
        prop_oneof![
            prop::sample::select(STABLECOIN_SYMBOLS.to_vec()).prop_map(|s| s.to_string()),
            prop::sample::select(STABLECOIN_SYMBOLS.to_vec()).prop_map(|s| s.to_lowercase()),
            "[A-Za-z]{2,6}",
        ]
    }

    fn arb_price() -> impl Strategy<Value = Decimal> {
        prop_oneof![
            Just(dec!(1)),
            (9_990i64..=10_010).prop_map(|p| Decimal::new(p, 4)),
            (1i64..100_000_000).prop_map(|p| Decimal::new(p, 4)),
        ]
    }

    fn arb_asset() -> impl Strategy<Value = MarketAsset> {
        (
            arb_symbol(),
            "[A-Za-z ]{0,12}",
            arb_price(),
            (-10_000i64..=50_000).prop_map(|c| Decimal::new(c, 2)),
        )
            .prop_map(|(symbol, name, price, change)| asset(&symbol, &name, price, change))
    }

    proptest! {
        #[test]
        fn prop_output_satisfies_every_rule(raw in prop::collection::vec(arb_asset(), 0..40)) {
            let out = filter_valid_gainers(&raw, &GainersFilter::default());
            for a in &out {
                let upper = a.symbol.to_uppercase();
                prop_assert!(!STABLECOIN_SYMBOLS.contains(&upper.as_str()));
                prop_assert!(a.change_24h_percent >= dec!(5));
                prop_assert!(a.price_usd != dec!(1));
                prop_assert!(!(a.price_usd > dec!(0.999) && a.price_usd < dec!(1.001)));
            }
        }

        #[test]
        fn prop_output_is_ordered_subsequence(raw in prop::collection::vec(arb_asset(), 0..40)) {
            let out = filter_valid_gainers(&raw, &GainersFilter::default());
            let mut remaining = raw.iter();
            for kept in &out {
                prop_assert!(remaining.any(|a| a == kept));
            }
        }

        #[test]
        fn prop_idempotent(raw in prop::collection::vec(arb_asset(), 0..40)) {
            let filter = GainersFilter::default();
            let once = filter_valid_gainers(&raw, &filter);
            let twice = filter_valid_gainers(&once, &filter);
            prop_assert_eq!(once, twice);
        }
    }
}
