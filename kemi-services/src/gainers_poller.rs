//! Top gainers polling controller
//!
//! Fetches top movers on a fixed cadence, runs them through the gainers
//! pipeline and publishes an immutable snapshot. Failures swap in a fixed
//! fallback sample so consumers always have something to show.
//!
//! Every cycle takes a sequence number; only the most recently issued cycle
//! may publish, and nothing is published after [`GainersPoller::stop`].

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use kemi_core::{FallbackSample, GainersList, TopMovers, TopMoversParams};
use kemi_market::{MarketDataError, ProviderChain, TopMoversProvider};

use crate::gainers_filter::{filter_valid_gainers, GainersFilter, GainersFilterConfig};

/// Message shown to users when live data couldn't be loaded
pub const GENERIC_ERROR_MESSAGE: &str =
    "Unable to load live market data. Showing sample gainers instead.";

/// Default polling cadence
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(120);

/// Default number of gainers shown
pub const DEFAULT_DISPLAY_CAP: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PollerState {
    #[default]
    Idle,
    Loading,
    Success,
    Failure,
}

/// What consumers of the poller see
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GainersSnapshot {
    pub status: PollerState,
    pub gainers: GainersList,
    /// Generic, user-facing message; set only in `Failure`
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    /// Sequence number of the cycle that produced this snapshot
    pub sequence: u64,
}

impl GainersSnapshot {
    /// Copy with the placeholder image substituted wherever a thumbnail is missing
    pub fn with_display_images(&self) -> Self {
        Self {
            gainers: GainersList::from_filtered(
                self.gainers.iter().map(|a| a.with_display_image()),
                self.gainers.len(),
            ),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval: Duration,
    pub display_cap: usize,
    pub params: TopMoversParams,
    pub filter: GainersFilterConfig,
    pub fallback: FallbackSample,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            display_cap: DEFAULT_DISPLAY_CAP,
            params: TopMoversParams::default(),
            filter: GainersFilterConfig::default(),
            fallback: FallbackSample::default(),
        }
    }
}

struct PollerInner {
    provider: Arc<dyn TopMoversProvider>,
    filter: GainersFilter,
    config: PollerConfig,
    snapshot: RwLock<GainersSnapshot>,
    /// Last sequence number handed out
    sequence: AtomicU64,
    /// Cleared by `stop`, always under the snapshot write lock
    mounted: AtomicBool,
}

impl PollerInner {
    async fn run_cycle(&self) -> bool {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.mark_loading();
        debug!(
            "Gainers cycle #{} fetching from {}",
            seq,
            self.provider.name()
        );

        let result = self.provider.fetch_top_movers(&self.config.params).await;
        self.publish(seq, result)
    }

    fn mark_loading(&self) {
        let mut snapshot = self.snapshot.write();
        if self.mounted.load(Ordering::SeqCst) {
            snapshot.status = PollerState::Loading;
        }
    }

    fn publish(&self, seq: u64, result: Result<TopMovers, MarketDataError>) -> bool {
        let mut snapshot = self.snapshot.write();

        if !self.mounted.load(Ordering::SeqCst) {
            debug!("Gainers cycle #{} finished after stop, discarding", seq);
            return false;
        }
        let latest = self.sequence.load(Ordering::SeqCst);
        if seq != latest {
            debug!(
                "Gainers cycle #{} superseded by #{}, discarding",
                seq, latest
            );
            return false;
        }

        *snapshot = match result {
            Ok(movers) => {
                let valid = filter_valid_gainers(&movers.top_gainers, &self.filter);
                let gainers = GainersList::from_filtered(valid, self.config.display_cap);
                info!(
                    "Gainers cycle #{}: {} of {} movers kept",
                    seq,
                    gainers.len(),
                    movers.top_gainers.len()
                );
                GainersSnapshot {
                    status: PollerState::Success,
                    gainers,
                    error: None,
                    last_updated: Some(Utc::now()),
                    sequence: seq,
                }
            }
            Err(e) => {
                warn!(
                    "Gainers cycle #{} failed via {}: {}",
                    seq,
                    self.provider.name(),
                    e
                );
                GainersSnapshot {
                    status: PollerState::Failure,
                    gainers: self.config.fallback.to_list(),
                    error: Some(GENERIC_ERROR_MESSAGE.to_string()),
                    last_updated: Some(Utc::now()),
                    sequence: seq,
                }
            }
        };
        true
    }
}

/// Polling controller for the top gainers list
pub struct GainersPoller {
    inner: Arc<PollerInner>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl GainersPoller {
    pub fn new(provider: Arc<dyn TopMoversProvider>, config: PollerConfig) -> Self {
        Self {
            inner: Arc::new(PollerInner {
                provider,
                filter: GainersFilter::new(&config.filter),
                config,
                snapshot: RwLock::new(GainersSnapshot::default()),
                sequence: AtomicU64::new(0),
                mounted: AtomicBool::new(false),
            }),
            timer: Mutex::new(None),
        }
    }

    /// Build a poller on the first available strategy of `chain`
    pub fn from_chain(chain: &ProviderChain, config: PollerConfig) -> Result<Self, MarketDataError> {
        Ok(Self::new(chain.select()?, config))
    }

    pub fn provider_name(&self) -> &str {
        self.inner.provider.name()
    }

    pub fn config(&self) -> &PollerConfig {
        &self.inner.config
    }

    /// Enter `Loading`, fetch immediately, then once per interval.
    ///
    /// Must be called from within a tokio runtime. Calling it while already
    /// running does nothing.
    pub fn start(&self) {
        let mut timer = self.timer.lock();
        if timer.is_some() {
            debug!("Gainers poller already running");
            return;
        }

        {
            let mut snapshot = self.inner.snapshot.write();
            // Cycles left over from a previous run must not publish
            self.inner.sequence.fetch_add(1, Ordering::SeqCst);
            self.inner.mounted.store(true, Ordering::SeqCst);
            snapshot.status = PollerState::Loading;
        }

        let period = self.inner.config.interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let inner = Arc::clone(&self.inner);
        *timer = Some(tokio::spawn(async move {
            loop {
                ticker.tick().await;
                let cycle = Arc::clone(&inner);
                tokio::spawn(async move {
                    cycle.run_cycle().await;
                });
            }
        }));

        info!(
            "Gainers poller started ({} every {:?})",
            self.inner.provider.name(),
            period
        );
    }

    /// Cancel the timer. Cycles already in flight finish but never publish.
    pub fn stop(&self) {
        {
            let _snapshot = self.inner.snapshot.write();
            self.inner.mounted.store(false, Ordering::SeqCst);
        }

        if let Some(handle) = self.timer.lock().take() {
            handle.abort();
            info!("Gainers poller stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer.lock().is_some()
    }

    /// Run one cycle now, on the same path as the timer, and return the
    /// resulting snapshot. The timer cadence is left untouched.
    pub async fn refresh(&self) -> GainersSnapshot {
        if !self.inner.run_cycle().await {
            debug!("Manual refresh result was not published");
        }
        self.snapshot()
    }

    pub fn snapshot(&self) -> GainersSnapshot {
        self.inner.snapshot.read().clone()
    }
}

impl Drop for GainersPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kemi_core::MarketAsset;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Semaphore;

    fn asset(id: &str, symbol: &str, change: Decimal) -> MarketAsset {
        MarketAsset {
            id: id.to_string(),
            symbol: symbol.to_string(),
            name: id.to_string(),
            image: None,
            market_cap_rank: None,
            price_usd: dec!(2.5),
            volume_24h_usd: dec!(1000),
            change_24h_percent: change,
        }
    }

    fn movers(ids: &[&str]) -> TopMovers {
        TopMovers {
            top_gainers: ids.iter().map(|id| asset(id, id, dec!(20))).collect(),
            top_losers: vec![],
        }
    }

    struct Step {
        delay: Duration,
        result: Result<TopMovers, MarketDataError>,
    }

    /// Replays scripted responses, then keeps answering with an empty list
    #[derive(Default)]
    struct ScriptedProvider {
        steps: Mutex<VecDeque<Step>>,
        calls: AtomicUsize,
        gate: Option<Arc<Semaphore>>,
    }

    impl ScriptedProvider {
        fn with_steps(steps: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(steps.into()),
                ..Self::default()
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TopMoversProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn fetch_top_movers(
            &self,
            _params: &TopMoversParams,
        ) -> Result<TopMovers, MarketDataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                let _permit = gate.acquire().await.map_err(|e| {
                    MarketDataError::Network(e.to_string())
                })?;
            }
            let step = self.steps.lock().pop_front();
            match step {
                Some(step) => {
                    tokio::time::sleep(step.delay).await;
                    step.result
                }
                None => Ok(TopMovers::default()),
            }
        }
    }

    fn ok(delay_secs: u64, ids: &[&str]) -> Step {
        Step {
            delay: Duration::from_secs(delay_secs),
            result: Ok(movers(ids)),
        }
    }

    /// Let every ready task run; the paused clock moves by 1ms
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_publishes_filtered_capped_list() {
        let provider = ScriptedProvider::with_steps(vec![Step {
            delay: Duration::ZERO,
            result: Ok(TopMovers {
                top_gainers: vec![
                    asset("tether", "USDT", dec!(50)),
                    asset("a", "A", dec!(40)),
                    asset("b", "B", dec!(3)),
                    asset("c", "C", dec!(30)),
                    asset("a", "A", dec!(40)),
                    asset("d", "D", dec!(25)),
                    asset("e", "E", dec!(20)),
                    asset("f", "F", dec!(15)),
                    asset("g", "G", dec!(10)),
                ],
                top_losers: vec![],
            }),
        }]);
        let poller = GainersPoller::new(provider.clone(), PollerConfig::default());
        assert_eq!(poller.snapshot().status, PollerState::Idle);

        poller.start();
        assert_eq!(poller.snapshot().status, PollerState::Loading);
        settle().await;

        let snapshot = poller.snapshot();
        assert_eq!(snapshot.status, PollerState::Success);
        assert_eq!(snapshot.gainers.ids(), vec!["a", "c", "d", "e", "f"]);
        assert!(snapshot.error.is_none());
        assert!(snapshot.last_updated.is_some());
        assert_eq!(snapshot.sequence, 2);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_shows_fallback_sample() {
        let provider = ScriptedProvider::with_steps(vec![Step {
            delay: Duration::ZERO,
            result: Err(MarketDataError::Network("connection refused".to_string())),
        }]);
        let poller = GainersPoller::new(provider, PollerConfig::default());

        poller.start();
        settle().await;

        let snapshot = poller.snapshot();
        assert_eq!(snapshot.status, PollerState::Failure);
        assert_eq!(snapshot.gainers, FallbackSample::default().to_list());
        assert_eq!(snapshot.gainers.len(), 3);
        let message = snapshot.error.unwrap();
        assert!(!message.is_empty());
        assert!(!message.contains("connection refused"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_payload_follows_failure_path() {
        let provider = ScriptedProvider::with_steps(vec![
            Step {
                delay: Duration::ZERO,
                result: Err(MarketDataError::MalformedPayload("missing top_gainers".to_string())),
            },
            ok(0, &["x"]),
        ]);
        let poller = GainersPoller::new(provider, PollerConfig::default());

        poller.start();
        settle().await;
        assert_eq!(poller.snapshot().status, PollerState::Failure);

        // Manual retry recovers
        let snapshot = poller.refresh().await;
        assert_eq!(snapshot.status, PollerState::Success);
        assert_eq!(snapshot.gainers.ids(), vec!["x"]);
        assert!(snapshot.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_mid_fetch_discards_result() {
        let gate = Arc::new(Semaphore::new(0));
        let provider = Arc::new(ScriptedProvider {
            steps: Mutex::new(vec![ok(0, &["late"])].into()),
            gate: Some(Arc::clone(&gate)),
            ..ScriptedProvider::default()
        });
        let poller = GainersPoller::new(provider.clone(), PollerConfig::default());

        poller.start();
        settle().await;
        assert_eq!(provider.calls(), 1);

        poller.stop();
        assert!(!poller.is_running());
        gate.add_permits(10);
        settle().await;

        let snapshot = poller.snapshot();
        assert_eq!(snapshot.status, PollerState::Loading);
        assert!(snapshot.gainers.is_empty());
        assert_eq!(snapshot.sequence, 0);

        tokio::time::advance(Duration::from_secs(600)).await;
        settle().await;
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_discards_cycle_from_previous_run() {
        let gate = Arc::new(Semaphore::new(0));
        let provider = Arc::new(ScriptedProvider {
            steps: Mutex::new(vec![ok(0, &["before-stop"])].into()),
            gate: Some(Arc::clone(&gate)),
            ..ScriptedProvider::default()
        });
        let poller = GainersPoller::new(provider.clone(), PollerConfig::default());

        poller.start();
        settle().await;
        assert_eq!(provider.calls(), 1);
        let in_flight = poller.inner.sequence.load(Ordering::SeqCst);

        poller.stop();
        poller.start();
        // The new run hasn't fetched yet, so the old cycle is still the latest fetch
        assert!(!poller.inner.publish(in_flight, Ok(movers(&["before-stop"]))));

        // Only the old cycle gets through the gate
        gate.add_permits(1);
        settle().await;
        assert_eq!(provider.calls(), 2);

        let snapshot = poller.snapshot();
        assert_eq!(snapshot.status, PollerState::Loading);
        assert!(snapshot.gainers.is_empty());
        assert_eq!(snapshot.sequence, 0);
        poller.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_discarded() {
        let provider = ScriptedProvider::with_steps(vec![ok(10, &["slow"]), ok(1, &["fast"])]);
        let poller = Arc::new(GainersPoller::new(provider, PollerConfig::default()));

        poller.start();
        settle().await;

        let manual = {
            let poller = Arc::clone(&poller);
            tokio::spawn(async move { poller.refresh().await })
        };

        let refreshed = manual.await.unwrap();
        assert_eq!(refreshed.gainers.ids(), vec!["fast"]);
        assert_eq!(refreshed.sequence, 3);

        // The first cycle lands later and must not overwrite
        tokio::time::sleep(Duration::from_secs(20)).await;
        settle().await;
        let snapshot = poller.snapshot();
        assert_eq!(snapshot.gainers.ids(), vec!["fast"]);
        assert_eq!(snapshot.sequence, 3);
        assert_eq!(snapshot.status, PollerState::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_cadence_and_manual_refresh() {
        let provider = ScriptedProvider::with_steps(vec![]);
        let poller = GainersPoller::new(provider.clone(), PollerConfig::default());

        poller.start();
        settle().await;
        assert_eq!(provider.calls(), 1);

        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;
        poller.refresh().await;
        assert_eq!(provider.calls(), 2);

        // Refresh doesn't push the next tick back
        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(provider.calls(), 3);

        tokio::time::advance(Duration::from_secs(120)).await;
        settle().await;
        assert_eq!(provider.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_and_restart() {
        let provider = ScriptedProvider::with_steps(vec![]);
        let poller = GainersPoller::new(provider.clone(), PollerConfig::default());

        poller.start();
        poller.start();
        settle().await;
        assert_eq!(provider.calls(), 1);

        poller.stop();
        poller.start();
        settle().await;
        assert_eq!(provider.calls(), 2);
        assert_eq!(poller.snapshot().status, PollerState::Success);
    }

    #[test]
    fn test_from_chain_without_providers() {
        let result = GainersPoller::from_chain(&ProviderChain::new(), PollerConfig::default());
        assert!(matches!(result, Err(MarketDataError::NoProviderAvailable(_))));
    }

    #[test]
    fn test_display_images_and_serialization() {
        let snapshot = GainersSnapshot {
            status: PollerState::Failure,
            gainers: GainersList::from_filtered(vec![asset("a", "A", dec!(10))], 5),
            error: Some(GENERIC_ERROR_MESSAGE.to_string()),
            last_updated: None,
            sequence: 3,
        };

        let display = snapshot.with_display_images();
        assert_eq!(
            display.gainers.as_slice()[0].image.as_deref(),
            Some(kemi_core::PLACEHOLDER_IMAGE_URL)
        );

        let value = serde_json::to_value(&display).unwrap();
        assert_eq!(value["status"], "failure");
        assert_eq!(value["gainers"][0]["usd_24h_change"], 10.0);
        assert_eq!(value["sequence"], 3);
    }
}
