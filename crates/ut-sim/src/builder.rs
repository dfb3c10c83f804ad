//! Fluent builder for constructing a [`TrafficManager`].

use std::marker::PhantomData;

use ut_core::TrafficConfig;
use ut_nav::{Autopilot, NavigationController};
use ut_road::RoadNetwork;

use crate::{SimError, SimResult, TrafficHost, TrafficManager};

/// Fluent builder for [`TrafficManager<H, A>`].
///
/// # Required inputs
///
/// - [`TrafficConfig`]: spawn, navigation and timing parameters
/// - `H: TrafficHost`: the world the vehicles live in
///
/// # Optional inputs (have defaults)
///
/// | Method         | Default                  |
/// |----------------|--------------------------|
/// | `.network(n)`  | `RoadNetwork::empty()`   |
/// | `.autopilot()` | `NavigationController`   |
///
/// # Example
///
/// ```rust,ignore
/// let (network, report) = compiler.compile();
/// let mut traffic = TrafficManagerBuilder::new(config, host)
///     .network(network)
///     .build()?;
/// traffic.begin(&mut NoopObserver);
/// ```
pub struct TrafficManagerBuilder<H: TrafficHost, A: Autopilot = NavigationController> {
    config: TrafficConfig,
    host: H,
    network: Option<RoadNetwork>,
    autopilot: PhantomData<A>,
}

impl<H: TrafficHost> TrafficManagerBuilder<H> {
    pub fn new(config: TrafficConfig, host: H) -> Self {
        Self { config, host, network: None, autopilot: PhantomData }
    }
}

impl<H: TrafficHost, A: Autopilot> TrafficManagerBuilder<H, A> {
    /// Supply the compiled road network.
    ///
    /// If not called, an empty network is used and nothing ever spawns until
    /// [`TrafficManager::rebuild`] swaps a real one in.
    pub fn network(mut self, network: RoadNetwork) -> Self {
        self.network = Some(network);
        self
    }

    /// Drive vehicles with `B` instead of the default controller.
    pub fn autopilot<B: Autopilot>(self) -> TrafficManagerBuilder<H, B> {
        TrafficManagerBuilder {
            config: self.config,
            host: self.host,
            network: self.network,
            autopilot: PhantomData,
        }
    }

    /// Validate the configuration and return a manager ready for
    /// [`begin`](TrafficManager::begin).
    pub fn build(self) -> SimResult<TrafficManager<H, A>> {
        self.config.validate()?;
        if self.config.spawn.attempts_per_vehicle == 0 {
            return Err(SimError::Config("spawn.attempts_per_vehicle must be at least 1".into()));
        }
        let network = self.network.unwrap_or_else(RoadNetwork::empty);
        Ok(TrafficManager::new(self.config, network, self.host))
    }
}
