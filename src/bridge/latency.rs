// Per-packet processing latency. Each model is a pure function of packet size.

use crate::sim::SimTime;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub trait ProcessingDelay: Send + Sync + fmt::Debug {
    fn delay(&self, size: u32) -> SimTime;
    fn name(&self) -> &str;
}

/// Same delay for every packet. Used for zonal switch lookups.
#[derive(Debug, Clone, Copy)]
pub struct ConstantDelay {
    delay: SimTime,
}

impl ConstantDelay {
    pub fn new(delay: SimTime) -> Self {
        Self { delay }
    }
}

impl ProcessingDelay for ConstantDelay {
    fn delay(&self, _size: u32) -> SimTime {
        self.delay
    }

    fn name(&self) -> &str {
        "constant"
    }
}

/// Linear fit of measured MACsec encrypt+decrypt latency against frame size,
/// halved to get a single direction. The constants are calibration data.
#[derive(Debug, Clone, Copy, Default)]
pub struct MacsecRegression;

impl MacsecRegression {
    const NS_PER_BYTE: u64 = 32;
    const INTERCEPT_NS: u64 = 6579;
}

impl ProcessingDelay for MacsecRegression {
    fn delay(&self, size: u32) -> SimTime {
        SimTime::from_nanos((size as u64 * Self::NS_PER_BYTE + Self::INTERCEPT_NS) / 2)
    }

    fn name(&self) -> &str {
        "macsec"
    }
}

/// Any closure of packet size.
pub struct FnDelay<F> {
    name: String,
    f: F,
}

impl<F> FnDelay<F>
where
    F: Fn(u32) -> SimTime + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

impl<F> fmt::Debug for FnDelay<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnDelay").field("name", &self.name).finish()
    }
}

impl<F> ProcessingDelay for FnDelay<F>
where
    F: Fn(u32) -> SimTime + Send + Sync,
{
    fn delay(&self, size: u32) -> SimTime {
        (self.f)(size)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

type Factory = Box<dyn Fn(SimTime) -> Arc<dyn ProcessingDelay> + Send + Sync>;

/// Latency models by name. The factory argument is the fixed delay, ignored by
/// models that derive their delay from packet size.
pub struct LatencyRegistry {
    models: HashMap<String, Factory>,
}

impl LatencyRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            models: HashMap::new(),
        };
        registry.register_builtin();
        registry
    }

    fn register_builtin(&mut self) {
        self.register("constant", |d| Arc::new(ConstantDelay::new(d)));
        self.register("switch", |d| Arc::new(ConstantDelay::new(d)));
        self.register("macsec", |_| Arc::new(MacsecRegression));
        self.register("macsec-regression", |_| Arc::new(MacsecRegression));
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(SimTime) -> Arc<dyn ProcessingDelay> + Send + Sync + 'static,
    {
        self.models.insert(name.to_lowercase(), Box::new(factory));
    }

    pub fn create(&self, name: &str, delay: SimTime) -> Option<Arc<dyn ProcessingDelay>> {
        self.models
            .get(&name.to_lowercase())
            .map(|factory| factory(delay))
    }

    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.models.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn global() -> &'static LatencyRegistry {
        use std::sync::OnceLock;
        static REGISTRY: OnceLock<LatencyRegistry> = OnceLock::new();
        REGISTRY.get_or_init(LatencyRegistry::new)
    }
}

impl Default for LatencyRegistry {
    fn default() -> Self {
        Self::new()
    }
}
