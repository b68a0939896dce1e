use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;

/// Stable identity of a registered metric: name plus label set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MetricId {
    pub name: String,
    pub labels: Vec<(String, String)>,
}

impl MetricId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: Vec::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push((key.into(), value.into()));
        self
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Polled by the registry at scrape time. `None` means "no data yet".
pub type GaugeProbe = Box<dyn Fn() -> Option<f64> + Send + Sync>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("metric already registered: {0}")]
    Duplicate(String),

    #[error("registry rejected metric: {0}")]
    Rejected(String),
}

/// External metrics registry a keeper publishes its gauges to.
pub trait MetricsRegistry {
    fn register_gauge(&self, id: MetricId, probe: GaugeProbe) -> Result<(), RegistryError>;

    /// Remove a gauge; returns whether it was registered.
    fn unregister_gauge(&self, id: &MetricId) -> bool;
}

/// In-memory registry; polls every gauge on [`SimpleRegistry::scrape`].
#[derive(Default)]
pub struct SimpleRegistry {
    gauges: Mutex<IndexMap<MetricId, GaugeProbe>>,
}

impl SimpleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.gauges.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current value of one gauge; outer `None` if it is not registered.
    pub fn value(&self, id: &MetricId) -> Option<Option<f64>> {
        self.gauges.lock().get(id).map(|probe| probe())
    }

    pub fn scrape(&self) -> Vec<(MetricId, Option<f64>)> {
        self.gauges
            .lock()
            .iter()
            .map(|(id, probe)| (id.clone(), probe()))
            .collect()
    }
}

impl MetricsRegistry for SimpleRegistry {
    fn register_gauge(&self, id: MetricId, probe: GaugeProbe) -> Result<(), RegistryError> {
        let mut gauges = self.gauges.lock();
        if gauges.contains_key(&id) {
            return Err(RegistryError::Duplicate(id.name));
        }
        gauges.insert(id, probe);
        Ok(())
    }

    fn unregister_gauge(&self, id: &MetricId) -> bool {
        self.gauges.lock().shift_remove(id).is_some()
    }
}
