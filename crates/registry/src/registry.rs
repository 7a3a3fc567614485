//! The adapter registry.

use std::sync::Arc;

use gpumap_platform_core::{
    display_adapters, Adapter, AdapterInfo, GraphicsApi, HardwareId, Output, OutputInfo,
    ResourceFactory, TelemetryApi,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::RegistryError;
use crate::handle::{next_serial, AdapterHandle, OutputHandle, MAX_SLOTS};

/// Output id returned when no output matches.
pub const NO_OUTPUT: i16 = -1;

struct OwnedOutput {
    output: Box<dyn Output>,
    /// Index of the adapter that reported this output.
    adapter: usize,
}

/// Owns every adapter and output discovered in one enumeration pass.
///
/// Adapters keep the order the display subsystem reported them in (minus
/// the ones that failed to initialize). Outputs form one flat list across
/// all adapters, grouped by adapter in the same order.
pub struct AdapterRegistry {
    factory: Box<dyn ResourceFactory>,
    serial: u32,
    initialized: bool,
    graphics: Option<Arc<dyn GraphicsApi>>,
    telemetry: Option<Arc<dyn TelemetryApi>>,
    adapters: Vec<Box<dyn Adapter>>,
    outputs: Vec<OwnedOutput>,
}

impl AdapterRegistry {
    pub fn new(factory: impl ResourceFactory + 'static) -> Self {
        Self::with_factory(Box::new(factory))
    }

    pub fn with_factory(factory: Box<dyn ResourceFactory>) -> Self {
        Self {
            factory,
            serial: next_serial(),
            initialized: false,
            graphics: None,
            telemetry: None,
            adapters: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Enumerate adapters and outputs.
    ///
    /// Fails without touching any state when the display subsystem cannot be
    /// opened or the graphics API is unavailable; the call may then be
    /// repeated. Once enumeration has run the registry is final, and it
    /// fails with [`RegistryError::NoAdapters`] if nothing survived.
    pub fn initialize(&mut self) -> Result<(), RegistryError> {
        if self.initialized {
            return Err(RegistryError::AlreadyInitialized);
        }

        let Some(enumerator) = self.factory.create_display_enumerator() else {
            warn!("Display subsystem is not accessible");
            return Err(RegistryError::DisplaySubsystemUnavailable);
        };

        let graphics = self.factory.create_graphics_api();
        if !graphics.is_available() {
            warn!(api = graphics.name(), "Graphics API is not available");
            return Err(RegistryError::GraphicsApiUnavailable {
                api: graphics.name().to_string(),
            });
        }

        let telemetry = self.factory.create_telemetry();
        if telemetry.is_available() {
            info!(api = telemetry.name(), "Telemetry loaded and initialized successfully");
        }

        self.initialized = true;
        let mut discarded = 0usize;

        for (index, entry) in display_adapters(enumerator.as_ref()).enumerate() {
            if self.adapters.len() > MAX_SLOTS {
                warn!(index, "Adapter limit reached, ignoring remaining adapters");
                break;
            }

            let mut adapter = self
                .factory
                .create_adapter(graphics.clone(), telemetry.clone());
            let mut staged: Vec<Box<dyn Output>> = Vec::new();

            if !adapter.initialize(&entry, &mut staged) {
                debug!(index, adapter = %entry.description, "Discarding adapter");
            } else if !outputs_fit(self.outputs.len(), staged.len()) {
                warn!(
                    index,
                    adapter = %entry.description,
                    outputs = staged.len(),
                    "Output limit reached, discarding initialized adapter"
                );
            } else {
                let owner = self.adapters.len();
                debug!(
                    index,
                    adapter = %entry.description,
                    outputs = staged.len(),
                    "Adapter initialized"
                );
                self.outputs.extend(
                    staged
                        .into_iter()
                        .map(|output| OwnedOutput { output, adapter: owner }),
                );
                self.adapters.push(adapter);
                continue;
            }

            discarded += 1;
            // outputs go before the adapter that produced them
            drop(staged);
            drop(adapter);
        }

        self.graphics = Some(graphics);
        self.telemetry = Some(telemetry);

        if self.adapters.is_empty() {
            warn!(discarded, "No usable adapters found");
            return Err(RegistryError::NoAdapters { discarded });
        }

        info!(
            adapters = self.adapters.len(),
            outputs = self.outputs.len(),
            discarded,
            "Adapter registry initialized"
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Graphics-API client the adapters were built with.
    pub fn graphics_api(&self) -> Option<&Arc<dyn GraphicsApi>> {
        self.graphics.as_ref()
    }

    /// Telemetry client the adapters were built with, available or not.
    pub fn telemetry(&self) -> Option<&Arc<dyn TelemetryApi>> {
        self.telemetry.as_ref()
    }

    pub fn adapter_count(&self) -> usize {
        self.adapters.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// First adapter in enumeration order.
    pub fn first_adapter(&self) -> Result<AdapterHandle, RegistryError> {
        self.adapter_at(0).ok_or(RegistryError::Empty)
    }

    pub fn adapter_at(&self, index: usize) -> Option<AdapterHandle> {
        (index < self.adapters.len()).then(|| AdapterHandle::new(self.serial, index))
    }

    /// First adapter reporting exactly `id`. Adapters without an id never match.
    pub fn adapter_by_hardware_id(&self, id: HardwareId) -> Option<AdapterHandle> {
        self.adapters
            .iter()
            .position(|adapter| adapter.hardware_id() == Some(id))
            .map(|index| AdapterHandle::new(self.serial, index))
    }

    /// Whether `handle` names an adapter this registry currently owns.
    pub fn is_adapter(&self, handle: AdapterHandle) -> bool {
        handle.registry() == self.serial && handle.index() < self.adapters.len()
    }

    /// Resolve a handle. Foreign and stale handles resolve to `None`.
    pub fn adapter(&self, handle: AdapterHandle) -> Option<&dyn Adapter> {
        if handle.registry() != self.serial {
            return None;
        }
        self.adapters.get(handle.index()).map(|adapter| &**adapter)
    }

    pub fn output_at(&self, index: usize) -> Option<OutputHandle> {
        (index < self.outputs.len()).then(|| OutputHandle::new(self.serial, index))
    }

    /// Whether `handle` names an output this registry currently owns.
    pub fn is_output(&self, handle: OutputHandle) -> bool {
        handle.registry() == self.serial && handle.index() < self.outputs.len()
    }

    pub fn output(&self, handle: OutputHandle) -> Option<&dyn Output> {
        if handle.registry() != self.serial {
            return None;
        }
        self.outputs.get(handle.index()).map(|slot| &*slot.output)
    }

    /// Adapter that reported `handle`.
    pub fn output_adapter(&self, handle: OutputHandle) -> Option<AdapterHandle> {
        if !self.is_output(handle) {
            return None;
        }
        let owner = self.outputs[handle.index()].adapter;
        Some(AdapterHandle::new(self.serial, owner))
    }

    /// Outputs reported by `handle`, in registry order. Empty for foreign handles.
    pub fn outputs_of(&self, handle: AdapterHandle) -> impl Iterator<Item = OutputHandle> + '_ {
        let owner = self.is_adapter(handle).then(|| handle.index());
        self.outputs
            .iter()
            .enumerate()
            .filter(move |(_, slot)| Some(slot.adapter) == owner)
            .map(move |(index, _)| OutputHandle::new(self.serial, index))
    }

    pub fn adapters(&self) -> impl Iterator<Item = (AdapterHandle, &dyn Adapter)> + '_ {
        self.adapters
            .iter()
            .enumerate()
            .map(move |(index, adapter)| (AdapterHandle::new(self.serial, index), &**adapter))
    }

    pub fn outputs(&self) -> impl Iterator<Item = (OutputHandle, &dyn Output)> + '_ {
        self.outputs
            .iter()
            .enumerate()
            .map(move |(index, slot)| (OutputHandle::new(self.serial, index), &*slot.output))
    }

    /// Index of the first output flagged primary.
    pub fn primary_output_index(&self) -> Option<usize> {
        self.outputs.iter().position(|slot| slot.output.is_primary())
    }

    /// Index of the first output whose device name equals `name` exactly.
    pub fn output_index(&self, name: &str) -> Option<usize> {
        self.outputs
            .iter()
            .position(|slot| slot.output.device_name() == name)
    }

    /// [`primary_output_index`](Self::primary_output_index) as a signed id,
    /// [`NO_OUTPUT`] when there is none.
    pub fn primary_output_id(&self) -> i16 {
        to_output_id(self.primary_output_index())
    }

    /// [`output_index`](Self::output_index) as a signed id, [`NO_OUTPUT`]
    /// when there is none.
    pub fn output_id(&self, name: &str) -> i16 {
        to_output_id(self.output_index(name))
    }

    /// Serializable view of everything the registry owns.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let adapters = self
            .adapters
            .iter()
            .enumerate()
            .map(|(index, adapter)| AdapterEntry {
                index,
                info: adapter.info(),
                outputs: self
                    .outputs
                    .iter()
                    .enumerate()
                    .filter(|(_, slot)| slot.adapter == index)
                    .map(|(output, _)| output)
                    .collect(),
            })
            .collect();

        let outputs = self
            .outputs
            .iter()
            .enumerate()
            .map(|(index, slot)| OutputEntry {
                index,
                adapter: slot.adapter,
                info: slot.output.info(),
            })
            .collect();

        RegistrySnapshot {
            adapters,
            outputs,
            primary_output: self.primary_output_index(),
        }
    }

    /// Release all outputs, then all adapters, then the probe clients.
    ///
    /// Safe to call more than once; afterwards the registry reads as empty
    /// and every previously issued handle fails validation.
    pub fn teardown(&mut self) {
        if !self.outputs.is_empty() || !self.adapters.is_empty() {
            debug!(
                adapters = self.adapters.len(),
                outputs = self.outputs.len(),
                "Tearing down adapter registry"
            );
        }
        self.outputs.clear();
        self.adapters.clear();
        self.graphics = None;
        self.telemetry = None;
    }
}

impl Drop for AdapterRegistry {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Whether `staged` more outputs still get encodable handles.
fn outputs_fit(owned: usize, staged: usize) -> bool {
    owned
        .checked_add(staged)
        .is_some_and(|total| total <= MAX_SLOTS + 1)
}

fn to_output_id(index: Option<usize>) -> i16 {
    index
        .and_then(|index| i16::try_from(index).ok())
        .unwrap_or(NO_OUTPUT)
}

/// Everything a registry owns, as plain data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub adapters: Vec<AdapterEntry>,
    pub outputs: Vec<OutputEntry>,
    pub primary_output: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterEntry {
    pub index: usize,
    pub info: AdapterInfo,
    /// Indices into [`RegistrySnapshot::outputs`].
    pub outputs: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputEntry {
    pub index: usize,
    pub adapter: usize,
    pub info: OutputInfo,
}

#[cfg(test)]
mod tests {
    use std::fmt::{self, Write as _};
    use std::sync::Mutex;

    use gpumap_platform_core::{
        AdapterDescriptor, DisplayEnumerator, OutputDescriptor, PciAddress, PhysicalDevice,
        TelemetryDevice, Vendor,
    };

    use super::*;

    type Log = Arc<Mutex<Vec<String>>>;

    /// Collects every event as `field=value` text.
    #[derive(Clone, Default)]
    struct Events(Log);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for Events {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let mut line = String::new();
            event.record(&mut Fields(&mut line));
            self.0.lock().unwrap().push(line);
        }
    }

    struct Fields<'a>(&'a mut String);

    impl tracing::field::Visit for Fields<'_> {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
            let _ = write!(self.0, "{}={:?} ", field.name(), value);
        }
    }

    fn initialize_capturing(registry: &mut AdapterRegistry) -> Vec<String> {
        use tracing_subscriber::layer::SubscriberExt;

        let events = Events::default();
        let subscriber = tracing_subscriber::registry().with(events.clone());
        tracing::subscriber::with_default(subscriber, || registry.initialize().unwrap());
        let lines = events.0.lock().unwrap().clone();
        lines
    }

    /// Factory whose adapters succeed unless their description starts with
    /// "fail", and which records every drop.
    struct Scripted {
        entries: Vec<AdapterDescriptor>,
        display: bool,
        graphics: bool,
        telemetry: bool,
        log: Log,
    }

    impl Scripted {
        fn new(entries: Vec<AdapterDescriptor>) -> Self {
            Self {
                entries,
                display: true,
                graphics: true,
                telemetry: true,
                log: Arc::default(),
            }
        }
    }

    struct Entries(Vec<AdapterDescriptor>);

    impl DisplayEnumerator for Entries {
        fn adapter_at(&self, index: u32) -> Option<AdapterDescriptor> {
            self.0.get(index as usize).cloned()
        }
    }

    struct Probe(bool);

    impl GraphicsApi for Probe {
        fn is_available(&self) -> bool {
            self.0
        }

        fn name(&self) -> &str {
            "probe"
        }

        fn physical_devices(&self) -> Vec<PhysicalDevice> {
            Vec::new()
        }
    }

    impl TelemetryApi for Probe {
        fn is_available(&self) -> bool {
            self.0
        }

        fn name(&self) -> &str {
            "probe"
        }

        fn device(&self, _pci: &PciAddress) -> Option<TelemetryDevice> {
            None
        }
    }

    struct TrackedAdapter {
        name: String,
        id: Option<HardwareId>,
        log: Log,
    }

    impl Adapter for TrackedAdapter {
        fn initialize(
            &mut self,
            entry: &AdapterDescriptor,
            outputs: &mut Vec<Box<dyn Output>>,
        ) -> bool {
            self.name = entry.description.clone();
            self.id = entry.hardware_id;
            for output in &entry.outputs {
                outputs.push(Box::new(TrackedOutput {
                    name: output.device_name.clone(),
                    primary: output.primary,
                    log: self.log.clone(),
                }));
            }
            !self.name.starts_with("fail")
        }

        fn hardware_id(&self) -> Option<HardwareId> {
            self.id
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn info(&self) -> AdapterInfo {
            AdapterInfo {
                name: self.name.clone(),
                vendor: Vendor::Other(0),
                vendor_id: 0,
                device_id: 0,
                hardware_id: self.id,
                pci: None,
                driver: None,
                driver_version: None,
                telemetry: None,
            }
        }
    }

    impl Drop for TrackedAdapter {
        fn drop(&mut self) {
            self.log.lock().unwrap().push(format!("adapter:{}", self.name));
        }
    }

    struct TrackedOutput {
        name: String,
        primary: bool,
        log: Log,
    }

    impl Output for TrackedOutput {
        fn device_name(&self) -> &str {
            &self.name
        }

        fn is_primary(&self) -> bool {
            self.primary
        }
    }

    impl Drop for TrackedOutput {
        fn drop(&mut self) {
            self.log.lock().unwrap().push(format!("output:{}", self.name));
        }
    }

    impl ResourceFactory for Scripted {
        fn create_display_enumerator(&self) -> Option<Box<dyn DisplayEnumerator>> {
            if !self.display {
                return None;
            }
            Some(Box::new(Entries(self.entries.clone())))
        }

        fn create_graphics_api(&self) -> Arc<dyn GraphicsApi> {
            Arc::new(Probe(self.graphics))
        }

        fn create_telemetry(&self) -> Arc<dyn TelemetryApi> {
            Arc::new(Probe(self.telemetry))
        }

        fn create_adapter(
            &self,
            _graphics: Arc<dyn GraphicsApi>,
            _telemetry: Arc<dyn TelemetryApi>,
        ) -> Box<dyn Adapter> {
            Box::new(TrackedAdapter {
                name: String::new(),
                id: None,
                log: self.log.clone(),
            })
        }
    }

    fn entry(name: &str, outputs: &[(&str, bool)]) -> AdapterDescriptor {
        outputs.iter().fold(AdapterDescriptor::new(name, 0, 0), |d, (n, p)| {
            d.with_output(OutputDescriptor::new(*n, *p))
        })
    }

    #[test]
    fn failed_adapter_outputs_never_reach_the_registry() {
        let factory = Scripted::new(vec![
            entry("a", &[("A1", false)]),
            entry("fail-b", &[("B1", true)]),
            entry("c", &[("C1", false), ("C2", false)]),
        ]);
        let log = factory.log.clone();
        let mut registry = AdapterRegistry::new(factory);

        registry.initialize().unwrap();

        assert_eq!(registry.adapter_count(), 2);
        assert_eq!(registry.output_count(), 3);
        assert_eq!(registry.output_id("B1"), NO_OUTPUT);
        assert_eq!(registry.primary_output_id(), NO_OUTPUT);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["output:B1".to_string(), "adapter:fail-b".to_string()]
        );
    }

    #[test]
    fn teardown_releases_outputs_before_adapters() {
        let factory = Scripted::new(vec![
            entry("a", &[("A1", true)]),
            entry("b", &[("B1", false)]),
        ]);
        let log = factory.log.clone();
        let mut registry = AdapterRegistry::new(factory);
        registry.initialize().unwrap();

        registry.teardown();

        let log = log.lock().unwrap();
        assert_eq!(
            *log,
            vec!["output:A1", "output:B1", "adapter:a", "adapter:b"]
        );
    }

    #[test]
    fn teardown_twice_is_a_no_op() {
        let factory = Scripted::new(vec![entry("a", &[("A1", true)])]);
        let log = factory.log.clone();
        let mut registry = AdapterRegistry::new(factory);
        registry.initialize().unwrap();

        registry.teardown();
        registry.teardown();
        drop(registry);

        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn handles_fail_validation_after_teardown() {
        let mut registry = AdapterRegistry::new(Scripted::new(vec![entry("a", &[("A1", true)])]));
        registry.initialize().unwrap();
        let adapter = registry.first_adapter().unwrap();
        let output = registry.output_at(0).unwrap();

        registry.teardown();

        assert!(!registry.is_adapter(adapter));
        assert!(!registry.is_output(output));
        assert!(registry.adapter(adapter).is_none());
        assert_eq!(registry.adapter_count(), 0);
        assert_eq!(registry.first_adapter(), Err(RegistryError::Empty));
    }

    #[test]
    fn missing_display_subsystem_mutates_nothing() {
        let mut factory = Scripted::new(vec![entry("a", &[])]);
        factory.display = false;
        let mut registry = AdapterRegistry::new(factory);

        assert_eq!(
            registry.initialize(),
            Err(RegistryError::DisplaySubsystemUnavailable)
        );
        assert!(!registry.is_initialized());
        assert!(registry.graphics_api().is_none());
        assert_eq!(registry.adapter_count(), 0);
    }

    #[test]
    fn unavailable_graphics_api_is_fatal() {
        let mut factory = Scripted::new(vec![entry("a", &[])]);
        factory.graphics = false;
        let mut registry = AdapterRegistry::new(factory);

        assert!(matches!(
            registry.initialize(),
            Err(RegistryError::GraphicsApiUnavailable { .. })
        ));
        assert_eq!(registry.adapter_count(), 0);
    }

    #[test]
    fn unavailable_telemetry_is_tolerated() {
        let mut factory = Scripted::new(vec![entry("a", &[])]);
        factory.telemetry = false;
        let mut registry = AdapterRegistry::new(factory);

        registry.initialize().unwrap();
        assert_eq!(registry.adapter_count(), 1);
        assert!(!registry.telemetry().unwrap().is_available());
    }

    #[test]
    fn output_limit_counts_every_slot() {
        assert!(outputs_fit(0, 0));
        assert!(outputs_fit(MAX_SLOTS, 1));
        assert!(!outputs_fit(MAX_SLOTS, 2));
        assert!(!outputs_fit(usize::MAX, 1));
    }

    #[test]
    fn unavailable_telemetry_logs_nothing() {
        let mut factory = Scripted::new(vec![entry("a", &[])]);
        factory.telemetry = false;
        let mut registry = AdapterRegistry::new(factory);

        let events = initialize_capturing(&mut registry);
        assert!(!events.is_empty());
        assert!(events.iter().all(|line| !line.contains("Telemetry")));
    }

    #[test]
    fn available_telemetry_logs_success() {
        let mut registry = AdapterRegistry::new(Scripted::new(vec![entry("a", &[])]));

        let events = initialize_capturing(&mut registry);
        let telemetry: Vec<_> = events.iter().filter(|line| line.contains("Telemetry")).collect();
        assert_eq!(telemetry.len(), 1);
        assert!(telemetry[0].contains("initialized successfully"));
    }

    #[test]
    fn second_initialize_is_rejected() {
        let mut registry = AdapterRegistry::new(Scripted::new(vec![entry("a", &[])]));
        registry.initialize().unwrap();
        assert_eq!(registry.initialize(), Err(RegistryError::AlreadyInitialized));
        assert_eq!(registry.adapter_count(), 1);
    }

    #[test]
    fn all_adapters_failing_reports_discards() {
        let mut registry = AdapterRegistry::new(Scripted::new(vec![
            entry("fail-a", &[]),
            entry("fail-b", &[]),
        ]));
        assert_eq!(
            registry.initialize(),
            Err(RegistryError::NoAdapters { discarded: 2 })
        );
        assert_eq!(registry.adapter_count(), 0);
        assert_eq!(registry.output_count(), 0);
    }

    #[test]
    fn output_parents_and_children_agree() {
        let mut registry = AdapterRegistry::new(Scripted::new(vec![
            entry("a", &[("A1", false)]),
            entry("b", &[("B1", false), ("B2", true)]),
        ]));
        registry.initialize().unwrap();

        let b = registry.adapter_at(1).unwrap();
        let children: Vec<_> = registry.outputs_of(b).map(|o| o.index()).collect();
        assert_eq!(children, vec![1, 2]);
        for child in registry.outputs_of(b) {
            assert_eq!(registry.output_adapter(child), Some(b));
        }
        assert_eq!(registry.primary_output_id(), 2);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.adapters[1].outputs, vec![1, 2]);
        assert_eq!(snapshot.outputs[0].adapter, 0);
        assert_eq!(snapshot.primary_output, Some(2));
    }

    #[test]
    fn handles_from_another_registry_are_foreign() {
        let mut first = AdapterRegistry::new(Scripted::new(vec![entry("a", &[("A1", true)])]));
        let mut second = AdapterRegistry::new(Scripted::new(vec![entry("a", &[("A1", true)])]));
        first.initialize().unwrap();
        second.initialize().unwrap();

        let handle = first.first_adapter().unwrap();
        assert!(first.is_adapter(handle));
        assert!(!second.is_adapter(handle));
        assert!(second.adapter(handle).is_none());
        assert!(!second.is_output(first.output_at(0).unwrap()));
    }

    #[test]
    fn output_id_saturates_to_none_beyond_i16() {
        assert_eq!(to_output_id(Some(5)), 5);
        assert_eq!(to_output_id(Some(40_000)), NO_OUTPUT);
        assert_eq!(to_output_id(None), NO_OUTPUT);
    }
}
