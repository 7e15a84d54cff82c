pub mod device;
pub mod registry;
pub mod service;
pub mod traits;

pub use device::{
    AccuracyCriteria, DEVICE_STRATEGY, DeviceProviders, DeviceStrategy, ProviderEvent,
    ProviderEventStream, UpdateSettings,
};
pub use registry::StrategyRegistry;
pub use service::{
    LocationRequest, LocationService, PositionStream, Priority, SERVICE_STRATEGY, ServiceFailure,
    ServiceStrategy,
};
pub use traits::{Strategy, StrategyReporter};
