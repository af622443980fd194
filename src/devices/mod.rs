pub mod builtin;
pub mod registry;
pub mod schema;
pub mod store;
pub mod types;

pub use builtin::BuiltinDevice;
pub use registry::{DeviceRegistry, Persisted};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use types::{DeviceDefinition, DeviceFrameImage, DeviceRef, NewDevice, ScreenRegion};
