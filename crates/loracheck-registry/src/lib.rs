//! Device registry gateways for loracheck.
//!
//! - [`IotHubRegistry`]: Azure IoT Hub REST API, authenticated with a
//!   shared-access-signature derived from a hub connection string
//! - [`InMemoryRegistry`]: process-local registry for tests and embedding
//!
//! Both implement [`loracheck_core::RegistryGateway`].

pub mod connection;
pub mod iothub;
pub mod memory;
pub mod sas;

pub use connection::{ConnectionString, ConnectionStringError};
pub use iothub::{IotHubConfig, IotHubRegistry, API_VERSION};
pub use memory::InMemoryRegistry;
pub use sas::SasTokenProvider;
