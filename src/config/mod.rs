//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! network file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (referential and value checks)
//!     → NetworkConfig (validated, immutable)
//!     → consumed once by bootstrap to build the topology
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the topology is built from it once
//! - Sections have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ChaincodeConfig, ChannelConfig, ChannelCreatorConfig, ChannelMemberConfig, NetworkConfig,
    ObservabilityConfig, OrdererConfig, OrganizationConfig, PeerConfig, RemoteConfig,
    TimeoutConfig, UserConfig,
};
pub use validation::{validate_config, ValidationError};
