//! Configuration loading and env substitution.
//!
//! Config files: `zapcrm.toml`, `zapcrm.yaml`, or `zapcrm.json`.
//! Searched in `./` then `~/.config/zapcrm/`.
//!
//! Supports `${ENV_VAR}` substitution in the raw config text.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{config_dir, discover_and_load, load_config},
    schema::{
        ClassifierConfig, DatabaseConfig, GatewayConfig, SessionConfig, TransportSessionConfig,
        ZapcrmConfig,
    },
};
