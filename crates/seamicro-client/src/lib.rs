//! # seamicro-client
//!
//! Resource managers for the SeaMicro chassis REST API (v2.0).
//!
//! [`ChassisClient`] bundles one manager per collection on a shared
//! transport from `seamicro-core`:
//!
//! - [`servers`] - power, VLAN, vdisk and boot order operations
//! - [`storage`] - pools, volumes and disks
//! - [`chassis`] - system, fan trays, power supplies, storage and management cards
//! - [`interfaces`] - switch interfaces and their VLANs
//! - [`models`] - typed records for resource attributes
//!
//! Resources returned by a manager act on themselves through the
//! per-kind extension traits, e.g. [`ServerExt`]:
//!
//! ```no_run
//! use seamicro_client::{ChassisClientBuilder, Filters, ServerExt};
//!
//! # async fn demo() -> seamicro_client::Result<()> {
//! let client = ChassisClientBuilder::new("https://chassis.example.com/v2.0", "admin", "seamicro")?
//!     .build()?;
//! let pools = client
//!     .pools()
//!     .findall(&Filters::new().le("freeSize", 500))
//!     .await?;
//! client.servers().power_off("0/0", true).await?;
//! for server in client.servers().list(None).await? {
//!     server.power_on(false).await?;
//! }
//! # drop(pools);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[macro_use]
mod macros;

pub mod chassis;
pub mod client;
pub mod interfaces;
pub mod models;
pub mod servers;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use client::{client_for_version, ChassisClient, ChassisClientBuilder, SUPPORTED_VERSIONS};
pub use seamicro_core::{AuthMode, ChassisConfig, Created, Error, Filters, Resource, ResourceId};
pub use chassis::{ChassisExt, ScardExt, SystemExt};
pub use interfaces::InterfaceExt;
pub use servers::{PowerState, Server, ServerExt, ServerManager};
pub use storage::{Disk, DiskExt, Pool, Volume, VolumeExt};

/// Result alias over the shared chassis error type.
pub type Result<T> = seamicro_core::Result<T>;
