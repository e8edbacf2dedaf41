//! Pacesync Core Library
//!
//! This crate provides the core functionality for pacesync, which keeps
//! pacenote `.ini` files from a rally simulator install in sync with
//! connected devices over WebSocket.
//!
//! # Architecture
//!
//! - **Watcher**: reports pacenote files appearing, changing and vanishing
//! - **Dispatcher**: decides which device gets which file, exactly once
//! - **Engine**: one event loop owning the dispatcher, fed by the watcher
//!   and the WebSocket server
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let (engine, handle) = Engine::new(
//!     EngineOptions { install_root: config.folder_path.clone(), ..Default::default() },
//!     Arc::new(RaceStatQuery),
//! );
//! let listener = sync::server::bind(&config.bind_address, config.port).await?;
//! engine.run(listener).await;
//! ```
//!
//! # Modules
//!
//! - `sync`: dispatcher, engine, WebSocket server and wire messages
//! - `watcher`: directory watcher with restart policy
//! - `registry`: sent-file and client-session bookkeeping
//! - `storage`: INI parsing and file access
//! - `query`: stage time lookups against `Cars.ini` and the race database
//! - `layout`: well-known paths inside a simulator install
//! - `config`: Application configuration

pub mod config;
pub mod layout;
pub mod models;
pub mod query;
pub mod registry;
pub mod storage;
pub mod sync;
pub mod watcher;

pub use config::Config;
pub use models::PacenoteFile;
pub use query::{RaceStatQuery, StageTimesQuery, StageTimesReply, StageTimesRequest};
pub use registry::{ClientRegistry, SentRegistry};
pub use storage::{FileStoreError, IniDocument};
pub use sync::{Engine, EngineHandle, EngineOptions, RedeliveryPolicy, StatusSnapshot};
pub use watcher::{DirectoryWatcher, RestartPolicy, WatchEvent};
