//! # Chartshift
//!
//! Moves a legacy application store into Kubernetes custom resources:
//! categories, repositories, applications, application versions and
//! releases, with chart packages pushed to a blob store. Chart archives can
//! also be imported directly as built-in applications.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! chartshift = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::path::{Path, PathBuf};
//! use std::sync::Arc;
//! use chartshift::blob::FsBlobStore;
//! use chartshift::context::CallContext;
//! use chartshift::store::SqliteStore;
//! use chartshift::workflow::{Source, Workflow};
//!
//! let store = SqliteStore::new("./data/resources.db").unwrap();
//! store.initialize().unwrap();
//!
//! let workflow = Workflow::new(
//!     Arc::new(store),
//!     Arc::new(FsBlobStore::new(Path::new("./data/blobs"))),
//! );
//! let report = workflow
//!     .run(&CallContext::background(), &Source::LegacyDir(PathBuf::from("/tmp/op-dump")))
//!     .unwrap();
//! println!("{report}");
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes CLI module. Disable with `default-features = false`.

pub mod blob;
pub mod chart;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod legacy;
pub mod runtime;
pub mod store;
pub mod types;
pub mod workflow;
