//! Client core for the analytics platform's ReportPack management interface.
//!
//! This crate authenticates against the platform's admin web tier, drives the
//! management SOAP service to list, download, upload and delete report packs,
//! and converts between unpacked report pack directories and `.arp` archives.

pub mod admin;
pub mod archive;
pub mod client;
pub mod config;
pub mod error;
pub mod facade;
pub mod model;
pub mod session;
pub mod soap;

pub use client::RemoteClient;
pub use config::{ClientConfig, Endpoints};
pub use error::{Error, Result};
pub use facade::{RemoteObjects, ReportPacks};
pub use model::{FetchedReportPack, ReportPackSummary, StoredReportPack};
pub use session::{Credentials, Session};
