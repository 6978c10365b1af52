//! # netconfig-audit
//!
//! A local-first ingestion and comparison harness for network device
//! configurations.
//!
//! netconfig-audit ingests configuration exports (Cisco IOS/IOS-XE, Aruba
//! AOS-CX and similar), masks secrets, splits the text into
//! indentation-delimited blocks with inferred vendor/hostname metadata, and
//! aligns golden against candidate configurations into deterministic diff
//! tables or narrative audit reports, via a CLI and a JSON HTTP server.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────┐
//! │   Extract   │──▶│ Redact+Parse │──▶│  SQLite  │
//! │ cfg/txt/pdf │   │  +Metadata   │   │   FTS5   │
//! └─────────────┘   └──────────────┘   └────┬─────┘
//!                                           │
//!                       ┌───────────────────┤
//!                       ▼                   ▼
//!                  ┌──────────┐       ┌──────────┐
//!                  │   CLI    │       │   HTTP   │
//!                  │  (nca)   │       │  (JSON)  │
//!                  └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! nca init                                  # create config + database
//! nca ingest ./golden.cfg --role golden     # ingest the reference config
//! nca ingest ./device.cfg --role candidate  # ingest the device export
//! nca compare "Compare 'device.cfg' against 'golden.cfg'. Focus on VLANs."
//! nca serve                                 # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`extract`] | Text extraction from plain and PDF files |
//! | [`redact`] | Secret masking |
//! | [`parser`] | Indentation-based block splitting |
//! | [`metadata`] | Vendor, OS family, and hostname inference |
//! | [`store`] | Block storage and FTS5 retrieval |
//! | [`compare`] | Block alignment and diff classification |
//! | [`narrative`] | Narrative generator abstraction |
//! | [`chat`] | Ask and compare orchestration |
//! | [`server`] | JSON HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chat;
pub mod compare;
pub mod config;
pub mod db;
pub mod extract;
pub mod files;
pub mod ingest;
pub mod metadata;
pub mod migrate;
pub mod models;
pub mod narrative;
pub mod parser;
pub mod redact;
pub mod server;
pub mod show;
pub mod store;
