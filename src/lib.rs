//! # hostel-search
//!
//! A small semantic search API over a catalogue of hostels. A free-text
//! query is embedded by a remote model, matched against a precomputed flat
//! vector index, and the nearest hits are hydrated from a document store.
//!
//! ## Request Pipeline
//!
//! ```text
//!     POST /api/search {"query": "..."}
//!                 │
//!                 ▼
//!        ┌─────────────────┐   blank      400 Query cannot be empty
//!        │  Trim/validate  │ ──────────▶
//!        └────────┬────────┘
//!                 ▼
//!        ┌─────────────────┐   not loaded 500 index unavailable
//!        │  Index guard    │ ──────────▶
//!        └────────┬────────┘
//!                 ▼
//!        ┌─────────────────┐   failure    500 embedding failure
//!        │  Embed query    │ ──────────▶
//!        └────────┬────────┘
//!                 ▼
//!        ┌─────────────────┐   slot 0 = -1
//!        │  Flat search k=5│ ──────────▶ 200 No matching hostels found
//!        └────────┬────────┘
//!                 ▼
//!        ┌─────────────────┐
//!        │ ids → records   │  out-of-range / missing are dropped and counted
//!        └────────┬────────┘
//!                 ▼
//!        ┌─────────────────┐
//!        │ Shape + default │ ──────────▶ 200 [HostelSummary; ≤5]
//!        └─────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for server, index files, embeddings and store
//! - [`models`] - Request/response types and record shaping
//! - [`error`] - `SearchError`, the failure taxonomy of a request
//! - [`llm::embeddings`] - `Embedder` trait and Gemini / Ollama / OpenAI HTTP clients
//! - [`search::index`] - FAISS flat index reader and exact k-NN search
//! - [`search::ids`] - `.npy` position → record id array
//! - [`search::locate`] - Startup discovery of the index files across candidate directories
//! - [`search::pipeline`] - The per-request search pipeline
//! - [`store`] - `RecordStore` trait with MongoDB and JSON-file backends
//! - [`api`] - Axum routes, CORS and HTTP error mapping
//! - [`state`] - Shared application state handed to every request

pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod search;
pub mod state;
pub mod store;
