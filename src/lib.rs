//! # Report Analyst
//!
//! Document-grounded question answering over a fixed corpus of market
//! reports.
//!
//! Report Analyst extracts text from a directory of PDF and Office documents,
//! assembles it into one provenance-labeled context, caches that context
//! until the corpus changes, and asks a generative model to answer strictly
//! from it. When documents or the model are unavailable, a fixed market
//! overview is served instead; answering never fails.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────┐
//! │   Corpus    │──▶│  Extractor  │──▶│ ContextCache │
//! │  FS/Memory  │   │ PDF/OOXML   │   │  + Assemble  │
//! └─────────────┘   └─────────────┘   └──────┬───────┘
//!                                            │
//!                                     ┌──────▼───────┐   ┌──────────┐
//!                                     │AnswerService │──▶│  Model   │
//!                                     │ + Prompt     │   │Gemini/OAI│
//!                                     └──────┬───────┘   └──────────┘
//!                               ┌────────────┤
//!                               ▼            ▼
//!                          ┌─────────┐  ┌─────────┐
//!                          │   CLI   │  │  HTTP   │
//!                          │(analyst)│  │ (axum)  │
//!                          └─────────┘  └─────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! analyst status                          # documents found, grounding available?
//! analyst ask "What are the current market shares?"
//! analyst chat                            # interactive session
//! analyst serve                           # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Error taxonomy |
//! | [`traits`] | Document corpus trait |
//! | [`connector_fs`] | Filesystem corpus |
//! | [`connector_memory`] | In-memory corpus |
//! | [`extract`] | Text extraction (PDF, DOCX, PPTX, XLSX, text) |
//! | [`assemble`] | Context assembly |
//! | [`cache`] | Fingerprint-keyed context cache |
//! | [`prompt`] | Prompt composition |
//! | [`model`] | Generative model adapters |
//! | [`answer`] | Answer orchestration and fallback |
//! | [`server`] | HTTP server |
//! | [`logging`] | Tracing subscriber setup |

pub mod answer;
pub mod assemble;
pub mod cache;
pub mod config;
pub mod connector_fs;
pub mod connector_memory;
pub mod error;
pub mod extract;
pub mod logging;
pub mod model;
pub mod models;
pub mod prompt;
pub mod server;
pub mod traits;
