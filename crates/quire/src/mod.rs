//! quire: documentation pipeline for C/C++ libraries
//!
//! A build runs three stages in strict order:
//! - the **extractor** scans public headers and their documentation comments
//!   into a [`SymbolTree`]
//! - the **translator** turns the tree into linked API pages (Markdown with
//!   TOML front matter) under the containment folder
//! - the **renderer** renders the API pages together with the hand-written
//!   narrative documents into an HTML site and, optionally, a LaTeX document
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │ include/*.hpp   │
//! └────────┬────────┘
//!          ▼
//!   ┌──────────────┐    symbols.json
//!   │  SymbolTree  │───────────────▶
//!   └──────┬───────┘
//!          ▼
//!   ┌──────────────┐    ┌──────────────┐
//!   │   PageSet    │    │ narrative md │
//!   └──────┬───────┘    └──────┬───────┘
//!          └─────────┬─────────┘
//!                    ▼
//!          ┌──────────────────┐
//!          │  DocumentGraph   │
//!          └────────┬─────────┘
//!          ┌────────┴────────┐
//!          ▼                 ▼
//!     ┌─────────┐       ┌─────────┐
//!     │  HTML   │       │  LaTeX  │
//!     └─────────┘       └─────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use quire::{Pipeline, ProjectPaths, QuireConfig};
//! use std::path::Path;
//!
//! let root = Path::new("docs");
//! let config = QuireConfig::load(root)?;
//! let paths = ProjectPaths::new(root, &config);
//! let report = Pipeline::new(&config, &paths).build()?;
//! println!("{} documents", report.documents);
//! # Ok::<(), quire::QuireError>(())
//! ```

// Configuration and errors
pub mod config;
pub mod diagnostics;

// Extracted symbols
pub mod doc_comment;
pub mod extractor;
pub mod inventory;
pub mod role;
pub mod symbol;

// Stages
pub mod pipeline;
pub mod renderer;
pub mod translator;

pub mod printer;
pub mod utils;

// Re-exports for convenience
pub use config::{Extension, ExtensionSet, ProjectPaths, QuireConfig, CONFIG_FILE_NAME};
pub use diagnostics::{Diagnostic, DiagnosticSeverity, DiagnosticsCollector, QuireError, QuireResult};
pub use doc_comment::DocComment;
pub use extractor::{load_symbols, scan_header, write_symbols, Extractor};
pub use inventory::{Inventory, InventoryEntry};
pub use symbol::{Location, Symbol, SymbolKind, SymbolTree};

// Terminal output
pub use printer::SymbolPrinter;

pub use pipeline::{BuildLock, BuildOptions, BuildReport, BuildState, ExtractReport, Pipeline};
pub use renderer::{RenderOutput, Renderer, Theme};
pub use translator::{FrontMatter, Page, PageSet, Translation, Translator};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
