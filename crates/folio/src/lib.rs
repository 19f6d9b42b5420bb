// Folio library exports

pub mod autosave;
pub mod command_processor;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod page;
pub mod settings;
pub mod snapshot;

pub use autosave::Autosave;
pub use command_processor::CommandProcessor;
pub use config::Config;
pub use document::{Document, DocumentEvent, DocumentListener, DocumentState};
pub use engine::{Cursor, HtmlEngine, RichTextEngine};
pub use error::{DocumentError, EngineError};
pub use page::{Page, PageId, PageStore};
pub use settings::{DecorationSettings, MarginPreset, MarginSide, Margins, Zoom};
pub use snapshot::{DocumentSnapshot, SnapshotManager};
