//! The paginated document: page store, decoration settings and the single
//! live editing surface, kept in step with each other.
//!
//! Every operation runs to completion before returning, and listeners are
//! told about it afterwards. The engine is only reachable mutably through
//! [`Document::edit`], so no change to the surface can skip the page store.

use pagecore::marker::{self, PAGE_BREAK};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::engine::{HtmlEngine, RichTextEngine};
use crate::error::DocumentError;
use crate::page::{Page, PageId, PageStore};
use crate::settings::DecorationSettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    PageAdded { id: PageId },
    PageDeleted { id: PageId, current: PageId },
    PageSwitched { from: PageId, to: PageId },
    ContentChanged { id: PageId },
    PageBreakInserted { id: PageId },
    SettingsChanged,
    Restored,
}

/// Receives change notifications from a [`Document`].
pub trait DocumentListener {
    fn on_event(&mut self, event: &DocumentEvent);
}

impl<F: FnMut(&DocumentEvent)> DocumentListener for F {
    fn on_event(&mut self, event: &DocumentEvent) {
        self(event)
    }
}

/// Everything needed to rebuild a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentState {
    pub pages: Vec<Page>,
    pub current_page_id: PageId,
    #[serde(default)]
    pub last_page_id: Option<PageId>,
    #[serde(default)]
    pub settings: DecorationSettings,
}

pub struct Document<E: RichTextEngine> {
    store: PageStore,
    engine: E,
    settings: DecorationSettings,
    listeners: Vec<Box<dyn DocumentListener>>,
}

impl<E: RichTextEngine> Document<E> {
    /// Start a document with one page holding `template`, bound to `engine`.
    pub fn new(engine: E, template: impl Into<String>) -> Self {
        Self::from_store(engine, PageStore::new(template), DecorationSettings::default())
    }

    pub fn restore(engine: E, state: DocumentState) -> Result<Self, DocumentError> {
        let store = PageStore::from_pages(state.pages, state.current_page_id, state.last_page_id)?;
        log::info!(
            "Restored document with {} pages, current page {}",
            store.len(),
            store.current_page_id()
        );
        Ok(Self::from_store(engine, store, state.settings))
    }

    fn from_store(mut engine: E, store: PageStore, settings: DecorationSettings) -> Self {
        engine.register_node_type(marker::node_spec());
        let mut document = Self {
            store,
            engine,
            settings,
            listeners: Vec::new(),
        };
        document.bind_current();
        document
    }

    /// Replace the whole document with `state`, keeping the engine, the
    /// listeners and the new-page placeholder.
    pub fn load_state(&mut self, state: DocumentState) -> Result<(), DocumentError> {
        let store = PageStore::from_pages(state.pages, state.current_page_id, state.last_page_id)?
            .with_placeholder(self.store.placeholder());
        self.store = store;
        self.settings = state.settings;
        self.bind_current();
        self.emit(DocumentEvent::Restored);
        Ok(())
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.store = self.store.with_placeholder(placeholder);
        self
    }

    pub fn with_settings(mut self, settings: DecorationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn subscribe(&mut self, listener: impl DocumentListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn emit(&mut self, event: DocumentEvent) {
        log::debug!("Document event: {:?}", event);
        for listener in &mut self.listeners {
            listener.on_event(&event);
        }
    }

    /// Load the current page into the surface, replacing what it shows.
    /// The page keeps the engine's normalized form so both always agree.
    fn bind_current(&mut self) {
        let id = self.store.current_page_id();
        let content = self.store.current_page().content.clone();
        self.engine.set_content(&content);

        let normalized = self.engine.serialized_content();
        if normalized != content {
            if let Err(e) = self.store.update_page_content(id, normalized) {
                log::error!("Failed to store normalized content for page {}: {}", id, e);
            }
        }
    }

    /// Write the surface's content back to the current page if it differs.
    fn flush(&mut self) {
        let id = self.store.current_page_id();
        let content = self.engine.serialized_content();
        if self.store.current_page().content != content {
            if let Err(e) = self.store.update_page_content(id, content) {
                log::error!("Failed to flush page {}: {}", id, e);
            }
        }
    }

    pub fn add_page(&mut self) -> Result<PageId, DocumentError> {
        self.add_page_with(None)
    }

    /// Append a page and switch to it.
    pub fn add_page_with(&mut self, content: Option<String>) -> Result<PageId, DocumentError> {
        self.flush();
        let id = self.store.add_page(content)?.id;
        self.bind_current();
        self.emit(DocumentEvent::PageAdded { id });
        Ok(id)
    }

    /// Delete a page. Returns false, changing nothing, for the last page
    /// or an unknown id. Deleting the active page activates the first page.
    pub fn delete_page(&mut self, id: PageId) -> bool {
        if !self.store.can_delete() || !self.store.contains(id) {
            return false;
        }

        let was_current = self.store.current_page_id() == id;
        if !was_current {
            self.flush();
        }
        if !self.store.delete_page(id) {
            return false;
        }
        if was_current {
            self.bind_current();
        }

        let current = self.store.current_page_id();
        self.emit(DocumentEvent::PageDeleted { id, current });
        true
    }

    /// Make `target` the active page. The outgoing page is flushed before
    /// the surface is rebound. Fails without changing anything if `target`
    /// does not exist.
    pub fn switch_to_page(&mut self, target: PageId) -> Result<(), DocumentError> {
        let from = self.store.current_page_id();
        if target == from {
            return Ok(());
        }
        if !self.store.contains(target) {
            return Err(DocumentError::PageNotFound(target));
        }

        let content = self.engine.serialized_content();
        self.store.update_page_content(from, content)?;
        self.store.set_current(target)?;
        self.bind_current();

        self.emit(DocumentEvent::PageSwitched { from, to: target });
        Ok(())
    }

    /// Change notification from the editing surface: `content` becomes the
    /// active page's content. If the surface reports content the engine
    /// does not hold, the engine is brought in line with it.
    pub fn on_edit(&mut self, content: String) {
        if self.engine.serialized_content() != content {
            self.engine.set_content(&content);
        }
        // keep the engine's normalized form, as binding does
        let content = self.engine.serialized_content();
        let id = self.store.current_page_id();
        if let Err(e) = self.store.update_page_content(id, content) {
            log::error!("Failed to record edit for page {}: {}", id, e);
            return;
        }
        self.emit(DocumentEvent::ContentChanged { id });
    }

    /// Run a command against the surface and record the result.
    pub fn edit<R>(&mut self, command: impl FnOnce(&mut E) -> R) -> R {
        let before = self.engine.serialized_content();
        let result = command(&mut self.engine);
        let after = self.engine.serialized_content();
        if after != before {
            self.on_edit(after);
        }
        result
    }

    /// Insert a page-break marker at the cursor of the active page. This
    /// only adds the marker; it never creates or splits pages.
    pub fn insert_page_break(&mut self) -> Result<(), DocumentError> {
        self.edit(|engine| engine.insert_node_at_cursor(PAGE_BREAK))
            .map_err(DocumentError::InvalidMarkerInsertion)?;
        let id = self.store.current_page_id();
        self.emit(DocumentEvent::PageBreakInserted { id });
        Ok(())
    }

    pub fn update_settings(&mut self, update: impl FnOnce(&mut DecorationSettings)) {
        let before = self.settings.clone();
        update(&mut self.settings);
        if self.settings != before {
            self.emit(DocumentEvent::SettingsChanged);
        }
    }

    pub fn placeholder(&self) -> &str {
        self.store.placeholder()
    }

    pub fn settings(&self) -> &DecorationSettings {
        &self.settings
    }

    pub fn pages(&self) -> &[Page] {
        self.store.pages()
    }

    pub fn page(&self, id: PageId) -> Result<&Page, DocumentError> {
        self.store.get_page(id)
    }

    pub fn page_count(&self) -> usize {
        self.store.len()
    }

    pub fn can_delete_page(&self) -> bool {
        self.store.can_delete()
    }

    pub fn current_page_id(&self) -> PageId {
        self.store.current_page_id()
    }

    pub fn current_page(&self) -> &Page {
        self.store.current_page()
    }

    /// 1-based position of the active page, for "Page X of N".
    pub fn current_page_number(&self) -> usize {
        self.store
            .position(self.store.current_page_id())
            .map_or(1, |i| i + 1)
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn state(&self) -> DocumentState {
        DocumentState {
            pages: self.store.pages().to_vec(),
            current_page_id: self.store.current_page_id(),
            last_page_id: Some(self.store.last_assigned_id()),
            settings: self.settings.clone(),
        }
    }
}

impl Document<HtmlEngine> {
    /// A new document on the reference engine, set up from `config`.
    pub fn from_config(config: &Config) -> Self {
        Document::new(HtmlEngine::new(), config.template_html())
            .with_placeholder(config.pages.new_page_placeholder.clone())
            .with_settings(config.decoration.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::NEW_PAGE_PLACEHOLDER;
    use crate::settings::MarginSide;
    use pagecore::marker::PAGE_BREAK_HTML;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn document(content: &str) -> Document<HtmlEngine> {
        Document::new(HtmlEngine::new(), content)
    }

    fn recorder(document: &mut Document<HtmlEngine>) -> Rc<RefCell<Vec<DocumentEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        document.subscribe(move |event: &DocumentEvent| sink.borrow_mut().push(event.clone()));
        events
    }

    fn surface(document: &Document<HtmlEngine>) -> String {
        document.engine().serialized_content()
    }

    fn assert_bound(document: &Document<HtmlEngine>) {
        assert_eq!(surface(document), document.current_page().content);
    }

    #[test]
    fn test_add_then_switch_back_keeps_content() {
        let mut doc = document("<p>Hello</p>");

        let id = doc.add_page().unwrap();
        assert_eq!(id, PageId(2));
        assert_eq!(doc.current_page_id(), PageId(2));
        assert_eq!(doc.current_page().content, NEW_PAGE_PLACEHOLDER);
        assert_eq!(surface(&doc), NEW_PAGE_PLACEHOLDER);

        doc.switch_to_page(PageId(1)).unwrap();
        assert_eq!(doc.page(PageId(1)).unwrap().content, "<p>Hello</p>");
        assert_eq!(surface(&doc), "<p>Hello</p>");
        assert_bound(&doc);
    }

    #[test]
    fn test_delete_active_page_after_edit() {
        let mut doc = document("<p>Hello</p>");
        doc.add_page().unwrap();
        doc.edit(|engine| engine.set_content("<p>Changed</p>"));
        assert_eq!(doc.page(PageId(2)).unwrap().content, "<p>Changed</p>");

        assert!(doc.delete_page(PageId(2)));
        let ids: Vec<PageId> = doc.pages().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![PageId(1)]);
        assert_eq!(doc.current_page_id(), PageId(1));
        assert_eq!(surface(&doc), "<p>Hello</p>");
    }

    #[test]
    fn test_delete_only_page_is_noop() {
        let mut doc = document("<p>Only</p>");
        let events = recorder(&mut doc);

        assert!(!doc.can_delete_page());
        assert!(!doc.delete_page(PageId(1)));
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.current_page().content, "<p>Only</p>");
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_delete_active_page_falls_back_to_first_not_previous() {
        let mut doc = document("<p>1</p>");
        doc.add_page().unwrap();
        doc.add_page().unwrap();
        doc.switch_to_page(PageId(3)).unwrap();

        assert!(doc.delete_page(PageId(3)));
        assert_eq!(doc.current_page_id(), PageId(1));
        assert_eq!(surface(&doc), "<p>1</p>");
    }

    #[test]
    fn test_switch_flushes_unsaved_surface_content() {
        let mut doc = document("<p>A</p>");
        doc.add_page_with(Some("<p>B</p>".to_string())).unwrap();
        doc.switch_to_page(PageId(1)).unwrap();

        doc.edit(|engine| {
            engine.move_to_end();
            engine.insert_text(" edited");
        });
        doc.switch_to_page(PageId(2)).unwrap();

        assert_eq!(doc.page(PageId(1)).unwrap().content, "<p>A edited</p>");
        assert_eq!(surface(&doc), "<p>B</p>");
        assert_bound(&doc);
    }

    #[test]
    fn test_switch_to_missing_page_changes_nothing() {
        let mut doc = document("<p>A</p>");
        let events = recorder(&mut doc);

        let err = doc.switch_to_page(PageId(42)).unwrap_err();
        assert_eq!(err, DocumentError::PageNotFound(PageId(42)));
        assert_eq!(doc.current_page_id(), PageId(1));
        assert_eq!(surface(&doc), "<p>A</p>");
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_switch_to_current_is_noop() {
        let mut doc = document("<p>A</p>");
        let events = recorder(&mut doc);
        doc.switch_to_page(PageId(1)).unwrap();
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_on_edit_records_content_and_syncs_surface() {
        let mut doc = document("<p>A</p>");
        let events = recorder(&mut doc);

        doc.on_edit("<p>Typed</p>".to_string());
        assert_eq!(doc.current_page().content, "<p>Typed</p>");
        assert_bound(&doc);
        assert_eq!(
            events.borrow().as_slice(),
            &[DocumentEvent::ContentChanged { id: PageId(1) }]
        );
    }

    #[test]
    fn test_on_edit_stores_normalized_content() {
        let mut doc = document("<p>A</p>");

        doc.on_edit(
            "<p>a</p>\n  <div class=\"page-break\" id=\"x\"></div>\n<p>b</p>".to_string(),
        );
        assert_bound(&doc);
        assert_eq!(
            doc.current_page().content,
            format!("<p>a</p>{}<p>b</p>", PAGE_BREAK_HTML)
        );

        doc.add_page().unwrap();
        doc.switch_to_page(PageId(1)).unwrap();
        assert_eq!(surface(&doc), format!("<p>a</p>{}<p>b</p>", PAGE_BREAK_HTML));
    }

    #[test]
    fn test_add_page_fails_cleanly_when_ids_run_out() {
        let state = DocumentState {
            pages: vec![Page {
                id: PageId(u32::MAX),
                content: "<p>Last</p>".to_string(),
            }],
            current_page_id: PageId(u32::MAX),
            last_page_id: None,
            settings: DecorationSettings::default(),
        };
        let mut doc = Document::restore(HtmlEngine::new(), state).unwrap();
        let events = recorder(&mut doc);

        assert_eq!(
            doc.add_page(),
            Err(DocumentError::PageIdsExhausted(PageId(u32::MAX)))
        );
        assert_eq!(doc.page_count(), 1);
        assert_bound(&doc);
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_page_break_is_stored_without_new_page() {
        let mut doc = document("<p>Hello world</p>");
        let events = recorder(&mut doc);

        doc.edit(|engine| engine.set_cursor(0, 5));
        doc.insert_page_break().unwrap();

        let content = &doc.current_page().content;
        assert_eq!(marker::count_page_breaks(content), 1);
        assert_eq!(
            content,
            &format!("<p>Hello</p>{}<p> world</p>", PAGE_BREAK_HTML)
        );
        assert_eq!(doc.page_count(), 1);
        assert_eq!(
            events.borrow().as_slice(),
            &[
                DocumentEvent::ContentChanged { id: PageId(1) },
                DocumentEvent::PageBreakInserted { id: PageId(1) },
            ]
        );
    }

    #[test]
    fn test_template_is_normalized_on_bind() {
        let doc = document("\n  <h1>Title</h1>\n  <p>x</p>\n");
        assert_eq!(doc.current_page().content, "<h1>Title</h1><p>x</p>");
        assert_bound(&doc);
    }

    #[test]
    fn test_markers_survive_page_switches() {
        let mut doc = document(&format!("<p>a</p>{}<p>b</p>", PAGE_BREAK_HTML));
        doc.add_page().unwrap();
        doc.switch_to_page(PageId(1)).unwrap();

        assert_eq!(marker::count_page_breaks(&surface(&doc)), 1);
        assert_eq!(
            doc.current_page().content,
            format!("<p>a</p>{}<p>b</p>", PAGE_BREAK_HTML)
        );
    }

    #[test]
    fn test_events_for_page_lifecycle() {
        let mut doc = document("<p>A</p>");
        let events = recorder(&mut doc);

        doc.add_page().unwrap();
        doc.switch_to_page(PageId(1)).unwrap();
        doc.delete_page(PageId(2));

        assert_eq!(
            events.borrow().as_slice(),
            &[
                DocumentEvent::PageAdded { id: PageId(2) },
                DocumentEvent::PageSwitched {
                    from: PageId(2),
                    to: PageId(1)
                },
                DocumentEvent::PageDeleted {
                    id: PageId(2),
                    current: PageId(1)
                },
            ]
        );
    }

    #[test]
    fn test_settings_changes_notify_once() {
        let mut doc = document("<p>A</p>");
        let events = recorder(&mut doc);

        doc.update_settings(|s| s.margins.set_from_input(MarginSide::Top, "abc"));
        doc.update_settings(|s| {
            s.set_zoom(110);
        });

        assert_eq!(doc.settings().margins.top, 0);
        assert_eq!(doc.settings().zoom.percent(), 100);
        assert_eq!(events.borrow().as_slice(), &[DocumentEvent::SettingsChanged]);
    }

    #[test]
    fn test_state_round_trip() {
        let mut doc = document("<p>A</p>");
        doc.add_page().unwrap();
        doc.delete_page(PageId(2));
        doc.update_settings(|s| s.header_text = "Report".to_string());

        let state = doc.state();
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"currentPageId\":1"));

        let restored: DocumentState = serde_json::from_str(&json).unwrap();
        let mut doc = Document::restore(HtmlEngine::new(), restored).unwrap();
        assert_eq!(doc.settings().header_text, "Report");
        assert_bound(&doc);
        assert_eq!(doc.add_page().unwrap(), PageId(3));
    }

    #[test]
    fn test_load_state_replaces_pages_and_keeps_listeners() {
        let mut source = document("<p>Saved</p>");
        source.add_page_with(Some("<p>Two</p>".to_string())).unwrap();
        let state = source.state();

        let mut doc = document("<p>Scratch</p>").with_placeholder("<p>blank</p>");
        let events = recorder(&mut doc);
        doc.load_state(state).unwrap();

        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.current_page_id(), PageId(2));
        assert_eq!(surface(&doc), "<p>Two</p>");
        assert_eq!(events.borrow().as_slice(), &[DocumentEvent::Restored]);

        doc.add_page().unwrap();
        assert_eq!(doc.current_page().content, "<p>blank</p>");
    }

    #[test]
    fn test_load_invalid_state_changes_nothing() {
        let mut doc = document("<p>Keep</p>");
        let state = DocumentState {
            pages: Vec::new(),
            current_page_id: PageId(1),
            last_page_id: None,
            settings: DecorationSettings::default(),
        };

        assert_eq!(doc.load_state(state), Err(DocumentError::EmptyDocument));
        assert_eq!(surface(&doc), "<p>Keep</p>");
    }

    #[test]
    fn test_from_config_uses_template_and_settings() {
        let mut config = Config::default();
        config.pages.template = "# Memo\n\n\\pagebreak\n\nBody".to_string();
        config.pages.new_page_placeholder = "<p>Empty</p>".to_string();
        config.decoration.header_text = "ACME".to_string();

        let mut doc = Document::from_config(&config);
        assert_eq!(
            doc.current_page().content,
            format!("<h1>Memo</h1>{}<p>Body</p>", PAGE_BREAK_HTML)
        );
        assert_eq!(doc.settings().header_text, "ACME");

        doc.add_page().unwrap();
        assert_eq!(doc.current_page().content, "<p>Empty</p>");
    }

    #[test]
    fn test_every_operation_leaves_surface_bound() {
        let mut doc = document("<p>A</p>");
        doc.add_page().unwrap();
        assert_bound(&doc);
        doc.edit(|engine| engine.insert_text("x"));
        assert_bound(&doc);
        doc.switch_to_page(PageId(1)).unwrap();
        assert_bound(&doc);
        doc.insert_page_break().unwrap();
        assert_bound(&doc);
        doc.delete_page(PageId(1));
        assert_bound(&doc);
        assert_eq!(doc.current_page_number(), 1);
    }
}
