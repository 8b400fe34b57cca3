//! Application state.
//!
//! Shared state for all request handlers.

use docgen_convert::{Converter, TemplateStore};

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Conversion pipeline; cloned into blocking tasks per request.
    pub(crate) converter: Converter,
}

impl AppState {
    #[must_use]
    pub(crate) fn new(converter: Converter) -> Self {
        Self { converter }
    }

    /// Template store, if one is configured.
    #[must_use]
    pub(crate) fn templates(&self) -> Option<&TemplateStore> {
        self.converter.templates()
    }
}
