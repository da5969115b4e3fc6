use crate::models::SinkElement;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

/// Somewhere rendered values end up. Writes are synchronous so callers can show a
/// placeholder before they suspend on I/O.
pub trait Sink: Send + Sync {
    fn set_text(&self, id: &str, text: &str);

    /// Points the element at `href` as an external link that does not leak `window.opener`.
    fn set_link(&self, id: &str, href: &str);
}

/// In-memory page model: element id to its current text and link.
#[derive(Debug, Default)]
pub struct SinkBoard {
    elements: RwLock<BTreeMap<String, SinkElement>>,
}

impl SinkBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<SinkElement> {
        self.elements
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn text(&self, id: &str) -> Option<String> {
        self.get(id).map(|element| element.text)
    }

    pub fn snapshot(&self) -> BTreeMap<String, SinkElement> {
        self.elements
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, id: &str, apply: impl FnOnce(&mut SinkElement)) {
        let mut elements = self.elements.write().unwrap_or_else(PoisonError::into_inner);
        apply(elements.entry(id.to_string()).or_default());
    }
}

impl Sink for SinkBoard {
    fn set_text(&self, id: &str, text: &str) {
        self.update(id, |element| element.text = text.to_string());
    }

    fn set_link(&self, id: &str, href: &str) {
        self.update(id, |element| {
            element.href = Some(href.to_string());
            element.target = Some("_blank".to_string());
            element.rel = Some("noopener noreferrer".to_string());
        });
    }
}
