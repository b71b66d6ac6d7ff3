//! The page the session runs in.

use serde_json::Value;

use crate::error::LinkError;
use crate::popup::PopupElements;

/// DOM operations the popup needs.
pub trait DocumentHost {
    fn has_element(&self, id: &str) -> bool;

    /// Removes the element and its subtree; `false` when it did not exist.
    fn remove_element(&self, id: &str) -> Result<bool, LinkError>;

    /// Appends `<style id=…>` to `<head>`.
    fn append_stylesheet(&self, id: &str, css: &str) -> Result<(), LinkError>;

    fn append_popup(&self, popup: &PopupElements) -> Result<(), LinkError>;
}

pub trait LinkHost: DocumentHost {
    /// `window.location.origin`.
    fn page_origin(&self) -> String;

    /// `postMessage` into the iframe with id `frame_id`.
    fn post_to_frame(&self, frame_id: &str, message: &Value, target_origin: &str)
        -> Result<(), LinkError>;

    /// Attaches the window `message` listener.
    fn listen(&self);

    fn unlisten(&self);
}

pub mod memory {
    //! A page kept entirely in memory, for tests and non-browser hosts.

    use std::cell::{Cell, RefCell};
    use std::collections::BTreeMap;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct MemoryElement {
        pub tag: &'static str,
        pub parent: Option<String>,
        pub attributes: BTreeMap<String, String>,
        pub text: String,
    }

    impl MemoryElement {
        fn new(tag: &'static str, parent: Option<&str>) -> Self {
            Self {
                tag,
                parent: parent.map(str::to_owned),
                attributes: BTreeMap::new(),
                text: String::new(),
            }
        }
    }

    pub struct MemoryHost {
        origin: String,
        /// Insertion-ordered so duplicate ids stay visible.
        elements: RefCell<Vec<(String, MemoryElement)>>,
        posted: RefCell<Vec<(String, Value)>>,
        listening: Cell<bool>,
        listen_calls: Cell<usize>,
    }

    impl MemoryHost {
        pub fn new(origin: impl Into<String>) -> Self {
            Self {
                origin: origin.into(),
                elements: RefCell::new(Vec::new()),
                posted: RefCell::new(Vec::new()),
                listening: Cell::new(false),
                listen_calls: Cell::new(0),
            }
        }

        pub fn element(&self, id: &str) -> Option<MemoryElement> {
            self.elements
                .borrow()
                .iter()
                .find(|(eid, _)| eid == id)
                .map(|(_, e)| e.clone())
        }

        pub fn attribute(&self, id: &str, name: &str) -> Option<String> {
            self.element(id)?.attributes.get(name).cloned()
        }

        pub fn parent_of(&self, id: &str) -> Option<String> {
            self.element(id)?.parent
        }

        pub fn stylesheet(&self, id: &str) -> Option<String> {
            self.element(id)
                .filter(|e| e.tag == "style")
                .map(|e| e.text)
        }

        pub fn count_with_id(&self, id: &str) -> usize {
            self.elements.borrow().iter().filter(|(eid, _)| eid == id).count()
        }

        /// Messages posted into the frame as `(target_origin, message)`.
        pub fn posted(&self) -> Vec<(String, Value)> {
            self.posted.borrow().clone()
        }

        /// Message types posted, one entry per distinct message in order.
        pub fn posted_types(&self) -> Vec<String> {
            let mut types: Vec<String> = Vec::new();
            let mut last: Option<&Value> = None;
            let posted = self.posted.borrow();
            for (_, message) in posted.iter() {
                if last != Some(message) {
                    if let Some(kind) = message.get("type").and_then(Value::as_str) {
                        types.push(kind.to_string());
                    }
                }
                last = Some(message);
            }
            types
        }

        /// Last message of type `kind`.
        pub fn last_posted(&self, kind: &str) -> Option<Value> {
            self.posted
                .borrow()
                .iter()
                .rev()
                .map(|(_, m)| m)
                .find(|m| m.get("type").and_then(Value::as_str) == Some(kind))
                .cloned()
        }

        pub fn clear_posted(&self) {
            self.posted.borrow_mut().clear();
        }

        pub fn is_listening(&self) -> bool {
            self.listening.get()
        }

        pub fn listen_calls(&self) -> usize {
            self.listen_calls.get()
        }

        fn insert(&self, id: &str, element: MemoryElement) {
            self.elements.borrow_mut().push((id.to_string(), element));
        }
    }

    impl DocumentHost for MemoryHost {
        fn has_element(&self, id: &str) -> bool {
            self.count_with_id(id) > 0
        }

        fn remove_element(&self, id: &str) -> Result<bool, LinkError> {
            if !self.has_element(id) {
                return Ok(false);
            }
            let mut doomed = vec![id.to_string()];
            let mut elements = self.elements.borrow_mut();
            // Children are always inserted after their parent.
            for (eid, element) in elements.iter() {
                if element.parent.as_ref().is_some_and(|p| doomed.contains(p)) {
                    doomed.push(eid.clone());
                }
            }
            elements.retain(|(eid, _)| !doomed.contains(eid));
            Ok(true)
        }

        fn append_stylesheet(&self, id: &str, css: &str) -> Result<(), LinkError> {
            let mut style = MemoryElement::new("style", Some("head"));
            style.text = css.to_string();
            self.insert(id, style);
            Ok(())
        }

        fn append_popup(&self, popup: &PopupElements) -> Result<(), LinkError> {
            self.insert(popup.root_id, MemoryElement::new("div", Some("body")));
            self.insert(popup.backdrop_id, MemoryElement::new("div", Some(popup.root_id)));
            self.insert(popup.content_id, MemoryElement::new("div", Some(popup.root_id)));

            let mut iframe = MemoryElement::new("iframe", Some(popup.content_id));
            iframe.attributes.insert("src".into(), popup.iframe_src.clone());
            iframe.attributes.insert("allow".into(), popup.iframe_allow.to_string());
            self.insert(popup.iframe_id, iframe);
            Ok(())
        }
    }

    impl LinkHost for MemoryHost {
        fn page_origin(&self) -> String {
            self.origin.clone()
        }

        fn post_to_frame(
            &self,
            frame_id: &str,
            message: &Value,
            target_origin: &str,
        ) -> Result<(), LinkError> {
            if self.element(frame_id).filter(|e| e.tag == "iframe").is_none() {
                return Err(LinkError::MissingElement(frame_id.to_string()));
            }
            self.posted
                .borrow_mut()
                .push((target_origin.to_string(), message.clone()));
            Ok(())
        }

        fn listen(&self) {
            self.listening.set(true);
            self.listen_calls.set(self.listen_calls.get() + 1);
        }

        fn unlisten(&self) {
            self.listening.set(false);
        }
    }
}
