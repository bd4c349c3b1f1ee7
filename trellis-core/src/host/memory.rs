//! In-memory host.
//!
//! A small document model that implements [`Host`] and records every call
//! it receives as a [`HostOp`]. Handles are cheap clones sharing one
//! document, so a test can keep one handle while the root owns another.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{trace, warn};

use super::{Event, EventHandler, Host, HostId};
use crate::element::Props;

/// One call received by a [`MemoryHost`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HostOp {
    CreateInstance { id: HostId, tag: String },
    CreateText { id: HostId, content: String },
    AppendChild { parent: HostId, child: HostId },
    InsertBefore { parent: HostId, child: HostId, before: HostId },
    RemoveChild { parent: HostId, child: HostId },
    SetText { id: HostId, content: String },
    UpdateProps { id: HostId },
    Discard { id: HostId },
}

impl HostOp {
    /// Whether the op changed the shape of the attached tree.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::AppendChild { .. } | Self::InsertBefore { .. } | Self::RemoveChild { .. }
        )
    }
}

#[derive(Debug)]
enum Content {
    Container(String),
    Element { tag: String, props: Props },
    Text(String),
}

#[derive(Debug)]
struct HostNode {
    content: Content,
    parent: Option<HostId>,
    children: Vec<HostId>,
}

#[derive(Debug, Default)]
struct Document {
    nodes: HashMap<HostId, HostNode>,
    next_id: u64,
    ops: Vec<HostOp>,
}

impl Document {
    fn create(&mut self, content: Content) -> HostId {
        self.next_id += 1;
        let id = HostId::new(self.next_id);
        self.nodes.insert(
            id,
            HostNode {
                content,
                parent: None,
                children: Vec::new(),
            },
        );
        id
    }

    fn detach(&mut self, child: HostId) {
        let Some(parent) = self.nodes.get_mut(&child).and_then(|node| node.parent.take()) else {
            return;
        };
        if let Some(parent) = self.nodes.get_mut(&parent) {
            parent.children.retain(|id| *id != child);
        }
    }

    fn attach(&mut self, parent: HostId, child: HostId, before: Option<HostId>) {
        if !self.nodes.contains_key(&parent) || !self.nodes.contains_key(&child) {
            warn!(parent = ?parent, child = ?child, "attach with unknown host node");
            return;
        }
        self.detach(child);

        if let Some(node) = self.nodes.get_mut(&parent) {
            let position = before.and_then(|before| node.children.iter().position(|id| *id == before));
            if before.is_some() && position.is_none() {
                warn!(parent = ?parent, "insert anchor is not a child; appending");
            }
            match position {
                Some(position) => node.children.insert(position, child),
                None => node.children.push(child),
            }
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
    }

    fn write_markup(&self, id: HostId, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        match &node.content {
            Content::Text(text) => out.push_str(text),
            Content::Container(tag) => {
                let _ = write!(out, "<{tag}>");
                self.write_children(node, out);
                let _ = write!(out, "</{tag}>");
            }
            Content::Element { tag, props } => {
                let _ = write!(out, "<{tag}");
                for (name, value) in props.attrs() {
                    match value {
                        Value::String(s) => {
                            let _ = write!(out, " {name}=\"{s}\"");
                        }
                        other => {
                            let _ = write!(out, " {name}=\"{other}\"");
                        }
                    }
                }
                out.push('>');
                self.write_children(node, out);
                let _ = write!(out, "</{tag}>");
            }
        }
    }

    fn write_children(&self, node: &HostNode, out: &mut String) {
        for child in &node.children {
            self.write_markup(*child, out);
        }
    }
}

/// In-memory [`Host`] implementation.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    doc: Arc<Mutex<Document>>,
}

impl MemoryHost {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a container to mount a root into. `tag` only shows in markup.
    pub fn create_container(&self, tag: &str) -> HostId {
        self.doc.lock().create(Content::Container(tag.to_string()))
    }

    /// Number of host nodes alive, containers included.
    pub fn node_count(&self) -> usize {
        self.doc.lock().nodes.len()
    }

    /// All operations recorded so far.
    pub fn ops(&self) -> Vec<HostOp> {
        self.doc.lock().ops.clone()
    }

    /// Return and forget the recorded operations.
    pub fn take_ops(&self) -> Vec<HostOp> {
        std::mem::take(&mut self.doc.lock().ops)
    }

    /// Attached children of a node, in order.
    pub fn children(&self, id: HostId) -> Vec<HostId> {
        self.doc
            .lock()
            .nodes
            .get(&id)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    /// Parent of a node, `None` when detached.
    pub fn parent(&self, id: HostId) -> Option<HostId> {
        self.doc.lock().nodes.get(&id).and_then(|node| node.parent)
    }

    /// Tag of an element instance.
    pub fn tag(&self, id: HostId) -> Option<String> {
        match &self.doc.lock().nodes.get(&id)?.content {
            Content::Element { tag, .. } => Some(tag.clone()),
            _ => None,
        }
    }

    /// Content of a text instance.
    pub fn text(&self, id: HostId) -> Option<String> {
        match &self.doc.lock().nodes.get(&id)?.content {
            Content::Text(text) => Some(text.clone()),
            _ => None,
        }
    }

    /// Current value of an element attribute.
    pub fn attr(&self, id: HostId, name: &str) -> Option<Value> {
        match &self.doc.lock().nodes.get(&id)?.content {
            Content::Element { props, .. } => props.attr(name).cloned(),
            _ => None,
        }
    }

    /// First element with `tag` below `root`, in document order.
    pub fn find_by_tag(&self, root: HostId, tag: &str) -> Option<HostId> {
        let doc = self.doc.lock();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = doc.nodes.get(&id)?;
            if matches!(&node.content, Content::Element { tag: t, .. } if t == tag) {
                return Some(id);
            }
            stack.extend(node.children.iter().rev());
        }
        None
    }

    /// Render the attached subtree at `id` as markup.
    pub fn to_markup(&self, id: HostId) -> String {
        let mut out = String::new();
        self.doc.lock().write_markup(id, &mut out);
        out
    }

    /// Dispatch an event at `target`.
    ///
    /// Capture handlers run from the outermost ancestor down to the target,
    /// then bubble handlers from the target up. Stopping propagation skips
    /// everything after the running handler.
    pub fn dispatch_event(&self, target: HostId, event_type: &str) -> Event {
        let mut event = Event::new(event_type, target);
        let (capture_name, bubble_name) = event.handler_names();

        let mut capture: Vec<(HostId, EventHandler)> = Vec::new();
        let mut bubble: Vec<(HostId, EventHandler)> = Vec::new();
        {
            let doc = self.doc.lock();
            let mut cursor = Some(target);
            while let Some(id) = cursor {
                let Some(node) = doc.nodes.get(&id) else {
                    break;
                };
                if let Content::Element { props, .. } = &node.content {
                    if let Some(handler) = props.handler(&capture_name) {
                        capture.push((id, Arc::clone(handler)));
                    }
                    if let Some(handler) = props.handler(&bubble_name) {
                        bubble.push((id, Arc::clone(handler)));
                    }
                }
                cursor = node.parent;
            }
        }
        capture.reverse();

        // Handlers may re-render, which calls back into this host.
        for (id, handler) in capture.into_iter().chain(bubble) {
            if event.is_propagation_stopped() {
                break;
            }
            event.current_target = id;
            trace!(event = %event, current = ?id, "invoking handler");
            handler(&mut event);
        }
        event
    }
}

impl Host for MemoryHost {
    fn create_instance(&mut self, tag: &str, props: &Props) -> HostId {
        let mut doc = self.doc.lock();
        let id = doc.create(Content::Element {
            tag: tag.to_string(),
            props: props.clone(),
        });
        doc.ops.push(HostOp::CreateInstance {
            id,
            tag: tag.to_string(),
        });
        id
    }

    fn create_text_instance(&mut self, content: &str) -> HostId {
        let mut doc = self.doc.lock();
        let id = doc.create(Content::Text(content.to_string()));
        doc.ops.push(HostOp::CreateText {
            id,
            content: content.to_string(),
        });
        id
    }

    fn append_child(&mut self, parent: HostId, child: HostId) {
        let mut doc = self.doc.lock();
        doc.attach(parent, child, None);
        doc.ops.push(HostOp::AppendChild { parent, child });
    }

    fn insert_before(&mut self, parent: HostId, child: HostId, before: HostId) {
        let mut doc = self.doc.lock();
        doc.attach(parent, child, Some(before));
        doc.ops.push(HostOp::InsertBefore {
            parent,
            child,
            before,
        });
    }

    fn remove_child(&mut self, parent: HostId, child: HostId) {
        let mut doc = self.doc.lock();
        if doc.nodes.get(&child).and_then(|node| node.parent) != Some(parent) {
            warn!(parent = ?parent, child = ?child, "removing a node that is not a child");
        }
        doc.detach(child);
        doc.ops.push(HostOp::RemoveChild { parent, child });
    }

    fn commit_text_update(&mut self, text: HostId, content: &str) {
        let mut doc = self.doc.lock();
        if let Some(HostNode {
            content: Content::Text(current),
            ..
        }) = doc.nodes.get_mut(&text)
        {
            *current = content.to_string();
        }
        doc.ops.push(HostOp::SetText {
            id: text,
            content: content.to_string(),
        });
    }

    fn commit_update(&mut self, instance: HostId, props: &Props) {
        let mut doc = self.doc.lock();
        if let Some(HostNode {
            content: Content::Element { props: current, .. },
            ..
        }) = doc.nodes.get_mut(&instance)
        {
            *current = props.clone();
        }
        doc.ops.push(HostOp::UpdateProps { id: instance });
    }

    fn discard_instance(&mut self, instance: HostId) {
        let mut doc = self.doc.lock();
        doc.detach(instance);
        let Some(node) = doc.nodes.remove(&instance) else {
            warn!(instance = ?instance, "discarding an unknown host node");
            return;
        };
        for child in node.children {
            if let Some(child) = doc.nodes.get_mut(&child) {
                child.parent = None;
            }
        }
        doc.ops.push(HostOp::Discard { id: instance });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn append_moves_attached_children() {
        let mut host = MemoryHost::new();
        let root = host.create_container("root");
        let a = host.create_instance("a", &Props::new());
        let b = host.create_instance("b", &Props::new());
        host.append_child(root, a);
        host.append_child(root, b);
        host.append_child(root, a);

        assert_eq!(host.children(root), vec![b, a]);
        assert_eq!(host.to_markup(root), "<root><b></b><a></a></root>");
    }

    #[test]
    fn only_attachment_changes_are_structural() {
        let mut host = MemoryHost::new();
        let root = host.create_container("root");
        let a = host.create_text_instance("a");
        host.append_child(root, a);
        host.commit_text_update(a, "b");
        host.remove_child(root, a);
        host.discard_instance(a);

        let structural: Vec<bool> = host.ops().iter().map(HostOp::is_structural).collect();
        assert_eq!(structural, vec![false, true, false, true, false]);
        assert_eq!(host.node_count(), 1);
    }

    #[test]
    fn insert_before_places_in_front() {
        let mut host = MemoryHost::new();
        let root = host.create_container("root");
        let a = host.create_text_instance("a");
        let b = host.create_text_instance("b");
        host.append_child(root, a);
        host.insert_before(root, b, a);
        assert_eq!(host.to_markup(root), "<root>ba</root>");

        host.remove_child(root, a);
        assert_eq!(host.parent(a), None);
        assert_eq!(host.to_markup(root), "<root>b</root>");
    }

    #[test]
    fn markup_includes_attributes() {
        let mut host = MemoryHost::new();
        let root = host.create_container("root");
        let mut props = Props::new();
        props.set_attr("id", "main");
        props.set_attr("tabindex", 2);
        let div = host.create_instance("div", &props);
        host.append_child(root, div);
        assert_eq!(
            host.to_markup(root),
            "<root><div id=\"main\" tabindex=\"2\"></div></root>"
        );
    }

    #[test]
    fn events_capture_then_bubble() {
        let mut host = MemoryHost::new();
        let root = host.create_container("root");
        let order = Arc::new(Mutex::new(Vec::new()));

        let recorder = |label: &'static str| -> EventHandler {
            let order = Arc::clone(&order);
            Arc::new(move |_: &mut Event| order.lock().push(label))
        };
        let mut outer_props = Props::new();
        outer_props.set_handler("onClickCapture", recorder("outer capture"));
        outer_props.set_handler("onClick", recorder("outer bubble"));
        let mut inner_props = Props::new();
        inner_props.set_handler("onClickCapture", recorder("inner capture"));
        inner_props.set_handler("onClick", recorder("inner bubble"));

        let outer = host.create_instance("div", &outer_props);
        let inner = host.create_instance("button", &inner_props);
        host.append_child(root, outer);
        host.append_child(outer, inner);

        let event = host.dispatch_event(inner, "click");
        assert_eq!(event.target, inner);
        assert_eq!(
            *order.lock(),
            vec!["outer capture", "inner capture", "inner bubble", "outer bubble"]
        );
    }

    #[test]
    fn stop_propagation_skips_outer_handlers() {
        let mut host = MemoryHost::new();
        let root = host.create_container("root");
        let calls = Arc::new(AtomicUsize::new(0));

        let counted = Arc::clone(&calls);
        let mut outer_props = Props::new();
        outer_props.set_handler(
            "onClick",
            Arc::new(move |_: &mut Event| {
                counted.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let mut inner_props = Props::new();
        inner_props.set_handler("onClick", Arc::new(|event: &mut Event| event.stop_propagation()));

        let outer = host.create_instance("div", &outer_props);
        let inner = host.create_instance("span", &inner_props);
        host.append_child(root, outer);
        host.append_child(outer, inner);

        assert!(host.dispatch_event(inner, "click").is_propagation_stopped());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn ops_are_recorded_in_order() {
        let mut host = MemoryHost::new();
        let root = host.create_container("root");
        let text = host.create_text_instance("x");
        host.append_child(root, text);
        host.commit_text_update(text, "y");

        let ops = host.take_ops();
        assert_eq!(
            ops,
            vec![
                HostOp::CreateText { id: text, content: "x".into() },
                HostOp::AppendChild { parent: root, child: text },
                HostOp::SetText { id: text, content: "y".into() },
            ]
        );
        assert!(host.ops().is_empty());
        assert_eq!(host.text(text).as_deref(), Some("y"));
    }
}
