//! In-memory document
//!
//! [`MemoryHost`] is a small DOM tree with just enough behavior for the menu
//! engine: id lookup, descendant selectors, classes, attributes, inline
//! styles, recorded frame requests and recorded listeners. Frames and
//! transitions never fire on their own; the caller drives them with
//! [`MemoryHost::run_frames`] and [`MemoryHost::finish_transitions`], which
//! makes every interleaving of a sequence reproducible.
//!
//! [`SidebarLayout`] builds the admin sidebar markup on top of it.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::{GroupConfig, NavConfig};
use crate::error::{NavError, NavResult};
use crate::host::{is_activation_key, FrameId, Host};
use crate::menu::NavMenu;

/// Handle to a node of a [`MemoryHost`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemoryNode(usize);

#[derive(Debug, Clone, Default)]
struct NodeData {
    tag: String,
    id: Option<String>,
    parent: Option<usize>,
    children: Vec<usize>,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    style: BTreeMap<String, String>,
    text: String,
    scroll_height: i32,
}

#[derive(Debug)]
pub struct MemoryHost {
    nodes: RefCell<Vec<NodeData>>,
    root: MemoryNode,
    head: MemoryNode,
    body: MemoryNode,
    location: RefCell<String>,
    pending_frames: RefCell<Vec<(FrameId, String)>>,
    cancelled_frames: RefCell<Vec<FrameId>>,
    toggle_listeners: RefCell<Vec<(String, MemoryNode)>>,
    toggle_attachments: RefCell<Vec<String>>,
    transition_listeners: RefCell<BTreeMap<String, MemoryNode>>,
    layout_flushes: Cell<usize>,
    failing: RefCell<HashSet<MemoryNode>>,
}

impl MemoryHost {
    /// Empty `<html><head/><body/></html>` at `location`
    pub fn new(location: &str) -> Self {
        let host = Self {
            nodes: RefCell::new(Vec::new()),
            root: MemoryNode(0),
            head: MemoryNode(1),
            body: MemoryNode(2),
            location: RefCell::new(location.to_string()),
            pending_frames: RefCell::new(Vec::new()),
            cancelled_frames: RefCell::new(Vec::new()),
            toggle_listeners: RefCell::new(Vec::new()),
            toggle_attachments: RefCell::new(Vec::new()),
            transition_listeners: RefCell::new(BTreeMap::new()),
            layout_flushes: Cell::new(0),
            failing: RefCell::new(HashSet::new()),
        };
        let root = host.create_element("html");
        let head = host.create_element("head");
        let body = host.create_element("body");
        host.append_child(root, head);
        host.append_child(root, body);
        host
    }

    pub fn head(&self) -> MemoryNode {
        self.head
    }

    pub fn body(&self) -> MemoryNode {
        self.body
    }

    // ========================
    // Tree building
    // ========================

    /// Detached element
    pub fn create_element(&self, tag: &str) -> MemoryNode {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(NodeData {
            tag: tag.to_ascii_lowercase(),
            ..NodeData::default()
        });
        MemoryNode(nodes.len() - 1)
    }

    pub fn set_id(&self, node: MemoryNode, id: &str) {
        self.nodes.borrow_mut()[node.0].id = Some(id.to_string());
    }

    /// Move `child` under `parent`, detaching it from any previous parent
    pub fn append_child(&self, parent: MemoryNode, child: MemoryNode) {
        self.detach(child);
        let mut nodes = self.nodes.borrow_mut();
        nodes[child.0].parent = Some(parent.0);
        nodes[parent.0].children.push(child.0);
    }

    /// Remove `node` (and its subtree) from the document
    pub fn detach(&self, node: MemoryNode) {
        let mut nodes = self.nodes.borrow_mut();
        if let Some(parent) = nodes[node.0].parent.take() {
            nodes[parent].children.retain(|&c| c != node.0);
        }
    }

    pub fn set_scroll_height(&self, node: MemoryNode, height: i32) {
        self.nodes.borrow_mut()[node.0].scroll_height = height;
    }

    pub fn set_location(&self, href: &str) {
        *self.location.borrow_mut() = href.to_string();
    }

    /// Make every mutation of `node` fail, as a throwing DOM call would
    pub fn fail_mutations(&self, node: MemoryNode) {
        self.failing.borrow_mut().insert(node);
    }

    // ========================
    // Inspection
    // ========================

    pub fn classes(&self, node: MemoryNode) -> Vec<String> {
        self.nodes.borrow()[node.0].classes.clone()
    }

    pub fn text(&self, node: MemoryNode) -> String {
        self.nodes.borrow()[node.0].text.clone()
    }

    /// Inline style properties currently set on `node`
    pub fn inline_styles(&self, node: MemoryNode) -> BTreeMap<String, String> {
        self.nodes.borrow()[node.0].style.clone()
    }

    pub fn is_connected(&self, node: MemoryNode) -> bool {
        let nodes = self.nodes.borrow();
        let mut current = node.0;
        loop {
            if current == self.root.0 {
                return true;
            }
            match nodes[current].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Frames requested and not yet run, including cancelled ones
    pub fn pending_frames(&self) -> Vec<FrameId> {
        self.pending_frames.borrow().iter().map(|(f, _)| *f).collect()
    }

    pub fn cancelled_frames(&self) -> Vec<FrameId> {
        self.cancelled_frames.borrow().clone()
    }

    /// Toggle listeners attached for `group`
    pub fn toggle_listener_count(&self, group: &str) -> usize {
        self.toggle_listeners
            .borrow()
            .iter()
            .filter(|(g, _)| g == group)
            .count()
    }

    /// How many times toggle handlers were attached for `group`, including
    /// attachments that were later replaced
    pub fn toggle_attach_count(&self, group: &str) -> usize {
        self.toggle_attachments
            .borrow()
            .iter()
            .filter(|g| *g == group)
            .count()
    }

    /// Node currently carrying `group`'s toggle handlers
    pub fn toggle_listener_node(&self, group: &str) -> Option<MemoryNode> {
        self.toggle_listeners
            .borrow()
            .iter()
            .find(|(g, _)| g == group)
            .map(|(_, node)| *node)
    }

    pub fn layout_flushes(&self) -> usize {
        self.layout_flushes.get()
    }

    /// Links whose `href` attribute is exactly `href`, in document order
    pub fn links_with_href(&self, href: &str) -> Vec<MemoryNode> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&n| {
                let nodes = self.nodes.borrow();
                nodes[n.0].tag == "a" && nodes[n.0].attributes.get("href").map(String::as_str) == Some(href)
            })
            .collect()
    }

    /// First link with `href`
    pub fn link(&self, href: &str) -> Option<MemoryNode> {
        self.links_with_href(href).into_iter().next()
    }

    fn descendants(&self, from: MemoryNode) -> Vec<MemoryNode> {
        let nodes = self.nodes.borrow();
        let mut out = Vec::new();
        let mut stack = vec![from.0];
        while let Some(current) = stack.pop() {
            out.push(MemoryNode(current));
            stack.extend(nodes[current].children.iter().rev());
        }
        out
    }

    fn check_writable(&self, node: &MemoryNode) -> NavResult<()> {
        if self.failing.borrow().contains(node) {
            return Err(NavError::Dom(format!("mutation of node {} rejected", node.0)));
        }
        Ok(())
    }

    // ========================
    // Event dispatch
    // ========================

    /// Dispatch a click on `target`. Toggle listeners on the target or an
    /// ancestor run first and stop propagation; otherwise the click reaches
    /// the document listener. Returns how many toggle handlers ran.
    pub fn click(&self, menu: &mut NavMenu<MemoryNode>, target: MemoryNode) -> usize {
        let mut current = Some(target);
        while let Some(node) = current {
            let groups: Vec<String> = self
                .toggle_listeners
                .borrow()
                .iter()
                .filter(|(_, toggle)| *toggle == node)
                .map(|(group, _)| group.clone())
                .collect();
            if !groups.is_empty() {
                for group in &groups {
                    menu.on_toggle_click(self, group);
                }
                return groups.len();
            }
            current = self.nodes.borrow()[node.0].parent.map(MemoryNode);
        }
        menu.on_document_click(self, &target);
        0
    }

    /// Dispatch a keydown on `target`. Activation keys on a toggle are turned
    /// into a click. Returns whether the default action was prevented.
    pub fn key(&self, menu: &mut NavMenu<MemoryNode>, target: MemoryNode, key: &str) -> bool {
        let on_toggle = self
            .toggle_listeners
            .borrow()
            .iter()
            .any(|(_, toggle)| *toggle == target);
        if on_toggle && is_activation_key(key, 0) {
            self.click(menu, target);
            return true;
        }
        false
    }

    /// Run every frame requested so far. Cancelled frames are dropped.
    pub fn run_frames(&self, menu: &mut NavMenu<MemoryNode>) -> usize {
        let frames: Vec<_> = self.pending_frames.borrow_mut().drain(..).collect();
        let cancelled = self.cancelled_frames.borrow().clone();
        let mut ran = 0;
        for (frame, group) in frames {
            if cancelled.contains(&frame) {
                continue;
            }
            menu.on_animation_frame(self, &group, frame);
            ran += 1;
        }
        ran
    }

    /// Fire `transitionend` for `property` on one group's panel
    pub fn fire_transition_end(&self, menu: &mut NavMenu<MemoryNode>, group: &str, property: &str) {
        if self.transition_listeners.borrow().contains_key(group) {
            menu.on_transition_end(self, group, property);
        }
    }

    /// Fire the `opacity` and then the `max-height` end on every listening panel
    pub fn finish_transitions(&self, menu: &mut NavMenu<MemoryNode>) {
        let groups: Vec<String> = self.transition_listeners.borrow().keys().cloned().collect();
        for group in groups {
            menu.on_transition_end(self, &group, "opacity");
            menu.on_transition_end(self, &group, "max-height");
        }
    }

    /// Run frames, then finish transitions
    pub fn settle(&self, menu: &mut NavMenu<MemoryNode>) {
        self.run_frames(menu);
        self.finish_transitions(menu);
    }

    /// Change the fragment or path and run the highlight pass, as a
    /// `hashchange` listener would
    pub fn navigate(&self, menu: &mut NavMenu<MemoryNode>, href: &str) -> Option<MemoryNode> {
        self.set_location(href);
        menu.highlight(self)
    }
}

impl Host for MemoryHost {
    type Node = MemoryNode;

    fn element_by_id(&self, id: &str) -> Option<MemoryNode> {
        self.descendants(self.root)
            .into_iter()
            .find(|n| self.nodes.borrow()[n.0].id.as_deref() == Some(id))
    }

    fn query_all(&self, selector: &str) -> NavResult<Vec<MemoryNode>> {
        let selector = Selector::parse(selector)?;
        Ok(self
            .descendants(self.root)
            .into_iter()
            .filter(|&n| selector.matches(self, n))
            .collect())
    }

    fn contains(&self, ancestor: &MemoryNode, node: &MemoryNode) -> bool {
        let nodes = self.nodes.borrow();
        let mut current = Some(node.0);
        while let Some(index) = current {
            if index == ancestor.0 {
                return true;
            }
            current = nodes[index].parent;
        }
        false
    }

    fn location_href(&self) -> NavResult<String> {
        Ok(self.location.borrow().clone())
    }

    fn attribute(&self, node: &MemoryNode, name: &str) -> Option<String> {
        self.nodes.borrow()[node.0].attributes.get(name).cloned()
    }

    fn set_attribute(&self, node: &MemoryNode, name: &str, value: &str) -> NavResult<()> {
        self.check_writable(node)?;
        self.nodes.borrow_mut()[node.0]
            .attributes
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn has_class(&self, node: &MemoryNode, class: &str) -> bool {
        self.nodes.borrow()[node.0].classes.iter().any(|c| c == class)
    }

    fn add_class(&self, node: &MemoryNode, class: &str) -> NavResult<()> {
        self.check_writable(node)?;
        if !self.has_class(node, class) {
            self.nodes.borrow_mut()[node.0].classes.push(class.to_string());
        }
        Ok(())
    }

    fn remove_class(&self, node: &MemoryNode, class: &str) -> NavResult<()> {
        self.check_writable(node)?;
        self.nodes.borrow_mut()[node.0].classes.retain(|c| c != class);
        Ok(())
    }

    fn style_property(&self, node: &MemoryNode, name: &str) -> String {
        self.nodes.borrow()[node.0]
            .style
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    fn set_style_property(&self, node: &MemoryNode, name: &str, value: &str) -> NavResult<()> {
        self.check_writable(node)?;
        let mut nodes = self.nodes.borrow_mut();
        if value.is_empty() {
            nodes[node.0].style.remove(name);
        } else {
            nodes[node.0].style.insert(name.to_string(), value.to_string());
        }
        Ok(())
    }

    fn scroll_height(&self, node: &MemoryNode) -> i32 {
        self.nodes.borrow()[node.0].scroll_height
    }

    fn force_layout(&self, _node: &MemoryNode) {
        self.layout_flushes.set(self.layout_flushes.get() + 1);
    }

    fn inject_stylesheet(&self, id: &str, css: &str) -> NavResult<()> {
        self.check_writable(&self.head)?;
        let style = self.create_element("style");
        self.set_id(style, id);
        self.nodes.borrow_mut()[style.0].text = css.to_string();
        self.append_child(self.head, style);
        Ok(())
    }

    fn request_frame(&self, group: &str, frame: FrameId) -> NavResult<()> {
        self.pending_frames
            .borrow_mut()
            .push((frame, group.to_string()));
        Ok(())
    }

    fn cancel_frame(&self, frame: FrameId) {
        self.cancelled_frames.borrow_mut().push(frame);
    }

    fn listen_toggle(&self, group: &str, toggle: &MemoryNode) -> NavResult<()> {
        let mut listeners = self.toggle_listeners.borrow_mut();
        listeners.retain(|(g, _)| g != group);
        listeners.push((group.to_string(), *toggle));
        self.toggle_attachments.borrow_mut().push(group.to_string());
        Ok(())
    }

    fn listen_transition_end(&self, group: &str, panel: &MemoryNode) -> NavResult<()> {
        self.transition_listeners
            .borrow_mut()
            .insert(group.to_string(), *panel);
        Ok(())
    }
}

// ========================
// Selectors
// ========================

/// Descendant-combinator selector: `aside nav a[href]`, `#id a.cls`
#[derive(Debug, Clone, PartialEq)]
struct Selector {
    compounds: Vec<Compound>,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<String>,
}

impl Selector {
    fn parse(input: &str) -> NavResult<Self> {
        let compounds = input
            .split_whitespace()
            .map(Compound::parse)
            .collect::<NavResult<Vec<_>>>()?;
        if compounds.is_empty() {
            return Err(NavError::Dom(format!("empty selector '{input}'")));
        }
        Ok(Self { compounds })
    }

    fn matches(&self, host: &MemoryHost, node: MemoryNode) -> bool {
        let nodes = host.nodes.borrow();
        let (last, rest) = match self.compounds.split_last() {
            Some(split) => split,
            None => return false,
        };
        if !last.matches(&nodes[node.0]) {
            return false;
        }
        // Greedy ancestor walk is exact for descendant-only selectors.
        let mut remaining = rest.len();
        let mut current = nodes[node.0].parent;
        while remaining > 0 {
            let Some(index) = current else {
                break;
            };
            if rest[remaining - 1].matches(&nodes[index]) {
                remaining -= 1;
            }
            current = nodes[index].parent;
        }
        remaining == 0
    }
}

impl Compound {
    fn parse(input: &str) -> NavResult<Self> {
        let mut compound = Compound::default();
        let mut rest = input;
        let tag_end = rest.find(['#', '.', '[']).unwrap_or(rest.len());
        if tag_end > 0 {
            compound.tag = Some(rest[..tag_end].to_ascii_lowercase());
        }
        rest = &rest[tag_end..];
        while !rest.is_empty() {
            let marker = rest.as_bytes()[0];
            if marker == b'[' {
                let close = rest
                    .find(']')
                    .ok_or_else(|| NavError::Dom(format!("unclosed attribute in '{input}'")))?;
                compound.attributes.push(rest[1..close].to_string());
                rest = &rest[close + 1..];
                continue;
            }
            let body = &rest[1..];
            let end = body.find(['#', '.', '[']).unwrap_or(body.len());
            let name = body[..end].to_string();
            match marker {
                b'#' => compound.id = Some(name),
                b'.' => compound.classes.push(name),
                _ => return Err(NavError::Dom(format!("unsupported selector '{input}'"))),
            }
            rest = &body[end..];
        }
        Ok(compound)
    }

    fn matches(&self, node: &NodeData) -> bool {
        self.tag.as_ref().map_or(true, |t| *t == node.tag)
            && self.id.as_ref().map_or(true, |id| node.id.as_ref() == Some(id))
            && self.classes.iter().all(|c| node.classes.contains(c))
            && self.attributes.iter().all(|a| node.attributes.contains_key(a))
    }
}

// ========================
// Sidebar markup
// ========================

/// Links of the admin sidebar, grouped the way the template renders them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SidebarLayout {
    /// Links rendered directly under `<nav>`, before the groups
    #[serde(default)]
    pub top_links: Vec<String>,
    /// Group key to child link hrefs; groups missing here are not rendered
    pub groups: BTreeMap<String, Vec<String>>,
    /// Height of one link row, used for panel `scrollHeight`
    #[serde(default = "default_row_height")]
    pub row_height: i32,
}

fn default_row_height() -> i32 {
    36
}

impl SidebarLayout {
    /// The stock admin console sidebar
    pub fn admin() -> Self {
        let mut groups = BTreeMap::new();
        groups.insert(
            "employees".to_string(),
            vec!["/admin/employees".to_string(), "/admin/employees/new".to_string()],
        );
        groups.insert(
            "attendance".to_string(),
            vec![
                "/admin/attendance".to_string(),
                "/admin/attendance/reports#monthly".to_string(),
            ],
        );
        groups.insert(
            "requests".to_string(),
            vec!["/admin/requests/leave".to_string(), "/admin/requests/overtime".to_string()],
        );
        Self {
            top_links: vec!["/admin/dashboard".to_string()],
            groups,
            row_height: default_row_height(),
        }
    }

    /// Build `<aside><nav>..</nav></aside>` under `<body>` of a new host
    pub fn build(&self, config: &NavConfig, location: &str) -> MemoryHost {
        let host = MemoryHost::new(location);
        let aside = host.create_element("aside");
        let nav = host.create_element("nav");
        host.append_child(host.body(), aside);
        host.append_child(aside, nav);

        for href in &self.top_links {
            let link = host.create_element("a");
            let _ = host.set_attribute(&link, "href", href);
            host.append_child(nav, link);
        }
        for group in &config.groups {
            if let Some(links) = self.groups.get(&group.key) {
                self.build_group(&host, nav, group, links);
            }
        }
        host
    }

    /// Render one group under `parent`; returns its wrapper
    pub fn build_group(
        &self,
        host: &MemoryHost,
        parent: MemoryNode,
        group: &GroupConfig,
        links: &[String],
    ) -> MemoryNode {
        let wrapper = host.create_element("div");
        host.set_id(wrapper, &group.wrapper_id);

        let toggle = host.create_element("button");
        host.set_id(toggle, &group.toggle_id);
        let _ = host.set_attribute(&toggle, "aria-expanded", "false");
        if let Some(indicator_id) = &group.indicator_id {
            let caret = host.create_element("span");
            host.set_id(caret, indicator_id);
            host.append_child(toggle, caret);
        }

        let panel = host.create_element("div");
        host.set_id(panel, &group.panel_id);
        let _ = host.add_class(&panel, "hidden");
        let rows = i32::try_from(links.len()).unwrap_or(i32::MAX);
        host.set_scroll_height(panel, self.row_height.saturating_mul(rows));
        for href in links {
            let link = host.create_element("a");
            let _ = host.set_attribute(&link, "href", href);
            host.append_child(panel, link);
        }

        host.append_child(wrapper, toggle);
        host.append_child(wrapper, panel);
        host.append_child(parent, wrapper);
        wrapper
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_matching() {
        let config = NavConfig::default();
        let host = SidebarLayout::admin().build(&config, "https://hr.test/admin/dashboard");
        let links = host.query_all("aside nav a[href]").unwrap();
        assert_eq!(links.len(), 7);
        assert_eq!(host.attribute(&links[0], "href").as_deref(), Some("/admin/dashboard"));

        let in_panel = host.query_all("#nav-requests-sub a").unwrap();
        assert_eq!(in_panel.len(), 2);
        assert!(host.query_all("section a").unwrap().is_empty());
    }

    #[test]
    fn test_class_selector() {
        let host = MemoryHost::new("https://hr.test/");
        let link = host.create_element("a");
        host.append_child(host.body(), link);
        host.add_class(&link, "nav-active").unwrap();
        assert_eq!(host.query_all("a.nav-active").unwrap(), vec![link]);
        assert!(host.query_all("a.other").unwrap().is_empty());
    }

    #[test]
    fn test_detached_nodes_are_not_found() {
        let host = MemoryHost::new("https://hr.test/");
        let div = host.create_element("div");
        host.set_id(div, "panel");
        assert!(host.element_by_id("panel").is_none());
        host.append_child(host.body(), div);
        assert_eq!(host.element_by_id("panel"), Some(div));
        host.detach(div);
        assert!(!host.is_connected(div));
        assert!(host.element_by_id("panel").is_none());
    }

    #[test]
    fn test_contains_is_inclusive() {
        let host = MemoryHost::new("https://hr.test/");
        let outer = host.create_element("div");
        let inner = host.create_element("span");
        host.append_child(host.body(), outer);
        host.append_child(outer, inner);
        assert!(host.contains(&outer, &inner));
        assert!(host.contains(&outer, &outer));
        assert!(!host.contains(&inner, &outer));
    }

    #[test]
    fn test_failing_node_rejects_mutations() {
        let host = MemoryHost::new("https://hr.test/");
        let node = host.create_element("div");
        host.fail_mutations(node);
        assert!(matches!(host.add_class(&node, "x"), Err(NavError::Dom(_))));
        assert!(host.classes(node).is_empty());
    }
}
