//! Arena document model the page behaviors mutate.

use std::collections::{HashMap, HashSet};

use crate::selector::{
    SelectorCombinator, SelectorPart, SelectorPseudoClass, SelectorStep, parse_selector_groups,
};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub(crate) enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) node_type: NodeType,
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) tag_name: String,
    // Source order is kept so serialization is stable.
    pub(crate) attrs: Vec<(String, String)>,
    // Dirty value. `None` while the control still reflects its markup.
    pub(crate) value: Option<String>,
}

impl Element {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn has_class(&self, class_name: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class_name))
    }
}

#[derive(Debug, Clone)]
pub struct Dom {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
    id_index: HashMap<String, NodeId>,
    // Released slots, reused by the next created node.
    free: Vec<NodeId>,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    pub fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            node_type: NodeType::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            id_index: HashMap::new(),
            free: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn create_node(&mut self, parent: Option<NodeId>, node_type: NodeType) -> NodeId {
        let node = Node {
            parent,
            children: Vec::new(),
            node_type,
        };
        let id = match self.free.pop() {
            Some(id) => {
                self.nodes[id.0] = node;
                id
            }
            None => {
                self.nodes.push(node);
                NodeId(self.nodes.len() - 1)
            }
        };
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].children.push(id);
        }
        id
    }

    pub fn create_element(
        &mut self,
        parent: NodeId,
        tag_name: &str,
        attrs: Vec<(String, String)>,
    ) -> Result<NodeId> {
        if !self.can_have_children(parent) {
            return Err(Error::InvalidNode(format!(
                "node {} cannot have children",
                parent.0
            )));
        }
        let id = self.create_node(Some(parent), NodeType::Element(new_element(tag_name, attrs)));
        if let Some(id_attr) = self.attr(id, "id") {
            self.id_index.entry(id_attr).or_insert(id);
        }
        Ok(id)
    }

    pub fn create_detached_element(&mut self, tag_name: &str) -> NodeId {
        self.create_node(None, NodeType::Element(new_element(tag_name, Vec::new())))
    }

    pub fn create_text(&mut self, parent: NodeId, text: &str) -> Result<NodeId> {
        if !self.can_have_children(parent) {
            return Err(Error::InvalidNode(format!(
                "node {} cannot have children",
                parent.0
            )));
        }
        Ok(self.create_node(Some(parent), NodeType::Text(text.to_string())))
    }

    pub(crate) fn element(&self, node_id: NodeId) -> Option<&Element> {
        match &self.nodes.get(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn element_mut(&mut self, node_id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut_or_err(&mut self, node_id: NodeId) -> Result<&mut Element> {
        self.element_mut(node_id)
            .ok_or_else(|| Error::InvalidNode(format!("node {} is not an element", node_id.0)))
    }

    pub fn is_element(&self, node_id: NodeId) -> bool {
        self.element(node_id).is_some()
    }

    pub fn tag_name(&self, node_id: NodeId) -> Option<&str> {
        self.element(node_id).map(|e| e.tag_name.as_str())
    }

    pub fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes.get(node_id.0)?.parent
    }

    pub fn children(&self, node_id: NodeId) -> &[NodeId] {
        self.nodes
            .get(node_id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    pub fn attr(&self, node_id: NodeId, name: &str) -> Option<String> {
        self.element(node_id)?.attr(name).map(str::to_string)
    }

    pub fn has_attr(&self, node_id: NodeId, name: &str) -> bool {
        self.element(node_id)
            .is_some_and(|element| element.attr(name).is_some())
    }

    pub fn set_attr(&mut self, node_id: NodeId, name: &str, value: &str) -> Result<()> {
        let name = name.to_ascii_lowercase();
        let element = self.element_mut_or_err(node_id)?;
        if let Some(slot) = element.attrs.iter_mut().find(|(key, _)| *key == name) {
            slot.1 = value.to_string();
        } else {
            element.attrs.push((name.clone(), value.to_string()));
        }
        if name == "id" {
            self.rebuild_id_index();
        }
        Ok(())
    }

    pub fn remove_attr(&mut self, node_id: NodeId, name: &str) -> Result<()> {
        let element = self.element_mut_or_err(node_id)?;
        element.attrs.retain(|(key, _)| key != name);
        if name == "id" {
            self.rebuild_id_index();
        }
        Ok(())
    }

    pub fn class_contains(&self, node_id: NodeId, class_name: &str) -> bool {
        self.element(node_id)
            .is_some_and(|element| element.has_class(class_name))
    }

    pub fn is_disabled(&self, node_id: NodeId) -> bool {
        self.has_attr(node_id, "disabled")
    }

    pub fn is_required(&self, node_id: NodeId) -> bool {
        self.has_attr(node_id, "required")
    }

    pub fn text_content(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node_id, &mut out);
        out
    }

    fn collect_text(&self, node_id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(node_id.0) else {
            return;
        };
        match &node.node_type {
            NodeType::Text(text) => out.push_str(text),
            NodeType::Document | NodeType::Element(_) => {
                for child in &node.children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    pub fn set_text_content(&mut self, node_id: NodeId, value: &str) -> Result<()> {
        self.element_mut_or_err(node_id)?;
        let old = std::mem::take(&mut self.nodes[node_id.0].children);
        for child in old {
            self.nodes[child.0].parent = None;
        }
        if !value.is_empty() {
            self.create_text(node_id, value)?;
        }
        self.rebuild_id_index();
        Ok(())
    }

    /// Current form value, the way a browser reports `element.value`.
    ///
    /// Until a value is set, inputs report their `value` attribute and
    /// textareas their text content, so a tree built node by node reads the
    /// same as a parsed one.
    pub fn value(&self, node_id: NodeId) -> Result<String> {
        let element = self
            .element(node_id)
            .ok_or_else(|| Error::InvalidNode(format!("node {} is not an element", node_id.0)))?;
        if let Some(value) = &element.value {
            return Ok(value.clone());
        }
        Ok(match element.tag_name.as_str() {
            "select" => self.select_value(node_id),
            "textarea" => self.text_content(node_id),
            _ => element.attr("value").unwrap_or_default().to_string(),
        })
    }

    /// Sets the live value. On a `select` the first option with a matching
    /// value becomes selected; with no match nothing is selected and the
    /// value reads as `""`.
    pub fn set_value(&mut self, node_id: NodeId, value: &str) -> Result<()> {
        let is_select = self.tag_name(node_id) == Some("select");
        if !is_select {
            self.element_mut_or_err(node_id)?.value = Some(value.to_string());
            return Ok(());
        }

        let options = self.options_of(node_id);
        let selected = options
            .iter()
            .copied()
            .find(|option| self.option_value(*option) == value);
        for option in options {
            if Some(option) == selected {
                self.set_attr(option, "selected", "")?;
            } else {
                self.remove_attr(option, "selected")?;
            }
        }
        self.element_mut_or_err(node_id)?.value = match selected {
            Some(_) => None,
            None => Some(String::new()),
        };
        Ok(())
    }

    fn select_value(&self, select: NodeId) -> String {
        let options = self.options_of(select);
        options
            .iter()
            .find(|option| self.has_attr(**option, "selected"))
            .or_else(|| options.first())
            .map(|option| self.option_value(*option))
            .unwrap_or_default()
    }

    fn option_value(&self, option: NodeId) -> String {
        self.attr(option, "value")
            .unwrap_or_else(|| self.text_content(option).trim().to_string())
    }

    fn options_of(&self, select: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_elements_descendants_dfs(select, &mut out);
        out.retain(|node| self.tag_name(*node) == Some("option"));
        out
    }

    pub fn style(&self, node_id: NodeId, property: &str) -> Option<String> {
        let decls = parse_style_declarations(self.element(node_id)?.attr("style"));
        let property = property.to_ascii_lowercase();
        decls
            .into_iter()
            .find(|(name, _)| *name == property)
            .map(|(_, value)| value)
    }

    pub fn set_style(&mut self, node_id: NodeId, property: &str, value: &str) -> Result<()> {
        let element = self.element_mut_or_err(node_id)?;
        let mut decls = parse_style_declarations(element.attr("style"));
        let property = property.to_ascii_lowercase();
        if value.is_empty() {
            decls.retain(|(name, _)| *name != property);
        } else if let Some(pos) = decls.iter().position(|(name, _)| *name == property) {
            decls[pos].1 = value.to_string();
        } else {
            decls.push((property, value.to_string()));
        }
        if decls.is_empty() {
            self.remove_attr(node_id, "style")
        } else {
            self.set_attr(node_id, "style", &serialize_style_declarations(&decls))
        }
    }

    pub fn next_element_sibling(&self, node_id: NodeId) -> Option<NodeId> {
        let parent = self.parent(node_id)?;
        let children = &self.nodes[parent.0].children;
        let pos = children.iter().position(|id| *id == node_id)?;
        children
            .iter()
            .skip(pos + 1)
            .copied()
            .find(|sibling| self.is_element(*sibling))
    }

    pub fn previous_element_sibling(&self, node_id: NodeId) -> Option<NodeId> {
        let parent = self.parent(node_id)?;
        let children = &self.nodes[parent.0].children;
        let pos = children.iter().position(|id| *id == node_id)?;
        children[..pos]
            .iter()
            .rev()
            .copied()
            .find(|sibling| self.is_element(*sibling))
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_insertion(parent, child)?;
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        self.rebuild_id_index();
        Ok(())
    }

    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: NodeId,
    ) -> Result<()> {
        if child == reference {
            return Ok(());
        }
        self.check_insertion(parent, child)?;
        if self.parent(reference) != Some(parent) {
            return Err(Error::InvalidNode(
                "insert_before reference is not a direct child".into(),
            ));
        }
        self.detach(child);
        let index = self.nodes[parent.0]
            .children
            .iter()
            .position(|id| *id == reference)
            .ok_or_else(|| Error::InvalidNode("insert_before reference is missing".into()))?;
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(index, child);
        self.rebuild_id_index();
        Ok(())
    }

    /// Inserts `child` directly after `target` among its parent's children.
    pub fn insert_after(&mut self, target: NodeId, child: NodeId) -> Result<()> {
        let parent = self
            .parent(target)
            .ok_or_else(|| Error::InvalidNode("insert_after target is detached".into()))?;
        let pos = self.nodes[parent.0]
            .children
            .iter()
            .position(|id| *id == target)
            .ok_or_else(|| Error::InvalidNode("insert_after target is detached".into()))?;
        match self.nodes[parent.0].children.get(pos + 1).copied() {
            Some(next) => self.insert_before(parent, child, next),
            None => self.append_child(parent, child),
        }
    }

    pub fn remove_node(&mut self, node: NodeId) -> Result<()> {
        if node == self.root {
            return Err(Error::InvalidNode("cannot remove document root".into()));
        }
        if !self.is_valid_node(node) {
            return Err(Error::InvalidNode(format!("unknown node {}", node.0)));
        }
        self.detach(node);
        self.rebuild_id_index();
        Ok(())
    }

    /// Returns a removed subtree's slots to the arena. Ids inside it must not
    /// be used afterwards; the next created nodes take them over.
    pub(crate) fn release(&mut self, node: NodeId) -> Result<()> {
        if node == self.root || !self.is_valid_node(node) || self.parent(node).is_some() {
            return Err(Error::InvalidNode(format!(
                "node {} must be removed before release",
                node.0
            )));
        }
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            let slot = &mut self.nodes[current.0];
            stack.append(&mut slot.children);
            slot.parent = None;
            slot.node_type = NodeType::Text(String::new());
            self.free.push(current);
        }
        Ok(())
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(old_parent) = self.nodes[node.0].parent.take() {
            self.nodes[old_parent.0].children.retain(|id| *id != node);
        }
    }

    fn check_insertion(&self, parent: NodeId, child: NodeId) -> Result<()> {
        if !self.can_have_children(parent) {
            return Err(Error::InvalidNode(format!(
                "node {} cannot have children",
                parent.0
            )));
        }
        if child == self.root || !self.is_valid_node(child) {
            return Err(Error::InvalidNode(format!("cannot insert node {}", child.0)));
        }
        // Prevent cycles: parent must not be inside child's subtree.
        let mut cursor = Some(parent);
        while let Some(node) = cursor {
            if node == child {
                return Err(Error::InvalidNode("insertion would create a cycle".into()));
            }
            cursor = self.parent(node);
        }
        Ok(())
    }

    fn can_have_children(&self, node_id: NodeId) -> bool {
        matches!(
            self.nodes.get(node_id.0).map(|n| &n.node_type),
            Some(NodeType::Document | NodeType::Element(_))
        )
    }

    fn is_valid_node(&self, node_id: NodeId) -> bool {
        node_id.0 < self.nodes.len()
    }

    pub fn is_connected(&self, node_id: NodeId) -> bool {
        let mut cursor = Some(node_id);
        while let Some(node) = cursor {
            if node == self.root {
                return true;
            }
            cursor = self.parent(node);
        }
        false
    }

    pub fn by_id(&self, id: &str) -> Option<NodeId> {
        self.id_index.get(id).copied()
    }

    pub(crate) fn rebuild_id_index(&mut self) {
        let mut next = HashMap::new();
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            if let NodeType::Element(element) = &self.nodes[node.0].node_type {
                if let Some(id) = element.attr("id").filter(|id| !id.is_empty()) {
                    next.entry(id.to_string()).or_insert(node);
                }
            }
            for child in self.nodes[node.0].children.iter().rev() {
                stack.push(*child);
            }
        }
        self.id_index = next;
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    /// Connected elements matching `selector`, in document order.
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let groups = parse_selector_groups(selector)?;

        if groups.len() == 1 && groups[0].len() == 1 {
            if let Some(id) = groups[0][0].step.id_only() {
                return Ok(self.by_id(id).into_iter().collect());
            }
        }

        let mut ids = Vec::new();
        self.collect_elements_dfs(self.root, &mut ids);
        Ok(self.filter_matching(ids, &groups))
    }

    /// Descendants of `root` matching `selector`, in document order.
    pub fn query_selector_all_from(&self, root: NodeId, selector: &str) -> Result<Vec<NodeId>> {
        let groups = parse_selector_groups(selector)?;
        let mut ids = Vec::new();
        self.collect_elements_descendants_dfs(root, &mut ids);
        Ok(self.filter_matching(ids, &groups))
    }

    fn filter_matching(
        &self,
        candidates: Vec<NodeId>,
        groups: &[Vec<SelectorPart>],
    ) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        candidates
            .into_iter()
            .filter(|candidate| {
                groups
                    .iter()
                    .any(|steps| self.matches_selector_chain(*candidate, steps))
                    && seen.insert(*candidate)
            })
            .collect()
    }

    pub fn matches_selector(&self, node_id: NodeId, selector: &str) -> Result<bool> {
        if !self.is_element(node_id) {
            return Ok(false);
        }
        let groups = parse_selector_groups(selector)?;
        Ok(groups
            .iter()
            .any(|steps| self.matches_selector_chain(node_id, steps)))
    }

    /// Nearest inclusive ancestor matching `selector`.
    pub fn closest(&self, node_id: NodeId, selector: &str) -> Result<Option<NodeId>> {
        let groups = parse_selector_groups(selector)?;
        let mut cursor = Some(node_id);
        while let Some(current) = cursor {
            if self.is_element(current)
                && groups
                    .iter()
                    .any(|steps| self.matches_selector_chain(current, steps))
            {
                return Ok(Some(current));
            }
            cursor = self.parent(current);
        }
        Ok(None)
    }

    pub fn find_ancestor_by_tag(&self, node_id: NodeId, tag: &str) -> Option<NodeId> {
        let mut cursor = self.parent(node_id);
        while let Some(current) = cursor {
            if self
                .tag_name(current)
                .is_some_and(|name| name.eq_ignore_ascii_case(tag))
            {
                return Some(current);
            }
            cursor = self.parent(current);
        }
        None
    }

    fn collect_elements_dfs(&self, node_id: NodeId, out: &mut Vec<NodeId>) {
        if self.is_element(node_id) {
            out.push(node_id);
        }
        self.collect_elements_descendants_dfs(node_id, out);
    }

    fn collect_elements_descendants_dfs(&self, node_id: NodeId, out: &mut Vec<NodeId>) {
        for child in self.children(node_id) {
            self.collect_elements_dfs(*child, out);
        }
    }

    fn matches_selector_chain(&self, node_id: NodeId, steps: &[SelectorPart]) -> bool {
        let Some(last) = steps.last() else {
            return false;
        };
        if !self.matches_step(node_id, &last.step) {
            return false;
        }

        let mut current = node_id;
        for idx in (1..steps.len()).rev() {
            let prev_step = &steps[idx - 1].step;
            let combinator = steps[idx]
                .combinator
                .unwrap_or(SelectorCombinator::Descendant);

            let matched = match combinator {
                SelectorCombinator::Child => self
                    .parent(current)
                    .filter(|parent| self.matches_step(*parent, prev_step)),
                SelectorCombinator::Descendant => {
                    let mut cursor = self.parent(current);
                    let mut found = None;
                    while let Some(parent) = cursor {
                        if self.matches_step(parent, prev_step) {
                            found = Some(parent);
                            break;
                        }
                        cursor = self.parent(parent);
                    }
                    found
                }
                SelectorCombinator::AdjacentSibling => self
                    .previous_element_sibling(current)
                    .filter(|sibling| self.matches_step(*sibling, prev_step)),
                SelectorCombinator::GeneralSibling => {
                    let mut cursor = self.previous_element_sibling(current);
                    let mut found = None;
                    while let Some(sibling) = cursor {
                        if self.matches_step(sibling, prev_step) {
                            found = Some(sibling);
                            break;
                        }
                        cursor = self.previous_element_sibling(sibling);
                    }
                    found
                }
            };

            let Some(matched) = matched else {
                return false;
            };
            current = matched;
        }

        true
    }

    fn matches_step(&self, node_id: NodeId, step: &SelectorStep) -> bool {
        let Some(element) = self.element(node_id) else {
            return false;
        };

        if let Some(tag) = &step.tag {
            if !element.tag_name.eq_ignore_ascii_case(tag) {
                return false;
            }
        }

        if let Some(id) = &step.id {
            if element.attr("id") != Some(id.as_str()) {
                return false;
            }
        }

        if step
            .classes
            .iter()
            .any(|class_name| !element.has_class(class_name))
        {
            return false;
        }

        if !step
            .attrs
            .iter()
            .all(|cond| cond.matches(|key| element.attr(key).map(str::to_string)))
        {
            return false;
        }

        step.pseudo_classes.iter().all(|pseudo| {
            let required = element.attr("required").is_some();
            let disabled = element.attr("disabled").is_some();
            match pseudo {
                SelectorPseudoClass::Required => required,
                SelectorPseudoClass::Optional => !required,
                SelectorPseudoClass::Disabled => disabled,
                SelectorPseudoClass::Enabled => !disabled,
            }
        })
    }

    pub fn dump_node(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        self.dump_into(node_id, &mut out);
        out
    }

    fn dump_into(&self, node_id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(node_id.0) else {
            return;
        };
        match &node.node_type {
            NodeType::Document => {
                for child in &node.children {
                    self.dump_into(*child, out);
                }
            }
            NodeType::Text(text) => out.push_str(&escape_html_text(text)),
            NodeType::Element(element) => {
                out.push('<');
                out.push_str(&element.tag_name);
                for (k, v) in &element.attrs {
                    out.push(' ');
                    out.push_str(k);
                    out.push_str("=\"");
                    out.push_str(&escape_html_attr(v));
                    out.push('"');
                }
                out.push('>');
                if crate::html::is_void_tag(&element.tag_name) {
                    return;
                }
                for child in &node.children {
                    self.dump_into(*child, out);
                }
                out.push_str("</");
                out.push_str(&element.tag_name);
                out.push('>');
            }
        }
    }
}

fn new_element(tag_name: &str, attrs: Vec<(String, String)>) -> Element {
    Element {
        tag_name: tag_name.to_ascii_lowercase(),
        attrs,
        value: None,
    }
}

fn parse_style_declarations(style_attr: Option<&str>) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    let Some(style_attr) = style_attr else {
        return out;
    };

    for decl in style_attr.split(';') {
        let Some((name, value)) = decl.split_once(':') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() {
            continue;
        }
        let value = value.trim().to_string();
        if let Some(pos) = out.iter().position(|(existing, _)| *existing == name) {
            out[pos].1 = value;
        } else {
            out.push((name, value));
        }
    }

    out
}

fn serialize_style_declarations(decls: &[(String, String)]) -> String {
    decls
        .iter()
        .map(|(name, value)| format!("{name}: {value};"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape_html_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_html_attr(value: &str) -> String {
    escape_html_text(value).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::parse_html;

    #[test]
    fn query_selector_all_returns_document_order() -> Result<()> {
        let dom = parse_html(
            "<div class='alert' id='a'></div><section><p class='alert' id='b'></p></section><span class='alert' id='c'></span>",
        )?;
        let ids = dom
            .query_selector_all(".alert")?
            .into_iter()
            .map(|node| dom.attr(node, "id").unwrap_or_default())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["a", "b", "c"]);
        Ok(())
    }

    #[test]
    fn query_selector_all_from_only_sees_descendants() -> Result<()> {
        let dom = parse_html(
            "<form id='one'><input id='x' required></form><form id='two'><input id='y' required><input id='z'></form>",
        )?;
        let two = dom.by_id("two").expect("form two");
        let found = dom.query_selector_all_from(two, "[required]")?;
        assert_eq!(found, vec![dom.by_id("y").expect("input y")]);
        Ok(())
    }

    #[test]
    fn insert_after_places_node_before_next_sibling() -> Result<()> {
        let mut dom = parse_html("<p id='p'><input id='field'><span id='after'></span></p>")?;
        let field = dom.by_id("field").expect("field");
        let hint = dom.create_detached_element("div");
        dom.insert_after(field, hint)?;
        assert_eq!(dom.next_element_sibling(field), Some(hint));
        assert_eq!(dom.next_element_sibling(hint), dom.by_id("after"));
        Ok(())
    }

    #[test]
    fn insert_after_detached_target_fails() {
        let mut dom = Dom::new();
        let lonely = dom.create_detached_element("input");
        let hint = dom.create_detached_element("div");
        assert!(matches!(
            dom.insert_after(lonely, hint),
            Err(Error::InvalidNode(_))
        ));
    }

    #[test]
    fn append_child_rejects_cycles() -> Result<()> {
        let mut dom = parse_html("<div id='outer'><div id='inner'></div></div>")?;
        let outer = dom.by_id("outer").expect("outer");
        let inner = dom.by_id("inner").expect("inner");
        assert!(matches!(
            dom.append_child(inner, outer),
            Err(Error::InvalidNode(_))
        ));
        Ok(())
    }

    #[test]
    fn remove_node_disconnects_subtree_and_id_index() -> Result<()> {
        let mut dom = parse_html("<div id='wrap'><span id='inner'>x</span></div>")?;
        let wrap = dom.by_id("wrap").expect("wrap");
        let inner = dom.by_id("inner").expect("inner");
        dom.remove_node(wrap)?;
        assert!(!dom.is_connected(inner));
        assert_eq!(dom.by_id("inner"), None);
        assert!(dom.query_selector_all("span")?.is_empty());
        assert!(matches!(
            dom.remove_node(dom.root()),
            Err(Error::InvalidNode(_))
        ));
        Ok(())
    }

    #[test]
    fn set_style_updates_single_declaration() -> Result<()> {
        let mut dom = parse_html("<div id='n' style='color: red; opacity: 1'></div>")?;
        let node = dom.by_id("n").expect("node");
        dom.set_style(node, "opacity", "0")?;
        dom.set_style(node, "display", "none")?;
        assert_eq!(dom.style(node, "opacity").as_deref(), Some("0"));
        assert_eq!(dom.style(node, "color").as_deref(), Some("red"));
        assert_eq!(
            dom.attr(node, "style").as_deref(),
            Some("color: red; opacity: 0; display: none;")
        );
        dom.set_style(node, "color", "")?;
        assert_eq!(dom.style(node, "color"), None);
        Ok(())
    }

    #[test]
    fn form_values_follow_browser_rules() -> Result<()> {
        let dom = parse_html(
            "<input id='i' value='hi'><textarea id='t'>body</textarea>\
             <select id='s'><option value='a'>A</option><option selected>B</option></select>\
             <select id='e'><option value='first'>1</option></select>",
        )?;
        assert_eq!(dom.value(dom.by_id("i").expect("i"))?, "hi");
        assert_eq!(dom.value(dom.by_id("t").expect("t"))?, "body");
        assert_eq!(dom.value(dom.by_id("s").expect("s"))?, "B");
        assert_eq!(dom.value(dom.by_id("e").expect("e"))?, "first");
        Ok(())
    }

    #[test]
    fn set_value_on_select_moves_selection() -> Result<()> {
        let mut dom = parse_html(
            "<select id='s'><option value='a' selected>A</option><option value='b'>B</option></select>",
        )?;
        let select = dom.by_id("s").expect("select");
        dom.set_value(select, "b")?;
        assert_eq!(dom.value(select)?, "b");
        Ok(())
    }

    #[test]
    fn values_of_hand_built_controls_follow_markup() -> Result<()> {
        let mut dom = Dom::new();
        let form = dom.create_element(dom.root(), "form", Vec::new())?;
        let area = dom.create_element(form, "textarea", vec![("required".into(), String::new())])?;
        dom.create_text(area, "Hello body")?;
        let input = dom.create_element(form, "input", vec![("value".into(), "seed".into())])?;

        assert_eq!(dom.value(area)?, "Hello body");
        assert_eq!(dom.value(input)?, "seed");

        dom.set_value(area, "typed")?;
        dom.set_text_content(area, "ignored once dirty")?;
        assert_eq!(dom.value(area)?, "typed");
        dom.set_attr(input, "value", "new default")?;
        assert_eq!(dom.value(input)?, "new default");
        Ok(())
    }

    #[test]
    fn set_value_without_matching_option_clears_select() -> Result<()> {
        let mut dom = parse_html(
            "<select id='s' required><option value='a'>A</option><option value='b'>B</option></select>",
        )?;
        let select = dom.by_id("s").expect("select");
        assert_eq!(dom.value(select)?, "a");
        dom.set_value(select, "zzz")?;
        assert_eq!(dom.value(select)?, "");
        assert!(dom.query_selector_all("option[selected]")?.is_empty());
        dom.set_value(select, "b")?;
        assert_eq!(dom.value(select)?, "b");
        Ok(())
    }

    #[test]
    fn matches_selector_checks_one_node() -> Result<()> {
        let dom = parse_html("<form id='f'><input id='t' class='form-control' required></form>")?;
        let input = dom.by_id("t").expect("input");
        assert!(dom.matches_selector(input, "form > input.form-control:required")?);
        assert!(dom.matches_selector(input, "textarea, [required]")?);
        assert!(!dom.matches_selector(input, ":disabled")?);
        assert!(!dom.matches_selector(dom.root(), "*")?);
        assert!(matches!(
            dom.matches_selector(input, "input["),
            Err(Error::UnsupportedSelector(_))
        ));
        Ok(())
    }

    #[test]
    fn released_slots_are_reused() -> Result<()> {
        let mut dom = parse_html("<p id='p'><input id='field'></p>")?;
        let field = dom.by_id("field").expect("field");
        let hint = dom.create_detached_element("div");
        dom.set_text_content(hint, "This field is required")?;
        dom.insert_after(field, hint)?;
        let arena = dom.nodes.len();

        assert!(matches!(dom.release(hint), Err(Error::InvalidNode(_))));
        dom.remove_node(hint)?;
        dom.release(hint)?;

        let again = dom.create_detached_element("div");
        dom.set_text_content(again, "This field is required")?;
        assert_eq!(dom.nodes.len(), arena);
        assert_eq!(dom.text_content(again), "This field is required");
        Ok(())
    }

    #[test]
    fn pseudo_classes_read_boolean_attributes() -> Result<()> {
        let dom = parse_html("<input id='r' required><input id='d' disabled>")?;
        assert_eq!(dom.query_selector_all(":required")?, vec![dom.by_id("r").expect("r")]);
        assert_eq!(dom.query_selector_all("input:disabled")?, vec![dom.by_id("d").expect("d")]);
        assert_eq!(dom.query_selector_all("input:optional")?, vec![dom.by_id("d").expect("d")]);
        Ok(())
    }

    #[test]
    fn closest_includes_self() -> Result<()> {
        let dom =
            parse_html("<button class='btn-danger' id='b'><a id='a' href='/x'>x</a></button>")?;
        let anchor = dom.by_id("a").expect("anchor");
        assert_eq!(dom.closest(anchor, "a[href]")?, Some(anchor));
        assert_eq!(dom.closest(anchor, ".btn-danger")?, dom.by_id("b"));
        Ok(())
    }

    #[test]
    fn dump_node_escapes_and_skips_void_end_tags() -> Result<()> {
        let dom = parse_html("<p id='p' title='a&quot;b'>1 &lt; 2<br></p>")?;
        let p = dom.by_id("p").expect("p");
        assert_eq!(
            dom.dump_node(p),
            "<p id=\"p\" title=\"a&quot;b\">1 &lt; 2<br></p>"
        );
        Ok(())
    }
}
