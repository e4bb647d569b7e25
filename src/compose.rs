use crate::template::ContractTemplate;
use crate::vars::{VarContext, format_date_jp};
use std::collections::BTreeMap;

/// Structural tag marking a pagination boundary. Every direct child of the
/// composed root carrying this class is treated as an indivisible unit by
/// the pagination engine.
pub const SECTION_CLASS: &str = "contract-section";

/// Stable identifier of the composed document root, the handle the
/// environment hands to the pagination engine.
pub const CONTRACT_ROOT_ID: &str = "contract-content";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Default)]
pub struct Node {
    pub tag: String,
    pub elem_id: Option<String>,
    pub class: String,
    pub text: String,
    style: BTreeMap<String, String>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

/// Arena-backed element tree standing in for the rendered DOM subtree. The
/// sanitizer mutates explicit styles through it; the paginator walks its
/// section boundaries; the rasterization capability consumes subtrees of it.
#[derive(Debug, Clone, Default)]
pub struct DomTree {
    nodes: Vec<Node>,
    /// Document-level custom color variables (the theme the shell applies).
    theme: BTreeMap<String, String>,
}

impl DomTree {
    pub fn new(root_tag: &str) -> (DomTree, NodeId) {
        let mut tree = DomTree::default();
        let root = tree.push_node(Node {
            tag: root_tag.to_string(),
            ..Node::default()
        });
        (tree, root)
    }

    fn push_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn add_child(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = self.push_node(Node {
            tag: tag.to_string(),
            parent: Some(parent),
            ..Node::default()
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) {
        self.nodes[id.0].text = text.to_string();
    }

    pub fn set_class(&mut self, id: NodeId, class: &str) {
        self.nodes[id.0].class = class.to_string();
    }

    pub fn set_elem_id(&mut self, id: NodeId, elem_id: &str) {
        self.nodes[id.0].elem_id = Some(elem_id.to_string());
    }

    /// Sets an explicit style property. An empty value unsets it, mirroring
    /// how inline style removal behaves on the rendering surface.
    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) {
        if value.is_empty() {
            self.nodes[id.0].style.remove(property);
        } else {
            self.nodes[id.0]
                .style
                .insert(property.to_string(), value.to_string());
        }
    }

    /// Explicit (non-computed) value, empty when unset.
    pub fn explicit_style(&self, id: NodeId, property: &str) -> String {
        self.nodes[id.0]
            .style
            .get(property)
            .cloned()
            .unwrap_or_default()
    }

    /// Computed value: explicit wins, then the nearest ancestor's explicit
    /// value, then the document theme's matching custom variable.
    pub fn computed_style(&self, id: NodeId, property: &str) -> String {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if let Some(value) = self.nodes[current.0].style.get(property) {
                return value.clone();
            }
            cursor = self.nodes[current.0].parent;
        }
        theme_var_for(property)
            .and_then(|var| self.theme.get(var))
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_theme_var(&mut self, var: &str, value: &str) {
        if value.is_empty() {
            self.theme.remove(var);
        } else {
            self.theme.insert(var.to_string(), value.to_string());
        }
    }

    pub fn theme_var(&self, var: &str) -> String {
        self.theme.get(var).cloned().unwrap_or_default()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn find_element(&self, elem_id: &str) -> Option<NodeId> {
        self.node_ids()
            .find(|id| self.nodes[id.0].elem_id.as_deref() == Some(elem_id))
    }

    fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.nodes[id.0]
            .class
            .split_whitespace()
            .any(|c| c == class)
    }

    /// Pagination-boundary units below `root`, in document order.
    pub fn sections(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_sections(root, &mut out);
        out
    }

    fn collect_sections(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for &child in &self.nodes[id.0].children {
            if self.has_class(child, SECTION_CLASS) {
                out.push(child);
            } else {
                self.collect_sections(child, out);
            }
        }
    }

    /// Concatenated text of the subtree rooted at `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        out.push_str(&self.nodes[id.0].text);
        for &child in &self.nodes[id.0].children {
            self.collect_text(child, out);
        }
    }
}

fn theme_var_for(property: &str) -> Option<&'static str> {
    match property {
        "background-color" => Some("--background"),
        "color" => Some("--foreground"),
        _ => None,
    }
}

/// Assembles the on-screen document for one contract: title and preamble,
/// each template section in order, the optional special-notes block, and the
/// conclusion with the two-party signature block. Pure; the caller owns
/// persistence and display.
pub fn compose(template: &ContractTemplate, ctx: &VarContext<'_>) -> (DomTree, NodeId) {
    let (mut tree, root) = DomTree::new("div");
    tree.set_elem_id(root, CONTRACT_ROOT_ID);
    tree.set_style(root, "background-color", "#ffffff");
    tree.set_style(root, "color", "#000000");

    let head = tree.add_child(root, "div");
    tree.set_class(head, SECTION_CLASS);
    let title = tree.add_child(head, "h1");
    tree.set_text(title, &template.title);
    let preamble = tree.add_child(head, "p");
    tree.set_text(preamble, &ctx.render(&template.preamble));

    for section in &template.sections {
        let unit = tree.add_child(root, "section");
        tree.set_class(unit, SECTION_CLASS);
        let heading = tree.add_child(unit, "h2");
        tree.set_text(heading, &format!("{}（{}）", section.number, section.title));
        let body = tree.add_child(unit, "div");
        tree.set_text(body, &ctx.render(&section.content));
    }

    if let Some(notes) = ctx.terms.special_notes.as_deref()
        && !notes.is_empty()
    {
        let unit = tree.add_child(root, "section");
        tree.set_class(unit, SECTION_CLASS);
        tree.set_style(unit, "background-color", "#fefce8");
        let heading = tree.add_child(unit, "h2");
        tree.set_text(heading, "特記事項");
        let body = tree.add_child(unit, "p");
        tree.set_text(body, notes);
    }

    let tail = tree.add_child(root, "div");
    tree.set_class(tail, SECTION_CLASS);
    let conclusion = tree.add_child(tail, "p");
    tree.set_text(conclusion, &ctx.render(&template.conclusion));
    let date_line = tree.add_child(tail, "p");
    tree.set_text(date_line, &format_date_jp(ctx.terms.start_date));

    signature_block(
        &mut tree,
        tail,
        "【甲】",
        &ctx.customer.address,
        &ctx.customer.name,
        &ctx.customer.representative,
    );
    signature_block(
        &mut tree,
        tail,
        "【乙】",
        &ctx.company_address(),
        &ctx.company_name(),
        &ctx.company_representative(),
    );

    (tree, root)
}

fn signature_block(
    tree: &mut DomTree,
    parent: NodeId,
    party: &str,
    address: &str,
    name: &str,
    representative: &str,
) {
    let block = tree.add_child(parent, "div");
    let label = tree.add_child(block, "p");
    tree.set_text(label, party);
    let address_label = tree.add_child(block, "p");
    tree.set_text(address_label, "住所");
    let address_line = tree.add_child(block, "p");
    tree.set_text(address_line, address);
    let name_label = tree.add_child(block, "p");
    tree.set_text(name_label, "名前");
    let name_line = tree.add_child(block, "p");
    tree.set_text(name_line, name);
    let seal = tree.add_child(block, "p");
    tree.set_text(seal, &format!("{}　印", representative));
}
