//! In-memory document store with text and attribute value indexes.
//!
//! Documents are built either from XML text or with a small builder DSL:
//!
//! ```
//! use locpath::data::{Data, MemData, attr, doc, elem, text};
//!
//! // <a id="1"><b>x</b><b>y</b></a>
//! let data = MemData::build(
//!     doc().child(
//!         elem("a")
//!             .attr(attr("id", "1"))
//!             .child(elem("b").child(text("x")))
//!             .child(elem("b").child(text("y"))),
//!     ),
//! );
//! assert_eq!(data.len(), 7);
//! assert_eq!(data.string_value(0), "xy");
//! ```
use std::collections::HashMap;

use compact_str::CompactString;
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;

use super::{Data, NameId, NodeKind, Pre};
use crate::error::{Error, ErrorCode};
use crate::index::{IndexKind, IndexQuery, ValueIndex};
use crate::nodes::NodeSet;

#[derive(Debug, Clone)]
struct NodeRec {
    kind: NodeKind,
    /// Distance to the parent; `0` for the document node.
    dist: usize,
    size: usize,
    att_size: usize,
    name: Option<NameId>,
    value: CompactString,
}

type ValueMap = HashMap<CompactString, Vec<Pre>>;

#[derive(Debug, Clone, Default)]
pub struct MemData {
    nodes: Vec<NodeRec>,
    names: Vec<CompactString>,
    name_ids: HashMap<CompactString, NameId>,
    leaf: Vec<bool>,
    text_index: Option<ValueMap>,
    attr_index: Option<ValueMap>,
    version: u64,
}

impl MemData {
    /// Build a document from a builder tree. A root that is not a document node is
    /// wrapped into one.
    pub fn build(spec: impl Into<NodeSpec>) -> MemData {
        let spec = spec.into();
        let mut b = Loader::default();
        match &spec {
            NodeSpec::Document(children) => {
                b.open_doc();
                for c in children {
                    b.append(c);
                }
            }
            other => {
                b.open_doc();
                b.append(other);
            }
        }
        b.close();
        b.finish()
    }

    /// Parse an XML document. Whitespace-only text is dropped.
    pub fn from_xml(xml: &str) -> Result<MemData, Error> {
        let mut reader = Reader::from_str(xml);
        let mut b = Loader::default();
        b.open_doc();
        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    let mut attrs = Vec::new();
                    for a in e.attributes() {
                        let a = a?;
                        let key = String::from_utf8_lossy(a.key.as_ref()).into_owned();
                        attrs.push((key, a.unescape_value()?.into_owned()));
                    }
                    b.open_elem(&name, attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
                }
                Event::Empty(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    let mut attrs = Vec::new();
                    for a in e.attributes() {
                        let a = a?;
                        let key = String::from_utf8_lossy(a.key.as_ref()).into_owned();
                        attrs.push((key, a.unescape_value()?.into_owned()));
                    }
                    b.open_elem(&name, attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
                    b.close();
                }
                Event::End(_) => {
                    if b.depth() <= 1 {
                        return Err(Error::from_code(ErrorCode::FODC0006, "unbalanced end tag"));
                    }
                    b.close();
                }
                Event::Text(t) => {
                    let value = t.unescape()?;
                    if !value.trim().is_empty() {
                        b.text(&value);
                    }
                }
                Event::CData(t) => b.text(&String::from_utf8_lossy(&t.into_inner())),
                Event::Comment(t) => b.leaf(NodeKind::Comment, None, &String::from_utf8_lossy(&t)),
                Event::PI(t) => {
                    let raw = String::from_utf8_lossy(&t).into_owned();
                    let target = raw.split(char::is_whitespace).next().unwrap_or_default().to_string();
                    b.leaf(NodeKind::ProcessingInstruction, Some(&target), &raw);
                }
                Event::Eof => break,
                _ => {}
            }
        }
        if b.depth() != 1 {
            return Err(Error::from_code(ErrorCode::FODC0006, "unexpected end of document"));
        }
        b.close();
        let data = b.finish();
        debug!(nodes = data.len(), names = data.names.len(), "loaded XML document");
        Ok(data)
    }

    /// Enable or drop the value indexes.
    pub fn with_indexes(mut self, text: bool, attribute: bool) -> MemData {
        self.text_index = text.then(|| self.collect_values(NodeKind::Text));
        self.attr_index = attribute.then(|| self.collect_values(NodeKind::Attribute));
        self
    }

    /// Replace the value of a text, attribute, comment or processing-instruction node.
    /// Indexes are kept current and the version is bumped.
    pub fn replace_value(&mut self, pre: Pre, value: &str) -> Result<(), Error> {
        let Some(rec) = self.nodes.get(pre) else {
            return Err(Error::type_error(format!("no node at position {pre}")));
        };
        let kind = rec.kind;
        if matches!(kind, NodeKind::Document | NodeKind::Element) {
            return Err(Error::type_error(format!("node {pre} has no value")));
        }
        let old = std::mem::replace(&mut self.nodes[pre].value, CompactString::from(value));
        let index = match kind {
            NodeKind::Text => self.text_index.as_mut(),
            NodeKind::Attribute => self.attr_index.as_mut(),
            _ => None,
        };
        if let Some(map) = index {
            if let Some(pres) = map.get_mut(&old) {
                if let Ok(i) = pres.binary_search(&pre) {
                    pres.remove(i);
                }
                if pres.is_empty() {
                    map.remove(&old);
                }
            }
            let pres = map.entry(CompactString::from(value)).or_default();
            if let Err(i) = pres.binary_search(&pre) {
                pres.insert(i, pre);
            }
        }
        self.version += 1;
        debug!(pre, version = self.version, "replaced node value");
        Ok(())
    }

    fn collect_values(&self, kind: NodeKind) -> ValueMap {
        let mut map = ValueMap::new();
        for (pre, rec) in self.nodes.iter().enumerate() {
            if rec.kind == kind {
                map.entry(rec.value.clone()).or_default().push(pre);
            }
        }
        map
    }

    fn compute_leaves(&mut self) {
        let mut leaf: Vec<Option<bool>> = vec![None; self.names.len()];
        for (pre, rec) in self.nodes.iter().enumerate() {
            if rec.kind != NodeKind::Element {
                continue;
            }
            let Some(name) = rec.name else { continue };
            let first = pre + rec.att_size;
            let end = pre + rec.size;
            let single_text = first < end
                && self.nodes[first].kind == NodeKind::Text
                && first + self.nodes[first].size == end;
            let slot = &mut leaf[name as usize];
            *slot = Some(slot.unwrap_or(true) && single_text);
        }
        self.leaf = leaf.into_iter().map(|l| l.unwrap_or(false)).collect();
    }
}

impl Data for MemData {
    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn kind(&self, pre: Pre) -> NodeKind {
        self.nodes[pre].kind
    }

    fn size(&self, pre: Pre, _kind: NodeKind) -> usize {
        self.nodes[pre].size
    }

    fn att_size(&self, pre: Pre, _kind: NodeKind) -> usize {
        self.nodes[pre].att_size
    }

    fn parent(&self, pre: Pre, _kind: NodeKind) -> Option<Pre> {
        match self.nodes[pre].dist {
            0 => None,
            d => Some(pre - d),
        }
    }

    fn name(&self, pre: Pre, _kind: NodeKind) -> Option<NameId> {
        self.nodes[pre].name
    }

    fn name_id(&self, name: &str) -> Option<NameId> {
        self.name_ids.get(name).copied()
    }

    fn name_of(&self, id: NameId) -> &str {
        self.names.get(id as usize).map(CompactString::as_str).unwrap_or_default()
    }

    fn value(&self, pre: Pre, _kind: NodeKind) -> &str {
        &self.nodes[pre].value
    }

    fn is_leaf(&self, name: NameId) -> bool {
        self.leaf.get(name as usize).copied().unwrap_or(false)
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn index(&self) -> Option<&dyn ValueIndex> {
        if self.text_index.is_some() || self.attr_index.is_some() {
            Some(self)
        } else {
            None
        }
    }
}

impl ValueIndex for MemData {
    fn supports(&self, kind: IndexKind) -> bool {
        match kind {
            IndexKind::Text => self.text_index.is_some(),
            IndexKind::Attribute => self.attr_index.is_some(),
        }
    }

    fn estimate(&self, query: &IndexQuery) -> u64 {
        let map = match query.kind() {
            IndexKind::Text => self.text_index.as_ref(),
            IndexKind::Attribute => self.attr_index.as_ref(),
        };
        // attribute estimates ignore the name and may overcount
        map.and_then(|m| m.get(query.value()))
            .map_or(0, |pres| pres.len() as u64)
    }

    fn lookup(&self, query: &IndexQuery) -> NodeSet {
        match query {
            IndexQuery::Text { value } => self
                .text_index
                .as_ref()
                .and_then(|m| m.get(value))
                .map(|pres| NodeSet::from_sorted(pres.clone()))
                .unwrap_or_default(),
            IndexQuery::Attribute { name, value } => self
                .attr_index
                .as_ref()
                .and_then(|m| m.get(value))
                .map(|pres| {
                    let hits = pres
                        .iter()
                        .copied()
                        .filter(|&p| self.nodes[p].name == Some(*name))
                        .collect();
                    NodeSet::from_sorted(hits)
                })
                .unwrap_or_default(),
        }
    }
}

/// Stack-based construction shared by the builder DSL and the XML loader.
#[derive(Default)]
struct Loader {
    data: MemData,
    stack: Vec<Pre>,
    /// Text node that a following text event is merged into.
    open_text: Option<Pre>,
}

impl Loader {
    fn depth(&self) -> usize {
        self.stack.len()
    }

    fn intern(&mut self, name: &str) -> NameId {
        if let Some(&id) = self.data.name_ids.get(name) {
            return id;
        }
        let id = self.data.names.len() as NameId;
        self.data.names.push(CompactString::from(name));
        self.data.name_ids.insert(CompactString::from(name), id);
        id
    }

    fn push(&mut self, kind: NodeKind, name: Option<NameId>, value: &str) -> Pre {
        let pre = self.data.nodes.len();
        let dist = self.stack.last().map_or(0, |&p| pre - p);
        self.data.nodes.push(NodeRec {
            kind,
            dist,
            size: 1,
            att_size: 1,
            name,
            value: CompactString::from(value),
        });
        pre
    }

    fn open_doc(&mut self) {
        let pre = self.push(NodeKind::Document, None, "");
        self.stack.push(pre);
        self.open_text = None;
    }

    fn open_elem<'a>(&mut self, name: &str, attrs: impl Iterator<Item = (&'a str, &'a str)>) {
        let id = self.intern(name);
        let pre = self.push(NodeKind::Element, Some(id), "");
        self.stack.push(pre);
        for (k, v) in attrs {
            let aid = self.intern(k);
            self.push(NodeKind::Attribute, Some(aid), v);
        }
        self.data.nodes[pre].att_size = self.data.nodes.len() - pre;
        self.open_text = None;
    }

    fn close(&mut self) {
        if let Some(pre) = self.stack.pop() {
            self.data.nodes[pre].size = self.data.nodes.len() - pre;
        }
        self.open_text = None;
    }

    fn text(&mut self, value: &str) {
        if value.is_empty() {
            return;
        }
        if let Some(pre) = self.open_text {
            self.data.nodes[pre].value.push_str(value);
            return;
        }
        let pre = self.push(NodeKind::Text, None, value);
        self.open_text = Some(pre);
    }

    fn leaf(&mut self, kind: NodeKind, name: Option<&str>, value: &str) {
        let id = name.map(|n| self.intern(n));
        self.push(kind, id, value);
        self.open_text = None;
    }

    fn append(&mut self, spec: &NodeSpec) {
        match spec {
            NodeSpec::Document(children) => {
                // nested documents are flattened into their children
                for c in children {
                    self.append(c);
                }
            }
            NodeSpec::Element {
                name,
                attrs,
                children,
            } => {
                self.open_elem(
                    name,
                    attrs.iter().map(|a| (a.name.as_str(), a.value.as_str())),
                );
                for c in children {
                    self.append(c);
                }
                self.close();
            }
            NodeSpec::Text(v) => self.text(v),
            NodeSpec::Comment(v) => self.leaf(NodeKind::Comment, None, v),
            NodeSpec::Pi { target, content } => {
                let raw = if content.is_empty() {
                    target.to_string()
                } else {
                    format!("{target} {content}")
                };
                self.leaf(NodeKind::ProcessingInstruction, Some(target), &raw);
            }
        }
    }

    fn finish(mut self) -> MemData {
        while !self.stack.is_empty() {
            self.close();
        }
        let mut data = self.data;
        data.compute_leaves();
        data.with_indexes(true, true)
    }
}

/// Builder tree for [`MemData::build`].
#[derive(Debug, Clone, PartialEq)]
pub enum NodeSpec {
    Document(Vec<NodeSpec>),
    Element {
        name: CompactString,
        attrs: Vec<AttrSpec>,
        children: Vec<NodeSpec>,
    },
    Text(CompactString),
    Comment(CompactString),
    Pi {
        target: CompactString,
        content: CompactString,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttrSpec {
    name: CompactString,
    value: CompactString,
}

impl NodeSpec {
    /// Append a child to a document or element; ignored for other nodes.
    pub fn child(mut self, c: impl Into<NodeSpec>) -> Self {
        match &mut self {
            NodeSpec::Document(children) | NodeSpec::Element { children, .. } => {
                children.push(c.into());
            }
            _ => {}
        }
        self
    }

    /// Add an attribute to an element; ignored for other nodes.
    pub fn attr(mut self, a: AttrSpec) -> Self {
        if let NodeSpec::Element { attrs, .. } = &mut self {
            attrs.push(a);
        }
        self
    }
}

pub fn doc() -> NodeSpec {
    NodeSpec::Document(Vec::new())
}

pub fn elem(name: &str) -> NodeSpec {
    NodeSpec::Element {
        name: CompactString::from(name),
        attrs: Vec::new(),
        children: Vec::new(),
    }
}

pub fn text(value: &str) -> NodeSpec {
    NodeSpec::Text(CompactString::from(value))
}

pub fn comment(value: &str) -> NodeSpec {
    NodeSpec::Comment(CompactString::from(value))
}

pub fn pi(target: &str, content: &str) -> NodeSpec {
    NodeSpec::Pi {
        target: CompactString::from(target),
        content: CompactString::from(content),
    }
}

pub fn attr(name: &str, value: &str) -> AttrSpec {
    AttrSpec {
        name: CompactString::from(name),
        value: CompactString::from(value),
    }
}
