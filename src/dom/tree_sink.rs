//! html5ever `TreeSink` that builds a [`Document`].

use std::borrow::Cow;
use std::cell::{Cell, RefCell};

use html5ever::tendril::StrTendril;
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{Attribute as Html5Attribute, QualName};

use super::arena::{Attribute, Document, NodeData, NodeId};

/// Handle the tree builder uses to refer to nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handle(pub NodeId);

impl Default for Handle {
    fn default() -> Self {
        Handle(NodeId::NONE)
    }
}

/// Builds a [`Document`] from tree builder callbacks.
///
/// `TreeSink` methods take `&self`, so the document sits behind a `RefCell`.
pub struct DocumentSink {
    doc: RefCell<Document>,
    parse_errors: Cell<usize>,
}

impl Default for DocumentSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentSink {
    pub fn new() -> Self {
        Self {
            doc: RefCell::new(Document::new()),
            parse_errors: Cell::new(0),
        }
    }

    /// Consume the sink, returning the document and the recovered error count.
    pub fn into_parts(self) -> (Document, usize) {
        (self.doc.into_inner(), self.parse_errors.get())
    }

    fn append_to(&self, parent: NodeId, child: NodeOrText<Handle>) {
        let mut doc = self.doc.borrow_mut();
        match child {
            NodeOrText::AppendNode(node) => doc.append(parent, node.0),
            NodeOrText::AppendText(text) => doc.append_text(parent, &text),
        }
    }
}

impl TreeSink for DocumentSink {
    type Handle = Handle;
    type Output = Self;
    type ElemName<'a>
        = &'a QualName
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        self
    }

    fn parse_error(&self, _msg: Cow<'static, str>) {
        // Recovered by the tree builder; only the count is kept.
        self.parse_errors.set(self.parse_errors.get() + 1);
    }

    fn get_document(&self) -> Self::Handle {
        Handle(self.doc.borrow().root())
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        static EMPTY: QualName = QualName {
            prefix: None,
            ns: html5ever::ns!(),
            local: html5ever::local_name!(""),
        };

        let doc = self.doc.borrow();
        match doc.get(target.0).map(|n| &n.data) {
            Some(NodeData::Element { name, .. }) => {
                let name: &QualName = name;
                // SAFETY: element names are boxed and never dropped or replaced
                // while the sink lives, so the pointee outlives the `RefCell`
                // guard even when the arena vector reallocates.
                unsafe { &*(name as *const QualName) }
            }
            _ => &EMPTY,
        }
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Html5Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        let attrs = attrs
            .into_iter()
            .map(|a| Attribute {
                name: a.name,
                value: a.value.to_string(),
            })
            .collect();

        Handle(self.doc.borrow_mut().create_element(name, attrs))
    }

    fn create_comment(&self, _text: StrTendril) -> Self::Handle {
        Handle(self.doc.borrow_mut().create_comment())
    }

    fn create_pi(&self, _target: StrTendril, _data: StrTendril) -> Self::Handle {
        Handle(self.doc.borrow_mut().create_comment())
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        self.append_to(parent.0, child);
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        let parent = self.doc.borrow().parent(element.0);
        match parent {
            Some(parent) => self.append_to(parent, child),
            None => self.append_to(prev_element.0, child),
        }
    }

    fn append_doctype_to_document(
        &self,
        _name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
        let mut doc = self.doc.borrow_mut();
        let root = doc.root();
        let doctype = doc.create_doctype();
        doc.append(root, doctype);
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        // Template contents stay under the template element, which extraction
        // treats as noise.
        *target
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        x.0 == y.0
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn append_before_sibling(&self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>) {
        let mut doc = self.doc.borrow_mut();
        match new_node {
            NodeOrText::AppendNode(node) => doc.insert_before(sibling.0, node.0),
            NodeOrText::AppendText(text) => {
                let text_node = doc.create_text(text.to_string());
                doc.insert_before(sibling.0, text_node);
            }
        }
    }

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<Html5Attribute>) {
        let mut doc = self.doc.borrow_mut();
        if let Some(node) = doc.get_mut(target.0)
            && let NodeData::Element {
                attrs: existing,
                classes,
                ..
            } = &mut node.data
        {
            for attr in attrs {
                if !existing.iter().any(|a| a.name == attr.name) {
                    if attr.name.local.as_ref() == "class" {
                        *classes = attr.value.split_whitespace().map(str::to_string).collect();
                    }
                    existing.push(Attribute {
                        name: attr.name,
                        value: attr.value.to_string(),
                    });
                }
            }
        }
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        self.doc.borrow_mut().detach(target.0);
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        let mut doc = self.doc.borrow_mut();
        let children: Vec<_> = doc.children(node.0).collect();
        for child in children {
            doc.detach(child);
            doc.append(new_parent.0, child);
        }
    }
}

#[cfg(test)]
mod tests {
    use html5ever::driver::ParseOpts;
    use html5ever::parse_document;
    use html5ever::tendril::TendrilSink;

    use super::*;

    fn parse_html(html: &str) -> (Document, usize) {
        parse_document(DocumentSink::new(), ParseOpts::default())
            .from_utf8()
            .one(html.as_bytes())
            .into_parts()
    }

    #[test]
    fn test_basic_parse() {
        let (doc, _) = parse_html("<html><body><p>Hello</p></body></html>");

        let p = doc.find_by_tag("p").expect("should find p");
        let text = doc.children(p).next().expect("p should have child");
        assert_eq!(doc.text(text), Some("Hello"));
    }

    #[test]
    fn test_recovers_from_unclosed_tags() {
        let (doc, errors) = parse_html("<div class='user'><p>one<p>two<b>bold</div><i>tail");

        assert!(errors > 0);
        let div = doc.find_by_tag("div").expect("should find div");
        let paragraphs = doc
            .children(div)
            .filter(|&c| doc.element_name(c).is_some_and(|n| n.as_ref() == "p"))
            .count();
        assert_eq!(paragraphs, 2);
        assert!(doc.find_by_tag("i").is_some());
    }

    #[test]
    fn test_misnested_formatting_is_repaired() {
        let (doc, _) = parse_html("<p><b>bold <i>both</b> italic</i></p>");

        // The adoption agency splits <i> so both halves survive.
        let italics = doc
            .descendants(doc.root())
            .filter(|&id| doc.element_name(id).is_some_and(|n| n.as_ref() == "i"))
            .count();
        assert_eq!(italics, 2);
    }
}
