pub use roxmltree::*;

use crate::builder::{Attribute, Element, Namespace};

pub fn parse(xml: &str) -> Result<Document<'_>, roxmltree::Error> {
    roxmltree::Document::parse(xml)
}

/// Parses `xml` and returns its root as an owned element tree.
///
/// Every element of the tree records its location from the document root and the
/// namespace bindings in scope, so QName-valued content can be resolved later.
pub fn parse_element(xml: &str) -> Result<Element<'static>, crate::XmlError> {
    let document = parse(xml)?;
    element_from_node(document.root_element())
}

/// Converts a parsed element node into an owned [`Element`].
pub fn element_from_node(node: Node<'_, '_>) -> Result<Element<'static>, crate::XmlError> {
    if !node.is_element() {
        return Err(crate::XmlError::InvalidNodeType {
            expected: NodeType::Element,
            found: node.node_type(),
        });
    }

    let parent_location = node
        .ancestors()
        .skip(1)
        .filter(Node::is_element)
        .map(|ancestor| ancestor.tag_name().name().to_owned())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .fold(String::new(), |mut path, name| {
            path.push('/');
            path.push_str(&name);
            path
        });

    Ok(convert(node, &parent_location))
}

fn convert(node: Node<'_, '_>, parent_location: &str) -> Element<'static> {
    let tag_name = node.tag_name();
    let location = format!("{parent_location}/{}{}", tag_name.name(), sibling_index(node));

    let mut element = Element::new(tag_name.name().to_owned())
        .set_namespace_optional(tag_name.namespace().map(|ns| Namespace::new(ns.to_owned())));

    let in_scope = bindings(node);
    let inherited = node.parent_element().map(bindings).unwrap_or_default();
    for (prefix, uri) in &in_scope {
        if !inherited.contains(&(prefix.clone(), uri.clone())) {
            element = element.add_namespace_declaration(uri.clone(), prefix.as_deref());
        }
    }

    for attribute in node.attributes() {
        element = element.add_attribute(Attribute::new_with_namespace(
            attribute.name().to_owned(),
            attribute.value().to_owned(),
            attribute.namespace().map(|ns| Namespace::new(ns.to_owned())),
        ));
    }

    for child in node.children() {
        if child.is_element() {
            element = element.add_child(convert(child, &location));
        } else if child.is_text() {
            if let Some(text) = child.text() {
                element = element.add_text(text.to_owned());
            }
        }
    }

    element.set_location(location);
    element.set_in_scope(in_scope);
    element
}

fn bindings(node: Node<'_, '_>) -> Vec<(Option<String>, String)> {
    node.namespaces()
        .filter(|ns| ns.name() != Some("xml"))
        .map(|ns| (ns.name().map(str::to_owned), ns.uri().to_owned()))
        .collect()
}

/// `[n]` suffix for the n-th element of that name among its siblings, empty for the first.
fn sibling_index(node: Node<'_, '_>) -> String {
    let name = node.tag_name().name();
    let earlier = node
        .prev_siblings()
        .skip(1)
        .filter(|sibling| sibling.is_element() && sibling.tag_name().name() == name)
        .count();

    if earlier == 0 {
        String::new()
    } else {
        format!("[{}]", earlier + 1)
    }
}
