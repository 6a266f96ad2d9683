use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};
use std::fmt;

const TEXT_KEY: &str = "$text";

/// A generic element: name, attributes in document order, concatenated text and child elements.
/// Only `<extra>` blocks are kept this way, everything else has a fixed shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }
}

/// Reads any element as a map: `@`-prefixed keys are attributes, `$text` is character data and
/// every other key is a child element named by it. The element's own name is set by its parent.
impl<'de> Deserialize<'de> for Element {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_struct("Element", &[], ElementVisitor)
    }
}

struct ElementVisitor;

impl<'de> Visitor<'de> for ElementVisitor {
    type Value = Element;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an xml element")
    }

    fn visit_str<E: de::Error>(self, text: &str) -> Result<Element, E> {
        Ok(Element {
            text: text.to_string(),
            ..Element::default()
        })
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Element, A::Error> {
        let mut element = Element::default();
        while let Some(key) = map.next_key::<String>()? {
            if let Some(attribute) = key.strip_prefix('@') {
                let value = map.next_value::<String>()?;
                element.attributes.push((attribute.to_string(), value));
            } else if key == TEXT_KEY {
                element.text.push_str(&map.next_value::<String>()?);
            } else {
                let mut child = map.next_value::<Element>()?;
                child.name = key;
                element.children.push(child);
            }
        }
        Ok(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::de::from_str;

    #[test]
    fn nests_children_in_order() {
        let root: Element = from_str(r#"<a x="1"><b>one</b><c/><b>two</b></a>"#).unwrap();
        assert_eq!(root.attribute("x"), Some("1"));
        assert_eq!(
            root.children.iter().map(|child| child.name.as_str()).collect::<Vec<_>>(),
            vec!["b", "c", "b"]
        );
        assert_eq!(root.children_named("b").map(|b| b.text.as_str()).collect::<Vec<_>>(), vec!["one", "two"]);
        assert!(root.child("c").is_some_and(|c| c.text.is_empty() && c.children.is_empty()));
    }

    #[test]
    fn unescapes_text_and_attributes() {
        let root: Element = from_str(r#"<a v="&lt;x&gt;">fish &amp; chips</a>"#).unwrap();
        assert_eq!(root.attribute("v"), Some("<x>"));
        assert_eq!(root.text, "fish & chips");
    }

    #[test]
    fn rejects_mismatched_tags() {
        assert!(from_str::<Element>("<a><b></a>").is_err());
    }
}
