//! Group-membership dump.
//!
//! `GET /group/membership` is the one endpoint that only speaks XML. The response is kept
//! as a generic element tree, with a typed view over the documented shape:
//!
//! ```xml
//! <memberships>
//!   <membership group="developers">
//!     <users><user name="jdoe"/></users>
//!     <groups><group name="contractors"/></groups>
//!   </membership>
//! </memberships>
//! ```

use crate::Result;
use crowd_core::Error;
use std::collections::BTreeMap;
use xmltree::{Element, XMLNode};

/// A parsed XML element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Local element name.
    pub name: String,
    /// Attributes by name.
    pub attributes: BTreeMap<String, String>,
    /// Concatenated text content, if any.
    pub text: Option<String>,
    /// Child elements in document order.
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// Parses a document and returns its root element.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the document is not well-formed.
    pub fn parse(document: &[u8]) -> Result<Self> {
        let root = Element::parse(document).map_err(|err| {
            Error::protocol(
                "group_memberships",
                None,
                format!("malformed XML: {err}"),
            )
        })?;
        Ok(Self::from_element(&root))
    }

    fn from_element(element: &Element) -> Self {
        let mut text = String::new();
        let mut children = Vec::new();

        for node in &element.children {
            match node {
                XMLNode::Element(child) => children.push(Self::from_element(child)),
                XMLNode::Text(value) | XMLNode::CData(value) => text.push_str(value),
                _ => {}
            }
        }

        let text = text.trim();
        Self {
            name: element.name.clone(),
            attributes: element
                .attributes
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            text: (!text.is_empty()).then(|| text.to_string()),
            children,
        }
    }

    /// Value of an attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// First child with the given name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|child| child.name == name)
    }

    /// All children with the given name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |child| child.name == name)
    }
}

/// Direct members of one group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupMembership {
    /// Group name.
    pub group: String,
    /// Names of users that are direct members.
    pub users: Vec<String>,
    /// Names of groups that are direct children.
    pub child_groups: Vec<String>,
}

/// Full dump of group memberships.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipDump {
    root: XmlElement,
}

impl MembershipDump {
    /// Parses a membership document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the document is not well-formed.
    pub fn parse(document: &[u8]) -> Result<Self> {
        XmlElement::parse(document).map(|root| Self { root })
    }

    /// The raw document tree.
    #[must_use]
    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    /// Typed view of every `<membership>` element.
    ///
    /// Entries without a `group` attribute are skipped.
    #[must_use]
    pub fn memberships(&self) -> Vec<GroupMembership> {
        self.root
            .children_named("membership")
            .filter_map(|membership| {
                let group = membership.attribute("group")?.to_string();
                Some(GroupMembership {
                    group,
                    users: names(membership, "users", "user"),
                    child_groups: names(membership, "groups", "group"),
                })
            })
            .collect()
    }

    /// Membership of one group.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<GroupMembership> {
        self.memberships()
            .into_iter()
            .find(|membership| membership.group == name)
    }
}

fn names(membership: &XmlElement, container: &str, entry: &str) -> Vec<String> {
    membership
        .child(container)
        .map(|list| {
            list.children_named(entry)
                .filter_map(|item| item.attribute("name").map(str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}
