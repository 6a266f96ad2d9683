//! Extra data: the generic side-channel tree every entity carries for profile specific data.
//! `Extra` -> `EType` (by name) -> `Technique` (by profile) -> `ENode` -> `EAttribute`.

use crate::animated::Animated;
use crate::object::ObjectFlags;
use crate::parameter::{ChildList, CloneParameter, ParameterInfo, ParameterKind, Parameterized, Spawn};
use itertools::Itertools;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;


/// Element and attribute names: the first character must be alphabetic or `_`, every other one
/// alphanumeric or `_`. Anything else becomes `_`.
pub fn clean_node_name(name: &str) -> String {
    name.chars()
        .enumerate()
        .map(|(i, c)| match c {
            'a'..='z' | 'A'..='Z' | '_' => c,
            '0'..='9' if i > 0 => c,
            _ => '_',
        })
        .collect()
}

#[derive(Debug)]
pub struct Extra {
    flags: ObjectFlags,
    types: ChildList<EType>,
}

impl Extra {
    /// Starts out with the default, unnamed type.
    pub fn new() -> Self {
        let mut types = ChildList::new();
        types.push(EType::new(""));
        Self {
            flags: ObjectFlags::default(),
            types,
        }
    }

    pub fn flags(&self) -> &ObjectFlags {
        &self.flags
    }

    pub fn types(&self) -> &[EType] {
        &self.types
    }

    pub fn default_type(&self) -> Option<&EType> {
        self.find_type("")
    }

    pub fn default_type_mut(&mut self) -> &mut EType {
        self.add_type("")
    }

    /// Finds the type called `name` or appends a new one.
    pub fn add_type(&mut self, name: &str) -> &mut EType {
        let (etype, created) = self.types.find_or_push(|t| t.name() == name, || EType::new(name));
        if created {
            self.flags.set_new_child();
        }
        etype
    }

    pub fn find_type(&self, name: &str) -> Option<&EType> {
        self.types.iter().find(|t| t.name() == name)
    }

    pub fn find_type_mut(&mut self, name: &str) -> Option<&mut EType> {
        self.types.iter_mut().find(|t| t.name() == name)
    }

    pub fn release_type(&mut self, name: &str) -> Option<EType> {
        let index = self.types.iter().position(|t| t.name() == name)?;
        self.flags.set_new_child();
        self.types.remove(index)
    }

    /// True when any technique of any type has at least one child node.
    pub fn has_content(&self) -> bool {
        self.types
            .iter()
            .flat_map(|t| t.techniques())
            .any(|technique| technique.child_node_count() > 0)
    }
}

impl Default for Extra {
    fn default() -> Self {
        Self::new()
    }
}

impl Spawn for Extra {
    fn spawn(&self) -> Self {
        Extra::new()
    }
}

/// An always-present extra tree slot: cloning merges into the existing tree.
impl CloneParameter for Extra {
    fn clone_parameter(&self, target: &mut Self) {
        self.clone_to(target);
    }
}

impl Parameterized for Extra {
    /// Types are matched by name in the target, created when missing.
    fn clone_to(&self, target: &mut Self) {
        for source in self.types.iter() {
            let clone = target.add_type(source.name());
            source.clone_to(clone);
        }
    }

    fn parameters(&self) -> Vec<ParameterInfo> {
        vec![ParameterInfo::new("types", ParameterKind::List)]
    }
}

#[derive(Debug)]
pub struct EType {
    flags: ObjectFlags,
    name: String,
    techniques: ChildList<Technique>,
}

impl EType {
    pub fn new(name: &str) -> Self {
        Self {
            flags: ObjectFlags::default(),
            name: name.to_string(),
            techniques: ChildList::new(),
        }
    }

    pub fn flags(&self) -> &ObjectFlags {
        &self.flags
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
        self.flags.set_dirty();
    }

    pub fn techniques(&self) -> &[Technique] {
        &self.techniques
    }

    pub fn technique_count(&self) -> usize {
        self.techniques.len()
    }

    /// Finds the technique for `profile` or appends a new one.
    pub fn add_technique(&mut self, profile: &str) -> &mut Technique {
        let (technique, created) = self
            .techniques
            .find_or_push(|t| t.profile() == profile, || Technique::new(profile));
        if created {
            self.flags.set_new_child();
        }
        technique
    }

    pub fn find_technique(&self, profile: &str) -> Option<&Technique> {
        self.techniques.iter().find(|t| t.profile() == profile)
    }

    pub fn find_technique_mut(&mut self, profile: &str) -> Option<&mut Technique> {
        self.techniques.iter_mut().find(|t| t.profile() == profile)
    }

    pub fn release_technique(&mut self, profile: &str) -> Option<Technique> {
        let index = self.techniques.iter().position(|t| t.profile() == profile)?;
        self.flags.set_new_child();
        self.techniques.remove(index)
    }

    /// First root node called `name`, looking through the techniques in order.
    pub fn find_root_node(&self, name: &str) -> Option<&ENode> {
        self.techniques.iter().find_map(|t| t.find_child_node(name))
    }
}

impl Spawn for EType {
    fn spawn(&self) -> Self {
        EType::new(&self.name)
    }
}

impl Parameterized for EType {
    /// Techniques are matched by profile in the target, created when missing.
    fn clone_to(&self, target: &mut Self) {
        for source in self.techniques.iter() {
            let clone = target.add_technique(source.profile());
            source.clone_to(clone);
        }
    }

    fn parameters(&self) -> Vec<ParameterInfo> {
        vec![
            ParameterInfo::new("name", ParameterKind::Value),
            ParameterInfo::new("techniques", ParameterKind::List),
        ]
    }
}

/// A node tree for one profile. Everything a node can do, a technique can do.
#[derive(Debug, Parameterized)]
pub struct Technique {
    #[parameter]
    profile: String,
    #[parameter(base)]
    node: ENode,
}

impl Technique {
    pub fn new(profile: &str) -> Self {
        Self {
            profile: profile.to_string(),
            node: ENode::new(),
        }
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }
}

impl Deref for Technique {
    type Target = ENode;

    fn deref(&self) -> &ENode {
        &self.node
    }
}

impl DerefMut for Technique {
    fn deref_mut(&mut self) -> &mut ENode {
        &mut self.node
    }
}

impl Spawn for Technique {
    fn spawn(&self) -> Self {
        Technique::new(&self.profile)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Parameterized)]
pub struct EAttribute {
    #[parameter]
    name: String,
    #[parameter]
    value: String,
}

impl EAttribute {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl Spawn for EAttribute {
    fn spawn(&self) -> Self {
        EAttribute {
            name: String::new(),
            value: String::new(),
        }
    }
}

/// One element of the tree. Content and children are mutually exclusive, as the textual format
/// doesn't allow mixed content.
#[derive(Debug, Parameterized)]
pub struct ENode {
    flags: ObjectFlags,
    #[parameter]
    name: String,
    #[parameter]
    content: String,
    #[parameter(list)]
    children: ChildList<ENode>,
    #[parameter(list)]
    attributes: ChildList<EAttribute>,
    // never cloned, the evaluator binds it to this node's identity
    animated: Option<Rc<Animated>>,
}

impl ENode {
    pub fn new() -> Self {
        Self {
            flags: ObjectFlags::default(),
            name: String::new(),
            content: String::new(),
            children: ChildList::new(),
            attributes: ChildList::new(),
            animated: None,
        }
    }

    pub fn flags(&self) -> &ObjectFlags {
        &self.flags
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = clean_node_name(name);
        self.flags.set_dirty();
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Releases every child first.
    pub fn set_content(&mut self, content: &str) {
        self.children.clear();
        self.content = content.to_string();
        self.flags.set_dirty();
    }

    pub fn children(&self) -> &[ENode] {
        &self.children
    }

    pub fn child_node_count(&self) -> usize {
        self.children.len()
    }

    pub fn child_node_mut(&mut self, index: usize) -> Option<&mut ENode> {
        self.children.get_mut(index)
    }

    pub fn add_child_node(&mut self) -> &mut ENode {
        self.flags.set_new_child();
        self.children.push(ENode::new())
    }

    pub fn add_child_node_named(&mut self, name: &str) -> &mut ENode {
        let node = self.add_child_node();
        node.set_name(name);
        node
    }

    pub fn release_child_node(&mut self, index: usize) -> Option<ENode> {
        let released = self.children.remove(index);
        if released.is_some() {
            self.flags.set_new_child();
        }
        released
    }

    pub fn find_child_node(&self, name: &str) -> Option<&ENode> {
        self.children.iter().find(|node| node.name == name)
    }

    pub fn find_child_node_mut(&mut self, name: &str) -> Option<&mut ENode> {
        self.children.iter_mut().find(|node| node.name == name)
    }

    pub fn find_children_nodes(&self, name: &str) -> Vec<&ENode> {
        self.children.iter().filter(|node| node.name == name).collect_vec()
    }

    /// A parameter is a named leaf child carrying content.
    pub fn add_parameter(&mut self, name: &str, value: &str) -> &mut ENode {
        let parameter = self.add_child_node_named(name);
        parameter.set_content(value);
        parameter
    }

    pub fn find_parameter(&self, name: &str) -> Option<&ENode> {
        self.find_child_node(name)
    }

    /// Every leaf child, with its name.
    pub fn find_parameters(&self) -> Vec<(&str, &ENode)> {
        self.children
            .iter()
            .filter(|node| node.child_node_count() == 0)
            .map(|node| (node.name(), node))
            .collect_vec()
    }

    pub fn attributes(&self) -> &[EAttribute] {
        &self.attributes
    }

    /// Sanitizes `name`, then updates the attribute of that name or appends it.
    pub fn add_attribute(&mut self, name: &str, value: &str) -> &EAttribute {
        let name = clean_node_name(name);
        self.flags.set_new_child();
        let (attribute, _) = self.attributes.find_or_push(
            |a| a.name == name,
            || EAttribute {
                name: name.clone(),
                value: String::new(),
            },
        );
        attribute.value = value.to_string();
        attribute
    }

    pub fn find_attribute(&self, name: &str) -> Option<&EAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// The value of `name`, or the empty string.
    pub fn read_attribute(&self, name: &str) -> &str {
        self.find_attribute(name).map(EAttribute::value).unwrap_or_default()
    }

    pub fn release_attribute(&mut self, name: &str) -> Option<EAttribute> {
        let index = self.attributes.iter().position(|a| a.name == name)?;
        self.flags.set_new_child();
        self.attributes.remove(index)
    }

    pub fn animated(&self) -> Option<&Rc<Animated>> {
        self.animated.as_ref()
    }

    /// Binds a single component animation to this node's content, creating it on first use. The
    /// second element tells whether it was just created; [`crate::document::Document::animate_node`]
    /// registers new bindings with the document.
    pub fn animate(&mut self) -> (Rc<Animated>, bool) {
        if let Some(animated) = &self.animated {
            return (animated.clone(), false);
        }

        let content = self.content.trim().parse::<f32>().unwrap_or_default();
        let animated = Animated::new(vec![content], &[""]);
        self.animated = Some(animated.clone());
        self.flags.set_dirty();
        (animated, true)
    }

    pub fn set_animated(&mut self, animated: Option<Rc<Animated>>) {
        self.animated = animated;
        self.flags.set_dirty();
    }
}

impl Default for ENode {
    fn default() -> Self {
        Self::new()
    }
}

impl Spawn for ENode {
    fn spawn(&self) -> Self {
        ENode::new()
    }
}
