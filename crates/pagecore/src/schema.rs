use std::fmt;

/// Ordered attribute list of an element, names lowercased.
pub type Attrs = Vec<(String, String)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeGroup {
    Block,
    Inline,
}

/// A node type understood by the content parser and serializer.
///
/// `matches` is the parse rule: it decides whether an element with the given
/// tag and attributes deserializes to this node. `render` is the inverse and
/// must produce markup that `matches` accepts again.
#[derive(Clone)]
pub struct NodeSpec {
    pub name: &'static str,
    pub group: NodeGroup,
    pub matches: fn(&str, &[(String, String)]) -> bool,
    pub render: fn(&[(String, String)]) -> String,
}

impl fmt::Debug for NodeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeSpec")
            .field("name", &self.name)
            .field("group", &self.group)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    nodes: Vec<NodeSpec>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node type, replacing any earlier spec with the same name.
    pub fn register(&mut self, spec: NodeSpec) {
        match self.nodes.iter_mut().find(|n| n.name == spec.name) {
            Some(existing) => {
                log::debug!("Replacing node type '{}'", spec.name);
                *existing = spec;
            }
            None => {
                log::debug!("Registered node type '{}'", spec.name);
                self.nodes.push(spec);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// First registered spec whose parse rule accepts the element.
    pub fn match_element(&self, tag: &str, attrs: &[(String, String)]) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| (n.matches)(tag, attrs))
    }

    pub fn node_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.nodes.iter().map(|n| n.name)
    }
}

/// Value of the named attribute, if present.
pub fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
