//! Declaration identifiers, kinds and payloads.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Index of a declaration inside one graph.
///
/// Builder ids are arena slots; frozen ids are dense and assigned in
/// depth-first pre-order, so the root of a frozen graph is always `0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub(crate) fn from_index(index: usize) -> Self {
        match u32::try_from(index) {
            Ok(value) => Self(value),
            Err(_) => panic!("broken graph invariant: more than u32::MAX declarations"),
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Payload-free discriminant of [`Kind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindTag {
    Root,
    Namespace,
    Class,
    Function,
    Variable,
    Parameter,
    Enum,
    Integral,
    Unknown,
}

impl KindTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            KindTag::Root => "root",
            KindTag::Namespace => "namespace",
            KindTag::Class => "class",
            KindTag::Function => "function",
            KindTag::Variable => "variable",
            KindTag::Parameter => "parameter",
            KindTag::Enum => "enum",
            KindTag::Integral => "integral",
            KindTag::Unknown => "unknown",
        }
    }

    /// Synthetic kinds are created by graph clean-up, not by the front end.
    pub fn is_synthetic(&self) -> bool {
        matches!(self, KindTag::Root | KindTag::Integral | KindTag::Unknown)
    }
}

impl fmt::Display for KindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific payload of a declaration.
///
/// References (`bases`, `parameters`, `return_type`, `value_type`) point
/// at declarations of the same graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Kind {
    Root,
    Namespace,
    Class {
        bases: BTreeSet<NodeId>,
    },
    Function {
        parameters: Vec<NodeId>,
        return_type: Option<NodeId>,
        body: Option<Arc<str>>,
    },
    Variable {
        value_type: Option<NodeId>,
        body: Option<Arc<str>>,
    },
    Parameter {
        value_type: Option<NodeId>,
        body: Option<Arc<str>>,
    },
    Enum,
    Integral,
    Unknown,
}

impl Kind {
    /// A payload of the given kind with no references and no body.
    pub fn empty(tag: KindTag) -> Self {
        match tag {
            KindTag::Root => Kind::Root,
            KindTag::Namespace => Kind::Namespace,
            KindTag::Class => Kind::Class {
                bases: BTreeSet::new(),
            },
            KindTag::Function => Kind::Function {
                parameters: Vec::new(),
                return_type: None,
                body: None,
            },
            KindTag::Variable => Kind::Variable {
                value_type: None,
                body: None,
            },
            KindTag::Parameter => Kind::Parameter {
                value_type: None,
                body: None,
            },
            KindTag::Enum => Kind::Enum,
            KindTag::Integral => Kind::Integral,
            KindTag::Unknown => Kind::Unknown,
        }
    }

    pub fn tag(&self) -> KindTag {
        match self {
            Kind::Root => KindTag::Root,
            Kind::Namespace => KindTag::Namespace,
            Kind::Class { .. } => KindTag::Class,
            Kind::Function { .. } => KindTag::Function,
            Kind::Variable { .. } => KindTag::Variable,
            Kind::Parameter { .. } => KindTag::Parameter,
            Kind::Enum => KindTag::Enum,
            Kind::Integral => KindTag::Integral,
            Kind::Unknown => KindTag::Unknown,
        }
    }

    /// Type of a variable or parameter, return type of a function.
    pub fn type_ref(&self) -> Option<NodeId> {
        match self {
            Kind::Function { return_type, .. } => *return_type,
            Kind::Variable { value_type, .. } | Kind::Parameter { value_type, .. } => *value_type,
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            Kind::Function { body, .. }
            | Kind::Variable { body, .. }
            | Kind::Parameter { body, .. } => body.as_deref(),
            _ => None,
        }
    }

    pub fn parameters(&self) -> &[NodeId] {
        match self {
            Kind::Function { parameters, .. } => parameters,
            _ => &[],
        }
    }

    pub fn bases(&self) -> Option<&BTreeSet<NodeId>> {
        match self {
            Kind::Class { bases } => Some(bases),
            _ => None,
        }
    }

    /// Every declaration this payload refers to, in payload order.
    pub fn references(&self) -> Vec<NodeId> {
        let mut refs = Vec::new();
        match self {
            Kind::Class { bases } => refs.extend(bases.iter().copied()),
            Kind::Function {
                parameters,
                return_type,
                ..
            } => {
                refs.extend(parameters.iter().copied());
                refs.extend(return_type.iter().copied());
            }
            Kind::Variable { value_type, .. } | Kind::Parameter { value_type, .. } => {
                refs.extend(value_type.iter().copied());
            }
            _ => {}
        }
        refs
    }

    /// Rewrite every reference. `None` drops the reference; returns whether
    /// anything changed.
    pub(crate) fn remap_references<F>(&mut self, mut remap: F) -> bool
    where
        F: FnMut(NodeId) -> Option<NodeId>,
    {
        match self {
            Kind::Class { bases } => {
                let remapped: BTreeSet<NodeId> =
                    bases.iter().filter_map(|&base| remap(base)).collect();
                let changed = remapped != *bases;
                *bases = remapped;
                changed
            }
            Kind::Function {
                parameters,
                return_type,
                ..
            } => {
                let remapped: Vec<NodeId> =
                    parameters.iter().filter_map(|&param| remap(param)).collect();
                let mut changed = remapped != *parameters;
                *parameters = remapped;
                changed |= remap_slot(return_type, &mut remap);
                changed
            }
            Kind::Variable { value_type, .. } | Kind::Parameter { value_type, .. } => {
                remap_slot(value_type, &mut remap)
            }
            _ => false,
        }
    }

    pub(crate) fn set_body(&mut self, text: Option<Arc<str>>) -> bool {
        match self {
            Kind::Function { body, .. }
            | Kind::Variable { body, .. }
            | Kind::Parameter { body, .. } => {
                *body = text;
                true
            }
            _ => false,
        }
    }
}

fn remap_slot<F>(slot: &mut Option<NodeId>, remap: &mut F) -> bool
where
    F: FnMut(NodeId) -> Option<NodeId>,
{
    let Some(id) = *slot else {
        return false;
    };
    let mapped = remap(id);
    *slot = mapped;
    mapped != Some(id)
}

/// Attributes of a declaration handed to
/// [`GraphBuilder::add_node`](crate::graph::GraphBuilder::add_node).
///
/// References are attached afterwards through the builder so that they can
/// be checked against the graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub unique_name: String,
    pub signature: String,
    pub tag: KindTag,
    pub body: Option<String>,
}

impl Declaration {
    /// A declaration whose unique name defaults to its display name.
    pub fn new(tag: KindTag, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            unique_name: name.clone(),
            name,
            signature: String::new(),
            tag,
            body: None,
        }
    }

    pub fn namespace(name: impl Into<String>) -> Self {
        Self::new(KindTag::Namespace, name)
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(KindTag::Class, name)
    }

    pub fn function(name: impl Into<String>) -> Self {
        Self::new(KindTag::Function, name)
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::new(KindTag::Variable, name)
    }

    pub fn parameter(name: impl Into<String>) -> Self {
        Self::new(KindTag::Parameter, name)
    }

    pub fn enumeration(name: impl Into<String>) -> Self {
        Self::new(KindTag::Enum, name)
    }

    pub fn unknown(name: impl Into<String>) -> Self {
        Self::new(KindTag::Unknown, name)
    }

    /// Builtin type leaf; name, unique name and signature are all the type
    /// spelling.
    pub fn integral(signature: impl Into<String>) -> Self {
        let signature = signature.into();
        Self {
            name: signature.clone(),
            unique_name: signature.clone(),
            signature,
            tag: KindTag::Integral,
            body: None,
        }
    }

    pub fn with_unique_name(mut self, unique_name: impl Into<String>) -> Self {
        self.unique_name = unique_name.into();
        self
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = signature.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}
