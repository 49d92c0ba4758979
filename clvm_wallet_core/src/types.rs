//! Core types for CLVM evaluation

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::number::Number;

/// Shared handle to a CLVM value; sub-trees are reference counted so
/// curried programs and predefined templates share structure
pub type Node = Arc<ClvmValue>;

/// 32-byte SHA-256 output (tree hashes, puzzle hashes, coin ids)
pub type Bytes32 = [u8; 32];

/// Internal CLVM value representation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClvmValue {
    Atom(Vec<u8>),
    Pair(Node, Node),
}

impl ClvmValue {
    pub fn nil() -> Node {
        Arc::new(ClvmValue::Atom(Vec::new()))
    }

    pub fn atom(bytes: impl Into<Vec<u8>>) -> Node {
        Arc::new(ClvmValue::Atom(bytes.into()))
    }

    /// Atom holding the canonical encoding of `value`
    pub fn int(value: impl Into<Number>) -> Node {
        Self::atom(value.into().to_bytes())
    }

    pub fn pair(first: Node, rest: Node) -> Node {
        Arc::new(ClvmValue::Pair(first, rest))
    }

    /// Build a proper nil-terminated list
    pub fn list<I>(items: I) -> Node
    where
        I: IntoIterator<Item = Node>,
        I::IntoIter: DoubleEndedIterator,
    {
        items
            .into_iter()
            .rev()
            .fold(Self::nil(), |rest, item| Self::pair(item, rest))
    }

    pub fn as_atom(&self) -> Option<&[u8]> {
        match self {
            ClvmValue::Atom(bytes) => Some(bytes),
            ClvmValue::Pair(..) => None,
        }
    }

    pub fn as_pair(&self) -> Option<(&Node, &Node)> {
        match self {
            ClvmValue::Pair(first, rest) => Some((first, rest)),
            ClvmValue::Atom(_) => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, ClvmValue::Atom(bytes) if bytes.is_empty())
    }

    pub fn is_pair(&self) -> bool {
        matches!(self, ClvmValue::Pair(..))
    }

    /// Nil is false, every other value (atom or pair) is true
    pub fn is_truthy(&self) -> bool {
        !self.is_nil()
    }

    /// Interpret an atom as a signed integer; pairs are a type error
    pub fn as_number(&self) -> Result<Number, ClvmError> {
        match self {
            ClvmValue::Atom(bytes) => Ok(Number::from_signed_bytes(bytes)),
            ClvmValue::Pair(..) => Err(ClvmError::TypeError(
                "expected atom, found pair".to_string(),
            )),
        }
    }

    /// Items of a nil-terminated list
    pub fn to_list(&self) -> Result<Vec<Node>, ClvmError> {
        let mut items = Vec::new();
        let mut current = self;
        loop {
            match current {
                ClvmValue::Pair(first, rest) => {
                    items.push(first.clone());
                    current = rest;
                }
                ClvmValue::Atom(bytes) if bytes.is_empty() => return Ok(items),
                ClvmValue::Atom(_) => {
                    return Err(ClvmError::TypeError(
                        "malformed list: non-nil atom in tail position".to_string(),
                    ))
                }
            }
        }
    }
}

/// Stands in for detached children while a tree is torn down
static DETACHED: Lazy<Node> = Lazy::new(|| Arc::new(ClvmValue::Atom(Vec::new())));

/// Frees nested pairs from a heap worklist, so dropping a tree of any depth
/// uses constant host stack
impl Drop for ClvmValue {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        detach_children(self, &mut pending);
        while let Some(node) = pending.pop() {
            // shared sub-trees stay alive; only the last owner descends
            if let Ok(mut value) = Arc::try_unwrap(node) {
                detach_children(&mut value, &mut pending);
            }
        }
    }
}

fn detach_children(value: &mut ClvmValue, pending: &mut Vec<Node>) {
    if let ClvmValue::Pair(first, rest) = value {
        pending.push(std::mem::replace(first, DETACHED.clone()));
        pending.push(std::mem::replace(rest, DETACHED.clone()));
    }
}

/// Unified error type for CLVM operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClvmError {
    #[error("parse error at offset {offset}: {message}")]
    ParseError { offset: usize, message: String },

    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    #[error("path error: {0}")]
    PathError(String),

    #[error("type error: {0}")]
    TypeError(String),

    #[error("operator 0x{} failed at argument {index}: {message}", hex::encode(.opcode))]
    OperatorError {
        opcode: Vec<u8>,
        index: usize,
        message: String,
    },

    #[error("range error: {0}")]
    RangeError(String),

    #[error("configuration error: {0}")]
    ConfigurationError(String),

    #[error("clvm raise: {0}")]
    Raise(String),

    #[error("cost exceeded: limit {limit}")]
    CostExceeded { limit: u64 },

    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl ClvmError {
    pub(crate) fn parse(offset: usize, message: impl Into<String>) -> Self {
        ClvmError::ParseError {
            offset,
            message: message.into(),
        }
    }

    pub(crate) fn operator(opcode: &[u8], index: usize, message: impl Into<String>) -> Self {
        ClvmError::OperatorError {
            opcode: opcode.to_vec(),
            index,
            message: message.into(),
        }
    }
}
