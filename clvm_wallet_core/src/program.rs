//! Compiled program with a lazily cached tree hash

use std::fmt;
use std::sync::OnceLock;

use crate::assemble::{assemble, disassemble};
use crate::curry::{curry, uncurry};
use crate::eval::ClvmEvaluator;
use crate::serialize::{node_from_bytes, node_from_hex, node_to_bytes};
use crate::tree_hash::tree_hash;
use crate::types::{Bytes32, ClvmError, Node};

#[derive(Debug, Clone)]
pub struct Program {
    node: Node,
    hash: OnceLock<Bytes32>,
}

impl Program {
    pub fn new(node: Node) -> Self {
        Self {
            node,
            hash: OnceLock::new(),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ClvmError> {
        node_from_bytes(bytes).map(Self::new)
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, ClvmError> {
        node_from_hex(hex_str).map(Self::new)
    }

    pub fn from_assembly(source: &str) -> Result<Self, ClvmError> {
        assemble(source).map(Self::new)
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn into_node(self) -> Node {
        self.node
    }

    /// Computed on first use
    pub fn tree_hash(&self) -> Bytes32 {
        *self.hash.get_or_init(|| tree_hash(&self.node))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ClvmError> {
        node_to_bytes(&self.node)
    }

    pub fn to_hex(&self) -> Result<String, ClvmError> {
        self.to_bytes().map(hex::encode)
    }

    /// Run with default options; `point_add`/`pubkey_for_exp` are unavailable
    pub fn run(&self, env: &Node) -> Result<(u64, Node), ClvmError> {
        self.run_with(&ClvmEvaluator::new(), env)
    }

    pub fn run_with(&self, evaluator: &ClvmEvaluator, env: &Node) -> Result<(u64, Node), ClvmError> {
        evaluator.run(&self.node, env)
    }

    pub fn curry(&self, args: &[Node]) -> Program {
        Program::new(curry(&self.node, args))
    }

    pub fn uncurry(&self) -> Option<(Program, Vec<Node>)> {
        uncurry(&self.node).map(|(program, args)| (Program::new(program), args))
    }
}

impl From<Node> for Program {
    fn from(node: Node) -> Self {
        Program::new(node)
    }
}

impl PartialEq for Program {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl Eq for Program {}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&disassemble(&self.node))
    }
}
