//! Content hash of a CLVM value
//!
//! Atoms hash as `sha256(0x01 || bytes)`, pairs as
//! `sha256(0x02 || hash(first) || hash(rest))`. this is the puzzle hash
//! used for addresses and coin ids.

use std::collections::HashSet;

use sha2::{Digest, Sha256};

use crate::types::{Bytes32, ClvmValue, Node};

const ATOM_PREFIX: u8 = 0x01;
const PAIR_PREFIX: u8 = 0x02;

pub fn tree_hash_atom(bytes: &[u8]) -> Bytes32 {
    let mut hasher = Sha256::new();
    hasher.update([ATOM_PREFIX]);
    hasher.update(bytes);
    hasher.finalize().into()
}

pub fn tree_hash_pair(first: &Bytes32, rest: &Bytes32) -> Bytes32 {
    let mut hasher = Sha256::new();
    hasher.update([PAIR_PREFIX]);
    hasher.update(first);
    hasher.update(rest);
    hasher.finalize().into()
}

pub fn tree_hash(node: &Node) -> Bytes32 {
    tree_hash_with_precalculated(node, &HashSet::new())
}

enum HashOp<'a> {
    Visit(&'a Node),
    Combine,
}

/// Like `tree_hash`, but any atom found in `precalculated` is taken to be
/// a hash already and is passed through unchanged
pub fn tree_hash_with_precalculated(node: &Node, precalculated: &HashSet<Bytes32>) -> Bytes32 {
    let mut ops = vec![HashOp::Visit(node)];
    let mut hashes: Vec<Bytes32> = Vec::new();

    while let Some(op) = ops.pop() {
        match op {
            HashOp::Visit(node) => match node.as_ref() {
                ClvmValue::Atom(bytes) => {
                    let known = <[u8; 32]>::try_from(bytes.as_slice())
                        .ok()
                        .filter(|hash| precalculated.contains(hash));
                    hashes.push(known.unwrap_or_else(|| tree_hash_atom(bytes)));
                }
                ClvmValue::Pair(first, rest) => {
                    ops.push(HashOp::Combine);
                    ops.push(HashOp::Visit(rest));
                    ops.push(HashOp::Visit(first));
                }
            },
            HashOp::Combine => {
                // first was pushed before rest, so rest is on top
                let rest = hashes.pop().unwrap_or_default();
                let first = hashes.pop().unwrap_or_default();
                hashes.push(tree_hash_pair(&first, &rest));
            }
        }
    }

    hashes.pop().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::assemble;
    use crate::serialize::node_from_hex;

    #[test]
    fn test_nil_hash() {
        assert_eq!(
            hex::encode(tree_hash(&ClvmValue::nil())),
            "4bf5122f344554c53bde2ebb8cd2b7e3d1600ad631c385a5d7cce23c7785459a"
        );
    }

    #[test]
    fn test_deterministic_and_structure_sensitive() {
        let corpus = [
            "()",
            "1",
            "(1)",
            "(1 . 1)",
            "(() . 1)",
            "((1))",
            "(1 2)",
            "(2 1)",
            "((1 2) 3)",
            "(1 (2 3))",
            "0x0102",
            "(0x0001 2)",
        ];
        let mut seen = HashSet::new();
        for source in corpus {
            let node = assemble(source).unwrap();
            let hash = tree_hash(&node);
            assert_eq!(hash, tree_hash(&node));
            assert!(seen.insert(hash), "collision for {}", source);
        }
    }

    #[test]
    fn test_shared_subtrees_hash_like_copies() {
        let shared = assemble("(1 2 3)").unwrap();
        let dag = ClvmValue::pair(shared.clone(), shared);
        let tree = assemble("((1 2 3) 1 2 3)").unwrap();
        assert_eq!(tree_hash(&dag), tree_hash(&tree));
    }

    #[test]
    fn test_precalculated_passthrough() {
        let inner = assemble("(q . 1)").unwrap();
        let inner_hash = tree_hash(&inner);
        let with_hash = ClvmValue::list(vec![ClvmValue::atom(inner_hash.to_vec())]);
        let with_tree = ClvmValue::list(vec![inner]);

        let mut known = HashSet::new();
        known.insert(inner_hash);
        assert_eq!(
            tree_hash_with_precalculated(&with_hash, &known),
            tree_hash(&with_tree)
        );
    }

    #[test]
    fn test_reference_puzzle_hashes() {
        let default_hidden = node_from_hex("ff0980").unwrap();
        assert_eq!(
            hex::encode(tree_hash(&default_hidden)),
            "711d6c4e32c92e53179b199484cf8c897542bc57f2b22582799f9d657eec4699"
        );
    }
}
