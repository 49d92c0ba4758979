pub mod assemble;
pub mod conditions;
pub mod cost;
pub mod curry;
pub mod eval;
pub mod number;
pub mod operators;
pub mod program;
pub mod registry;
pub mod serialize;
pub mod tree_hash;
pub mod types;

pub use assemble::{assemble, disassemble, Assembler};
pub use conditions::*;
pub use cost::CostTable;
pub use curry::{curry, uncurry};
pub use eval::{run_program, BlsOps, ClvmEvaluator, PointAddFn, PubkeyForExpFn, RunOptions};
pub use number::{msb_mask, Number};
pub use operators::*;
pub use program::Program;
pub use registry::{PredefinedPrograms, PuzzleName};
pub use serialize::{node_from_bytes, node_from_hex, node_to_bytes, ClvmParser};
pub use tree_hash::{tree_hash, tree_hash_atom, tree_hash_pair, tree_hash_with_precalculated};
pub use types::*;

/// Order of the BLS12-381 scalar field, big-endian
pub const GROUP_ORDER: [u8; 32] = [
    0x73, 0xed, 0xa7, 0x53, 0x29, 0x9d, 0x7d, 0x48, 0x33, 0x39, 0xd8, 0x08, 0x09, 0xa1, 0xd8, 0x05,
    0x53, 0xbd, 0xa4, 0x02, 0xff, 0xfe, 0x5b, 0xfe, 0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x01,
];

/// `GROUP_ORDER` as a CLVM integer
pub fn group_order() -> Number {
    Number::from_unsigned_bytes(&GROUP_ORDER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_order_value() {
        assert_eq!(
            group_order().to_string(),
            "52435875175126190479447740508185965837690552500527637822603658699938581184513"
        );
    }
}
