//! Spend conditions: the `(opcode arg...)` lists a puzzle returns

use crate::number::Number;
use crate::types::{Bytes32, ClvmError, ClvmValue, Node};

pub mod condition_opcodes {
    pub const AGG_SIG_UNSAFE: u8 = 49;
    pub const AGG_SIG_ME: u8 = 50;
    pub const CREATE_COIN: u8 = 51;
    pub const RESERVE_FEE: u8 = 52;
    pub const CREATE_COIN_ANNOUNCEMENT: u8 = 60;
    pub const ASSERT_COIN_ANNOUNCEMENT: u8 = 61;
    pub const CREATE_PUZZLE_ANNOUNCEMENT: u8 = 62;
    pub const ASSERT_PUZZLE_ANNOUNCEMENT: u8 = 63;
    pub const ASSERT_MY_COIN_ID: u8 = 70;
    pub const ASSERT_MY_PARENT_ID: u8 = 71;
    pub const ASSERT_MY_PUZZLEHASH: u8 = 72;
    pub const ASSERT_MY_AMOUNT: u8 = 73;
    pub const ASSERT_SECONDS_RELATIVE: u8 = 80;
    pub const ASSERT_SECONDS_ABSOLUTE: u8 = 81;
    pub const ASSERT_HEIGHT_RELATIVE: u8 = 82;
    pub const ASSERT_HEIGHT_ABSOLUTE: u8 = 83;
}

use condition_opcodes::*;

fn opcode_atom(opcode: u8) -> Node {
    ClvmValue::atom(vec![opcode])
}

/// `(51 puzzle_hash amount [memo])`; an empty memo is left out
pub fn make_create_coin_condition(puzzle_hash: &Bytes32, amount: u64, memo: &[u8]) -> Node {
    let mut items = vec![
        opcode_atom(CREATE_COIN),
        ClvmValue::atom(puzzle_hash.to_vec()),
        ClvmValue::int(amount),
    ];
    if !memo.is_empty() {
        items.push(ClvmValue::atom(memo.to_vec()));
    }
    ClvmValue::list(items)
}

pub fn make_reserve_fee_condition(fee: u64) -> Node {
    ClvmValue::list(vec![opcode_atom(RESERVE_FEE), ClvmValue::int(fee)])
}

pub fn make_assert_coin_announcement(announcement_hash: &Bytes32) -> Node {
    ClvmValue::list(vec![
        opcode_atom(ASSERT_COIN_ANNOUNCEMENT),
        ClvmValue::atom(announcement_hash.to_vec()),
    ])
}

pub fn make_assert_puzzle_announcement(announcement_hash: &Bytes32) -> Node {
    ClvmValue::list(vec![
        opcode_atom(ASSERT_PUZZLE_ANNOUNCEMENT),
        ClvmValue::atom(announcement_hash.to_vec()),
    ])
}

pub fn make_create_coin_announcement(message: &[u8]) -> Node {
    ClvmValue::list(vec![
        opcode_atom(CREATE_COIN_ANNOUNCEMENT),
        ClvmValue::atom(message.to_vec()),
    ])
}

pub fn make_create_puzzle_announcement(message: &[u8]) -> Node {
    ClvmValue::list(vec![
        opcode_atom(CREATE_PUZZLE_ANNOUNCEMENT),
        ClvmValue::atom(message.to_vec()),
    ])
}

/// A condition read back out of a puzzle's output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub opcode: u8,
    pub args: Vec<Node>,
}

impl Condition {
    pub fn new(opcode: u8, args: Vec<Node>) -> Self {
        Self { opcode, args }
    }

    pub fn to_node(&self) -> Node {
        let mut items = vec![opcode_atom(self.opcode)];
        items.extend(self.args.iter().cloned());
        ClvmValue::list(items)
    }

    /// Atom argument `index`
    pub fn atom_arg(&self, index: usize) -> Result<&[u8], ClvmError> {
        self.args
            .get(index)
            .and_then(|arg| arg.as_atom())
            .ok_or_else(|| {
                ClvmError::TypeError(format!(
                    "condition {} has no atom argument {}",
                    self.opcode, index
                ))
            })
    }

    pub fn bytes32_arg(&self, index: usize) -> Result<Bytes32, ClvmError> {
        let atom = self.atom_arg(index)?;
        Bytes32::try_from(atom).map_err(|_| {
            ClvmError::RangeError(format!(
                "condition {} argument {} is {} bytes, expected 32",
                self.opcode,
                index,
                atom.len()
            ))
        })
    }

    pub fn u64_arg(&self, index: usize) -> Result<u64, ClvmError> {
        Number::from_signed_bytes(self.atom_arg(index)?).to_u64()
    }
}

/// Split a puzzle result into conditions; each must be a list headed by a
/// one-byte opcode
pub fn parse_conditions(result: &Node) -> Result<Vec<Condition>, ClvmError> {
    result
        .to_list()?
        .into_iter()
        .map(|item| {
            let mut parts = item.to_list()?.into_iter();
            let head = parts
                .next()
                .ok_or_else(|| ClvmError::TypeError("empty condition".to_string()))?;
            let opcode = match head.as_atom() {
                Some([opcode]) => *opcode,
                _ => {
                    return Err(ClvmError::TypeError(
                        "condition opcode must be a single byte".to_string(),
                    ))
                }
            };
            Ok(Condition::new(opcode, parts.collect()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::disassemble;

    #[test]
    fn test_create_coin_memo_is_optional() {
        let ph = [0x11u8; 32];
        let without = make_create_coin_condition(&ph, 1000, &[]);
        assert_eq!(without.to_list().unwrap().len(), 3);
        let with = make_create_coin_condition(&ph, 1000, b"memo");
        let items = with.to_list().unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(items[0].as_atom(), Some(&[CREATE_COIN][..]));
        assert_eq!(items[2].as_atom(), Some(&[0x03, 0xe8][..]));
        assert_eq!(items[3].as_atom(), Some(&b"memo"[..]));
    }

    #[test]
    fn test_amount_is_canonical() {
        let ph = [0u8; 32];
        let node = make_create_coin_condition(&ph, 128, &[]);
        let items = node.to_list().unwrap();
        assert_eq!(items[2].as_atom(), Some(&[0x00, 0x80][..]));
        let zero = make_reserve_fee_condition(0);
        assert_eq!(disassemble(&zero), "(52 ())");
    }

    #[test]
    fn test_announcement_shapes() {
        let hash = [0xabu8; 32];
        for (node, opcode) in [
            (make_assert_coin_announcement(&hash), ASSERT_COIN_ANNOUNCEMENT),
            (make_assert_puzzle_announcement(&hash), ASSERT_PUZZLE_ANNOUNCEMENT),
            (make_create_coin_announcement(b"hi"), CREATE_COIN_ANNOUNCEMENT),
            (make_create_puzzle_announcement(b"hi"), CREATE_PUZZLE_ANNOUNCEMENT),
        ] {
            let items = node.to_list().unwrap();
            assert_eq!(items.len(), 2);
            assert_eq!(items[0].as_atom(), Some(&[opcode][..]));
        }
    }

    #[test]
    fn test_parse_conditions() {
        let ph = [0x22u8; 32];
        let list = ClvmValue::list(vec![
            make_create_coin_condition(&ph, 42, &[]),
            make_reserve_fee_condition(7),
        ]);
        let conditions = parse_conditions(&list).unwrap();
        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].opcode, CREATE_COIN);
        assert_eq!(conditions[0].bytes32_arg(0).unwrap(), ph);
        assert_eq!(conditions[0].u64_arg(1).unwrap(), 42);
        assert_eq!(conditions[1].u64_arg(0).unwrap(), 7);
        assert_eq!(conditions[1].to_node(), make_reserve_fee_condition(7));
    }

    #[test]
    fn test_parse_conditions_rejects_bad_shapes() {
        let not_a_list = ClvmValue::int(5);
        assert!(parse_conditions(&not_a_list).is_err());
        let bad_opcode = ClvmValue::list(vec![ClvmValue::list(vec![ClvmValue::atom(vec![1, 2])])]);
        assert!(parse_conditions(&bad_opcode).is_err());
    }
}
