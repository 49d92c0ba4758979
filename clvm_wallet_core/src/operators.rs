//! CLVM operator definitions and the keyword <-> atom lookup table
//! The assembler, disassembler and evaluator all resolve opcodes here

use core::str::FromStr;

use crate::types::ClvmError;

/// Operators understood by the evaluator, one byte each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClvmOperator {
    // core
    Quote,  // 0x01 (q)
    Apply,  // 0x02 (a)
    If,     // 0x03 (i)
    Cons,   // 0x04 (c)
    First,  // 0x05 (f)
    Rest,   // 0x06 (r)
    ListP,  // 0x07 (l)
    Raise,  // 0x08 (x)
    Equal,  // 0x09 (=)

    // bytes
    GreaterBytes, // 0x0a (>s)
    Sha256,       // 0x0b
    Substr,       // 0x0c
    Strlen,       // 0x0d
    Concat,       // 0x0e

    // arithmetic
    Add,         // 0x10 (+)
    Subtract,    // 0x11 (-)
    Multiply,    // 0x12 (*)
    Divide,      // 0x13 (/)
    DivMod,      // 0x14
    GreaterThan, // 0x15 (>)
    Ash,         // 0x16
    Lsh,         // 0x17
    LogAnd,      // 0x18
    LogIor,      // 0x19
    LogXor,      // 0x1a
    LogNot,      // 0x1b

    // bls
    PointAdd,     // 0x1d
    PubkeyForExp, // 0x1e

    // boolean
    Not, // 0x20
    Any, // 0x21
    All, // 0x22

    Softfork, // 0x24
}

impl ClvmOperator {
    /// Every operator, in opcode order
    pub const ALL: [ClvmOperator; 32] = [
        ClvmOperator::Quote,
        ClvmOperator::Apply,
        ClvmOperator::If,
        ClvmOperator::Cons,
        ClvmOperator::First,
        ClvmOperator::Rest,
        ClvmOperator::ListP,
        ClvmOperator::Raise,
        ClvmOperator::Equal,
        ClvmOperator::GreaterBytes,
        ClvmOperator::Sha256,
        ClvmOperator::Substr,
        ClvmOperator::Strlen,
        ClvmOperator::Concat,
        ClvmOperator::Add,
        ClvmOperator::Subtract,
        ClvmOperator::Multiply,
        ClvmOperator::Divide,
        ClvmOperator::DivMod,
        ClvmOperator::GreaterThan,
        ClvmOperator::Ash,
        ClvmOperator::Lsh,
        ClvmOperator::LogAnd,
        ClvmOperator::LogIor,
        ClvmOperator::LogXor,
        ClvmOperator::LogNot,
        ClvmOperator::PointAdd,
        ClvmOperator::PubkeyForExp,
        ClvmOperator::Not,
        ClvmOperator::Any,
        ClvmOperator::All,
        ClvmOperator::Softfork,
    ];

    pub fn opcode(&self) -> u8 {
        match self {
            ClvmOperator::Quote => 0x01,
            ClvmOperator::Apply => 0x02,
            ClvmOperator::If => 0x03,
            ClvmOperator::Cons => 0x04,
            ClvmOperator::First => 0x05,
            ClvmOperator::Rest => 0x06,
            ClvmOperator::ListP => 0x07,
            ClvmOperator::Raise => 0x08,
            ClvmOperator::Equal => 0x09,
            ClvmOperator::GreaterBytes => 0x0a,
            ClvmOperator::Sha256 => 0x0b,
            ClvmOperator::Substr => 0x0c,
            ClvmOperator::Strlen => 0x0d,
            ClvmOperator::Concat => 0x0e,
            ClvmOperator::Add => 0x10,
            ClvmOperator::Subtract => 0x11,
            ClvmOperator::Multiply => 0x12,
            ClvmOperator::Divide => 0x13,
            ClvmOperator::DivMod => 0x14,
            ClvmOperator::GreaterThan => 0x15,
            ClvmOperator::Ash => 0x16,
            ClvmOperator::Lsh => 0x17,
            ClvmOperator::LogAnd => 0x18,
            ClvmOperator::LogIor => 0x19,
            ClvmOperator::LogXor => 0x1a,
            ClvmOperator::LogNot => 0x1b,
            ClvmOperator::PointAdd => 0x1d,
            ClvmOperator::PubkeyForExp => 0x1e,
            ClvmOperator::Not => 0x20,
            ClvmOperator::Any => 0x21,
            ClvmOperator::All => 0x22,
            ClvmOperator::Softfork => 0x24,
        }
    }

    pub fn from_opcode(opcode: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.opcode() == opcode)
    }

    /// Resolve an atom; only single-byte atoms name operators
    pub fn from_atom(atom: &[u8]) -> Option<Self> {
        match atom {
            [opcode] => Self::from_opcode(*opcode),
            _ => None,
        }
    }

    /// Parse operator from a mnemonic, accepting the long-form aliases
    pub fn parse_operator(s: &str) -> Option<Self> {
        let canonical = match s {
            "add" => "+",
            "subtract" => "-",
            "multiply" => "*",
            "div" => "/",
            "if" => "i",
            "cons" => "c",
            "first" => "f",
            "rest" => "r",
            "listp" => "l",
            "raise" => "x",
            "eq" => "=",
            "gr" => ">",
            "gr_bytes" => ">s",
            other => other,
        };
        Self::ALL.iter().copied().find(|op| op.as_str() == canonical)
    }

    /// Canonical mnemonic
    pub fn as_str(&self) -> &'static str {
        match self {
            ClvmOperator::Quote => "q",
            ClvmOperator::Apply => "a",
            ClvmOperator::If => "i",
            ClvmOperator::Cons => "c",
            ClvmOperator::First => "f",
            ClvmOperator::Rest => "r",
            ClvmOperator::ListP => "l",
            ClvmOperator::Raise => "x",
            ClvmOperator::Equal => "=",
            ClvmOperator::GreaterBytes => ">s",
            ClvmOperator::Sha256 => "sha256",
            ClvmOperator::Substr => "substr",
            ClvmOperator::Strlen => "strlen",
            ClvmOperator::Concat => "concat",
            ClvmOperator::Add => "+",
            ClvmOperator::Subtract => "-",
            ClvmOperator::Multiply => "*",
            ClvmOperator::Divide => "/",
            ClvmOperator::DivMod => "divmod",
            ClvmOperator::GreaterThan => ">",
            ClvmOperator::Ash => "ash",
            ClvmOperator::Lsh => "lsh",
            ClvmOperator::LogAnd => "logand",
            ClvmOperator::LogIor => "logior",
            ClvmOperator::LogXor => "logxor",
            ClvmOperator::LogNot => "lognot",
            ClvmOperator::PointAdd => "point_add",
            ClvmOperator::PubkeyForExp => "pubkey_for_exp",
            ClvmOperator::Not => "not",
            ClvmOperator::Any => "any",
            ClvmOperator::All => "all",
            ClvmOperator::Softfork => "softfork",
        }
    }

    /// Fixed argument count, `None` for variadic operators
    pub fn arity(&self) -> Option<usize> {
        match self {
            ClvmOperator::First
            | ClvmOperator::Rest
            | ClvmOperator::ListP
            | ClvmOperator::Strlen
            | ClvmOperator::LogNot
            | ClvmOperator::PubkeyForExp
            | ClvmOperator::Not => Some(1),

            ClvmOperator::Apply
            | ClvmOperator::Cons
            | ClvmOperator::Equal
            | ClvmOperator::GreaterBytes
            | ClvmOperator::Divide
            | ClvmOperator::DivMod
            | ClvmOperator::GreaterThan
            | ClvmOperator::Ash
            | ClvmOperator::Lsh => Some(2),

            ClvmOperator::If => Some(3),

            // quote takes its operand unevaluated; substr takes 2 or 3
            ClvmOperator::Quote
            | ClvmOperator::Raise
            | ClvmOperator::Sha256
            | ClvmOperator::Substr
            | ClvmOperator::Concat
            | ClvmOperator::Add
            | ClvmOperator::Subtract
            | ClvmOperator::Multiply
            | ClvmOperator::LogAnd
            | ClvmOperator::LogIor
            | ClvmOperator::LogXor
            | ClvmOperator::PointAdd
            | ClvmOperator::Any
            | ClvmOperator::All
            | ClvmOperator::Softfork => None,
        }
    }
}

impl FromStr for ClvmOperator {
    type Err = ClvmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_operator(s).ok_or_else(|| ClvmError::UnknownOperator(s.to_string()))
    }
}

/// Mnemonic -> one-byte atom
pub fn keyword_to_atom(keyword: &str) -> Result<Vec<u8>, ClvmError> {
    keyword
        .parse::<ClvmOperator>()
        .map(|op| vec![op.opcode()])
}

/// One-byte atom -> canonical mnemonic
pub fn atom_to_keyword(atom: &[u8]) -> Option<&'static str> {
    ClvmOperator::from_atom(atom).map(|op| op.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(keyword_to_atom("q").unwrap(), vec![0x01]);
        assert_eq!(keyword_to_atom("add").unwrap(), vec![0x10]);
        assert_eq!(keyword_to_atom("+").unwrap(), vec![0x10]);
        assert_eq!(keyword_to_atom("softfork").unwrap(), vec![0x24]);
        assert!(matches!(
            keyword_to_atom("modpow"),
            Err(ClvmError::UnknownOperator(_))
        ));
    }

    #[test]
    fn test_operator_roundtrip() {
        for op in ClvmOperator::ALL {
            let atom = keyword_to_atom(op.as_str()).unwrap();
            assert_eq!(atom_to_keyword(&atom), Some(op.as_str()));
            assert_eq!(ClvmOperator::from_opcode(op.opcode()), Some(op));
        }
    }

    #[test]
    fn test_opcodes_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for op in ClvmOperator::ALL {
            assert!(seen.insert(op.opcode()), "duplicate opcode for {:?}", op);
        }
    }

    #[test]
    fn test_unassigned_opcodes() {
        assert_eq!(ClvmOperator::from_opcode(0x00), None);
        assert_eq!(ClvmOperator::from_opcode(0x0f), None);
        assert_eq!(ClvmOperator::from_opcode(0x1c), None);
        assert_eq!(atom_to_keyword(&[0x01, 0x00]), None);
    }

    #[test]
    fn test_arity_validation() {
        assert_eq!(ClvmOperator::Add.arity(), None);
        assert_eq!(ClvmOperator::First.arity(), Some(1));
        assert_eq!(ClvmOperator::If.arity(), Some(3));
        assert_eq!(ClvmOperator::Divide.arity(), Some(2));
    }
}
