//! Solutions for the standard puzzle
//!
//! The standard puzzle takes `(original_public_key delegated_puzzle solution)`.
//! with a nil first element it demands a signature on the delegated
//! puzzle's hash and runs it; otherwise the first element must rebuild the
//! synthetic key together with the hidden puzzle passed in its place.

use clvm_wallet_core::{ClvmValue, Node, PredefinedPrograms, Program, PuzzleName};

use crate::error::WalletError;
use crate::keys::PublicKey;

/// A puzzle that ignores its solution and returns `conditions`
pub fn puzzle_for_conditions(conditions: &[Node]) -> Result<Program, WalletError> {
    let p2_conditions = PredefinedPrograms::shared()?.get(PuzzleName::P2Conditions);
    let env = ClvmValue::list(vec![ClvmValue::list(conditions.to_vec())]);
    let (_, puzzle) = p2_conditions.run(&env)?;
    Ok(Program::new(puzzle))
}

pub fn solution_for_delegated_puzzle(delegated_puzzle: &Program, solution: &Node) -> Node {
    ClvmValue::list(vec![
        ClvmValue::nil(),
        delegated_puzzle.node().clone(),
        solution.clone(),
    ])
}

/// Spend the standard puzzle straight into `conditions`
pub fn solution_for_conditions(conditions: &[Node]) -> Result<Node, WalletError> {
    let delegated = puzzle_for_conditions(conditions)?;
    Ok(solution_for_delegated_puzzle(&delegated, &ClvmValue::nil()))
}

/// Spend through the hidden puzzle instead of a signature
pub fn solution_for_hidden_puzzle(
    original_public_key: &PublicKey,
    hidden_puzzle: &Program,
    solution: &Node,
) -> Node {
    ClvmValue::list(vec![
        ClvmValue::atom(original_public_key.to_bytes().to_vec()),
        hidden_puzzle.node().clone(),
        solution.clone(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use clvm_wallet_core::{disassemble, make_create_coin_condition, make_reserve_fee_condition};

    #[test]
    fn test_puzzle_for_conditions_quotes() {
        let conditions = vec![make_reserve_fee_condition(5)];
        let puzzle = puzzle_for_conditions(&conditions).unwrap();
        assert_eq!(disassemble(puzzle.node()), "(q (52 5))");
        let (_, result) = puzzle.run(&ClvmValue::int(99)).unwrap();
        assert_eq!(result, ClvmValue::list(conditions));
    }

    #[test]
    fn test_solution_for_conditions_shape() {
        let conditions = vec![make_create_coin_condition(&[7u8; 32], 1, &[])];
        let solution = solution_for_conditions(&conditions).unwrap();
        let items = solution.to_list().unwrap();
        assert_eq!(items.len(), 3);
        assert!(items[0].is_nil());
        assert!(items[2].is_nil());
        let (_, result) = Program::new(items[1].clone()).run(&ClvmValue::nil()).unwrap();
        assert_eq!(result, ClvmValue::list(conditions));
    }
}
