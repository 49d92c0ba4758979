//! Pre-binding arguments into a program
//!
//! `curry(p, [a1, a2])` builds `(a (q . p) (c (q . a1) (c (q . a2) 1)))`:
//! run against any environment `e`, it runs `p` against `(a1 a2 . e)`.
//! construction only; nothing is evaluated.

use crate::operators::ClvmOperator;
use crate::types::{ClvmValue, Node};

fn op_atom(op: ClvmOperator) -> Node {
    ClvmValue::atom(vec![op.opcode()])
}

fn quote(value: Node) -> Node {
    ClvmValue::pair(op_atom(ClvmOperator::Quote), value)
}

pub fn curry(program: &Node, args: &[Node]) -> Node {
    let environment = args.iter().rev().fold(ClvmValue::int(1), |rest, arg| {
        ClvmValue::list(vec![op_atom(ClvmOperator::Cons), quote(arg.clone()), rest])
    });
    ClvmValue::list(vec![
        op_atom(ClvmOperator::Apply),
        quote(program.clone()),
        environment,
    ])
}

/// Inverse of `curry`: `None` unless `node` has exactly the curried shape
pub fn uncurry(node: &Node) -> Option<(Node, Vec<Node>)> {
    let items = node.to_list().ok()?;
    let [apply, quoted_program, environment] = items.as_slice() else {
        return None;
    };
    if !is_op(apply, ClvmOperator::Apply) {
        return None;
    }
    let program = unquote(quoted_program)?;

    let mut args = Vec::new();
    let mut current = environment.clone();
    loop {
        if current.as_atom() == Some(&[1u8][..]) {
            return Some((program, args));
        }
        let items = current.to_list().ok()?;
        let [cons, quoted_arg, rest] = items.as_slice() else {
            return None;
        };
        if !is_op(cons, ClvmOperator::Cons) {
            return None;
        }
        args.push(unquote(quoted_arg)?);
        current = rest.clone();
    }
}

fn is_op(node: &Node, op: ClvmOperator) -> bool {
    node.as_atom() == Some(&[op.opcode()][..])
}

fn unquote(node: &Node) -> Option<Node> {
    let (q, value) = node.as_pair()?;
    is_op(q, ClvmOperator::Quote).then(|| value.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::{assemble, disassemble};
    use crate::eval::run_program;
    use crate::tree_hash::tree_hash;

    #[test]
    fn test_curry_shape() {
        let program = assemble("(+ 2 5)").unwrap();
        let curried = curry(&program, &[ClvmValue::int(10)]);
        assert_eq!(disassemble(&curried), "(a (q 16 2 5) (c (q . 10) 1))");
    }

    #[test]
    fn test_curried_args_are_prepended() {
        // (+ 2 5) adds the first two environment entries
        let program = assemble("(+ 2 5)").unwrap();
        let curried = curry(&program, &[ClvmValue::int(10)]);
        let env = assemble("(32)").unwrap();
        let (_, result) = run_program(&curried, &env).unwrap();
        assert_eq!(result.as_number().unwrap().to_i64().unwrap(), 42);
    }

    #[test]
    fn test_curry_changes_hash() {
        let program = assemble("(+ 2 5)").unwrap();
        let curried = curry(&program, &[]);
        assert_ne!(tree_hash(&program), tree_hash(&curried));
        let (_, result) = run_program(&curried, &assemble("(1 2)").unwrap()).unwrap();
        assert_eq!(result.as_number().unwrap().to_i64().unwrap(), 3);
    }

    #[test]
    fn test_uncurry_roundtrip() {
        let program = assemble("(c 2 5)").unwrap();
        let args = vec![ClvmValue::int(7), assemble("(1 2)").unwrap()];
        let curried = curry(&program, &args);
        let (inner, bound) = uncurry(&curried).unwrap();
        assert_eq!(inner, program);
        assert_eq!(bound, args);
    }

    #[test]
    fn test_uncurry_rejects_other_shapes() {
        assert!(uncurry(&assemble("(+ 2 5)").unwrap()).is_none());
        assert!(uncurry(&assemble("(a (q . 1) 2)").unwrap()).is_none());
    }
}
