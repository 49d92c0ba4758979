//! Cost-metered CLVM evaluator
//!
//! Reduction runs on an explicit operation stack so adversarial nesting
//! cannot exhaust the host stack. Atoms are environment paths, `(q . x)`
//! is a literal, and `((X) . args)` applies the lone atom `X` to the
//! operands unevaluated. Any other pair evaluates its arguments left to
//! right before applying the operator named by its first atom.

use std::cmp::Ordering;

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::assemble::disassemble;
use crate::cost::CostTable;
use crate::number::{msb_mask, Number};
use crate::operators::ClvmOperator;
use crate::types::{ClvmError, ClvmValue, Node};

/// Sums G1 points given as 48-byte compressed encodings
pub type PointAddFn = fn(&[&[u8]]) -> Result<Vec<u8>, String>;
/// Maps a scalar atom (signed, reduced by the callee) to its G1 public key
pub type PubkeyForExpFn = fn(&[u8]) -> Result<Vec<u8>, String>;

/// Curve operations supplied by the host; the core has no pairing library
#[derive(Debug, Clone, Copy)]
pub struct BlsOps {
    pub point_add: PointAddFn,
    pub pubkey_for_exp: PubkeyForExpFn,
}

/// Knobs for a single run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Abort with `CostExceeded` once the running total passes this
    pub max_cost: Option<u64>,
    /// Reject opcodes outside the operator table instead of charging the unknown-op cost
    pub strict: bool,
    pub costs: CostTable,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_cost: None,
            strict: true,
            costs: CostTable::default(),
        }
    }
}

const UNKNOWN_OP_MAX_LEN: usize = 5;
const UNKNOWN_OP_COST_LIMIT: u64 = 1 << 32;

enum Op {
    Eval(Node, Node),
    Apply(Vec<u8>, usize),
}

enum Step {
    Done(Node),
    Eval(Node, Node),
}

struct CostMeter {
    total: u64,
    limit: Option<u64>,
}

impl CostMeter {
    fn charge(&mut self, amount: u64) -> Result<(), ClvmError> {
        self.total = self.total.saturating_add(amount);
        match self.limit {
            Some(limit) if self.total > limit => Err(ClvmError::CostExceeded { limit }),
            _ => Ok(()),
        }
    }
}

pub struct ClvmEvaluator {
    pub options: RunOptions,

    pub bls: Option<BlsOps>,
}

impl Default for ClvmEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl ClvmEvaluator {
    pub fn new() -> Self {
        Self::with_options(RunOptions::default())
    }

    pub fn with_options(options: RunOptions) -> Self {
        Self { options, bls: None }
    }

    pub fn with_bls(mut self, bls: BlsOps) -> Self {
        self.bls = Some(bls);
        self
    }

    /// Reduce `program` against `env`, returning total cost and result
    pub fn run(&self, program: &Node, env: &Node) -> Result<(u64, Node), ClvmError> {
        let mut meter = CostMeter {
            total: 0,
            limit: self.options.max_cost,
        };
        let mut ops = vec![Op::Eval(program.clone(), env.clone())];
        let mut values: Vec<Node> = Vec::new();

        while let Some(op) = ops.pop() {
            match op {
                Op::Eval(program, env) => match program.as_ref() {
                    ClvmValue::Atom(path) => {
                        values.push(self.traverse_path(path, &env, &mut meter)?);
                    }
                    ClvmValue::Pair(operator, operands) => {
                        // `((X) . args)` applies X to the unevaluated operands
                        if let Some((inner, tail)) = operator.as_pair() {
                            let opcode = match inner.as_atom() {
                                Some(opcode) if tail.is_nil() => opcode,
                                _ => {
                                    return Err(ClvmError::TypeError(
                                        "operator list must hold a lone atom".to_string(),
                                    ))
                                }
                            };
                            meter.charge(self.options.costs.apply)?;
                            let operands = operands.to_list().map_err(|_| {
                                ClvmError::operator(opcode, 0, "argument list must be nil-terminated")
                            })?;
                            ops.push(Op::Apply(opcode.to_vec(), operands.len()));
                            values.extend(operands);
                            continue;
                        }
                        let opcode = operator.as_atom().ok_or_else(|| {
                            ClvmError::TypeError("operator must be an atom".to_string())
                        })?;
                        if opcode == [ClvmOperator::Quote.opcode()] {
                            meter.charge(self.options.costs.quote)?;
                            values.push(operands.clone());
                            continue;
                        }
                        let operands = operands.to_list().map_err(|_| {
                            ClvmError::operator(opcode, 0, "argument list must be nil-terminated")
                        })?;
                        ops.push(Op::Apply(opcode.to_vec(), operands.len()));
                        for operand in operands.into_iter().rev() {
                            ops.push(Op::Eval(operand, env.clone()));
                        }
                    }
                },
                Op::Apply(opcode, argc) => {
                    let args = values.split_off(values.len() - argc);
                    match self.apply_operator(&opcode, &args, &mut meter) {
                        Ok(Step::Done(value)) => values.push(value),
                        Ok(Step::Eval(program, env)) => ops.push(Op::Eval(program, env)),
                        Err(e) => {
                            debug!(
                                "operator 0x{} failed on {}: {}",
                                hex::encode(&opcode),
                                disassemble(&ClvmValue::list(args)),
                                e
                            );
                            return Err(e);
                        }
                    }
                }
            }
        }

        let result = values
            .pop()
            .ok_or_else(|| ClvmError::TypeError("evaluation produced no value".to_string()))?;
        trace!("run finished with cost {}", meter.total);
        Ok((meter.total, result))
    }

    /// Walk `env` by the bits of `path`, least significant first: a clear
    /// bit takes the first of a pair, a set bit the rest. The highest set
    /// bit terminates the walk. An all-zero path is nil.
    fn traverse_path(
        &self,
        path: &[u8],
        env: &Node,
        meter: &mut CostMeter,
    ) -> Result<Node, ClvmError> {
        let costs = &self.options.costs;
        let zero_bytes = path.iter().take_while(|&&b| b == 0).count();
        let Some(&lead) = path.get(zero_bytes) else {
            meter.charge(linear_cost(
                costs.path_lookup_base,
                &[(costs.path_lookup_per_zero_byte, zero_bytes as u64)],
            ))?;
            return Ok(ClvmValue::nil());
        };

        let end_mask = msb_mask(lead);
        let mut byte_cursor = path.len() - 1;
        let mut bitmask = 0x01u8;
        let mut legs = 0u64;
        let mut current = env.clone();

        while byte_cursor > zero_bytes || bitmask < end_mask {
            let next = match current.as_pair() {
                Some((first, rest)) => {
                    if path[byte_cursor] & bitmask != 0 {
                        rest.clone()
                    } else {
                        first.clone()
                    }
                }
                None => {
                    return Err(ClvmError::PathError(format!(
                        "path 0x{} walks into an atom",
                        hex::encode(path)
                    )))
                }
            };
            current = next;
            legs += 1;
            if bitmask == 0x80 {
                bitmask = 0x01;
                byte_cursor -= 1;
            } else {
                bitmask <<= 1;
            }
        }

        meter.charge(linear_cost(
            costs.path_lookup_base,
            &[
                (costs.path_lookup_per_leg, legs),
                (costs.path_lookup_per_zero_byte, zero_bytes as u64),
            ],
        ))?;
        Ok(current)
    }

    fn apply_operator(
        &self,
        opcode: &[u8],
        args: &[Node],
        meter: &mut CostMeter,
    ) -> Result<Step, ClvmError> {
        let Some(op) = ClvmOperator::from_atom(opcode) else {
            return self.handle_unknown_op(opcode, args, meter).map(Step::Done);
        };
        if let Some(arity) = op.arity() {
            if args.len() != arity {
                return Err(ClvmError::operator(
                    opcode,
                    args.len().min(arity),
                    format!("{} takes exactly {} argument(s)", op.as_str(), arity),
                ));
            }
        }

        let costs = &self.options.costs;
        let value = match op {
            ClvmOperator::Apply => {
                meter.charge(costs.apply)?;
                return Ok(Step::Eval(args[0].clone(), args[1].clone()));
            }
            // quote is handled before arguments are evaluated
            ClvmOperator::Quote => {
                return Err(ClvmError::operator(opcode, 0, "quote cannot be applied"))
            }
            ClvmOperator::If => self.handle_op_if(args, meter)?,
            ClvmOperator::Cons => {
                meter.charge(costs.cons)?;
                ClvmValue::pair(args[0].clone(), args[1].clone())
            }
            ClvmOperator::First => self.handle_op_first(args, meter)?,
            ClvmOperator::Rest => self.handle_op_rest(args, meter)?,
            ClvmOperator::ListP => {
                meter.charge(costs.listp)?;
                bool_atom(args[0].is_pair())
            }
            ClvmOperator::Raise => {
                return Err(ClvmError::Raise(disassemble(&ClvmValue::list(
                    args.iter().cloned(),
                ))))
            }
            ClvmOperator::Equal => self.handle_op_equal(opcode, args, meter)?,
            ClvmOperator::GreaterBytes => self.handle_op_gr_bytes(opcode, args, meter)?,
            ClvmOperator::Sha256 => self.handle_op_sha256(opcode, args, meter)?,
            ClvmOperator::Substr => self.handle_op_substr(opcode, args, meter)?,
            ClvmOperator::Strlen => {
                let s = atom_arg(opcode, args, 0)?;
                meter.charge(linear_cost(
                    costs.strlen_base,
                    &[(costs.strlen_per_byte, s.len() as u64)],
                ))?;
                self.new_number(Number::from(s.len()), meter)?
            }
            ClvmOperator::Concat => self.handle_op_concat(opcode, args, meter)?,
            ClvmOperator::Add => self.handle_op_add(opcode, args, meter)?,
            ClvmOperator::Subtract => self.handle_op_subtract(opcode, args, meter)?,
            ClvmOperator::Multiply => self.handle_op_multiply(opcode, args, meter)?,
            ClvmOperator::Divide => self.handle_op_divide(opcode, args, meter)?,
            ClvmOperator::DivMod => self.handle_op_divmod(opcode, args, meter)?,
            ClvmOperator::GreaterThan => self.handle_op_greater(opcode, args, meter)?,
            ClvmOperator::Ash => self.handle_op_shift(opcode, args, meter, false)?,
            ClvmOperator::Lsh => self.handle_op_shift(opcode, args, meter, true)?,
            ClvmOperator::LogAnd => {
                self.handle_op_logic(opcode, args, meter, Number::from(-1), Number::bitand)?
            }
            ClvmOperator::LogIor => {
                self.handle_op_logic(opcode, args, meter, Number::zero(), Number::bitor)?
            }
            ClvmOperator::LogXor => {
                self.handle_op_logic(opcode, args, meter, Number::zero(), Number::bitxor)?
            }
            ClvmOperator::LogNot => {
                let n = atom_arg(opcode, args, 0)?;
                meter.charge(linear_cost(
                    costs.lognot_base,
                    &[(costs.lognot_per_byte, n.len() as u64)],
                ))?;
                self.new_number(Number::from_signed_bytes(n).not(), meter)?
            }
            ClvmOperator::PointAdd => self.handle_op_point_add(opcode, args, meter)?,
            ClvmOperator::PubkeyForExp => self.handle_op_pubkey_for_exp(opcode, args, meter)?,
            ClvmOperator::Not => {
                meter.charge(costs.bool_base)?;
                bool_atom(!args[0].is_truthy())
            }
            ClvmOperator::Any => {
                meter.charge(linear_cost(
                    costs.bool_base,
                    &[(costs.bool_per_arg, args.len() as u64)],
                ))?;
                bool_atom(args.iter().any(|a| a.is_truthy()))
            }
            ClvmOperator::All => {
                meter.charge(linear_cost(
                    costs.bool_base,
                    &[(costs.bool_per_arg, args.len() as u64)],
                ))?;
                bool_atom(args.iter().all(|a| a.is_truthy()))
            }
            ClvmOperator::Softfork => self.handle_op_softfork(opcode, args, meter)?,
        };
        Ok(Step::Done(value))
    }

    // === OPCODE HANDLER METHODS ===

    /// Strict conditional: both branches were already evaluated
    fn handle_op_if(&self, args: &[Node], meter: &mut CostMeter) -> Result<Node, ClvmError> {
        meter.charge(self.options.costs.if_cost)?;
        Ok(if args[0].is_truthy() {
            args[1].clone()
        } else {
            args[2].clone()
        })
    }

    fn handle_op_first(&self, args: &[Node], meter: &mut CostMeter) -> Result<Node, ClvmError> {
        meter.charge(self.options.costs.first)?;
        match args[0].as_pair() {
            Some((first, _)) => Ok(first.clone()),
            None => Err(ClvmError::TypeError("first of non-pair".to_string())),
        }
    }

    fn handle_op_rest(&self, args: &[Node], meter: &mut CostMeter) -> Result<Node, ClvmError> {
        meter.charge(self.options.costs.rest)?;
        match args[0].as_pair() {
            Some((_, rest)) => Ok(rest.clone()),
            None => Err(ClvmError::TypeError("rest of non-pair".to_string())),
        }
    }

    /// Numeric equality; nil and the empty atom both read as zero
    fn handle_op_equal(
        &self,
        opcode: &[u8],
        args: &[Node],
        meter: &mut CostMeter,
    ) -> Result<Node, ClvmError> {
        let a = atom_arg(opcode, args, 0)?;
        let b = atom_arg(opcode, args, 1)?;
        let costs = &self.options.costs;
        meter.charge(linear_cost(
            costs.eq_base,
            &[(costs.eq_per_byte, (a.len() + b.len()) as u64)],
        ))?;
        Ok(bool_atom(
            Number::from_signed_bytes(a) == Number::from_signed_bytes(b),
        ))
    }

    fn handle_op_gr_bytes(
        &self,
        opcode: &[u8],
        args: &[Node],
        meter: &mut CostMeter,
    ) -> Result<Node, ClvmError> {
        let a = atom_arg(opcode, args, 0)?;
        let b = atom_arg(opcode, args, 1)?;
        let costs = &self.options.costs;
        meter.charge(linear_cost(
            costs.grs_base,
            &[(costs.grs_per_byte, (a.len() + b.len()) as u64)],
        ))?;
        Ok(bool_atom(a.cmp(b) == Ordering::Greater))
    }

    fn handle_op_greater(
        &self,
        opcode: &[u8],
        args: &[Node],
        meter: &mut CostMeter,
    ) -> Result<Node, ClvmError> {
        let a = atom_arg(opcode, args, 0)?;
        let b = atom_arg(opcode, args, 1)?;
        let costs = &self.options.costs;
        meter.charge(linear_cost(
            costs.gr_base,
            &[(costs.gr_per_byte, (a.len() + b.len()) as u64)],
        ))?;
        Ok(bool_atom(
            Number::from_signed_bytes(a) > Number::from_signed_bytes(b),
        ))
    }

    fn handle_op_sha256(
        &self,
        opcode: &[u8],
        args: &[Node],
        meter: &mut CostMeter,
    ) -> Result<Node, ClvmError> {
        let costs = &self.options.costs;
        let mut hasher = Sha256::new();
        let mut total = 0u64;
        for index in 0..args.len() {
            let atom = atom_arg(opcode, args, index)?;
            total += atom.len() as u64;
            hasher.update(atom);
        }
        meter.charge(linear_cost(
            costs.sha256_base,
            &[
                (costs.sha256_per_arg, args.len() as u64),
                (costs.sha256_per_byte, total),
            ],
        ))?;
        self.new_atom(hasher.finalize().to_vec(), meter)
    }

    /// `(substr s start [end])`, indices in bytes
    fn handle_op_substr(
        &self,
        opcode: &[u8],
        args: &[Node],
        meter: &mut CostMeter,
    ) -> Result<Node, ClvmError> {
        if args.len() != 2 && args.len() != 3 {
            return Err(ClvmError::operator(
                opcode,
                args.len().min(3),
                "substr takes 2 or 3 arguments",
            ));
        }
        let s = atom_arg(opcode, args, 0)?;
        let start = index_arg(opcode, args, 1)?;
        let end = if args.len() == 3 {
            index_arg(opcode, args, 2)?
        } else {
            s.len()
        };
        if end > s.len() || start > end {
            return Err(ClvmError::operator(opcode, 1, "invalid indices for substr"));
        }
        meter.charge(self.options.costs.substr)?;
        Ok(ClvmValue::atom(s[start..end].to_vec()))
    }

    fn handle_op_concat(
        &self,
        opcode: &[u8],
        args: &[Node],
        meter: &mut CostMeter,
    ) -> Result<Node, ClvmError> {
        let costs = &self.options.costs;
        let mut out = Vec::new();
        for index in 0..args.len() {
            out.extend_from_slice(atom_arg(opcode, args, index)?);
        }
        meter.charge(linear_cost(
            costs.concat_base,
            &[
                (costs.concat_per_arg, args.len() as u64),
                (costs.concat_per_byte, out.len() as u64),
            ],
        ))?;
        self.new_atom(out, meter)
    }

    fn handle_op_add(
        &self,
        opcode: &[u8],
        args: &[Node],
        meter: &mut CostMeter,
    ) -> Result<Node, ClvmError> {
        let (numbers, total_bytes) = int_args(opcode, args)?;
        self.charge_arith(args.len(), total_bytes, meter)?;
        let sum = numbers.iter().fold(Number::zero(), |acc, n| &acc + n);
        self.new_number(sum, meter)
    }

    /// `(- a b c)` is `a - b - c`; with no arguments the result is 0
    fn handle_op_subtract(
        &self,
        opcode: &[u8],
        args: &[Node],
        meter: &mut CostMeter,
    ) -> Result<Node, ClvmError> {
        let (numbers, total_bytes) = int_args(opcode, args)?;
        self.charge_arith(args.len(), total_bytes, meter)?;
        let mut iter = numbers.into_iter();
        let first = iter.next().unwrap_or_default();
        let difference = iter.fold(first, |acc, n| &acc - &n);
        self.new_number(difference, meter)
    }

    fn handle_op_multiply(
        &self,
        opcode: &[u8],
        args: &[Node],
        meter: &mut CostMeter,
    ) -> Result<Node, ClvmError> {
        let costs = &self.options.costs;
        meter.charge(costs.mul_base)?;
        let mut product = Number::from(1);
        let mut product_len = 1u64;
        for index in 0..args.len() {
            let operand = atom_arg(opcode, args, index)?;
            if index == 0 {
                product = Number::from_signed_bytes(operand);
                product_len = operand.len() as u64;
                continue;
            }
            let operand_len = operand.len() as u64;
            meter.charge(self.mul_step_cost(product_len, operand_len))?;
            product = &product * &Number::from_signed_bytes(operand);
            product_len = product.to_bytes().len() as u64;
        }
        self.new_number(product, meter)
    }

    /// Floor division: `(/ -3 2)` is -2
    fn handle_op_divide(
        &self,
        opcode: &[u8],
        args: &[Node],
        meter: &mut CostMeter,
    ) -> Result<Node, ClvmError> {
        let a = atom_arg(opcode, args, 0)?;
        let b = atom_arg(opcode, args, 1)?;
        let costs = &self.options.costs;
        meter.charge(linear_cost(
            costs.div_base,
            &[(costs.div_per_byte, (a.len() + b.len()) as u64)],
        ))?;
        let divisor = Number::from_signed_bytes(b);
        if divisor.is_zero() {
            return Err(ClvmError::operator(opcode, 1, "div with 0"));
        }
        let quotient = Number::from_signed_bytes(a).div_floor(&divisor)?;
        self.new_number(quotient, meter)
    }

    fn handle_op_divmod(
        &self,
        opcode: &[u8],
        args: &[Node],
        meter: &mut CostMeter,
    ) -> Result<Node, ClvmError> {
        let a = atom_arg(opcode, args, 0)?;
        let b = atom_arg(opcode, args, 1)?;
        let costs = &self.options.costs;
        meter.charge(linear_cost(
            costs.divmod_base,
            &[(costs.divmod_per_byte, (a.len() + b.len()) as u64)],
        ))?;
        let (dividend, divisor) = (Number::from_signed_bytes(a), Number::from_signed_bytes(b));
        if divisor.is_zero() {
            return Err(ClvmError::operator(opcode, 1, "divmod with 0"));
        }
        let quotient = self.new_number(dividend.div_floor(&divisor)?, meter)?;
        let remainder = self.new_number(dividend.mod_floor(&divisor)?, meter)?;
        Ok(ClvmValue::pair(quotient, remainder))
    }

    /// `ash` shifts the signed value, `lsh` the unsigned one; a negative
    /// shift amount shifts right
    fn handle_op_shift(
        &self,
        opcode: &[u8],
        args: &[Node],
        meter: &mut CostMeter,
        logical: bool,
    ) -> Result<Node, ClvmError> {
        let value = atom_arg(opcode, args, 0)?;
        let amount = Number::from_signed_bytes(atom_arg(opcode, args, 1)?)
            .to_i32()
            .ok()
            .filter(|s| s.unsigned_abs() <= 65535)
            .ok_or_else(|| ClvmError::operator(opcode, 1, "shift too large"))?;
        let base = if logical {
            Number::from_unsigned_bytes(value)
        } else {
            Number::from_signed_bytes(value)
        };
        let result = base.shift(amount);
        let costs = &self.options.costs;
        meter.charge(linear_cost(
            costs.shift_base,
            &[(costs.shift_per_byte, (value.len() + result.to_bytes().len()) as u64)],
        ))?;
        self.new_number(result, meter)
    }

    fn handle_op_logic(
        &self,
        opcode: &[u8],
        args: &[Node],
        meter: &mut CostMeter,
        identity: Number,
        combine: fn(&Number, &Number) -> Number,
    ) -> Result<Node, ClvmError> {
        let (numbers, total_bytes) = int_args(opcode, args)?;
        let costs = &self.options.costs;
        meter.charge(linear_cost(
            costs.log_base,
            &[
                (costs.log_per_arg, args.len() as u64),
                (costs.log_per_byte, total_bytes),
            ],
        ))?;
        let result = numbers.iter().fold(identity, |acc, n| combine(&acc, n));
        self.new_number(result, meter)
    }

    fn handle_op_point_add(
        &self,
        opcode: &[u8],
        args: &[Node],
        meter: &mut CostMeter,
    ) -> Result<Node, ClvmError> {
        let bls = self.require_bls(opcode)?;
        let costs = &self.options.costs;
        meter.charge(linear_cost(
            costs.point_add_base,
            &[(costs.point_add_per_arg, args.len() as u64)],
        ))?;
        let points = (0..args.len())
            .map(|index| atom_arg(opcode, args, index))
            .collect::<Result<Vec<_>, _>>()?;
        let sum = (bls.point_add)(&points).map_err(|e| ClvmError::operator(opcode, 0, e))?;
        self.new_atom(sum, meter)
    }

    fn handle_op_pubkey_for_exp(
        &self,
        opcode: &[u8],
        args: &[Node],
        meter: &mut CostMeter,
    ) -> Result<Node, ClvmError> {
        let bls = self.require_bls(opcode)?;
        let exponent = atom_arg(opcode, args, 0)?;
        let costs = &self.options.costs;
        meter.charge(linear_cost(
            costs.pubkey_base,
            &[(costs.pubkey_per_byte, exponent.len() as u64)],
        ))?;
        let pk = (bls.pubkey_for_exp)(exponent).map_err(|e| ClvmError::operator(opcode, 0, e))?;
        self.new_atom(pk, meter)
    }

    /// Charges the cost named by the first argument and yields nil
    fn handle_op_softfork(
        &self,
        opcode: &[u8],
        args: &[Node],
        meter: &mut CostMeter,
    ) -> Result<Node, ClvmError> {
        if args.is_empty() {
            return Err(ClvmError::operator(opcode, 0, "softfork takes at least 1 argument"));
        }
        let cost = Number::from_signed_bytes(atom_arg(opcode, args, 0)?)
            .to_u64()
            .ok()
            .filter(|&c| c > 0)
            .ok_or_else(|| ClvmError::operator(opcode, 0, "softfork cost must be positive"))?;
        meter.charge(cost)?;
        Ok(ClvmValue::nil())
    }

    /// Lenient handling of opcodes outside the table. The top two bits of
    /// the last byte pick a cost shape (flat, arithmetic, multiply, concat)
    /// which is scaled by that byte plus one; the result is always nil.
    fn handle_unknown_op(
        &self,
        opcode: &[u8],
        args: &[Node],
        meter: &mut CostMeter,
    ) -> Result<Node, ClvmError> {
        if self.options.strict {
            return Err(ClvmError::operator(opcode, 0, "unimplemented operator"));
        }
        let Some(&last) = opcode.last() else {
            return Err(ClvmError::operator(opcode, 0, "reserved operator"));
        };
        if opcode.len() > 2 && opcode.starts_with(&[0xff, 0xff]) {
            return Err(ClvmError::operator(opcode, 0, "reserved operator"));
        }
        if opcode.len() > UNKNOWN_OP_MAX_LEN {
            return Err(ClvmError::operator(opcode, 0, "invalid operator"));
        }

        let costs = &self.options.costs;
        let argc = args.len() as u64;
        let base = match last >> 6 {
            0 => costs.unknown_op_base,
            1 => self.arith_cost(argc, atom_bytes(opcode, args)?),
            2 => {
                // stops at the first pair operand
                let mut lens = args
                    .iter()
                    .map_while(|arg| arg.as_atom().map(|atom| atom.len() as u64));
                let mut cost = costs.mul_base;
                if let Some(mut product_len) = lens.next() {
                    for operand_len in lens {
                        cost = cost.saturating_add(self.mul_step_cost(product_len, operand_len));
                        product_len = product_len.saturating_add(operand_len);
                    }
                }
                cost
            }
            _ => linear_cost(
                costs.concat_base,
                &[
                    (costs.concat_per_byte, atom_bytes(opcode, args)?),
                    (costs.concat_per_arg, argc),
                ],
            ),
        };

        let cost = base.saturating_mul(u64::from(last) + 1);
        if cost >= UNKNOWN_OP_COST_LIMIT {
            return Err(ClvmError::operator(opcode, 0, "invalid operator"));
        }
        meter.charge(cost)?;
        Ok(ClvmValue::nil())
    }

    fn require_bls(&self, opcode: &[u8]) -> Result<BlsOps, ClvmError> {
        self.bls
            .ok_or_else(|| ClvmError::operator(opcode, 0, "bls operations are not available"))
    }

    fn charge_arith(
        &self,
        argc: usize,
        total_bytes: u64,
        meter: &mut CostMeter,
    ) -> Result<(), ClvmError> {
        meter.charge(self.arith_cost(argc as u64, total_bytes))
    }

    fn arith_cost(&self, argc: u64, total_bytes: u64) -> u64 {
        let costs = &self.options.costs;
        linear_cost(
            costs.arith_base,
            &[(costs.arith_per_arg, argc), (costs.arith_per_byte, total_bytes)],
        )
    }

    /// Cost of folding one more operand of `operand_len` bytes into a product
    fn mul_step_cost(&self, product_len: u64, operand_len: u64) -> u64 {
        let costs = &self.options.costs;
        linear_cost(
            costs.mul_per_op,
            &[(costs.mul_linear_per_byte, product_len.saturating_add(operand_len))],
        )
        .saturating_add(
            product_len.saturating_mul(operand_len) / costs.mul_square_per_byte_divider.max(1),
        )
    }

    fn new_atom(&self, bytes: Vec<u8>, meter: &mut CostMeter) -> Result<Node, ClvmError> {
        meter.charge(
            self.options
                .costs
                .malloc_per_byte
                .saturating_mul(bytes.len() as u64),
        )?;
        Ok(ClvmValue::atom(bytes))
    }

    fn new_number(&self, number: Number, meter: &mut CostMeter) -> Result<Node, ClvmError> {
        self.new_atom(number.to_bytes(), meter)
    }
}

/// `base + rate * count` over each term, saturating at `u64::MAX`
fn linear_cost(base: u64, terms: &[(u64, u64)]) -> u64 {
    terms.iter().fold(base, |total, &(rate, count)| {
        total.saturating_add(rate.saturating_mul(count))
    })
}

fn bool_atom(value: bool) -> Node {
    if value {
        ClvmValue::atom(vec![1u8])
    } else {
        ClvmValue::nil()
    }
}

fn atom_arg<'a>(opcode: &[u8], args: &'a [Node], index: usize) -> Result<&'a [u8], ClvmError> {
    args.get(index)
        .and_then(|node| node.as_atom())
        .ok_or_else(|| ClvmError::operator(opcode, index, "requires an atom argument"))
}

/// Total length of the atom arguments; any pair is an error
fn atom_bytes(opcode: &[u8], args: &[Node]) -> Result<u64, ClvmError> {
    (0..args.len()).try_fold(0u64, |total, index| {
        Ok(total + atom_arg(opcode, args, index)?.len() as u64)
    })
}

fn index_arg(opcode: &[u8], args: &[Node], index: usize) -> Result<usize, ClvmError> {
    Number::from_signed_bytes(atom_arg(opcode, args, index)?)
        .to_u32()
        .map(|i| i as usize)
        .map_err(|_| ClvmError::operator(opcode, index, "invalid index"))
}

fn int_args(opcode: &[u8], args: &[Node]) -> Result<(Vec<Number>, u64), ClvmError> {
    let mut total_bytes = 0u64;
    let mut numbers = Vec::with_capacity(args.len());
    for index in 0..args.len() {
        let atom = atom_arg(opcode, args, index)?;
        total_bytes += atom.len() as u64;
        numbers.push(Number::from_signed_bytes(atom));
    }
    Ok((numbers, total_bytes))
}

/// Run with default options and no BLS support
pub fn run_program(program: &Node, env: &Node) -> Result<(u64, Node), ClvmError> {
    ClvmEvaluator::new().run(program, env)
}
