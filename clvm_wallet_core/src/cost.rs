//! Per-operator cost constants
//!
//! Defaults are the mainnet CLVM cost table. Every field can be overridden
//! from JSON; missing fields keep their defaults.

use serde::{Deserialize, Serialize};

use crate::types::ClvmError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostTable {
    pub quote: u64,
    pub apply: u64,
    pub path_lookup_base: u64,
    pub path_lookup_per_leg: u64,
    pub path_lookup_per_zero_byte: u64,

    pub if_cost: u64,
    pub cons: u64,
    pub first: u64,
    pub rest: u64,
    pub listp: u64,
    pub malloc_per_byte: u64,

    pub arith_base: u64,
    pub arith_per_arg: u64,
    pub arith_per_byte: u64,

    pub log_base: u64,
    pub log_per_arg: u64,
    pub log_per_byte: u64,
    pub lognot_base: u64,
    pub lognot_per_byte: u64,

    pub mul_base: u64,
    pub mul_per_op: u64,
    pub mul_linear_per_byte: u64,
    pub mul_square_per_byte_divider: u64,

    pub gr_base: u64,
    pub gr_per_byte: u64,
    pub eq_base: u64,
    pub eq_per_byte: u64,
    pub grs_base: u64,
    pub grs_per_byte: u64,

    pub div_base: u64,
    pub div_per_byte: u64,
    pub divmod_base: u64,
    pub divmod_per_byte: u64,

    pub strlen_base: u64,
    pub strlen_per_byte: u64,
    pub substr: u64,
    pub concat_base: u64,
    pub concat_per_arg: u64,
    pub concat_per_byte: u64,

    pub sha256_base: u64,
    pub sha256_per_arg: u64,
    pub sha256_per_byte: u64,

    pub shift_base: u64,
    pub shift_per_byte: u64,

    pub bool_base: u64,
    pub bool_per_arg: u64,

    pub point_add_base: u64,
    pub point_add_per_arg: u64,
    pub pubkey_base: u64,
    pub pubkey_per_byte: u64,

    /// Flat-shape cost for unrecognised opcodes, before scaling by the last byte
    pub unknown_op_base: u64,
}

impl Default for CostTable {
    fn default() -> Self {
        Self {
            quote: 20,
            apply: 90,
            path_lookup_base: 40,
            path_lookup_per_leg: 4,
            path_lookup_per_zero_byte: 4,

            if_cost: 33,
            cons: 50,
            first: 30,
            rest: 30,
            listp: 19,
            malloc_per_byte: 10,

            arith_base: 99,
            arith_per_arg: 320,
            arith_per_byte: 3,

            log_base: 100,
            log_per_arg: 264,
            log_per_byte: 3,
            lognot_base: 331,
            lognot_per_byte: 3,

            mul_base: 92,
            mul_per_op: 885,
            mul_linear_per_byte: 6,
            mul_square_per_byte_divider: 128,

            gr_base: 498,
            gr_per_byte: 2,
            eq_base: 117,
            eq_per_byte: 1,
            grs_base: 117,
            grs_per_byte: 1,

            div_base: 988,
            div_per_byte: 4,
            divmod_base: 1116,
            divmod_per_byte: 6,

            strlen_base: 173,
            strlen_per_byte: 1,
            substr: 1,
            concat_base: 142,
            concat_per_arg: 135,
            concat_per_byte: 3,

            sha256_base: 87,
            sha256_per_arg: 134,
            sha256_per_byte: 2,

            shift_base: 277,
            shift_per_byte: 3,

            bool_base: 200,
            bool_per_arg: 300,

            point_add_base: 101_094,
            point_add_per_arg: 1_343_980,
            pubkey_base: 1_325_730,
            pubkey_per_byte: 38,

            unknown_op_base: 1,
        }
    }
}

impl CostTable {
    /// Load overrides from a JSON object
    pub fn from_json(json: &str) -> Result<Self, ClvmError> {
        let table: CostTable = serde_json::from_str(json)
            .map_err(|e| ClvmError::ConfigurationError(format!("invalid cost table: {}", e)))?;
        if table.mul_square_per_byte_divider == 0 {
            return Err(ClvmError::ConfigurationError(
                "mul_square_per_byte_divider must be non-zero".to_string(),
            ));
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_override_keeps_defaults() {
        let table = CostTable::from_json(r#"{"quote": 7, "apply": 11}"#).unwrap();
        assert_eq!(table.quote, 7);
        assert_eq!(table.apply, 11);
        assert_eq!(table.cons, CostTable::default().cons);
    }

    #[test]
    fn test_invalid_tables_rejected() {
        assert!(matches!(
            CostTable::from_json("{\"quote\": -1}"),
            Err(ClvmError::ConfigurationError(_))
        ));
        assert!(CostTable::from_json(r#"{"mul_square_per_byte_divider": 0}"#).is_err());
    }
}
