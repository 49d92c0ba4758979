//! Standard puzzle templates, parsed once from their serialized form

use std::str::FromStr;

use once_cell::sync::Lazy;

use crate::program::Program;
use crate::types::ClvmError;

/// `(=)`: always fails, so a key paired with it has no hidden spend path
const DEFAULT_HIDDEN_PUZZLE_HEX: &str = "ff0980";

/// `(point_add 2 (pubkey_for_exp (sha256 2 5)))`
const SYNTHETIC_MOD_HEX: &str = "ff1dff02ffff1effff0bff02ff05808080";

/// P2_delegated_puzzle_or_hidden_puzzle; curried with a synthetic public key
const STANDARD_PUZZLE_HEX: &str = concat!(
    "ff02ffff01ff02ffff03ff0bffff01ff02ffff03ffff09ff05ffff1dff0bffff1effff0bff0bffff02ff06ffff04ff02",
    "ffff04ff17ff8080808080808080ffff01ff02ff17ff2f80ffff01ff088080ff0180ffff01ff04ffff04ff04ffff04ff",
    "05ffff04ffff02ff06ffff04ff02ffff04ff17ff80808080ff80808080ffff02ff17ff2f808080ff0180ffff04ffff01",
    "ff32ff02ffff03ffff07ff0580ffff01ff0bffff0102ffff02ff06ffff04ff02ffff04ff09ff80808080ffff02ff06ff",
    "ff04ff02ffff04ff0dff8080808080ffff01ff0bffff0101ff058080ff0180ff018080"
);

/// `(c (q . 1) 2)`: quotes its argument, so running it returns the conditions
const P2_CONDITIONS_HEX: &str = "ff04ffff0101ff0280";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PuzzleName {
    DefaultHiddenPuzzle,
    SyntheticMod,
    StandardPuzzle,
    P2Conditions,
}

impl PuzzleName {
    pub const ALL: [PuzzleName; 4] = [
        PuzzleName::DefaultHiddenPuzzle,
        PuzzleName::SyntheticMod,
        PuzzleName::StandardPuzzle,
        PuzzleName::P2Conditions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PuzzleName::DefaultHiddenPuzzle => "default_hidden_puzzle",
            PuzzleName::SyntheticMod => "synthetic_mod",
            PuzzleName::StandardPuzzle => "p2_delegated_puzzle_or_hidden_puzzle",
            PuzzleName::P2Conditions => "p2_conditions",
        }
    }

    fn hex(&self) -> &'static str {
        match self {
            PuzzleName::DefaultHiddenPuzzle => DEFAULT_HIDDEN_PUZZLE_HEX,
            PuzzleName::SyntheticMod => SYNTHETIC_MOD_HEX,
            PuzzleName::StandardPuzzle => STANDARD_PUZZLE_HEX,
            PuzzleName::P2Conditions => P2_CONDITIONS_HEX,
        }
    }
}

impl FromStr for PuzzleName {
    type Err = ClvmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PuzzleName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| ClvmError::ConfigurationError(format!("unknown predefined program: {}", s)))
    }
}

/// Immutable set of parsed templates
///
/// Build one explicitly with `new` and pass it around, or use `shared` for
/// the process-wide instance that is built on first access.
#[derive(Debug, Clone)]
pub struct PredefinedPrograms {
    default_hidden_puzzle: Program,
    synthetic_mod: Program,
    standard_puzzle: Program,
    p2_conditions: Program,
}

static SHARED: Lazy<Result<PredefinedPrograms, ClvmError>> = Lazy::new(PredefinedPrograms::new);

impl PredefinedPrograms {
    pub fn new() -> Result<Self, ClvmError> {
        Ok(Self {
            default_hidden_puzzle: Program::from_hex(PuzzleName::DefaultHiddenPuzzle.hex())?,
            synthetic_mod: Program::from_hex(PuzzleName::SyntheticMod.hex())?,
            standard_puzzle: Program::from_hex(PuzzleName::StandardPuzzle.hex())?,
            p2_conditions: Program::from_hex(PuzzleName::P2Conditions.hex())?,
        })
    }

    pub fn shared() -> Result<&'static PredefinedPrograms, ClvmError> {
        SHARED.as_ref().map_err(Clone::clone)
    }

    pub fn get(&self, name: PuzzleName) -> &Program {
        match name {
            PuzzleName::DefaultHiddenPuzzle => &self.default_hidden_puzzle,
            PuzzleName::SyntheticMod => &self.synthetic_mod,
            PuzzleName::StandardPuzzle => &self.standard_puzzle,
            PuzzleName::P2Conditions => &self.p2_conditions,
        }
    }

    pub fn get_by_name(&self, name: &str) -> Result<&Program, ClvmError> {
        name.parse::<PuzzleName>().map(|name| self.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_hashes() {
        let programs = PredefinedPrograms::new().unwrap();
        let expected = [
            (
                PuzzleName::DefaultHiddenPuzzle,
                "711d6c4e32c92e53179b199484cf8c897542bc57f2b22582799f9d657eec4699",
            ),
            (
                PuzzleName::SyntheticMod,
                "624c5d5704d0decadfc0503e71bbffb6cdfe45025bce7cf3e6864d1eafe8f65e",
            ),
            (
                PuzzleName::StandardPuzzle,
                "e9aaa49f45bad5c889b86ee3341550c155cfdd10c3a6757de618d20612fffd52",
            ),
            (
                PuzzleName::P2Conditions,
                "1c77d7d5efde60a7a1d2d27db6d746bc8e568aea1ef8586ca967a0d60b83cc36",
            ),
        ];
        for (name, hash) in expected {
            assert_eq!(hex::encode(programs.get(name).tree_hash()), hash, "{:?}", name);
        }
    }

    #[test]
    fn test_blobs_reserialize_exactly() {
        let programs = PredefinedPrograms::new().unwrap();
        for name in PuzzleName::ALL {
            assert_eq!(programs.get(name).to_hex().unwrap(), name.hex());
        }
    }

    #[test]
    fn test_lookup_by_name() {
        let programs = PredefinedPrograms::shared().unwrap();
        let by_name = programs.get_by_name("synthetic_mod").unwrap();
        assert_eq!(by_name, programs.get(PuzzleName::SyntheticMod));
        assert!(matches!(
            programs.get_by_name("p2_singleton"),
            Err(ClvmError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_shared_instance_is_built_once() {
        let a = PredefinedPrograms::shared().unwrap() as *const _;
        let b = PredefinedPrograms::shared().unwrap() as *const _;
        assert_eq!(a, b);
    }

    #[test]
    fn test_shared_from_many_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                std::thread::spawn(|| {
                    PredefinedPrograms::shared()
                        .unwrap()
                        .get(PuzzleName::StandardPuzzle)
                        .tree_hash()
                })
            })
            .collect();
        let hashes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(hashes.windows(2).all(|w| w[0] == w[1]));
    }
}
