use clvm_wallet::clvm_wallet_core::condition_opcodes::{AGG_SIG_ME, CREATE_COIN};
use clvm_wallet::clvm_wallet_core::{
    make_create_coin_condition, make_reserve_fee_condition, parse_conditions, ClvmError,
    ClvmEvaluator,
};
use clvm_wallet::{
    bls_ops, calculate_synthetic_public_key, calculate_synthetic_secret_key,
    default_hidden_puzzle_hash, puzzle_for_conditions, puzzle_for_public_key,
    puzzle_for_public_key_and_hidden_puzzle, sign_coin_spends, solution_for_conditions,
    solution_for_hidden_puzzle, verify_coin_spends, ClvmValue, Coin, CoinSpend, Program,
    WalletError,
};

mod common;
use crate::common::random_secret_key;

const ADDITIONAL_DATA: [u8; 32] = [0xcc; 32];

#[test]
fn test_delegated_spend_demands_synthetic_signature() {
    let sk = random_secret_key();
    let pk = sk.public_key();
    let hidden = default_hidden_puzzle_hash().unwrap();
    let synthetic_pk = calculate_synthetic_public_key(&pk, &hidden).unwrap();

    let puzzle = puzzle_for_public_key(&pk).unwrap();
    let outputs = vec![make_create_coin_condition(&[3u8; 32], 1000, &[])];
    let solution = solution_for_conditions(&outputs).unwrap();
    let delegated = puzzle_for_conditions(&outputs).unwrap();

    let evaluator = ClvmEvaluator::new().with_bls(bls_ops());
    let (cost, result) = puzzle.run_with(&evaluator, &solution).unwrap();
    test_info!("standard puzzle delegated spend cost {}", cost);

    let conditions = parse_conditions(&result).unwrap();
    assert_eq!(conditions.len(), 2);
    assert_eq!(conditions[0].opcode, AGG_SIG_ME);
    assert_eq!(conditions[0].atom_arg(0).unwrap(), &synthetic_pk.to_bytes()[..]);
    assert_eq!(conditions[0].bytes32_arg(1).unwrap(), delegated.tree_hash());
    assert_eq!(conditions[1].opcode, CREATE_COIN);
    assert_eq!(conditions[1].u64_arg(1).unwrap(), 1000);
}

#[test]
fn test_hidden_puzzle_spend() {
    let pk = random_secret_key().public_key();
    let hidden = puzzle_for_conditions(&[make_reserve_fee_condition(9)]).unwrap();
    let puzzle = puzzle_for_public_key_and_hidden_puzzle(&pk, &hidden).unwrap();
    let evaluator = ClvmEvaluator::new().with_bls(bls_ops());

    let solution = solution_for_hidden_puzzle(&pk, &hidden, &ClvmValue::nil());
    let (_, result) = puzzle.run_with(&evaluator, &solution).unwrap();
    assert_eq!(result, ClvmValue::list(vec![make_reserve_fee_condition(9)]));

    // a different original key does not rebuild the synthetic key
    let stranger = random_secret_key().public_key();
    let forged = solution_for_hidden_puzzle(&stranger, &hidden, &ClvmValue::nil());
    let err = puzzle.run_with(&evaluator, &forged).unwrap_err();
    assert!(matches!(err, ClvmError::Raise(_)), "{:?}", err);
}

#[test]
fn test_default_hidden_puzzle_cannot_be_revealed() {
    let pk = random_secret_key().public_key();
    let puzzle = puzzle_for_public_key(&pk).unwrap();
    let default_hidden = Program::from_hex("ff0980").unwrap();
    let solution = solution_for_hidden_puzzle(&pk, &default_hidden, &ClvmValue::nil());
    let evaluator = ClvmEvaluator::new().with_bls(bls_ops());
    assert!(puzzle.run_with(&evaluator, &solution).is_err());
}

#[test]
fn test_sign_standard_spend_end_to_end() -> Result<(), WalletError> {
    let sk = random_secret_key().derive_wallet_key(0)?;
    let hidden = default_hidden_puzzle_hash()?;
    let synthetic_sk = calculate_synthetic_secret_key(&sk, &hidden)?;

    let puzzle = puzzle_for_public_key(&sk.public_key())?;
    let coin = Coin::new([1u8; 32], puzzle.tree_hash(), 1_000_000);
    let outputs = vec![
        make_create_coin_condition(&[4u8; 32], 999_000, &[]),
        make_reserve_fee_condition(1_000),
    ];
    let solution = Program::new(solution_for_conditions(&outputs)?);
    let spend = CoinSpend::new(coin, puzzle, solution);

    assert_eq!(spend.reserved_fee()?, 1_000);
    assert_eq!(spend.additions()?, vec![Coin::new(coin.name(), [4u8; 32], 999_000)]);

    let lookup = |pk: &clvm_wallet::PublicKey| {
        (*pk == synthetic_sk.public_key()).then(|| synthetic_sk.clone())
    };
    let signature = sign_coin_spends(&[spend.clone()], lookup, &ADDITIONAL_DATA, None)?;
    test_info!("aggregate signature {}", signature.to_hex());
    assert!(verify_coin_spends(&[spend.clone()], &signature, &ADDITIONAL_DATA, None)?);

    // the unblinded wallet key cannot sign for the synthetic key
    let wrong = sign_coin_spends(&[spend], |_| Some(sk.clone()), &ADDITIONAL_DATA, None);
    assert!(matches!(wrong, Err(WalletError::MissingSecretKey(_))));
    Ok(())
}
