#![allow(dead_code)]
use clvm_wallet::clvm_wallet_core::{assemble, ClvmError, ClvmEvaluator, Node, RunOptions};
use clvm_wallet::{bls_ops, SecretKey};
use once_cell::sync::Lazy;
use rand::{thread_rng, RngCore};
use std::env;

/// Internal helper for formatted logging
#[macro_export]
macro_rules! log_with_level {
    ($level:literal, $($arg:tt)*) => {
        println!("[{}] [{}] [{}] {}",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            $level,
            std::thread::current().name().unwrap_or("test"),
            format!($($arg)*))
    };
}

/// Internal helper for error logging (uses stderr)
#[macro_export]
macro_rules! error_log_with_level {
    ($level:literal, $($arg:tt)*) => {
        eprintln!("[{}] [{}] [{}] {}",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            $level,
            std::thread::current().name().unwrap_or("test"),
            format!($($arg)*))
    };
}

/// Test logging macros that include timestamp, level, and test name
#[macro_export]
macro_rules! test_info {
    ($($arg:tt)*) => {
        log_with_level!("INFO", $($arg)*)
    };
}

#[macro_export]
macro_rules! test_error {
    ($($arg:tt)*) => {
        error_log_with_level!("ERROR", $($arg)*)
    };
}

#[macro_export]
macro_rules! test_warn {
    ($($arg:tt)*) => {
        log_with_level!("WARN", $($arg)*)
    };
}

#[macro_export]
macro_rules! test_debug {
    ($($arg:tt)*) => {
        log_with_level!("DEBUG", $($arg)*)
    };
}

/// Assemble both sides and run with BLS support
pub fn run_asm(program: &str, env: &str) -> Result<(u64, Node), ClvmError> {
    run_asm_with(program, env, RunOptions::default())
}

pub fn run_asm_with(program: &str, env: &str, options: RunOptions) -> Result<(u64, Node), ClvmError> {
    let evaluator = ClvmEvaluator::with_options(options).with_bls(bls_ops());
    evaluator.run(&assemble(program)?, &assemble(env)?)
}

/// Fresh master key from a random seed
pub fn random_secret_key() -> SecretKey {
    let mut seed = [0u8; 32];
    thread_rng().fill_bytes(&mut seed);
    SecretKey::key_gen(&seed).expect("32-byte seed is always accepted")
}

pub static BATCH_SIZE: Lazy<usize> = Lazy::new(|| {
    env::var("BATCH_SIZE")
        .ok()
        .and_then(|val| val.parse::<usize>().ok())
        .unwrap_or(4) // fallback default
});
