use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clvm_wallet_core::{
    assemble, disassemble, node_from_hex, ClvmEvaluator, CostTable, Node, Program, RunOptions,
};
use log::info;
use serde::Serialize;

use crate::address::{decode_address, encode_puzzle_hash};
use crate::error::WalletError;
use crate::keys::{bls_ops, PublicKey, SecretKey};
use crate::synthetic::{
    calculate_synthetic_public_key, default_hidden_puzzle_hash, puzzle_for_synthetic_public_key,
};

#[derive(Parser)]
#[command(name = "clvm-wallet")]
#[command(about = "Run CLVM programs and derive standard-puzzle keys and addresses")]
#[command(version = "0.1.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a program against an environment
    Run {
        /// Program in assembler syntax, e.g. "(+ 2 5)"
        program: String,
        /// Environment in assembler syntax
        #[arg(long, default_value = "()")]
        env: String,
        /// Abort once the cost passes this limit
        #[arg(long, env = "CLVM_MAX_COST")]
        max_cost: Option<u64>,
        /// Reject unknown operators (false charges the unknown-op cost and returns nil)
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        strict: bool,
        /// JSON file overriding the operator cost table
        #[arg(long)]
        cost_table: Option<PathBuf>,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Print the tree hash of a program
    #[command(name = "tree-hash")]
    TreeHash { program: String },
    /// Bind arguments into a program
    Curry {
        program: String,
        /// Arguments in assembler syntax
        args: Vec<String>,
    },
    /// Print the serialized hex of a program
    Serialize { program: String },
    /// Print a serialized program in assembler syntax
    Deserialize { hex: String },
    /// Derive the synthetic public key and standard puzzle hash
    #[command(name = "synthetic-key")]
    SyntheticKey {
        /// 48-byte public key, hex
        public_key: String,
        /// Hidden puzzle in assembler syntax (default: the always-failing puzzle)
        #[arg(long)]
        hidden: Option<String>,
    },
    /// Encode the standard puzzle hash of a public key as an address
    Address {
        public_key: String,
        #[arg(long, default_value = "xch")]
        prefix: String,
    },
    /// Decode an address to its puzzle hash
    #[command(name = "decode-address")]
    DecodeAddress { address: String },
    /// Derive a wallet key from a seed along m/12381/8444/2/index
    #[command(name = "wallet-key")]
    WalletKey {
        /// Seed of at least 32 bytes, hex
        #[arg(long)]
        seed: String,
        #[arg(long, default_value = "0")]
        index: u32,
        #[arg(long, default_value = "xch")]
        prefix: String,
    },
}

#[derive(clap::ValueEnum, Clone, Copy)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct RunReport {
    cost: u64,
    result: String,
    result_hex: String,
}

pub fn run_cli() -> Result<(), WalletError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            program,
            env,
            max_cost,
            strict,
            cost_table,
            format,
        } => run_program(&program, &env, max_cost, strict, cost_table, format),
        Commands::TreeHash { program } => {
            let program = Program::from_assembly(&program)?;
            println!("{}", hex::encode(program.tree_hash()));
            Ok(())
        }
        Commands::Curry { program, args } => run_curry(&program, &args),
        Commands::Serialize { program } => {
            println!("{}", Program::from_assembly(&program)?.to_hex()?);
            Ok(())
        }
        Commands::Deserialize { hex } => {
            println!("{}", disassemble(&node_from_hex(&hex)?));
            Ok(())
        }
        Commands::SyntheticKey { public_key, hidden } => {
            run_synthetic_key(&public_key, hidden.as_deref())
        }
        Commands::Address { public_key, prefix } => {
            let public_key = PublicKey::from_hex(&public_key)?;
            let puzzle_hash = crate::synthetic::public_key_to_puzzle_hash(&public_key)?;
            println!("{}", encode_puzzle_hash(&puzzle_hash, &prefix)?);
            Ok(())
        }
        Commands::DecodeAddress { address } => {
            let (prefix, puzzle_hash) = decode_address(&address)?;
            println!("prefix: {}", prefix);
            println!("puzzle hash: {}", hex::encode(puzzle_hash));
            Ok(())
        }
        Commands::WalletKey {
            seed,
            index,
            prefix,
        } => run_wallet_key(&seed, index, &prefix),
    }
}

fn run_program(
    program: &str,
    env: &str,
    max_cost: Option<u64>,
    strict: bool,
    cost_table: Option<PathBuf>,
    format: OutputFormat,
) -> Result<(), WalletError> {
    let costs = match cost_table {
        Some(path) => CostTable::from_json(&fs::read_to_string(path)?)?,
        None => CostTable::default(),
    };
    let options = RunOptions {
        max_cost,
        strict,
        costs,
    };
    let evaluator = ClvmEvaluator::with_options(options).with_bls(bls_ops());
    let program = Program::from_assembly(program)?;
    let env = assemble(env)?;

    let (cost, result) = program.run_with(&evaluator, &env)?;
    info!("program {} ran with cost {}", hex::encode(program.tree_hash()), cost);

    let report = RunReport {
        cost,
        result: disassemble(&result),
        result_hex: Program::new(result).to_hex()?,
    };
    match format {
        OutputFormat::Text => {
            println!("cost: {}", report.cost);
            println!("{}", report.result);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn run_curry(program: &str, args: &[String]) -> Result<(), WalletError> {
    let program = Program::from_assembly(program)?;
    let args = args
        .iter()
        .map(|arg| assemble(arg))
        .collect::<Result<Vec<Node>, _>>()?;
    let curried = program.curry(&args);
    println!("{}", curried);
    println!("tree hash: {}", hex::encode(curried.tree_hash()));
    Ok(())
}

fn run_synthetic_key(public_key: &str, hidden: Option<&str>) -> Result<(), WalletError> {
    let public_key = PublicKey::from_hex(public_key)?;
    let hidden_puzzle_hash = match hidden {
        Some(source) => Program::from_assembly(source)?.tree_hash(),
        None => default_hidden_puzzle_hash()?,
    };
    let synthetic = calculate_synthetic_public_key(&public_key, &hidden_puzzle_hash)?;
    let puzzle = puzzle_for_synthetic_public_key(&synthetic)?;
    println!("hidden puzzle hash: {}", hex::encode(hidden_puzzle_hash));
    println!("synthetic public key: {}", synthetic);
    println!("puzzle hash: {}", hex::encode(puzzle.tree_hash()));
    Ok(())
}

fn run_wallet_key(seed: &str, index: u32, prefix: &str) -> Result<(), WalletError> {
    let master = SecretKey::key_gen(&hex::decode(seed)?)?;
    let wallet_key = master.derive_wallet_key(index)?;
    let public_key = wallet_key.public_key();
    let puzzle_hash = crate::synthetic::public_key_to_puzzle_hash(&public_key)?;
    println!("path: m/12381/8444/2/{}", index);
    println!("public key: {}", public_key);
    println!("puzzle hash: {}", hex::encode(puzzle_hash));
    println!("address: {}", encode_puzzle_hash(&puzzle_hash, prefix)?);
    Ok(())
}
