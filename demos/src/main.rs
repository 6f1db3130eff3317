//! Lottery demos entry point.
//!
//! Dispatches the command line onto the walkthroughs in the library crate.

use std::env;
use std::process;

use lotto_demos::{rollover, single_round, DemoError};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "round" => run_single_round(&args[2..]),
        "rollover" => rollover::run(),
        "help" | "--help" | "-h" => {
            print_usage(&args[0]);
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {}", args[1]);
            print_usage(&args[0]);
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run_single_round(args: &[String]) -> Result<(), DemoError> {
    let seed = if args.is_empty() {
        42
    } else {
        args[0]
            .parse::<u64>()
            .map_err(|_| DemoError::Other("Invalid oracle seed".to_string()))?
    };
    single_round::run(seed)
}

fn print_usage(program_name: &str) {
    println!("Lottery Engine Demos");
    println!();
    println!("USAGE:");
    println!("    {program_name} <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    round [SEED]    One full round: purchases, draw, claims (default seed: 42)");
    println!("    rollover        Two rounds with a scripted jackpot and carryover");
    println!("    help            Show this help message");
    println!();
    println!("EXAMPLES:");
    println!("    {program_name} round 7      # Draw from oracle seed 7");
    println!("    {program_name} rollover     # Watch unclaimed pools carry forward");
}
