use anrex::{CompileError, Compiler, ProcessOptimizer, compile};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "anrex")]
#[command(about = "Anrex - compile annotated regexes down to plain patterns")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile annotated source to a plain pattern
    Compile {
        /// Source file, or '-' for stdin
        input: PathBuf,
        /// Run capture groups through the external optimizer
        #[arg(short, long)]
        optimize: bool,
        /// External optimizer command
        #[arg(long, default_value = ProcessOptimizer::DEFAULT_PROGRAM)]
        optimizer: String,
        /// Optimizer timeout in seconds
        #[arg(long, default_value_t = 10)]
        timeout: u64,
    },
    /// Compile, validate against a regex engine, and report capture groups
    Check {
        /// Source file, or '-' for stdin
        input: PathBuf,
        /// Run capture groups through the external optimizer
        #[arg(short, long)]
        optimize: bool,
        /// External optimizer command
        #[arg(long, default_value = ProcessOptimizer::DEFAULT_PROGRAM)]
        optimizer: String,
        /// Optimizer timeout in seconds
        #[arg(long, default_value_t = 10)]
        timeout: u64,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            input,
            optimize,
            optimizer,
            timeout,
        } => cmd_compile(&input, optimize, &optimizer, timeout),
        Commands::Check {
            input,
            optimize,
            optimizer,
            timeout,
        } => cmd_check(&input, optimize, &optimizer, timeout),
    }
}

fn cmd_compile(input: &Path, optimize: bool, optimizer: &str, timeout: u64) {
    let source = read_source(input);

    match build_pattern(&source, optimize, optimizer, timeout) {
        Ok(pattern) => println!("{pattern}"),
        Err(e) => report_and_exit(&e),
    }
}

fn cmd_check(input: &Path, optimize: bool, optimizer: &str, timeout: u64) {
    let source = read_source(input);

    let pattern = match build_pattern(&source, optimize, optimizer, timeout) {
        Ok(pattern) => pattern,
        Err(e) => report_and_exit(&e),
    };

    println!("{}", "Compiled pattern:".bold());
    println!("  {}", pattern.cyan());
    println!();

    let regex = match regex::Regex::new(&pattern) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    println!("{}", "✓ Pattern is valid".green().bold());

    let group_count = regex.captures_len() - 1;
    println!(
        "{} {}",
        "Capture groups:".bold(),
        group_count.to_string().green()
    );
    for (idx, name) in regex.capture_names().enumerate().skip(1) {
        match name {
            Some(name) => println!("  [{}] {}", idx, name.cyan()),
            None => println!("  [{}] {}", idx, "(unnamed)".dimmed()),
        }
    }
}

fn build_pattern(
    source: &str,
    optimize: bool,
    optimizer: &str,
    timeout: u64,
) -> Result<String, CompileError> {
    if optimize {
        let optimizer =
            ProcessOptimizer::new(optimizer).with_timeout(Duration::from_secs(timeout));
        Compiler::new().with_optimizer(&optimizer).compile(source)
    } else {
        compile(source)
    }
}

fn read_source(input: &Path) -> String {
    let result = if input.as_os_str() == "-" {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .map(|_| source)
    } else {
        std::fs::read_to_string(input)
    };

    match result {
        Ok(source) => source,
        Err(e) => {
            eprintln!(
                "{} cannot read {}: {}",
                "Error:".red().bold(),
                input.display(),
                e
            );
            std::process::exit(1);
        }
    }
}

fn report_and_exit(err: &CompileError) -> ! {
    let diag = err.diagnostic();
    eprintln!("{} {}", "Error:".red().bold(), diag.message);
    if !diag.context.is_empty() {
        eprintln!("  near: {}", diag.context.escape_debug().to_string().dimmed());
    }
    std::process::exit(1)
}
