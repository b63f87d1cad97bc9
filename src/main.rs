use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use qlisp::{eval_each, eval_str, Environment, Value};

#[derive(Parser, Debug)]
#[command(name = "qlisp", about = "A small Lisp with quoted expressions")]
struct Args {
    /// Source file; every top-level expression is evaluated in order.
    file: Option<PathBuf>,

    /// Evaluate one line and print the result.
    #[arg(short, long)]
    expression: Option<String>,
}

fn run_file(env: &Environment, path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let contents = fs::read_to_string(path)?;
    info!(path = %path.display(), "loading file");

    let results = match eval_each(env, &contents) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(());
        }
    };

    for res in results.into_iter().filter(Value::is_error) {
        println!("{}", res);
    }
    Ok(())
}

fn repl(env: &Environment) -> Result<(), Box<dyn std::error::Error>> {
    println!("qlisp - Ctrl+D or 'exit' to quit");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();
    loop {
        write!(stdout, "qlisp> ")?;
        stdout.flush()?;

        let Some(line) = lines.next() else { break };
        let line = line?;
        let line = line.trim();
        if line == "exit" { break }
        if line.is_empty() { continue }

        match eval_str(env, line) {
            Ok(v) => println!("{}", v),
            Err(e) => eprintln!("{}", e),
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    use tracing_subscriber::{fmt, EnvFilter};

    // RUST_LOG controls verbosity; warnings only by default.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let env = Environment::with_builtins();

    if let Some(expr) = args.expression {
        match eval_str(&env, &expr) {
            Ok(v) => println!("{}", v),
            Err(e) => eprintln!("{}", e),
        }
        return Ok(());
    }

    match args.file {
        Some(path) => run_file(&env, &path),
        None => repl(&env),
    }
}
