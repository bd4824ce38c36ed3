use std::io::{self, Read};

use anyhow::{Context, Result, bail};

use minipy::{bytecode, interpreter, lexer, parser};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let source = match args.next() {
        Some(code) => {
            if args.next().is_some() {
                bail!("Only one program argument is supported");
            }
            code
        }
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Reading stdin")?;
            buffer
        }
    };

    let tokens = lexer::tokenize(&source)?;
    println!("Tokens:");
    for token in &tokens {
        println!("{token}");
    }

    let program = parser::parse(tokens)?;
    println!("----------------------------");
    println!("Abstract Syntax Tree:");
    println!("{program}");

    let compiled = bytecode::compile(&program)?;
    println!("----------------------------");
    println!("Bytecode:");
    for instruction in &compiled {
        println!("{instruction}");
    }

    let outcome = interpreter::interpret(compiled)?;
    println!("----------------------------");
    println!("Scope: {}", outcome.render_scope());
    match outcome.last_result {
        Some(value) => println!("Result: {value}"),
        None => println!("Result: unset"),
    }
    Ok(())
}
