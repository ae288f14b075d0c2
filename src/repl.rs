use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use noocrush::{Config, Interpreter};

const PROMPT: &str = ">> ";

pub fn start(config: Config) -> Result<()> {
    let mut interpreter = Interpreter::with_config(config);
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{}", PROMPT);
        stdout.flush().context("failed to flush stdout")?;

        let mut input = String::new();
        let read = stdin
            .lock()
            .read_line(&mut input)
            .context("failed to read line")?;
        if read == 0 {
            println!();
            return Ok(());
        }
        if input.trim().is_empty() {
            continue;
        }

        let result = interpreter.run_each(&input, |value| println!("=> {}", value));
        if let Err(errors) = result {
            for error in errors.iter() {
                eprintln!("{}", error);
            }
        }
    }
}
