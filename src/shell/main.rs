//! A small POSIX-like shell driving an ext2 image through the engine: a REPL reading
//! `<command> [args...]` lines from stdin and dispatching them through [`commands::execute`].

mod commands;
mod cwd;
mod print;

use cwd::Cwd;
use ext2fs::error::CommandError;
use ext2fs::Engine;
use std::env;
use std::io::{self, BufRead, Write};
use std::process::exit;

fn main() {
	let image_path = env::args().nth(1).unwrap_or_else(|| {
		eprintln!("usage: ext2sh <image>");
		exit(1);
	});

	let mut engine = Engine::mount(&image_path).unwrap_or_else(|e| {
		eprintln!("ext2sh: {image_path}: {e}");
		exit(1);
	});
	let mut cwd = Cwd::root(engine.root_inode());

	let stdin = io::stdin();
	loop {
		print!("{}> ", cwd.display());
		let _ = io::stdout().flush();

		let mut line = String::new();
		let bytes_read = stdin.lock().read_line(&mut line).unwrap_or_else(|e| {
			eprintln!("ext2sh: {e}");
			exit(1);
		});
		if bytes_read == 0 {
			// EOF on stdin: leave the loop like an explicit `exit`.
			break;
		}

		let cmd = commands::parse(line.trim_end());
		match commands::execute(cmd, &mut engine, &mut cwd) {
			Ok(true) => {}
			Ok(false) => break,
			Err(CommandError::Recoverable(_)) => {
				// Already reported to stderr at the point of failure.
			}
			Err(CommandError::Fatal(e)) => {
				eprintln!("ext2sh: fatal: {e}");
				exit(1);
			}
		}
	}
}
