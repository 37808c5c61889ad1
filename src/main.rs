use std::env;
use std::process;

fn main() {
    process::exit(cli::run(env::args_os()));
}
