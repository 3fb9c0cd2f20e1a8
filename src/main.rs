use crate::shell::start_shell;

mod logger;
mod shell;

fn main() {
    if let Err(e) = logger::init() {
        eprintln!("failed to install logger: {}", e);
    }
    start_shell();
}
