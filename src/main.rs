//! planforge CLI binary.
//!
//! All logic lives in the library; main only maps errors to the process
//! exit code.

fn main() {
    if let Err(err) = planforge::cli::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
