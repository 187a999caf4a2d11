//! Verbose user-facing output. Diagnostics go through the `log` facade.

pub fn print_verbose(verbose: bool, msg: &str) {
    if verbose {
        eprintln!("Verbose: {}", msg);
    }
}
