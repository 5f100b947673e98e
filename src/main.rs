//! cleanbuild - Build a snap inside a clean LXD container.
//!
//! This binary snapshots the project sources, builds them in an ephemeral container
//! and retrieves the resulting snap into the project directory.

use std::io::Write;
use std::process;

use kodegen_bundler_cleanbuild::cli;

#[tokio::main]
async fn main() {
    // Progress lines are printed verbatim
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    // Run CLI and get exit code
    let exit_code = match cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            for suggestion in e.recovery_suggestions() {
                eprintln!("  • {}", suggestion);
            }
            1
        }
    };

    process::exit(exit_code);
}
