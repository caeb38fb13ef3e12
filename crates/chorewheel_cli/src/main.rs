//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `chorewheel_core` linkage and
//!   storage bootstrap.
//! - Keep output deterministic for quick local sanity checks.

use chorewheel_core::db::{migrations, open_db_in_memory};

fn main() {
    println!("chorewheel_core version={}", chorewheel_core::core_version());
    match open_db_in_memory() {
        Ok(_conn) => println!("chorewheel_core schema=v{}", migrations::latest_version()),
        Err(err) => {
            eprintln!("chorewheel_core bootstrap failed: {err}");
            std::process::exit(1);
        }
    }
}
