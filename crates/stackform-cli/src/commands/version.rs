//! `stackform version`

/// Commit the binary was built from, when the build provides it.
pub const COMMIT: Option<&str> = option_env!("STACKFORM_GIT_COMMIT");

pub fn line() -> String {
    format!(
        "{} {} (commit {})",
        env!("CARGO_PKG_NAME"),
        stackform_core::VERSION,
        COMMIT.unwrap_or("unknown")
    )
}

pub fn run() {
    println!("{}", line());
}
