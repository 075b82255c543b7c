// Build script for fieldpulsectl - embeds version at compile time

fn main() {
    // Release pipelines may set FIELDPULSE_VERSION; otherwise use Cargo.toml
    let version = std::env::var("FIELDPULSE_VERSION")
        .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=FIELDPULSE_VERSION={}", version);

    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-env-changed=FIELDPULSE_VERSION");
}
