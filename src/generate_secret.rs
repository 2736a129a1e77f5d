// generate_secret.rs
// Utility to generate a new JWT signing secret

use base64::{engine::general_purpose::STANDARD, Engine};
use rand::{rngs::OsRng, RngCore};

const SECRET_BYTES: usize = 64;

fn main() {
    println!("Generating new JWT signing secret...\n");

    let mut bytes = [0u8; SECRET_BYTES];
    if let Err(e) = OsRng.try_fill_bytes(&mut bytes) {
        eprintln!("❌ Could not read from the OS random source: {}", e);
        std::process::exit(1);
    }
    let secret = STANDARD.encode(bytes);

    println!("✅ Secret generated successfully!\n");
    println!("Add this to your .env file:");
    println!("─────────────────────────────────────────────────");
    println!("JWT_SECRET={}", secret);
    println!("─────────────────────────────────────────────────");
    println!("\n⚠️  IMPORTANT:");
    println!("  • Keep this secret out of version control");
    println!("  • Rotating it invalidates every issued credential");
}
