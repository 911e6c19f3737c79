// generate_secret.rs
// Utility to generate signing secrets for access tokens and cookies

use rand::{rngs::OsRng, RngCore};

const SECRET_BYTES: usize = 32;

fn random_hex() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn main() {
    println!("Generating new signing secrets...\n");

    let jwt_secret = random_hex();
    let cookie_secret = random_hex();

    println!("✅ Secrets generated successfully!\n");
    println!("Add these to your .env file:");
    println!("─────────────────────────────────────────────────");
    println!("JWT_SECRET={}", jwt_secret);
    println!("COOKIE_SECRET={}", cookie_secret);
    println!("─────────────────────────────────────────────────");
    println!("\n⚠️  IMPORTANT:");
    println!("  • Keep these secrets out of version control");
    println!("  • Rotating JWT_SECRET invalidates every outstanding access token");
    println!("  • Rotating COOKIE_SECRET invalidates in-flight OAuth sign-ins");
}
