//! Password hashing utility for the movie catalog
//!
//! Generates an Argon2id hash for seeding an admin account directly in the
//! `users` table.
//!
//! Usage:
//!   cargo run --bin hash-password
//!   cargo run --bin hash-password "MySecurePassword123!"

use std::env;
use std::io::{self, Write};

use anyhow::Context;
use movie_catalog_api::auth::{hash_password, validate_password_strength};

fn main() -> anyhow::Result<()> {
    let password = match env::args().nth(1) {
        Some(pwd) => pwd,
        None => {
            // stdin keeps the password out of the process list
            print!("Enter password to hash: ");
            io::stdout().flush()?;

            let mut password = String::new();
            io::stdin().read_line(&mut password)?;
            password.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    if let Err(e) = validate_password_strength(&password) {
        anyhow::bail!("refusing to hash password: {e}");
    }

    let password_hash = hash_password(&password).context("password hashing failed")?;

    println!("\n===========================================");
    println!("Password Hash (Argon2id):");
    println!("===========================================");
    println!("{}", password_hash);
    println!("===========================================\n");

    println!("Example SQL (emails are matched case-insensitively, store them lowercase):");
    println!(
        "INSERT INTO users (first_name, last_name, email, password) \
         VALUES ('Admin', 'User', 'admin@example.com', '{}');",
        password_hash
    );

    Ok(())
}
