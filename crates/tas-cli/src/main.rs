//! # tas CLI Entry Point
//!
//! Parses arguments and dispatches to the handler modules.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use tas_cli::{document, keys};
use tas_crypto::EccCurve;
use tas_vc::ProofPurpose;

/// Trusted Agent Server tooling: keys, canonical JSON, and proofs.
#[derive(Parser, Debug)]
#[command(name = "tas", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate an ECDSA key pair.
    Keygen {
        /// Secp256k1 or Secp256r1.
        #[arg(long, default_value = "Secp256r1")]
        curve: EccCurve,
        /// Output directory for the key files.
        #[arg(long, short, default_value = ".")]
        output: PathBuf,
        /// Prefix for the key file names.
        #[arg(long, default_value = "tas")]
        prefix: String,
    },

    /// Print the canonical JSON form of a document.
    Canonicalize {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Attach a proof to a JSON document.
    Sign {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Private key file written by `keygen`.
        #[arg(long)]
        key: PathBuf,
        #[arg(long, default_value = "Secp256r1")]
        curve: EccCurve,
        /// DID-key-URL of the key, e.g. `did:omn:ta#assert-1`.
        #[arg(long)]
        verification_method: String,
        #[arg(long, default_value = "assertionMethod", value_parser = parse_purpose)]
        purpose: ProofPurpose,
        /// Write the signed document here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Verify a document's proof.
    Verify {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Multibase public key, or a `.pub` file.
        #[arg(long)]
        public_key: String,
        #[arg(long, default_value = "Secp256r1")]
        curve: EccCurve,
    },
}

fn parse_purpose(s: &str) -> Result<ProofPurpose, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| format!("unknown proof purpose {s:?}"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Keygen { curve, output, prefix } => {
            let generated = keys::keygen(curve, &output, &prefix)?;
            println!("OK: generated {} key pair", curve.as_str());
            println!("  Private key: {}", generated.secret_path.display());
            println!("  Public key:  {}", generated.public_path.display());
            println!("  Public key (multibase): {}", generated.public_multibase);
        }
        Commands::Canonicalize { file } => {
            println!("{}", document::canonicalize(&file)?);
        }
        Commands::Sign {
            file,
            key,
            curve,
            verification_method,
            purpose,
            output,
        } => {
            let key = keys::load_secret(&key, curve)?;
            let mut doc = document::JsonDocument::read(&file)?;
            document::sign_document(&mut doc, &key, &verification_method, purpose)?;
            let rendered = doc.to_pretty()?;
            match output {
                Some(path) => std::fs::write(&path, rendered)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => println!("{rendered}"),
            }
        }
        Commands::Verify {
            file,
            public_key,
            curve,
        } => {
            let public_key = keys::load_public(&public_key, curve)?;
            let doc = document::JsonDocument::read(&file)?;
            let proof = document::verify_document(&doc, &public_key)?;
            println!("OK: signature is valid ({})", proof.verification_method);
        }
    }

    Ok(())
}
