#![forbid(unsafe_code)]

//! Stocksund CLI: validate SAML bearer tokens, mint test tokens, print
//! certificate thumbprints.

use base64::Engine;
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;
use stocksund_core::Error;
use stocksund_keys::{loader, CertificateStore, TrustedCertificate};
use stocksund_saml::{SamlValidator, TrustConfig, ValidationResult};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "stocksund",
    about = "Stocksund — SAML 2.0 bearer assertion validation",
    version
)]
struct Cli {
    /// Log at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a base64-encoded SAML assertion
    Validate {
        /// Trust configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Directory of trusted certificates (PEM or DER)
        #[arg(long)]
        certs: PathBuf,

        /// Token file, or `-` for stdin
        #[arg(short, long, default_value = "-")]
        token: String,

        /// Validate as of this instant (RFC 3339) instead of now
        #[arg(long)]
        now: Option<String>,

        /// Print the full identity as JSON when valid
        #[arg(long)]
        identity: bool,
    },

    /// Sign an assertion template
    Sign {
        /// Template XML file (with empty DigestValue/SignatureValue)
        template: PathBuf,

        /// Private key (PEM or DER)
        #[arg(short = 'k', long)]
        key: PathBuf,

        /// Certificate to embed in an empty X509Certificate
        #[arg(long)]
        cert: Option<PathBuf>,

        /// Emit the base64 token instead of XML
        #[arg(long)]
        base64: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print SHA-1 and SHA-256 thumbprints of a certificate
    Thumbprint {
        /// Certificate file (PEM or DER)
        cert: PathBuf,
    },

    /// List supported algorithms
    Info,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Validate {
            config,
            certs,
            token,
            now,
            identity,
        } => cmd_validate(&config, &certs, &token, now.as_deref(), identity),
        Commands::Sign {
            template,
            key,
            cert,
            base64,
            output,
        } => cmd_sign(&template, &key, cert.as_deref(), base64, output),
        Commands::Thumbprint { cert } => cmd_thumbprint(&cert),
        Commands::Info => cmd_info(),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(2);
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_validate(
    config_path: &Path,
    certs: &Path,
    token_path: &str,
    now: Option<&str>,
    identity: bool,
) -> Result<bool, Error> {
    let config = TrustConfig::from_json_file(config_path)
        .map_err(|e| Error::Other(format!("{}: {e}", config_path.display())))?;
    config
        .check()
        .map_err(|e| Error::Other(format!("{}: {e}", config_path.display())))?;
    let store = CertificateStore::load_dir(certs)?;
    tracing::debug!(certificates = store.len(), idp = %config.name, "trust material loaded");

    let token = read_token(token_path)?;
    let validator = SamlValidator::new(config, store);
    let now = match now {
        Some(text) => stocksund_saml::decoder::parse_date_time(text)
            .ok_or_else(|| Error::Other(format!("--now is not an RFC 3339 instant: {text}")))?,
        None => chrono::Utc::now(),
    };

    if identity {
        return match validator.validate_identity_at(&token, now) {
            Ok(id) => {
                let json = serde_json::to_string_pretty(&id)
                    .map_err(|e| Error::Other(format!("identity: {e}")))?;
                println!("{json}");
                Ok(true)
            }
            Err(rejection) => {
                println!("invalid: {rejection}");
                Ok(false)
            }
        };
    }

    match validator.validate_at(&token, now) {
        ValidationResult::Valid { name } => {
            println!("valid: {name}");
            Ok(true)
        }
        ValidationResult::Invalid { reason, detail } => {
            println!("invalid: {reason}: {detail}");
            Ok(false)
        }
    }
}

fn cmd_sign(
    template: &Path,
    key_path: &Path,
    cert_path: Option<&Path>,
    as_base64: bool,
    output: Option<PathBuf>,
) -> Result<bool, Error> {
    let template_xml = read_file(template)?;
    let mut key = loader::load_key_file(key_path)?;
    if let Some(path) = cert_path {
        let data = std::fs::read(path)
            .map_err(|e| Error::Other(format!("{}: {e}", path.display())))?;
        key = key.with_certificate(TrustedCertificate::from_pem(&data)
            .or_else(|_| TrustedCertificate::from_der(&data))?
            .der()
            .to_vec());
    }

    tracing::debug!(template = %template.display(), key = key.data.algorithm_name(), "signing");
    let signed = stocksund_dsig::sign(&stocksund_dsig::DsigContext::new(key), &template_xml)?;
    let out = if as_base64 {
        base64::engine::general_purpose::STANDARD.encode(signed)
    } else {
        signed
    };
    write_output(output, out.as_bytes())?;
    Ok(true)
}

fn cmd_thumbprint(path: &Path) -> Result<bool, Error> {
    let data = std::fs::read(path).map_err(|e| Error::Other(format!("{}: {e}", path.display())))?;
    let cert = if data.starts_with(b"-----BEGIN") {
        TrustedCertificate::from_pem(&data)?
    } else {
        TrustedCertificate::from_der(&data)?
    };
    println!("Subject: {}", cert.subject());
    println!("SHA-1:   {}", cert.sha1());
    println!("SHA-256: {}", cert.sha256());
    Ok(true)
}

fn cmd_info() -> Result<bool, Error> {
    println!("Stocksund — SAML 2.0 bearer assertion validation");
    println!();
    println!("Supported digest algorithms:");
    println!("  SHA-1, SHA-224, SHA-256, SHA-384, SHA-512");
    println!();
    println!("Supported signature algorithms:");
    println!("  RSA PKCS#1 v1.5 (SHA-1, SHA-224, SHA-256, SHA-384, SHA-512)");
    println!("  ECDSA P-256/P-384 (SHA-256, SHA-384)");
    println!();
    println!("Supported canonicalization:");
    println!("  C14N 1.0 (±comments)");
    println!("  Exclusive C14N 1.0 (±comments)");
    println!();
    println!("Trust model:");
    println!("  certificate pinned by SHA-1 or SHA-256 thumbprint");
    Ok(true)
}

// ── Utility functions ────────────────────────────────────────────────

fn read_file(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path).map_err(|e| Error::Other(format!("{}: {e}", path.display())))
}

fn read_token(path: &str) -> Result<String, Error> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| Error::Other(format!("stdin: {e}")))?;
        Ok(buf)
    } else {
        read_file(Path::new(path))
    }
}

fn write_output(path: Option<PathBuf>, data: &[u8]) -> Result<(), Error> {
    match path {
        Some(p) => std::fs::write(&p, data).map_err(|e| Error::Other(format!("{}: {e}", p.display()))),
        None => {
            use std::io::Write;
            std::io::stdout()
                .write_all(data)
                .map_err(|e| Error::Other(format!("stdout: {e}")))
        }
    }
}
