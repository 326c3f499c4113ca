#![forbid(unsafe_code)]

//! wssec CLI: secure SOAP messages with a handler configuration and
//! verify the signatures of secured ones.

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::{bail, Context};
use base64::Engine;
use clap::{Parser, Subcommand};
use tracing::debug;
use wssec_core::ns;
use wssec_crypto::SigningKey;
use wssec_handler::{keys, MessageContext, PasswordMap, WsHandler};
use wssec_keys::loader;
use wssec_token::verify::{signing_certificate, verify_signature};
use wssec_xml::XmlDocument;

#[derive(Parser)]
#[command(
    name = "wssec",
    about = "WS-Security for SOAP messages (UsernameToken, Timestamp, Signature, Encryption, SAML)",
    version
)]
struct Cli {
    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a Security header to a SOAP message
    Secure {
        /// SOAP envelope file
        input: PathBuf,

        /// Handler options (TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Treat the message as a response
        #[arg(long)]
        response: bool,

        /// Password for a user or key alias (USER=SECRET)
        #[arg(short, long = "password")]
        passwords: Vec<String>,

        /// Named symmetric key, base64 encoded (NAME=BASE64)
        #[arg(short, long = "secret")]
        secrets: Vec<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify the signatures of a secured SOAP message
    Verify {
        /// Secured SOAP envelope file
        input: PathBuf,

        /// Signer certificate (PEM); by default the certificate the
        /// signature references
        #[arg(long)]
        cert: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Secure {
            input,
            config,
            response,
            passwords,
            secrets,
            output,
        } => cmd_secure(&input, &config, response, &passwords, &secrets, output.as_deref()),
        Commands::Verify { input, cert } => cmd_verify(&input, cert.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_secure(
    input: &Path,
    config: &Path,
    response: bool,
    passwords: &[String],
    secrets: &[String],
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let handler = WsHandler::from_file(config)
        .with_context(|| format!("loading {}", config.display()))?;
    let mut doc = read_document(input)?;

    let mut credentials = PasswordMap::new();
    for entry in passwords {
        let (user, password) = split_pair(entry, "USER=SECRET")?;
        credentials = credentials.with_password(user, password);
    }
    for entry in secrets {
        let (name, b64) = split_pair(entry, "NAME=BASE64")?;
        let key = base64::engine::general_purpose::STANDARD
            .decode(b64)
            .with_context(|| format!("secret {name}"))?;
        credentials = credentials.with_key(name, key);
    }
    let credentials = Arc::new(credentials);

    let mut msg = MessageContext::new();
    msg.set_callback(keys::PW_CALLBACK_REF, credentials.clone());
    msg.set_callback(keys::ENC_CALLBACK_REF, credentials);

    let req = handler.secure(&mut doc, &mut msg, !response)?;
    debug!(signatures = req.signature_values.len(), "secured {}", input.display());
    write_output(output, doc.to_xml().as_bytes())
}

fn cmd_verify(input: &Path, cert: Option<&Path>) -> anyhow::Result<()> {
    let doc = read_document(input)?;
    let given = match cert {
        Some(path) => Some(
            loader::load_certificate_file(path)?
                .into_iter()
                .next()
                .with_context(|| format!("no certificate in {}", path.display()))?,
        ),
        None => None,
    };

    let signatures = doc.find_elements(ns::DSIG, ns::node::SIGNATURE);
    if signatures.is_empty() {
        bail!("no signatures in {}", input.display());
    }
    for signature in signatures {
        let cert = match &given {
            Some(cert) => cert.clone(),
            None => signing_certificate(&doc, signature)?
                .context("signature does not reference a certificate; use --cert")?,
        };
        let key = SigningKey::RsaPublic(cert.public_key()?);
        let verified = verify_signature(&doc, signature, &key)?;
        println!(
            "OK {} ({})",
            signature.attribute("Id").unwrap_or("-"),
            verified.references.join(", ")
        );
    }
    Ok(())
}

fn read_document(path: &Path) -> anyhow::Result<XmlDocument> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(XmlDocument::parse(&text)?)
}

fn split_pair<'a>(entry: &'a str, form: &str) -> anyhow::Result<(&'a str, &'a str)> {
    match entry.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name, value)),
        _ => bail!("invalid argument {entry} (expected {form})"),
    }
}

fn write_output(path: Option<&Path>, data: &[u8]) -> anyhow::Result<()> {
    match path {
        Some(p) => std::fs::write(p, data).with_context(|| format!("writing {}", p.display())),
        None => {
            use std::io::Write;
            std::io::stdout().write_all(data).context("writing stdout")
        }
    }
}
