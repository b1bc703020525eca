//! encryptor: command-line front end for password envelopes, ElGamal, ECIES,
//! hybrid key wrapping and direct RSA-OAEP.
//!
//! Results are printed as JSON on stdout; logs go to stderr. Private keys
//! created by `keygen` are kept in a passphrase-protected keystore directory.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use encryptor_core::defaults::{
    BCRYPT_DEFAULT_COST, DEFAULT_DECRYPTED_FILE_NAME, DEFAULT_RSA_BITS, KEYSTORE_DIR,
    MAX_PAYLOAD_BYTES,
};
use encryptor_core::{logging, FileStore};
use encryptor_crypto::envelope::decrypted_file_name;
use encryptor_crypto::hash::{bcrypt_hash, bcrypt_verify, digest_hex, digest_reader};
use encryptor_crypto::{
    detect_format, ecies, elgamal, encrypted_file_name, hybrid, rsa_decrypt_message,
    rsa_encrypt_message, Algorithm, Curve, EcKeyPair, EcPrivateKey, EcPublicKey, EcWrapPrivateKey,
    EcWrapPublicKey, EciesMessage, ElGamalKeyPair, ElGamalPair, ElGamalParams, ElGamalPublicKey,
    Envelope, HashAlgorithm, HybridPackage, KeyKind, Keystore, Payload, RsaWrapPrivateKey,
    RsaWrapPublicKey,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{field, info, info_span, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "encryptor")]
#[command(author, version, about = "Password envelopes and public-key encryption")]
#[command(propagate_version = true)]
struct Cli {
    /// Directory holding passphrase-protected private keys
    #[arg(long, global = true, env = "ENCRYPTOR_KEYSTORE", default_value = KEYSTORE_DIR)]
    keystore: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt text or a file into a password envelope
    Seal {
        #[command(flatten)]
        source: Source,

        /// Cipher: AES, TripleDES, Blowfish or Rabbit
        #[arg(short, long, default_value = "AES")]
        alg: Algorithm,

        /// Password (min 6 characters)
        #[arg(short, long, env = "ENCRYPTOR_PASSWORD", hide_env_values = true)]
        password: String,

        /// Output file (default: <input>.enc for files, stdout for text)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decrypt a password envelope
    Open {
        /// Envelope file
        #[arg(short, long)]
        input: PathBuf,

        /// Password used to seal the envelope
        #[arg(short, long, env = "ENCRYPTOR_PASSWORD", hide_env_values = true)]
        password: String,

        /// Output file for file payloads (default: the sealed file name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Identify the format of an encrypted document
    Detect {
        /// File to inspect
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Compute a hex digest, CRC checksum or bcrypt hash
    Hash {
        #[command(flatten)]
        source: Source,

        /// SHA-256, SHA-512, MD5, CRC-32, CRC-16, CRC-16-CCITT, CRC-8 or bcrypt
        #[arg(short, long, default_value = "SHA-256", value_parser = parse_hash_mode)]
        alg: HashMode,

        /// bcrypt cost factor (4-31)
        #[arg(long, default_value_t = BCRYPT_DEFAULT_COST)]
        cost: u32,

        /// Compare against this digest or bcrypt hash instead of printing one
        #[arg(long)]
        verify: Option<String>,
    },

    /// Textbook ElGamal (teaching scale)
    #[command(subcommand)]
    Elgamal(ElGamalCommand),

    /// ECIES-style hybrid encryption
    #[command(subcommand)]
    Ecies(EciesCommand),

    /// Hybrid encryption with a wrapped AES key
    #[command(subcommand)]
    Wrap(WrapCommand),

    /// RSA-OAEP encryption of short messages
    #[command(subcommand)]
    Rsa(RsaCommand),
}

#[derive(Args)]
struct Source {
    /// Input file
    #[arg(short, long, conflicts_with = "text")]
    input: Option<PathBuf>,

    /// Inline text
    #[arg(short, long)]
    text: Option<String>,

    /// MIME type recorded for file input
    #[arg(long)]
    mime: Option<String>,
}

#[derive(Args)]
struct KeyOwner {
    /// Keystore entry name
    #[arg(short, long)]
    name: String,

    /// Keystore passphrase
    #[arg(long, env = "ENCRYPTOR_KEYSTORE_PASSPHRASE", hide_env_values = true)]
    passphrase: String,
}

#[derive(Subcommand)]
enum ElGamalCommand {
    /// Generate a key pair
    Keygen {
        #[command(flatten)]
        owner: KeyOwner,

        #[arg(short, long, value_enum, default_value_t = Group::Demo)]
        group: Group,

        /// Write the public key JSON here
        #[arg(long)]
        public_out: Option<PathBuf>,
    },
    /// Encrypt for a public key
    Encrypt {
        #[command(flatten)]
        source: Source,

        /// Public key JSON file
        #[arg(short = 'k', long)]
        public_key: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Decrypt with a stored key
    Decrypt {
        #[command(flatten)]
        owner: KeyOwner,

        /// Ciphertext JSON file
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum EciesCommand {
    /// Generate a key pair
    Keygen {
        #[command(flatten)]
        owner: KeyOwner,

        #[arg(short, long, default_value = "secp256k1")]
        curve: Curve,

        /// Write the public key JSON here
        #[arg(long)]
        public_out: Option<PathBuf>,
    },
    /// Encrypt for a public key
    Encrypt {
        #[command(flatten)]
        source: Source,

        /// Public key JSON file
        #[arg(short = 'k', long)]
        public_key: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Decrypt with a stored key
    Decrypt {
        #[command(flatten)]
        owner: KeyOwner,

        /// ECIES message JSON file
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum WrapCommand {
    /// Generate a wrapping key pair
    Keygen {
        #[command(flatten)]
        owner: KeyOwner,

        #[arg(short, long, value_enum, default_value_t = WrapScheme::Rsa)]
        scheme: WrapScheme,

        /// RSA modulus size
        #[arg(long, default_value_t = DEFAULT_RSA_BITS)]
        bits: usize,

        /// Curve for the EC scheme
        #[arg(short, long, default_value = "P-256")]
        curve: Curve,

        /// Write the public key (PEM or JSON) here
        #[arg(long)]
        public_out: Option<PathBuf>,
    },
    /// Encrypt for a public key
    Encrypt {
        #[command(flatten)]
        source: Source,

        /// Public key file: RSA PEM or EC JSON
        #[arg(short = 'k', long)]
        public_key: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Decrypt with a stored key
    Decrypt {
        #[command(flatten)]
        owner: KeyOwner,

        /// Hybrid package JSON file
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum RsaCommand {
    /// Generate an RSA key pair
    Keygen {
        #[command(flatten)]
        owner: KeyOwner,

        /// Modulus size
        #[arg(long, default_value_t = DEFAULT_RSA_BITS)]
        bits: usize,

        /// Write the public key PEM here
        #[arg(long)]
        public_out: Option<PathBuf>,
    },
    /// Encrypt a short message; prints base64
    Encrypt {
        #[command(flatten)]
        source: Source,

        /// Public key PEM file
        #[arg(short = 'k', long)]
        public_key: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Decrypt base64 ciphertext with a stored key
    Decrypt {
        #[command(flatten)]
        owner: KeyOwner,

        /// File holding the base64 ciphertext
        #[arg(short, long, conflicts_with = "ciphertext")]
        input: Option<PathBuf>,

        /// Inline base64 ciphertext
        #[arg(short, long)]
        ciphertext: Option<String>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Digest algorithm or bcrypt.
#[derive(Clone, Copy)]
enum HashMode {
    Digest(HashAlgorithm),
    Bcrypt,
}

impl HashMode {
    fn as_str(&self) -> &'static str {
        match self {
            HashMode::Digest(alg) => alg.as_str(),
            HashMode::Bcrypt => "bcrypt",
        }
    }
}

fn parse_hash_mode(s: &str) -> Result<HashMode, String> {
    if s.trim().eq_ignore_ascii_case("bcrypt") {
        return Ok(HashMode::Bcrypt);
    }
    s.parse::<HashAlgorithm>()
        .map(HashMode::Digest)
        .map_err(|e| e.to_string())
}

#[derive(Clone, Copy, ValueEnum)]
enum Group {
    /// p = 7919, g = 2
    Demo,
    /// RFC 3526 2048-bit MODP group
    Modp2048,
}

#[derive(Clone, Copy, ValueEnum)]
enum WrapScheme {
    /// RSA-OAEP-SHA256
    Rsa,
    /// ECDH + HKDF + AES-256-GCM
    Ec,
}

/// Public EC key file contents.
#[derive(Serialize, Deserialize)]
struct EcPublicKeyFile {
    curve: Curve,
    #[serde(rename = "publicKey")]
    public_key: String,
}

impl EcPublicKeyFile {
    fn from_key(key: &EcPublicKey) -> anyhow::Result<Self> {
        Ok(Self {
            curve: key.curve(),
            public_key: key.to_hex()?,
        })
    }

    fn into_key(self) -> anyhow::Result<EcPublicKey> {
        Ok(EcPublicKey::from_hex(self.curve, &self.public_key)?)
    }
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            warn!(subsystem = "cli", error = %e, "Command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logging goes to stderr so stdout carries only JSON results.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_ANSI    - "true"/"false" override ANSI colors
///   RUST_LOG    - standard env filter (default: "encryptor=info,encryptor_crypto=warn")
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "encryptor=info,encryptor_crypto=warn".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    if log_format == "json" {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        let mut layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
        if let Some(ansi) = log_ansi {
            layer = layer.with_ansi(ansi);
        }
        registry.with(layer).init();
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let started = Instant::now();
    let span = info_span!(
        "command",
        subsystem = "cli",
        op = field::Empty,
        alg = field::Empty,
        input_len = field::Empty,
        output_len = field::Empty,
        duration_ms = field::Empty,
    );
    let _guard = span.enter();

    let keystore_dir = cli.keystore;
    let output = match cli.command {
        Commands::Seal {
            source,
            alg,
            password,
            output,
        } => {
            span.record(logging::OPERATION, "seal");
            span.record(logging::ALGORITHM, alg.as_str());
            cmd_seal(&source, alg, &password, output.as_deref())?
        }
        Commands::Open {
            input,
            password,
            output,
        } => {
            span.record(logging::OPERATION, "open");
            cmd_open(&input, &password, output.as_deref())?
        }
        Commands::Detect { input } => {
            span.record(logging::OPERATION, "detect");
            let data = std::fs::read(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            json!({ "input": input.to_string_lossy(), "format": detect_format(&data) })
        }
        Commands::Hash {
            source,
            alg,
            cost,
            verify,
        } => {
            span.record(logging::OPERATION, "hash");
            span.record(logging::ALGORITHM, alg.as_str());
            cmd_hash(&source, alg, cost, verify.as_deref())?
        }
        Commands::Elgamal(cmd) => {
            span.record(logging::OPERATION, "elgamal");
            cmd_elgamal(cmd, &keystore_dir)?
        }
        Commands::Ecies(cmd) => {
            span.record(logging::OPERATION, "ecies");
            cmd_ecies(cmd, &keystore_dir)?
        }
        Commands::Wrap(cmd) => {
            span.record(logging::OPERATION, "wrap");
            cmd_wrap(cmd, &keystore_dir)?
        }
        Commands::Rsa(cmd) => {
            span.record(logging::OPERATION, "rsa");
            span.record(logging::ALGORITHM, "RSA-OAEP-SHA256");
            cmd_rsa(cmd, &keystore_dir)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);

    span.record(logging::DURATION_MS, started.elapsed().as_millis() as u64);
    info!("Command complete");
    Ok(())
}

// =============================================================================
// Password envelopes
// =============================================================================

fn cmd_seal(
    source: &Source,
    alg: Algorithm,
    password: &str,
    output: Option<&Path>,
) -> anyhow::Result<Value> {
    let payload = read_payload(source)?;
    tracing::Span::current().record(logging::INPUT_LEN, payload.len() as u64);

    let envelope = Envelope::seal(&payload, password, alg)?;
    let body = envelope.to_json_pretty()?;

    let output_path = match (output, &source.input) {
        (Some(path), _) => Some(path.to_path_buf()),
        (None, Some(input)) => Some(PathBuf::from(encrypted_file_name(&input.to_string_lossy()))),
        (None, None) => None,
    };

    match output_path {
        Some(path) => {
            write_atomic(&path, body.as_bytes())?;
            tracing::Span::current().record(logging::OUTPUT_LEN, body.len() as u64);
            Ok(json!({
                "output": path.to_string_lossy(),
                "alg": alg,
                "kind": envelope.kind(),
                "input_size": payload.len(),
                "output_size": body.len(),
            }))
        }
        None => Ok(serde_json::from_str(&body)?),
    }
}

fn cmd_open(input: &Path, password: &str, output: Option<&Path>) -> anyhow::Result<Value> {
    let text = read_text(input)?;
    let envelope = Envelope::from_json(&text)?;
    tracing::Span::current().record(logging::ALGORITHM, envelope.algorithm().as_str());

    match envelope.open(password)? {
        Payload::Text(text) => Ok(json!({ "kind": "text", "text": text })),
        Payload::File {
            name,
            mime_type,
            bytes,
        } => {
            let path = match output {
                Some(path) => path.to_path_buf(),
                None => default_open_path(input, &name),
            };
            write_atomic(&path, &bytes)?;
            tracing::Span::current().record(logging::OUTPUT_LEN, bytes.len() as u64);
            Ok(json!({
                "kind": "file",
                "name": name,
                "type": mime_type,
                "output": path.to_string_lossy(),
                "output_size": bytes.len(),
            }))
        }
    }
}

fn cmd_hash(
    source: &Source,
    mode: HashMode,
    cost: u32,
    verify: Option<&str>,
) -> anyhow::Result<Value> {
    let alg = match mode {
        HashMode::Digest(alg) => alg,
        HashMode::Bcrypt => {
            let password = read_payload(source)?.into_bytes();
            return match verify {
                Some(hash) => Ok(json!({
                    "algorithm": "bcrypt",
                    "valid": bcrypt_verify(&password, hash)?,
                })),
                None => Ok(json!({
                    "algorithm": "bcrypt",
                    "cost": cost,
                    "hash": bcrypt_hash(&password, cost)?,
                })),
            };
        }
    };
    let digest = match (&source.input, &source.text) {
        (Some(path), _) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("opening {}", path.display()))?;
            digest_reader(alg, std::io::BufReader::new(file))?
        }
        (None, Some(text)) => digest_hex(alg, text.as_bytes()),
        (None, None) => bail!("either --input or --text is required"),
    };
    match verify {
        Some(expected) => Ok(json!({
            "algorithm": alg,
            "valid": digest.eq_ignore_ascii_case(expected.trim()),
        })),
        None => Ok(json!({ "algorithm": alg, "digest": digest })),
    }
}

// =============================================================================
// ElGamal
// =============================================================================

fn cmd_elgamal(cmd: ElGamalCommand, keystore_dir: &Path) -> anyhow::Result<Value> {
    let mut rng = rand::thread_rng();
    match cmd {
        ElGamalCommand::Keygen {
            owner,
            group,
            public_out,
        } => {
            let params = match group {
                Group::Demo => ElGamalParams::demo(),
                Group::Modp2048 => ElGamalParams::modp_2048()?,
            };
            let keys = ElGamalKeyPair::generate(&params, &mut rng);
            let secret = serde_json::to_vec(&keys)?;
            open_keystore(keystore_dir)?.save(
                &owner.name,
                KeyKind::ElGamal,
                &secret,
                &owner.passphrase,
                &mut rng,
            )?;

            let public = serde_json::to_value(keys.public_key())?;
            if let Some(path) = &public_out {
                write_atomic(path, serde_json::to_string_pretty(&public)?.as_bytes())?;
            }
            Ok(json!({ "name": owner.name, "public_key": public }))
        }
        ElGamalCommand::Encrypt {
            source,
            public_key,
            output,
        } => {
            let public: ElGamalPublicKey = serde_json::from_str(&read_text(&public_key)?)
                .context("parsing ElGamal public key")?;
            let payload = read_payload(&source)?;
            let pairs = elgamal::encrypt(payload.as_bytes(), &public, &mut rng);
            emit(&serde_json::to_value(&pairs)?, output.as_deref())
        }
        ElGamalCommand::Decrypt {
            owner,
            input,
            output,
        } => {
            let stored = load_key(keystore_dir, &owner, &[KeyKind::ElGamal])?;
            let keys: ElGamalKeyPair = serde_json::from_slice(&stored.secret)?;
            let pairs: Vec<ElGamalPair> = serde_json::from_str(&read_text(&input)?)
                .context("parsing ElGamal ciphertext")?;
            let plaintext = elgamal::decrypt(&pairs, &keys)?;
            emit_plaintext(plaintext, output.as_deref())
        }
    }
}

// =============================================================================
// ECIES
// =============================================================================

fn cmd_ecies(cmd: EciesCommand, keystore_dir: &Path) -> anyhow::Result<Value> {
    let mut rng = rand::thread_rng();
    match cmd {
        EciesCommand::Keygen {
            owner,
            curve,
            public_out,
        } => {
            let keys = EcKeyPair::generate(curve, &mut rng);
            save_ec_key(keystore_dir, &owner, &keys.private)?;
            let public = serde_json::to_value(EcPublicKeyFile::from_key(&keys.public)?)?;
            if let Some(path) = &public_out {
                write_atomic(path, serde_json::to_string_pretty(&public)?.as_bytes())?;
            }
            Ok(json!({ "name": owner.name, "public_key": public }))
        }
        EciesCommand::Encrypt {
            source,
            public_key,
            output,
        } => {
            let file: EcPublicKeyFile = serde_json::from_str(&read_text(&public_key)?)
                .context("parsing EC public key")?;
            let recipient = file.into_key()?;
            let message = ecies::encrypt_with_rng(&read_payload(&source)?, &recipient, &mut rng)?;
            emit(&serde_json::to_value(&message)?, output.as_deref())
        }
        EciesCommand::Decrypt {
            owner,
            input,
            output,
        } => {
            let private = load_ec_key(keystore_dir, &owner)?;
            let message = EciesMessage::from_json(&read_text(&input)?)?;
            match ecies::decrypt(&message, &private)? {
                Payload::Text(text) => Ok(json!({ "kind": "text", "text": text })),
                Payload::File { name, bytes, .. } => {
                    let path = output.unwrap_or_else(|| PathBuf::from(file_name_only(&name)));
                    write_atomic(&path, &bytes)?;
                    Ok(json!({ "kind": "file", "output": path.to_string_lossy(), "output_size": bytes.len() }))
                }
            }
        }
    }
}

// =============================================================================
// Hybrid key wrap
// =============================================================================

fn cmd_wrap(cmd: WrapCommand, keystore_dir: &Path) -> anyhow::Result<Value> {
    let mut rng = rand::thread_rng();
    match cmd {
        WrapCommand::Keygen {
            owner,
            scheme,
            bits,
            curve,
            public_out,
        } => {
            let public_text = match scheme {
                WrapScheme::Rsa => generate_rsa_key(keystore_dir, &owner, bits)?.to_pem()?,
                WrapScheme::Ec => {
                    let private = EcWrapPrivateKey::generate(curve, &mut rng);
                    save_ec_key(keystore_dir, &owner, private.key())?;
                    serde_json::to_string_pretty(&EcPublicKeyFile::from_key(
                        private.public_key().key(),
                    )?)?
                }
            };
            if let Some(path) = &public_out {
                write_atomic(path, public_text.as_bytes())?;
            }
            Ok(json!({ "name": owner.name, "public_key": public_text }))
        }
        WrapCommand::Encrypt {
            source,
            public_key,
            output,
        } => {
            let message = read_payload(&source)?.into_bytes();
            let key_text = read_text(&public_key)?;
            let package = if key_text.trim_start().starts_with("-----BEGIN") {
                hybrid::encrypt_with_rng(&message, &RsaWrapPublicKey::from_pem(&key_text)?, &mut rng)?
            } else {
                let file: EcPublicKeyFile =
                    serde_json::from_str(&key_text).context("parsing EC public key")?;
                let recipient = EcWrapPublicKey::new(file.into_key()?);
                hybrid::encrypt_with_rng(&message, &recipient, &mut rng)?
            };
            emit(&serde_json::to_value(&package)?, output.as_deref())
        }
        WrapCommand::Decrypt {
            owner,
            input,
            output,
        } => {
            let package = HybridPackage::from_json(&read_text(&input)?)?;
            let stored = load_key(
                keystore_dir,
                &owner,
                &[KeyKind::RsaPkcs8Pem, KeyKind::EcSecp256k1, KeyKind::EcP256],
            )?;
            let plaintext = match stored.kind {
                KeyKind::RsaPkcs8Pem => {
                    let pem = std::str::from_utf8(&stored.secret)
                        .map_err(|_| anyhow!("stored RSA key is not valid PEM"))?;
                    hybrid::decrypt(&package, &RsaWrapPrivateKey::from_pem(pem)?)?
                }
                kind => {
                    let private = ec_key_from_stored(kind, &stored.secret)?;
                    hybrid::decrypt(&package, &EcWrapPrivateKey::new(private))?
                }
            };
            emit_plaintext(plaintext, output.as_deref())
        }
    }
}

// =============================================================================
// Direct RSA-OAEP
// =============================================================================

fn cmd_rsa(cmd: RsaCommand, keystore_dir: &Path) -> anyhow::Result<Value> {
    match cmd {
        RsaCommand::Keygen {
            owner,
            bits,
            public_out,
        } => {
            let public_pem = generate_rsa_key(keystore_dir, &owner, bits)?.to_pem()?;
            if let Some(path) = &public_out {
                write_atomic(path, public_pem.as_bytes())?;
            }
            Ok(json!({ "name": owner.name, "public_key": public_pem }))
        }
        RsaCommand::Encrypt {
            source,
            public_key,
            output,
        } => {
            let public = RsaWrapPublicKey::from_pem(&read_text(&public_key)?)?;
            let message = read_payload(&source)?.into_bytes();
            tracing::Span::current().record(logging::INPUT_LEN, message.len() as u64);
            let ciphertext = rsa_encrypt_message(&message, &public, &mut rand::thread_rng())?;
            emit(&json!({ "ciphertext": ciphertext }), output.as_deref())
        }
        RsaCommand::Decrypt {
            owner,
            input,
            ciphertext,
            output,
        } => {
            let ciphertext = match (input, ciphertext) {
                (Some(path), _) => read_text(&path)?,
                (None, Some(text)) => text,
                (None, None) => bail!("either --input or --ciphertext is required"),
            };
            let stored = load_key(keystore_dir, &owner, &[KeyKind::RsaPkcs8Pem])?;
            let pem = std::str::from_utf8(&stored.secret)
                .map_err(|_| anyhow!("stored RSA key is not valid PEM"))?;
            let private = RsaWrapPrivateKey::from_pem(pem)?;
            let plaintext = rsa_decrypt_message(&ciphertext, &private)?;
            emit_plaintext(plaintext.to_vec(), output.as_deref())
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Generate an RSA key, store it under `owner` and return the public half.
fn generate_rsa_key(
    dir: &Path,
    owner: &KeyOwner,
    bits: usize,
) -> anyhow::Result<RsaWrapPublicKey> {
    let mut rng = rand::thread_rng();
    let private = RsaWrapPrivateKey::generate(bits, &mut rng)?;
    let pem = private.to_pem()?;
    open_keystore(dir)?.save(
        &owner.name,
        KeyKind::RsaPkcs8Pem,
        pem.as_bytes(),
        &owner.passphrase,
        &mut rng,
    )?;
    Ok(private.public_key())
}

fn open_keystore(dir: &Path) -> anyhow::Result<Keystore<FileStore>> {
    let store = FileStore::open(dir)
        .with_context(|| format!("opening keystore {}", dir.display()))?;
    Ok(Keystore::new(store))
}

fn load_key(
    dir: &Path,
    owner: &KeyOwner,
    expected: &[KeyKind],
) -> anyhow::Result<encryptor_crypto::keystore::StoredKey> {
    let stored = open_keystore(dir)?.load(&owner.name, &owner.passphrase)?;
    if !expected.contains(&stored.kind) {
        bail!("key {:?} is a {:?} key", owner.name, stored.kind);
    }
    Ok(stored)
}

fn save_ec_key(dir: &Path, owner: &KeyOwner, key: &EcPrivateKey) -> anyhow::Result<()> {
    let kind = match key.curve() {
        Curve::Secp256k1 => KeyKind::EcSecp256k1,
        Curve::P256 => KeyKind::EcP256,
    };
    open_keystore(dir)?.save(
        &owner.name,
        kind,
        key.to_hex().as_bytes(),
        &owner.passphrase,
        &mut rand::thread_rng(),
    )?;
    Ok(())
}

fn load_ec_key(dir: &Path, owner: &KeyOwner) -> anyhow::Result<EcPrivateKey> {
    let stored = load_key(dir, owner, &[KeyKind::EcSecp256k1, KeyKind::EcP256])?;
    ec_key_from_stored(stored.kind, &stored.secret)
}

fn ec_key_from_stored(kind: KeyKind, secret: &[u8]) -> anyhow::Result<EcPrivateKey> {
    let curve = match kind {
        KeyKind::EcSecp256k1 => Curve::Secp256k1,
        KeyKind::EcP256 => Curve::P256,
        other => bail!("expected an EC key, found {:?}", other),
    };
    let hex_str = std::str::from_utf8(secret).map_err(|_| anyhow!("stored EC key is not hex"))?;
    Ok(EcPrivateKey::from_hex(curve, hex_str)?)
}

/// Build a payload from `--input` or `--text`, checking the size limit
/// before reading the file.
fn read_payload(source: &Source) -> anyhow::Result<Payload> {
    match (&source.input, &source.text) {
        (Some(path), _) => {
            let size = std::fs::metadata(path)
                .with_context(|| format!("reading {}", path.display()))?
                .len();
            if size > MAX_PAYLOAD_BYTES as u64 {
                bail!(
                    "{} is {} bytes; the limit is {} bytes",
                    path.display(),
                    size,
                    MAX_PAYLOAD_BYTES
                );
            }
            let bytes =
                std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "file".to_string());
            Ok(Payload::file(name, source.mime.as_deref(), bytes))
        }
        (None, Some(text)) => Ok(Payload::text(text.clone())),
        (None, None) => bail!("either --input or --text is required"),
    }
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// Write through a temporary sibling and rename, so an aborted run never
/// leaves a partial output file.
fn write_atomic(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("output path {} has no file name", path.display()))?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));
    std::fs::write(&tmp, bytes).with_context(|| format!("writing {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Print `value`, or write it to `output` and print a summary.
fn emit(value: &Value, output: Option<&Path>) -> anyhow::Result<Value> {
    match output {
        Some(path) => {
            let body = serde_json::to_string_pretty(value)?;
            write_atomic(path, body.as_bytes())?;
            Ok(json!({ "output": path.to_string_lossy(), "output_size": body.len() }))
        }
        None => Ok(value.clone()),
    }
}

/// Print plaintext as text, or write raw bytes when `output` is given.
fn emit_plaintext(plaintext: Vec<u8>, output: Option<&Path>) -> anyhow::Result<Value> {
    match output {
        Some(path) => {
            write_atomic(path, &plaintext)?;
            Ok(json!({ "output": path.to_string_lossy(), "output_size": plaintext.len() }))
        }
        None => {
            let text = String::from_utf8(plaintext)
                .map_err(|_| anyhow!("plaintext is binary; pass --output to write it to a file"))?;
            Ok(json!({ "text": text }))
        }
    }
}

/// Strip any directory components from a name taken from an envelope.
fn file_name_only(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_DECRYPTED_FILE_NAME.to_string())
}

/// Output path for a decrypted file: the sealed name next to the envelope,
/// never the envelope itself.
fn default_open_path(input: &Path, sealed_name: &str) -> PathBuf {
    let candidate = input.with_file_name(file_name_only(sealed_name));
    if candidate != input {
        return candidate;
    }
    let input_name = file_name_only(&input.to_string_lossy());
    let stripped = decrypted_file_name(&input_name);
    if stripped != input_name {
        input.with_file_name(stripped)
    } else {
        input.with_file_name(format!("{}.out", input_name))
    }
}
