//! Process configuration.
//!
//! The recognized options pin the cryptographic profile (one member per
//! family in this build), name the transport binding for the external RPC
//! layer, and say where the primary master secret comes from.

use std::net::SocketAddr;
use std::path::PathBuf;

use rand_core::Rng;
use serde::Deserialize;
use zeroize::Zeroize;

/// The recognized process options.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// The prime-order group profile.
    #[serde(default)]
    pub curve: Curve,
    /// How tokens are blinded for evaluation.
    #[serde(default)]
    pub voprf_blinding: Blinding,
    /// The attribute key-derivation scheme.
    #[serde(default)]
    pub kdf: KdfAlgorithm,
    /// Where the external transport should bind. Passed through untouched.
    pub listen_address: Option<SocketAddr>,
    /// Where the primary master secret comes from.
    pub master_secret_source: MasterSecretSource,
}

impl Config {
    /// Parse a TOML configuration document.
    pub fn from_toml(document: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(document)?)
    }
}

/// The prime-order group profile. This build ships exactly one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Curve {
    #[default]
    Ristretto255,
}

/// The blinding mode of the pseudorandom function. This build ships
/// exactly one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Blinding {
    #[default]
    Multiplicative,
}

/// The attribute key-derivation scheme. This build ships exactly one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KdfAlgorithm {
    #[default]
    Sdhi,
}

/// Where the primary master secret comes from.
///
/// File contents are raw bytes; environment values are hex, since an
/// environment cannot carry arbitrary bytes. `raw` marks the material as
/// the canonical 32-byte encoding of the secret scalar itself instead of a
/// seed to hash.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum MasterSecretSource {
    File {
        path: PathBuf,
        #[serde(default)]
        raw: bool,
    },
    Env {
        var: String,
        #[serde(default)]
        raw: bool,
    },
    /// Sample 32 fresh bytes at startup. The key pair then changes across
    /// restarts, invalidating outstanding credentials; useful for tests and
    /// ephemeral deployments only.
    Generated,
}

impl MasterSecretSource {
    /// Load the secret material, enforcing the length bounds.
    pub fn load(&self, rng: &mut impl Rng) -> Result<MasterSecret, ConfigError> {
        let (bytes, raw) = match self {
            MasterSecretSource::File { path, raw } => (std::fs::read(path)?, *raw),
            MasterSecretSource::Env { var, raw } => {
                (const_hex::decode(std::env::var(var)?)?, *raw)
            }
            MasterSecretSource::Generated => {
                let mut bytes = vec![0u8; 32];
                rng.fill_bytes(&mut bytes);
                (bytes, false)
            }
        };

        if raw && bytes.len() != 32 {
            return Err(ConfigError::InvalidMasterScalar);
        }
        if !raw && bytes.len() < 32 {
            return Err(ConfigError::SecretTooShort(bytes.len()));
        }
        Ok(MasterSecret { bytes, raw })
    }
}

/// Loaded master-secret material. Wiped on drop.
pub struct MasterSecret {
    bytes: Vec<u8>,
    raw: bool,
}

impl MasterSecret {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Whether the bytes are the secret scalar itself rather than a seed.
    pub fn is_raw(&self) -> bool {
        self.raw
    }
}

impl Drop for MasterSecret {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

/// Configuration failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read master secret file: {0}")]
    Io(#[from] std::io::Error),
    #[error("master secret environment variable: {0}")]
    Env(#[from] std::env::VarError),
    #[error("master secret is not valid hex: {0}")]
    Hex(#[from] const_hex::FromHexError),
    #[error("master secret must be at least 32 bytes, got {0}")]
    SecretTooShort(usize),
    #[error("raw master secret must be a canonical 32-byte scalar")]
    InvalidMasterScalar,
}
