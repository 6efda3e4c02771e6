//! Content-integrity digests for persisted financial rows.
//!
//! SHA-256 is the default. FNV-1a (32 bit, offset basis `0x811c9dc5`,
//! prime `0x01000193`) is kept as the documented non-cryptographic fallback;
//! every digest reports which of the two produced it.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Fnv1a32,
}

impl HashAlgorithm {
    pub fn tag(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Fnv1a32 => "fnv1a32",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            "fnv1a32" | "fnv1a" => Ok(HashAlgorithm::Fnv1a32),
            other => Err(format!("unknown hash algorithm `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentDigest {
    pub algorithm: HashAlgorithm,
    pub hex: String,
}

pub trait HashProvider: Send + Sync {
    fn hash(&self, input: &[u8]) -> ContentDigest;
}

#[derive(Debug, Clone, Copy)]
pub struct IntegrityHasher {
    algorithm: HashAlgorithm,
}

impl IntegrityHasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }
}

impl Default for IntegrityHasher {
    fn default() -> Self {
        Self::new(HashAlgorithm::default())
    }
}

impl HashProvider for IntegrityHasher {
    fn hash(&self, input: &[u8]) -> ContentDigest {
        let hex = match self.algorithm {
            HashAlgorithm::Sha256 => format!("{:x}", Sha256::digest(input)),
            HashAlgorithm::Fnv1a32 => format!("{:08x}", fnv1a32(input)),
        };

        ContentDigest { algorithm: self.algorithm, hex }
    }
}

pub fn fnv1a32(input: &[u8]) -> u32 {
    input.iter().fold(0x811c_9dc5_u32, |hash, byte| {
        (hash ^ u32::from(*byte)).wrapping_mul(0x0100_0193)
    })
}
