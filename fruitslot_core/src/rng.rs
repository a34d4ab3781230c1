use hmac::{Hmac, Mac};
use rand::{rngs::StdRng, Rng, SeedableRng};
use sha2::{Digest, Sha256};

/// Source of uniform values in [0,1). Threaded explicitly through every spin so
/// the engine never touches ambient global state.
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

/// Production generator, seeded from OS entropy. Create one per spin call or
/// per session; it is not meant to be shared between tasks.
pub struct EntropyRng(StdRng);

impl EntropyRng {
    pub fn new() -> Self {
        Self(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl Default for EntropyRng {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for EntropyRng {
    fn next_unit(&mut self) -> f64 {
        self.0.gen::<f64>()
    }
}

// Deterministic stream: HMAC-SHA256(server_seed, "client_seed:nonce") gives the
// first 32 bytes, each exhausted block is re-hashed to extend it. Every 4 bytes
// become one u32 mapped onto [0,1).

pub type HmacSha256 = Hmac<Sha256>;

pub fn derive_hash_hex(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}

pub fn unit_from_bytes(chunk: [u8; 4]) -> f64 {
    let v = u32::from_be_bytes(chunk);
    (v as f64) / (u32::MAX as f64 + 1.0)
}

pub struct SeededRng {
    server_seed: String,
    client_seed: String,
    nonce: u64,
    block: Vec<u8>,
    cursor: usize,
}

impl SeededRng {
    pub fn new(server_seed: impl Into<String>, client_seed: impl Into<String>, nonce: u64) -> Self {
        let mut rng = Self {
            server_seed: server_seed.into(),
            client_seed: client_seed.into(),
            nonce,
            block: Vec::new(),
            cursor: 0,
        };
        rng.block = rng.hmac_bytes().to_vec();
        rng
    }

    pub fn server_seed_hash_hex(&self) -> String {
        derive_hash_hex(self.server_seed.as_bytes())
    }

    pub fn hmac_bytes(&self) -> [u8; 32] {
        let mut mac =
            HmacSha256::new_from_slice(self.server_seed.as_bytes()).expect("HMAC accepts any key length");
        let msg = format!("{}:{}", self.client_seed, self.nonce);
        mac.update(msg.as_bytes());
        let res = mac.finalize().into_bytes();
        let mut out = [0u8; 32];
        out.copy_from_slice(&res);
        out
    }
}

impl RandomSource for SeededRng {
    fn next_unit(&mut self) -> f64 {
        if self.cursor + 4 > self.block.len() {
            self.block = Sha256::digest(&self.block).to_vec();
            self.cursor = 0;
        }
        let c = &self.block[self.cursor..self.cursor + 4];
        self.cursor += 4;
        unit_from_bytes([c[0], c[1], c[2], c[3]])
    }
}

/// Replays a fixed list of values, wrapping around when it runs out.
#[derive(Debug, Clone)]
pub struct ScriptedRng {
    values: Vec<f64>,
    cursor: usize,
}

impl ScriptedRng {
    /// `None` for an empty list, which has nothing to replay.
    pub fn new(values: impl Into<Vec<f64>>) -> Option<Self> {
        let values = values.into();
        if values.is_empty() {
            return None;
        }
        Some(Self { values, cursor: 0 })
    }

    pub fn drawn(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for ScriptedRng {
    fn next_unit(&mut self) -> f64 {
        let v = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        v
    }
}
