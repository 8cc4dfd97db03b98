use thiserror::Error;

#[derive(Error, Debug)]
pub enum RsaError {
    #[error("e and phi are not coprime")]
    NotCoprime,
    #[error("key size of {0} bits is too small")]
    KeyTooSmall(usize),
    #[error("public and private key moduli do not match")]
    ModulusMismatch,
    #[error("failed to parse PEM key: {0}")]
    Pem(String),
}

#[derive(Error, Debug)]
pub enum RingError {
    #[error("malformed key record on line {line}: {reason}")]
    MalformedKeyRecord { line: usize, reason: String },
    #[error("ring must contain exactly {expected} keys, got {actual}")]
    RingSizeMismatch { expected: usize, actual: usize },
    #[error("no signer with private key material is selected")]
    NoSignerSelected,
    #[error("secure random source failed: {0}")]
    RandomnessFailure(String),
    #[error("payload encryption failed: {0}")]
    EncryptionFailure(String),
    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(String),
    #[error("malformed signature: {0}")]
    MalformedSignature(String),
    #[error("big integer could not be constructed: {0}")]
    BigIntegerAllocationFailure(String),
    #[error("i/o failure on {path}: {source}")]
    IoFailure {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Rsa(#[from] RsaError),
}

pub type Result<T> = std::result::Result<T, RingError>;
