use crate::constants::{self, RING_SIZE};
use crate::error::{RingError, RsaError};
use crate::serialization::biguint_to_hex;
use log::{debug, info};
use num_bigint::BigUint;
use num_integer::Integer;
use num_prime::RandPrime;
use num_traits::One;
use rand::Rng;
// PKCS#8 / SPKI PEM のデコード
use rsa::{
    pkcs8::{DecodePrivateKey, DecodePublicKey},
    traits::{PrivateKeyParts, PublicKeyParts},
    RsaPrivateKey, RsaPublicKey,
};
use std::fmt;

// 生成可能な最小のモジュラス長
const MIN_RSA_BITS: usize = 64;

/// リングメンバーの鍵: RSA 公開鍵と、署名者であれば秘密指数
#[derive(Clone, PartialEq, Eq)]
pub struct KeyRecord {
    // 公開指数
    pub e: BigUint,
    // モジュラス (法)
    pub n: BigUint,
    // 秘密指数 (署名者のみ)
    pub d: Option<BigUint>,
}

impl KeyRecord {
    pub fn has_private(&self) -> bool {
        self.d.is_some()
    }

    /// 秘密指数を除いたコピー
    pub fn public_only(&self) -> KeyRecord {
        KeyRecord {
            e: self.e.clone(),
            n: self.n.clone(),
            d: None,
        }
    }

    /// 鍵ファイルの1行 `e,n,d` に変換 (公開鍵のみなら `d = 0`)
    pub fn to_key_line(&self) -> String {
        let d = self
            .d
            .as_ref()
            .map(biguint_to_hex)
            .unwrap_or_else(|| "0".to_string());
        format!("{},{},{}", biguint_to_hex(&self.e), biguint_to_hex(&self.n), d)
    }
}

// 秘密指数はログに出さない
impl fmt::Debug for KeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRecord")
            .field("e", &self.e)
            .field("n_bits", &self.n.bits())
            .field("d", &self.d.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// RSA 演算 `base^exponent mod modulus`
/// modulus は 0 でないこと
pub fn rsa_operation(base: &BigUint, exponent: &BigUint, modulus: &BigUint) -> BigUint {
    base.modpow(exponent, modulus)
}

/// RSA鍵ペア生成
/// bits: モジュラスのビット長 (p, q で半分ずつ)
/// rng: 乱数生成器
pub fn generate_keypair(bits: usize, rng: &mut impl Rng) -> Result<KeyRecord, RsaError> {
    info!("RSA鍵ペア生成開始: bits = {}", bits);
    if bits < MIN_RSA_BITS {
        return Err(RsaError::KeyTooSmall(bits));
    }
    let e = BigUint::from(constants::E);

    loop {
        let p: BigUint = rng.gen_prime_exact(bits / 2, None);
        let q: BigUint = rng.gen_prime_exact(bits - bits / 2, None);
        if p == q {
            continue;
        }

        // φ(n) = (p-1)*(q-1)
        let phi = (&p - 1u32) * (&q - 1u32);
        if !e.gcd(&phi).is_one() {
            // e = 65537 ではまれ。素数を選び直す
            debug!("generate_keypair: e shares a factor with phi, retrying");
            continue;
        }
        let d = e.modinv(&phi).ok_or(RsaError::NotCoprime)?;
        let n = &p * &q;

        let record = KeyRecord {
            e: e.clone(),
            n,
            d: Some(d),
        };
        info!("RSA鍵ペア生成完了: n bits = {}", record.n.bits());
        return Ok(record);
    }
}

/// 4 つの鍵ペアを生成し、`signer` の位置のみ秘密指数を持つ鍵ファイルを作成
pub fn generate_ring_file(
    bits: usize,
    signer: usize,
    rng: &mut impl Rng,
) -> Result<String, RingError> {
    if signer >= RING_SIZE {
        return Err(RingError::NoSignerSelected);
    }
    let mut lines = vec!["# e,n,d (hex); d = 0 for public-only members".to_string()];
    for i in 0..RING_SIZE {
        let record = generate_keypair(bits, rng)?;
        let record = if i == signer {
            record
        } else {
            record.public_only()
        };
        lines.push(record.to_key_line());
    }
    info!("Generated ring key file: signer = {}, bits = {}", signer, bits);
    Ok(lines.join("\n") + "\n")
}

/// SPKI 公開鍵 PEM (と任意で PKCS#8 秘密鍵 PEM) からリングメンバーを作成
pub fn key_record_from_pem(
    public_pem: &str,
    private_pem: Option<&str>,
) -> Result<KeyRecord, RsaError> {
    let public = RsaPublicKey::from_public_key_pem(public_pem)
        .map_err(|e| RsaError::Pem(format!("public key: {}", e)))?;
    // rsa crate の BigUint から num-bigint の BigUint に変換
    let n = BigUint::from_bytes_be(&public.n().to_bytes_be());
    let e = BigUint::from_bytes_be(&public.e().to_bytes_be());

    let d = match private_pem {
        Some(pem) => {
            let private = RsaPrivateKey::from_pkcs8_pem(pem)
                .map_err(|e| RsaError::Pem(format!("private key (PKCS#8): {}", e)))?;
            if BigUint::from_bytes_be(&private.n().to_bytes_be()) != n {
                return Err(RsaError::ModulusMismatch);
            }
            Some(BigUint::from_bytes_be(&private.d().to_bytes_be()))
        }
        None => None,
    };
    info!(
        "PEM key imported: n bits = {}, private = {}",
        n.bits(),
        d.is_some()
    );
    Ok(KeyRecord { e, n, d })
}
