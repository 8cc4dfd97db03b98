use crate::constants::{AES_KEY_LEN, RING_SIZE};
use crate::crypto_utils::{aes_decrypt, aes_encrypt_with_rng, random_below, random_block};
use crate::error::{Result, RingError};
use crate::keystore::{load_ring, Ring};
use crate::models::{CommitmentResponsePair, Signature};
use crate::rsa::rsa_operation;
use crate::serialization::parse_signature;
use crate::transcript::{challenge_from_digest, transcript_digest};
use log::{debug, error, info, trace, warn};
use num_bigint::BigUint;
use num_traits::Zero;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

/// リング署名生成
/// ring: 署名者を選択済みのリング
/// message: 署名対象のメッセージ
pub fn ring_sign(ring: &Ring, message: &[u8]) -> Result<Signature> {
    ring_sign_with_rng(ring, message, &mut OsRng)
}

/// 使い捨て鍵・IV・ダミーの (r, s) を `rng` から生成するリング署名
/// 乱数源の失敗はいずれも `RandomnessFailure` になる
pub fn ring_sign_with_rng<R: RngCore + CryptoRng>(
    ring: &Ring,
    message: &[u8],
    rng: &mut R,
) -> Result<Signature> {
    // infoには主要パラメータのみ、詳細はdebugで出力
    info!(
        "リング署名生成開始: ring_size = {}, signer = {:?}, m_len = {}",
        ring.len(),
        ring.signer_index(),
        message.len()
    );

    let (signer, signer_key, signer_d) = ring.signer().ok_or_else(|| {
        error!("No private key selected for signing");
        RingError::NoSignerSelected
    })?;
    if ring.len() != RING_SIZE {
        error!("Need exactly {} public keys, got {}", RING_SIZE, ring.len());
        return Err(RingError::RingSizeMismatch {
            expected: RING_SIZE,
            actual: ring.len(),
        });
    }

    // 使い捨ての AES-128 鍵を生成
    let key = random_block(rng)?;

    // メッセージを暗号化 (IV || ciphertext)
    let encrypted_payload = aes_encrypt_with_rng(message, &key, rng).map_err(|e| match e {
        RingError::RandomnessFailure(reason) => RingError::RandomnessFailure(reason),
        other => RingError::EncryptionFailure(other.to_string()),
    })?;
    debug!(
        "ring_sign: encrypted_payload = {} bytes",
        encrypted_payload.len()
    );

    // 鍵を整数として扱い、署名者のモジュラス未満に収める
    let mut key_value = BigUint::from_bytes_be(&key);
    if key_value >= signer_key.n {
        warn!(
            "One-time key is larger than the signer modulus ({} bits), taking it modulo n",
            signer_key.n.bits()
        );
        key_value %= &signer_key.n;
    }

    // 署名者以外のメンバーにはランダムな (r, s) を割り当てる
    let mut pairs: Vec<CommitmentResponsePair> = Vec::with_capacity(RING_SIZE);
    for (i, member) in ring.members().iter().enumerate() {
        if i == signer {
            pairs.push(CommitmentResponsePair {
                commitment: BigUint::zero(),
                response: BigUint::zero(),
            });
            continue;
        }
        let commitment = random_below(&member.n, rng)?;
        let response = random_below(&member.n, rng)?;
        trace!("ring_sign: decoy[{}] = ({}, {})", i, commitment, response);
        pairs.push(CommitmentResponsePair {
            commitment,
            response,
        });
    }

    // 署名者の r: 鍵を秘密指数で暗号化したもの
    pairs[signer].commitment = rsa_operation(&key_value, signer_d, &signer_key.n);

    // 暗号文と全ての r からチャレンジを計算し、署名者の s とする
    let digest = transcript_digest(&encrypted_payload, pairs.iter().map(|p| &p.commitment));
    let challenge = challenge_from_digest(&digest);
    pairs[signer].response = challenge % &signer_key.n;
    debug!(
        "ring_sign: signer = {}, r bits = {}, s bits = {}",
        signer,
        pairs[signer].commitment.bits(),
        pairs[signer].response.bits()
    );

    let signature = Signature {
        encrypted_payload,
        pairs,
    };
    info!(
        "リング署名生成完了: payload_len = {}, pairs = {}",
        signature.encrypted_payload.len(),
        signature.pairs.len()
    );
    Ok(signature)
}

/// リング署名検証 (構造チェックのみ)
///
/// 全ての r, s が対応するメンバーのモジュラス未満であることのみを確認する
/// チャレンジの再計算は行わないため、範囲内の値であれば受理される
pub fn verify_signature(ring: &Ring, sig: &Signature) -> bool {
    info!(
        "リング署名検証開始: ring_size = {}, pairs = {}, payload_len = {}",
        ring.len(),
        sig.pairs.len(),
        sig.encrypted_payload.len()
    );
    if ring.len() != RING_SIZE || sig.pairs.len() != RING_SIZE {
        info!("リング署名検証結果: false (member count)");
        return false;
    }

    for (i, (pair, member)) in sig.pairs.iter().zip(ring.members()).enumerate() {
        if pair.commitment >= member.n || pair.response >= member.n {
            debug!("verify_signature: position {} is out of range", i);
            info!("リング署名検証結果: false");
            return false;
        }
    }
    info!("リング署名検証結果: true");
    true
}

/// 署名テキストをパースしてリングに対して検証する
/// パース失敗はエラー、範囲外の値は `Ok(false)`
pub fn ring_verify(ring: &Ring, signature_text: &str) -> Result<bool> {
    let sig = parse_signature(signature_text).map_err(|e| {
        error!("{}", e);
        e
    })?;
    Ok(verify_signature(ring, &sig))
}

/// `key_source` からリングを読み込み直して検証する
pub fn ring_verify_from_source(key_source: &str, signature_text: &str) -> Result<bool> {
    let ring = load_ring(key_source)?;
    ring_verify(&ring.to_public(), signature_text)
}

/// 公開鍵のみで暗号化ペイロードの復号を試みる
///
/// 各位置について `r^e mod n` を鍵の候補として復号し、パディングが正しく
/// 外れた位置とその平文をすべて返す。誤った鍵でも約 1/256 の確率で
/// パディングが外れるため、候補は複数になりうる。
/// 署名時に鍵が縮約されていなければ署名者の位置は必ず含まれる
pub fn recover_payload(ring: &Ring, sig: &Signature) -> Vec<(usize, Vec<u8>)> {
    let mut candidates = Vec::new();
    for (i, (pair, member)) in sig.pairs.iter().zip(ring.members()).enumerate() {
        let key_value = rsa_operation(&pair.commitment, &member.e, &member.n);
        let Some(key) = key_block(&key_value) else {
            trace!("recover_payload: position {} key does not fit 16 bytes", i);
            continue;
        };
        match aes_decrypt(&sig.encrypted_payload, &key) {
            Ok(plaintext) => {
                debug!("recover_payload: position {} opened the payload", i);
                candidates.push((i, plaintext));
            }
            Err(e) => trace!("recover_payload: position {}: {}", i, e),
        }
    }
    info!("recover_payload: {} candidate(s)", candidates.len());
    candidates
}

// 鍵の値を AES 鍵長まで左詰めで 0 埋めする
fn key_block(value: &BigUint) -> Option<[u8; AES_KEY_LEN]> {
    let bytes = value.to_bytes_be();
    if bytes.len() > AES_KEY_LEN {
        return None;
    }
    let mut key = [0u8; AES_KEY_LEN];
    key[AES_KEY_LEN - bytes.len()..].copy_from_slice(&bytes);
    Some(key)
}
