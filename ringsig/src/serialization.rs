use crate::constants::{RING_SIZE, SIGNATURE_PREFIX};
use crate::error::{Result, RingError};
use crate::models::{CommitmentResponsePair, Signature};
use log::debug;
use num_bigint::BigUint;
use num_traits::Zero;

/// BigUint を大文字の16進文字列に変換 (1バイト2桁)
/// 0 は "0" になる
pub fn biguint_to_hex(n: &BigUint) -> String {
    if n.is_zero() {
        return "0".to_string();
    }
    hex::encode_upper(n.to_bytes_be())
}

/// 16進文字列 (大文字・小文字、奇数長も可) を BigUint に変換
pub fn hex_to_biguint(hex: &str) -> std::result::Result<BigUint, String> {
    if hex.is_empty() {
        return Err("empty hex value".to_string());
    }
    // parse_bytes は '_' を許容するため、先に文字を検証する
    if let Some(bad) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(format!("invalid hex character {:?} in {:?}", bad, hex));
    }
    BigUint::parse_bytes(hex.as_bytes(), 16).ok_or_else(|| format!("invalid hex value {:?}", hex))
}

/// 署名をテキスト形式に変換
/// `RING_SIG:<payload>:<r0>,<s0>:<r1>,<s1>:<r2>,<s2>:<r3>,<s3>`
pub fn serialize_signature(sig: &Signature) -> String {
    let pairs = sig
        .pairs
        .iter()
        .map(|pair| {
            format!(
                "{},{}",
                biguint_to_hex(&pair.commitment),
                biguint_to_hex(&pair.response)
            )
        })
        .collect::<Vec<String>>()
        .join(":");
    format!(
        "{}{}:{}",
        SIGNATURE_PREFIX,
        hex::encode(&sig.encrypted_payload),
        pairs
    )
}

/// [`serialize_signature`] の出力をパース
pub fn parse_signature(text: &str) -> Result<Signature> {
    let body = text
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or_else(|| malformed(format!("missing {} prefix", SIGNATURE_PREFIX)))?;

    // ペイロード + メンバーごとのセグメント
    let segments: Vec<&str> = body.split(':').collect();
    if segments.len() != RING_SIZE + 1 {
        return Err(malformed(format!(
            "expected {} segments, found {}",
            RING_SIZE + 1,
            segments.len()
        )));
    }

    let encrypted_payload =
        hex::decode(segments[0]).map_err(|e| malformed(format!("payload: {}", e)))?;
    debug!(
        "parse_signature: payload = {} bytes",
        encrypted_payload.len()
    );

    let pairs = segments[1..]
        .iter()
        .enumerate()
        .map(|(i, segment)| parse_pair(i, segment))
        .collect::<Result<Vec<CommitmentResponsePair>>>()?;

    Ok(Signature {
        encrypted_payload,
        pairs,
    })
}

fn parse_pair(index: usize, segment: &str) -> Result<CommitmentResponsePair> {
    let values: Vec<&str> = segment.split(',').collect();
    if values.len() != 2 {
        return Err(malformed(format!(
            "pair {} has {} values, expected 2",
            index,
            values.len()
        )));
    }
    let commitment =
        hex_to_biguint(values[0]).map_err(|e| malformed(format!("pair {} r: {}", index, e)))?;
    let response =
        hex_to_biguint(values[1]).map_err(|e| malformed(format!("pair {} s: {}", index, e)))?;
    Ok(CommitmentResponsePair {
        commitment,
        response,
    })
}

fn malformed(reason: impl Into<String>) -> RingError {
    RingError::MalformedSignature(reason.into())
}
