// ハッシュ関数 (SHA-256)
use log::{debug, trace};
use num_bigint::BigUint;
use sha2::{Digest, Sha256};

use crate::constants::CHALLENGE_HEX_LEN;
use crate::serialization::biguint_to_hex;

/// 暗号化ペイロードと全コミットメントを結びつけるダイジェスト
///
/// 入力はペイロードの生バイト列に続けて、各 r の16進テキストをリング順に
/// 連結したもの (署名テキスト上の表記と同じ)
pub fn transcript_digest<'a, I>(encrypted_payload: &[u8], commitments: I) -> [u8; 32]
where
    I: IntoIterator<Item = &'a BigUint>,
{
    let mut hasher = Sha256::new();
    hasher.update(encrypted_payload);
    for (i, commitment) in commitments.into_iter().enumerate() {
        let text = biguint_to_hex(commitment);
        trace!("transcript_digest: commitment[{}] = {}", i, text);
        hasher.update(text.as_bytes());
    }
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    debug!("transcript_digest: digest = {}", hex::encode(digest));
    digest
}

/// チャレンジ値: ダイジェストの先頭 128 ビット (16進32文字)
/// 残りは捨てる
pub fn challenge_from_digest(digest: &[u8; 32]) -> BigUint {
    BigUint::from_bytes_be(&digest[..CHALLENGE_HEX_LEN / 2])
}
