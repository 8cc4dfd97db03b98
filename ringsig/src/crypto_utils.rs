// AES-128-CBC ブロック暗号モード
use aes::Aes128;
use block_padding::Pkcs7;
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use log::{debug, trace};
use num_bigint::BigUint;
use num_traits::Zero;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use crate::constants::{AES_IV_LEN, AES_KEY_LEN};
use crate::error::{Result, RingError};

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// CSPRNG から 16 バイトのブロックを生成 (使い捨て鍵または IV)
pub fn random_block<R: RngCore + CryptoRng>(rng: &mut R) -> Result<[u8; AES_KEY_LEN]> {
    let mut block = [0u8; AES_KEY_LEN];
    rng.try_fill_bytes(&mut block)
        .map_err(|e| RingError::RandomnessFailure(e.to_string()))?;
    Ok(block)
}

/// `[0, bound)` の一様乱数 (棄却サンプリング)
/// `RandBigInt` と異なり乱数源の失敗を `RandomnessFailure` として返す
pub fn random_below<R: RngCore + CryptoRng>(bound: &BigUint, rng: &mut R) -> Result<BigUint> {
    if bound <= &BigUint::from(1u32) {
        return Ok(BigUint::zero());
    }
    let bits = bound.bits();
    let mut buf = vec![0u8; ((bits + 7) / 8) as usize];
    // 最上位バイトの余分なビットを落とす
    let top_mask = match bits % 8 {
        0 => 0xff,
        r => (1u8 << r) - 1,
    };
    loop {
        rng.try_fill_bytes(&mut buf)
            .map_err(|e| RingError::RandomnessFailure(e.to_string()))?;
        buf[0] &= top_mask;
        let value = BigUint::from_bytes_be(&buf);
        if &value < bound {
            return Ok(value);
        }
    }
}

/// 対称鍵暗号によるメッセージの暗号化
/// IV は OS の乱数から生成し、`iv || ciphertext` を返す
pub fn aes_encrypt(plaintext: &[u8], key: &[u8; AES_KEY_LEN]) -> Result<Vec<u8>> {
    aes_encrypt_with_rng(plaintext, key, &mut OsRng)
}

/// IV を `rng` から生成する [`aes_encrypt`]
pub fn aes_encrypt_with_rng<R: RngCore + CryptoRng>(
    plaintext: &[u8],
    key: &[u8; AES_KEY_LEN],
    rng: &mut R,
) -> Result<Vec<u8>> {
    let iv = random_block(rng)?;
    Ok(aes_encrypt_with_iv(plaintext, key, &iv))
}

/// 指定した IV での CBC 暗号化
/// PKCS#7 パディングは常に 1〜16 バイトを追加する
pub(crate) fn aes_encrypt_with_iv(
    plaintext: &[u8],
    key: &[u8; AES_KEY_LEN],
    iv: &[u8; AES_IV_LEN],
) -> Vec<u8> {
    trace!("aes_encrypt: plaintext_len = {}", plaintext.len());
    let ciphertext =
        Aes128CbcEnc::new(key.into(), iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext);
    debug!("aes_encrypt: ciphertext_len = {}", ciphertext.len());

    let mut blob = Vec::with_capacity(AES_IV_LEN + ciphertext.len());
    blob.extend_from_slice(iv);
    blob.extend_from_slice(&ciphertext);
    blob
}

/// `iv || ciphertext` の復号
pub fn aes_decrypt(blob: &[u8], key: &[u8; AES_KEY_LEN]) -> Result<Vec<u8>> {
    if blob.len() < AES_IV_LEN {
        return Err(RingError::InvalidCiphertext(format!(
            "{} bytes is too short to hold an IV",
            blob.len()
        )));
    }
    let (iv, ciphertext) = blob.split_at(AES_IV_LEN);
    trace!("aes_decrypt: ciphertext_len = {}", ciphertext.len());
    if ciphertext.is_empty() || ciphertext.len() % AES_IV_LEN != 0 {
        return Err(RingError::InvalidCiphertext(format!(
            "ciphertext length {} is not a positive multiple of the block size",
            ciphertext.len()
        )));
    }

    let plaintext = Aes128CbcDec::new(key.into(), iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| RingError::InvalidCiphertext("bad padding".to_string()))?;
    debug!("aes_decrypt: plaintext_len = {}", plaintext.len());
    Ok(plaintext)
}
