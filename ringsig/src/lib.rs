// エラーハンドリング
pub mod error;
// RSA鍵とべき乗剰余
pub mod rsa;
// リング鍵ファイルの読み込み
pub mod keystore;
// AES-128-CBC ハイブリッド暗号
pub mod crypto_utils;
// トランスクリプトハッシュ
pub mod transcript;
// リング署名関連
pub mod ring;
// 定数
pub mod constants;
// 署名データ構造
pub mod models;
// シリアライゼーションヘルパー
pub mod serialization;
// ファイル入出力
pub mod files;

pub use error::{RingError, RsaError};
pub use keystore::{load_ring, Ring};
pub use models::{CommitmentResponsePair, Signature};
pub use ring::{recover_payload, ring_sign, ring_verify, ring_verify_from_source, verify_signature};
pub use crate::rsa::{generate_keypair, KeyRecord};
pub use serialization::{parse_signature, serialize_signature};
