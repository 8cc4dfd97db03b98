use num_bigint::BigUint;

/// 各リングメンバーのコミットメント (r) とレスポンス (s)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitmentResponsePair {
    pub commitment: BigUint,
    pub response: BigUint,
}

/// リング署名を表す構造体
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    // 署名対象メッセージの IV || AES-128-CBC 暗号文
    pub encrypted_payload: Vec<u8>,
    // リング順の (r, s) ペア
    pub pairs: Vec<CommitmentResponsePair>,
}

impl Signature {
    /// トランスクリプトハッシュに入力される順の r
    pub fn commitments(&self) -> impl Iterator<Item = &BigUint> {
        self.pairs.iter().map(|pair| &pair.commitment)
    }
}
