use crate::constants::RING_SIZE;
use crate::error::{Result, RingError};
use crate::rsa::KeyRecord;
use crate::serialization::hex_to_biguint;
use log::{debug, error, info, warn};
use num_bigint::BigUint;
use num_traits::Zero;

/// ちょうど [`RING_SIZE`] 人のメンバーと、現在選択されている署名者
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ring {
    members: Vec<KeyRecord>,
    signer_index: Option<usize>,
}

impl Ring {
    /// リング順のレコードからリングを構築する
    /// 秘密指数を持つ最後のレコードが署名者になる
    pub fn new(members: Vec<KeyRecord>) -> Result<Ring> {
        if members.len() != RING_SIZE {
            return Err(RingError::RingSizeMismatch {
                expected: RING_SIZE,
                actual: members.len(),
            });
        }
        for (i, member) in members.iter().enumerate() {
            if member.e.is_zero() || member.n.is_zero() {
                return Err(RingError::MalformedKeyRecord {
                    line: i + 1,
                    reason: "exponent and modulus must be nonzero".to_string(),
                });
            }
        }
        let signer_index = members.iter().rposition(KeyRecord::has_private);
        Ok(Ring {
            members,
            signer_index,
        })
    }

    pub fn members(&self) -> &[KeyRecord] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn signer_index(&self) -> Option<usize> {
        self.signer_index
    }

    /// `index` を署名者として選択する
    /// 範囲外、または秘密指数を持たないメンバーの場合は何もしない
    pub fn set_signer_index(&mut self, index: usize) {
        match self.members.get(index) {
            Some(member) if member.has_private() => {
                debug!("set_signer_index: signer = {}", index);
                self.signer_index = Some(index);
            }
            _ => {
                warn!(
                    "set_signer_index: member {} has no private key, keeping {:?}",
                    index, self.signer_index
                );
            }
        }
    }

    /// 署名者の位置・鍵レコード・秘密指数
    pub fn signer(&self) -> Option<(usize, &KeyRecord, &BigUint)> {
        let index = self.signer_index?;
        let member = self.members.get(index)?;
        let d = member.d.as_ref()?;
        Some((index, member, d))
    }

    /// 秘密指数をすべて取り除いたリング
    pub fn to_public(&self) -> Ring {
        Ring {
            members: self.members.iter().map(KeyRecord::public_only).collect(),
            signer_index: None,
        }
    }
}

/// 鍵リストの読み込み
/// 1行に1つの `e,n,d` (16進数) レコード。`#` コメント行と空行はスキップ
/// 秘密指数が `0` (または空) のメンバーは公開鍵のみ
///
/// 先頭 [`RING_SIZE`] 件のレコードのみを使用する。それ以降の行は無視するが、
/// 有効なレコードが続く場合はリングサイズ超過としてエラー
pub fn load_ring(source: &str) -> Result<Ring> {
    info!("Loading ring keys: {} bytes", source.len());
    let mut members: Vec<KeyRecord> = Vec::with_capacity(RING_SIZE);
    let mut surplus = 0usize;

    for (i, raw) in source.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim();
        // 空行とコメント行はスキップ
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if members.len() == RING_SIZE {
            match parse_record(line_no, line) {
                Ok(_) => surplus += 1,
                Err(e) => debug!("load_ring: ignoring trailing line {}: {}", line_no, e),
            }
            continue;
        }
        let record = parse_record(line_no, line).map_err(|e| {
            error!("{}", e);
            e
        })?;
        debug!(
            "load_ring: line {} -> n bits = {}, private = {}",
            line_no,
            record.n.bits(),
            record.has_private()
        );
        members.push(record);
    }

    let total = members.len() + surplus;
    if total != RING_SIZE {
        error!("Ring must hold {} keys, found {}", RING_SIZE, total);
        return Err(RingError::RingSizeMismatch {
            expected: RING_SIZE,
            actual: total,
        });
    }

    let ring = Ring::new(members)?;
    info!("Ring loaded: signer = {:?}", ring.signer_index());
    Ok(ring)
}

fn parse_record(line_no: usize, line: &str) -> Result<KeyRecord> {
    // 4列目以降は無視する
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let (e, n, d) = match fields.as_slice() {
        [e, n, d, ..] => (*e, *n, *d),
        _ => return Err(malformed(line_no, "expected 3 comma-separated fields")),
    };

    let e = parse_field(line_no, "public exponent", e)?;
    let n = parse_field(line_no, "modulus", n)?;
    if e.is_zero() {
        return Err(malformed(line_no, "public exponent is zero"));
    }
    if n.is_zero() {
        return Err(malformed(line_no, "modulus is zero"));
    }

    // 秘密指数が 0 または空なら公開鍵のみのメンバー
    let d = if d.is_empty() || d == "0" {
        None
    } else {
        Some(parse_field(line_no, "private exponent", d)?).filter(|d| !d.is_zero())
    };
    Ok(KeyRecord { e, n, d })
}

fn parse_field(line_no: usize, name: &str, value: &str) -> Result<BigUint> {
    hex_to_biguint(value).map_err(|reason| malformed(line_no, format!("{}: {}", name, reason)))
}

fn malformed(line: usize, reason: impl Into<String>) -> RingError {
    RingError::MalformedKeyRecord {
        line,
        reason: reason.into(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::Result;

    // 教科書的な小さい鍵: (61*53, e=17), (11*13, e=7), (17*23, e=3), (5*11, e=3)
    pub(crate) const TEXTBOOK_PUBLIC: [&str; 4] = ["11,0CA1,0", "7,8F,0", "3,0187,0", "3,37,0"];
    pub(crate) const TEXTBOOK_PRIVATE: [&str; 4] = ["11,0CA1,AC1", "7,8F,67", "3,0187,EB", "3,37,1B"];

    /// `signers` の位置のみ秘密指数を持つ鍵ファイル
    pub(crate) fn textbook_key_file(signers: &[usize]) -> String {
        let mut text = String::from("# textbook ring\n");
        for i in 0..RING_SIZE {
            let line = if signers.contains(&i) {
                TEXTBOOK_PRIVATE[i]
            } else {
                TEXTBOOK_PUBLIC[i]
            };
            text.push_str(line);
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_load_public_ring() -> Result<()> {
        let ring = load_ring(&textbook_key_file(&[]))?;
        assert_eq!(ring.len(), RING_SIZE);
        assert_eq!(ring.signer_index(), None);
        assert_eq!(ring.members()[0].n, BigUint::from(3233u32));
        assert_eq!(ring.members()[3].e, BigUint::from(3u32));
        assert!(ring.members().iter().all(|m| !m.has_private()));
        Ok(())
    }

    #[test]
    fn test_load_detects_signer() -> Result<()> {
        let ring = load_ring(&textbook_key_file(&[2]))?;
        assert_eq!(ring.signer_index(), Some(2));
        let (index, member, d) = ring.signer().unwrap();
        assert_eq!(index, 2);
        assert_eq!(member.n, BigUint::from(391u32));
        assert_eq!(*d, BigUint::from(235u32));
        Ok(())
    }

    #[test]
    fn test_duplicate_private_keys_last_wins() -> Result<()> {
        let ring = load_ring(&textbook_key_file(&[0, 2, 1]))?;
        assert_eq!(ring.signer_index(), Some(2));
        let ring = load_ring(&textbook_key_file(&[0, 3]))?;
        assert_eq!(ring.signer_index(), Some(3));
        Ok(())
    }

    #[test]
    fn test_comments_blank_lines_and_whitespace() -> Result<()> {
        let text = "\n# header\n  11 , ca1 ,  0  \n\n   # indented comment\n7,8f,\n\t3, 187 ,eb,\r\n3,37,0\n";
        let ring = load_ring(text)?;
        assert_eq!(ring.members()[0].n, BigUint::from(3233u32));
        assert!(!ring.members()[1].has_private());
        assert_eq!(ring.signer_index(), Some(2));
        Ok(())
    }

    #[test]
    fn test_private_exponent_zero_forms() -> Result<()> {
        let ring = load_ring("11,CA1,0\n7,8F,\n3,187,00\n3,37,0\n")?;
        assert!(ring.members().iter().all(|m| !m.has_private()));
        Ok(())
    }

    #[test]
    fn test_too_few_fields() {
        let result = load_ring("11,CA1\n7,8F,0\n3,187,0\n3,37,0\n");
        assert!(matches!(
            result,
            Err(RingError::MalformedKeyRecord { line: 1, .. })
        ));
    }

    #[test]
    fn test_bad_hex() {
        for text in [
            "11,CA1,0\n7,8G,0\n3,187,0\n3,37,0\n",
            "xyz,CA1,0\n7,8F,0\n3,187,0\n3,37,0\n",
            "11,CA1,0\n7,8F,0\n3,187,EBG,1\n3,37,0\n",
            "11,,0\n7,8F,0\n3,187,0\n3,37,0\n",
        ] {
            assert!(
                matches!(load_ring(text), Err(RingError::MalformedKeyRecord { .. })),
                "accepted {:?}",
                text
            );
        }
    }

    #[test]
    fn test_extra_columns_are_ignored() -> Result<()> {
        let ring = load_ring("11,CA1,0,alice\n7,8F,0\n3,187,EB\n3,37,0\n")?;
        assert_eq!(ring.signer_index(), Some(2));
        assert_eq!(ring.members()[0].n, BigUint::from(3233u32));
        assert!(!ring.members()[0].has_private());

        // 4列目は秘密指数として読まれない
        let ring = load_ring("11,CA1,0\n7,8F,0\n3,187,EB,1\n3,37,0,,\n")?;
        assert_eq!(ring.signer_index(), Some(2));
        assert_eq!(ring.members()[2].d, Some(BigUint::from(235u32)));

        // 3列未満は引き続きエラー
        assert!(matches!(
            load_ring("11,CA1,0,alice\n7,8F\n3,187,EB\n3,37,0\n"),
            Err(RingError::MalformedKeyRecord { line: 2, .. })
        ));
        Ok(())
    }

    #[test]
    fn test_zero_modulus_or_exponent() {
        let result = load_ring("11,0,0\n7,8F,0\n3,187,0\n3,37,0\n");
        assert!(matches!(
            result,
            Err(RingError::MalformedKeyRecord { line: 1, .. })
        ));
        let result = load_ring("11,CA1,0\n0,8F,0\n3,187,0\n3,37,0\n");
        assert!(matches!(
            result,
            Err(RingError::MalformedKeyRecord { line: 2, .. })
        ));
    }

    #[test]
    fn test_three_records() {
        let result = load_ring("11,CA1,0\n7,8F,0\n3,187,0\n");
        assert!(matches!(
            result,
            Err(RingError::RingSizeMismatch {
                expected: 4,
                actual: 3
            })
        ));
        assert!(matches!(
            load_ring("# nothing here\n\n"),
            Err(RingError::RingSizeMismatch { actual: 0, .. })
        ));
    }

    #[test]
    fn test_five_records() {
        let mut text = textbook_key_file(&[1]);
        text.push_str("3,37,0\n");
        assert!(matches!(
            load_ring(&text),
            Err(RingError::RingSizeMismatch {
                expected: 4,
                actual: 5
            })
        ));
    }

    #[test]
    fn test_trailing_garbage_after_fourth_record_is_ignored() -> Result<()> {
        let mut text = textbook_key_file(&[1]);
        text.push_str("this is not a key\n");
        let ring = load_ring(&text)?;
        assert_eq!(ring.signer_index(), Some(1));
        Ok(())
    }

    #[test]
    fn test_set_signer_index() -> Result<()> {
        let mut ring = load_ring(&textbook_key_file(&[0, 2]))?;
        assert_eq!(ring.signer_index(), Some(2));
        ring.set_signer_index(0);
        assert_eq!(ring.signer_index(), Some(0));
        // 公開鍵のみのメンバー: 変更なし
        ring.set_signer_index(1);
        assert_eq!(ring.signer_index(), Some(0));
        // 範囲外: 変更なし
        ring.set_signer_index(4);
        assert_eq!(ring.signer_index(), Some(0));
        Ok(())
    }

    #[test]
    fn test_set_signer_index_without_private_material() -> Result<()> {
        let mut ring = load_ring(&textbook_key_file(&[]))?;
        ring.set_signer_index(2);
        assert_eq!(ring.signer_index(), None);
        assert!(ring.signer().is_none());
        Ok(())
    }

    #[test]
    fn test_to_public() -> Result<()> {
        let ring = load_ring(&textbook_key_file(&[3]))?;
        let public = ring.to_public();
        assert_eq!(public.signer_index(), None);
        assert_eq!(public, load_ring(&textbook_key_file(&[]))?);
        Ok(())
    }

    #[test]
    fn test_ring_new_size_check() {
        let record = KeyRecord {
            e: BigUint::from(3u32),
            n: BigUint::from(55u32),
            d: None,
        };
        let result = Ring::new(vec![record; 3]);
        assert!(matches!(
            result,
            Err(RingError::RingSizeMismatch { actual: 3, .. })
        ));
    }
}
