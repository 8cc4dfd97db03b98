//! CLI が使うファイル入出力
//! 書き込みは一時ファイルを経由してリネームするため、失敗しても書きかけのファイルは残らない

use crate::error::{Result, RingError};
use crate::keystore::{load_ring, Ring};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

fn io_failure(path: &Path, source: std::io::Error) -> RingError {
    RingError::IoFailure {
        path: path.display().to_string(),
        source,
    }
}

/// リング鍵ファイルの読み込み
pub fn read_key_file(path: impl AsRef<Path>) -> Result<Ring> {
    let path = path.as_ref();
    info!("Reading key file: {}", path.display());
    let text = fs::read_to_string(path).map_err(|e| io_failure(path, e))?;
    load_ring(&text)
}

/// 署名対象メッセージをバイト列として読み込む
pub fn read_message(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let message = fs::read(path).map_err(|e| io_failure(path, e))?;
    debug!("read_message: {} bytes from {}", message.len(), path.display());
    Ok(message)
}

/// 署名ファイルの読み込み
/// 前後の空白と [`write_signature`] が付けた改行は取り除く
pub fn read_signature(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| io_failure(path, e))?;
    Ok(text.trim().to_string())
}

/// 署名を1行で書き込む
pub fn write_signature(path: impl AsRef<Path>, signature: &str) -> Result<()> {
    write_atomic(path.as_ref(), format!("{}\n", signature).as_bytes())
}

pub fn write_key_file(path: impl AsRef<Path>, contents: &str) -> Result<()> {
    write_atomic(path.as_ref(), contents.as_bytes())
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp = temp_path(path);
    if let Err(e) = fs::write(&tmp, contents) {
        let _ = fs::remove_file(&tmp);
        return Err(io_failure(path, e));
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(io_failure(path, e));
    }
    info!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".tmp{}", std::process::id()));
    path.with_file_name(name)
}
