// RSA 公開指数 (一般的な 65537)
pub const E: u32 = 65537;
// リングのメンバー数
pub const RING_SIZE: usize = 4;
// 署名テキストの接頭辞
pub const SIGNATURE_PREFIX: &str = "RING_SIG:";
// AES-128 使い捨て鍵の長さ (バイト)
pub const AES_KEY_LEN: usize = 16;
// CBC 初期化ベクトルの長さ (バイト)
pub const AES_IV_LEN: usize = 16;
// チャレンジとして使うダイジェストの16進文字数 (128 ビット)
pub const CHALLENGE_HEX_LEN: usize = 32;
// 鍵ファイル生成時のデフォルトの鍵長
pub const DEFAULT_RSA_BITS: usize = 2048;

pub const DEFAULT_KEY_FILE: &str = "publickey.txt";
pub const DEFAULT_MESSAGE_FILE: &str = "message.txt";
pub const DEFAULT_SIGNATURE_FILE: &str = "signature.txt";
