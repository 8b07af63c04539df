//! ビッグエンディアンのバイト列カーソル

use crate::InfraError;

/// メッセージを先頭から読み進めるカーソル
///
/// 読み取りが末尾を越える場合は `MalformedCiphertext` を返し、パニックしない。
pub(crate) struct ByteReader<'a> {
    bytes:    &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.position
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.position >= self.bytes.len()
    }

    /// ここまでに読み取ったバイト列
    pub(crate) fn consumed(&self) -> &'a [u8] {
        self.bytes.get(..self.position).unwrap_or_default()
    }

    pub(crate) fn take(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], InfraError> {
        let end = self
            .position
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| InfraError::malformed(format!("{field} の途中でデータが終了しました")))?;
        let slice = self.bytes.get(self.position..end).unwrap_or_default();
        self.position = end;
        Ok(slice)
    }

    pub(crate) fn array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], InfraError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, field)?);
        Ok(out)
    }

    pub(crate) fn u8(&mut self, field: &'static str) -> Result<u8, InfraError> {
        Ok(u8::from_be_bytes(self.array(field)?))
    }

    pub(crate) fn u16(&mut self, field: &'static str) -> Result<u16, InfraError> {
        Ok(u16::from_be_bytes(self.array(field)?))
    }

    pub(crate) fn u32(&mut self, field: &'static str) -> Result<u32, InfraError> {
        Ok(u32::from_be_bytes(self.array(field)?))
    }

    pub(crate) fn u64(&mut self, field: &'static str) -> Result<u64, InfraError> {
        Ok(u64::from_be_bytes(self.array(field)?))
    }

    /// 2 バイト長プレフィックス付きのフィールド
    pub(crate) fn length_prefixed(&mut self, field: &'static str) -> Result<&'a [u8], InfraError> {
        let len = self.u16(field)?;
        self.take(usize::from(len), field)
    }
}
