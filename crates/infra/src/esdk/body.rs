//! 本文（フレーム列）とフッタの解析

use super::{
    header::{ContentType, MessageHeader},
    reader::ByteReader,
    suite::AlgorithmSuite,
};
use crate::InfraError;

const FINAL_FRAME_MARKER: u32 = 0xFFFF_FFFF;

/// 本文の AAD に含める識別文字列
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameKind {
    Regular,
    Final,
    SingleBlock,
}

impl FrameKind {
    pub(crate) fn content_string(self) -> &'static [u8] {
        match self {
            Self::Regular => b"AWSKMSEncryptionClient Frame",
            Self::Final => b"AWSKMSEncryptionClient Final Frame",
            Self::SingleBlock => b"AWSKMSEncryptionClient Single Block",
        }
    }
}

/// 暗号化された 1 フレーム
#[derive(Debug)]
pub(crate) struct Frame<'a> {
    pub(crate) kind:     FrameKind,
    pub(crate) sequence: u32,
    pub(crate) iv:       [u8; AlgorithmSuite::IV_LEN],
    pub(crate) content:  &'a [u8],
    pub(crate) tag:      [u8; AlgorithmSuite::TAG_LEN],
}

impl Frame<'_> {
    /// フレームの AAD: message id || 識別文字列 || シーケンス番号 || 内容長
    pub(crate) fn aad(&self, message_id: &[u8]) -> Vec<u8> {
        let content_string = self.kind.content_string();
        let mut aad = Vec::with_capacity(message_id.len() + content_string.len() + 12);
        aad.extend_from_slice(message_id);
        aad.extend_from_slice(content_string);
        aad.extend_from_slice(&self.sequence.to_be_bytes());
        aad.extend_from_slice(&(self.content.len() as u64).to_be_bytes());
        aad
    }
}

/// 本文のフレーム列を読み取る
///
/// シーケンス番号は 1 から始まり 1 ずつ増えなければならない。
pub(crate) fn parse_frames<'a>(
    reader: &mut ByteReader<'a>,
    header: &MessageHeader,
) -> Result<Vec<Frame<'a>>, InfraError> {
    match header.content_type {
        ContentType::NonFramed => parse_single_block(reader).map(|frame| vec![frame]),
        ContentType::Framed => parse_framed(reader, header.frame_length),
    }
}

fn parse_single_block<'a>(reader: &mut ByteReader<'a>) -> Result<Frame<'a>, InfraError> {
    let iv = reader.array("iv")?;
    let len = usize::try_from(reader.u64("content length")?)
        .map_err(|_| InfraError::malformed("本文の長さが大きすぎます"))?;
    let content = reader.take(len, "encrypted content")?;
    let tag = reader.array("auth tag")?;
    Ok(Frame {
        kind: FrameKind::SingleBlock,
        sequence: 1,
        iv,
        content,
        tag,
    })
}

fn parse_framed<'a>(
    reader: &mut ByteReader<'a>,
    frame_length: u32,
) -> Result<Vec<Frame<'a>>, InfraError> {
    let frame_length = usize::try_from(frame_length)
        .map_err(|_| InfraError::malformed("フレーム長が大きすぎます"))?;
    let mut frames = Vec::new();
    let mut expected: u32 = 1;

    loop {
        let marker = reader.u32("sequence number")?;
        let (kind, sequence) = if marker == FINAL_FRAME_MARKER {
            (FrameKind::Final, reader.u32("final sequence number")?)
        } else {
            (FrameKind::Regular, marker)
        };
        if sequence != expected {
            return Err(InfraError::malformed(format!(
                "フレームのシーケンス番号が不正です（期待値 {expected}、実際 {sequence}）"
            )));
        }

        let iv = reader.array("iv")?;
        let content = match kind {
            FrameKind::Final => {
                let len = usize::try_from(reader.u32("final frame length")?)
                    .map_err(|_| InfraError::malformed("最終フレーム長が大きすぎます"))?;
                if len > frame_length {
                    return Err(InfraError::malformed("最終フレームがフレーム長を超えています"));
                }
                reader.take(len, "final frame content")?
            }
            _ => reader.take(frame_length, "frame content")?,
        };
        let tag = reader.array("auth tag")?;
        frames.push(Frame {
            kind,
            sequence,
            iv,
            content,
            tag,
        });

        if kind == FrameKind::Final {
            return Ok(frames);
        }
        expected = expected
            .checked_add(1)
            .filter(|next| *next != FINAL_FRAME_MARKER)
            .ok_or_else(|| InfraError::malformed("フレーム数が上限を超えています"))?;
    }
}

/// フッタ（ECDSA 署名）
#[derive(Debug)]
pub(crate) struct Footer<'a> {
    /// 署名対象（ヘッダと本文のすべて）
    pub(crate) signed_bytes: &'a [u8],
    /// DER 形式の署名
    pub(crate) signature:    &'a [u8],
}

pub(crate) fn parse_footer<'a>(
    reader: &mut ByteReader<'a>,
    suite: AlgorithmSuite,
) -> Result<Option<Footer<'a>>, InfraError> {
    if !suite.is_signed() {
        return Ok(None);
    }
    let signed_bytes = reader.consumed();
    let signature = reader.length_prefixed("signature")?;
    Ok(Some(Footer {
        signed_bytes,
        signature,
    }))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{error::InfraErrorKind, esdk::testing::MessageBuilder};

    const KEY_ARN: &str = "arn:aws:kms:us-east-1:111122223333:key/test";

    fn parse(bytes: &[u8]) -> Result<usize, InfraError> {
        let mut reader = ByteReader::new(bytes);
        let header = MessageHeader::parse(&mut reader)?;
        parse_frames(&mut reader, &header).map(|frames| frames.len())
    }

    #[test]
    fn test_フレーム長ごとに分割されたフレームを読み取る() {
        let bytes = MessageBuilder::new(KEY_ARN, [1u8; 32])
            .frame_length(4)
            .build(b"ABCDEFGHIJ");

        // 4 + 4 + 最終フレーム 2
        assert_eq!(parse(&bytes).unwrap(), 3);
    }

    #[test]
    fn test_長さがフレーム長の倍数なら空の最終フレームで終わる() {
        let bytes = MessageBuilder::new(KEY_ARN, [1u8; 32])
            .frame_length(3)
            .build(b"ABCDEF");

        assert_eq!(parse(&bytes).unwrap(), 3);
    }

    #[test]
    fn test_非フレーム形式は単一ブロックとして読み取る() {
        let bytes = MessageBuilder::new(KEY_ARN, [1u8; 32])
            .non_framed()
            .build(b"482913");

        assert_eq!(parse(&bytes).unwrap(), 1);
    }

    #[test]
    fn test_シーケンス番号が飛んでいると形式不正になる() {
        let bytes = MessageBuilder::new(KEY_ARN, [1u8; 32])
            .frame_length(4)
            .sequence_offset(1)
            .build(b"ABCDEFGHIJ");

        let err = parse(&bytes).unwrap_err();

        assert!(matches!(err.kind(), InfraErrorKind::MalformedCiphertext(_)));
    }

    #[test]
    fn test_フレームの途中で終わると形式不正になる() {
        let bytes = MessageBuilder::new(KEY_ARN, [1u8; 32])
            .frame_length(4)
            .unsigned()
            .build(b"ABCDEFGHIJ");

        let err = parse(&bytes[..bytes.len() - 5]).unwrap_err();

        assert!(matches!(err.kind(), InfraErrorKind::MalformedCiphertext(_)));
    }

    #[test]
    fn test_フレームaadは識別文字列とシーケンス番号と長さを含む() {
        let frame = Frame {
            kind:     FrameKind::Final,
            sequence: 2,
            iv:       [0u8; 12],
            content:  b"abc",
            tag:      [0u8; 16],
        };

        let aad = frame.aad(&[9u8; 32]);

        let mut expected = vec![9u8; 32];
        expected.extend_from_slice(b"AWSKMSEncryptionClient Final Frame");
        expected.extend_from_slice(&[0, 0, 0, 2]);
        expected.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 3]);
        assert_eq!(aad, expected);
    }
}
