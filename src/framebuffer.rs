//! `CreateRefreshableFramebuffer` (spec.md §4.6): a version-gated binary
//! header followed by a raw pixel dump from the `framebuffer:` transport.
//!
//! Grounded on the same byteorder-based binary record style as
//! [`crate::log`]; the version-gated 12-field (v1) vs 16-field (v2, adds
//! `color_space`) header split is the documented `framebuffer_info`
//! "version word first" convention.

use byteorder::{ByteOrder, LittleEndian};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{AdbError, AdbResult};

/// Decoded `framebuffer_info` header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FramebufferHeader {
    pub version: u32,
    pub bpp: u32,
    pub color_space: Option<u32>,
    pub size: u32,
    pub width: u32,
    pub height: u32,
    pub red_offset: u32,
    pub red_length: u32,
    pub blue_offset: u32,
    pub blue_length: u32,
    pub green_offset: u32,
    pub green_length: u32,
    pub alpha_offset: u32,
    pub alpha_length: u32,
}

const V1_FIELD_COUNT: usize = 12;
const V2_FIELD_COUNT: usize = 13;

impl FramebufferHeader {
    /// Parses a header from its little-endian `u32` words, the first of
    /// which (`version`) determines whether 12 fields (v1) or 13 fields
    /// (v2, inserting `color_space` after `bpp`) follow.
    fn from_words(words: &[u32]) -> AdbResult<FramebufferHeader> {
        let version = words[0];
        let rest = &words[1..];

        let (bpp, color_space, tail) = if version >= 2 {
            if rest.len() < V2_FIELD_COUNT {
                return Err(AdbError::ProtocolFault(
                    "framebuffer v2 header is shorter than expected".into(),
                ));
            }
            (rest[0], Some(rest[1]), &rest[2..])
        } else {
            if rest.len() < V1_FIELD_COUNT {
                return Err(AdbError::ProtocolFault(
                    "framebuffer v1 header is shorter than expected".into(),
                ));
            }
            (rest[0], None, &rest[1..])
        };

        Ok(FramebufferHeader {
            version,
            bpp,
            color_space,
            size: tail[0],
            width: tail[1],
            height: tail[2],
            red_offset: tail[3],
            red_length: tail[4],
            blue_offset: tail[5],
            blue_length: tail[6],
            green_offset: tail[7],
            green_length: tail[8],
            alpha_offset: tail[9],
            alpha_length: tail[10],
        })
    }

    /// Total header length in bytes, for `from_words`'s expected input size.
    fn word_count(version: u32) -> usize {
        if version >= 2 {
            1 + V2_FIELD_COUNT
        } else {
            1 + V1_FIELD_COUNT
        }
    }
}

/// A framebuffer snapshot: header plus raw pixel bytes, refreshable by
/// re-reading the `framebuffer:` transport.
pub struct Framebuffer {
    pub header: FramebufferHeader,
    pub pixels: Vec<u8>,
}

/// Reads exactly `buf.len()` bytes, remapping an EOF to
/// [`AdbError::EndOfStream`] rather than the generic I/O error: a short
/// read partway through a framebuffer snapshot is not a normal
/// termination the way a clean EOF between snapshots would be.
async fn read_exact_mid_record<S: AsyncRead + Unpin>(socket: &mut S, buf: &mut [u8]) -> AdbResult<()> {
    match socket.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => Err(AdbError::EndOfStream(
            "framebuffer stream ended mid-snapshot".into(),
        )),
        Err(err) => Err(err.into()),
    }
}

impl Framebuffer {
    /// Reads one framebuffer snapshot from an already-selected
    /// `framebuffer:` transport.
    pub async fn read<S: AsyncRead + Unpin>(socket: &mut S) -> AdbResult<Framebuffer> {
        let mut version_buf = [0u8; 4];
        read_exact_mid_record(socket, &mut version_buf).await?;
        let version = LittleEndian::read_u32(&version_buf);

        let word_count = FramebufferHeader::word_count(version);
        let mut rest_buf = vec![0u8; (word_count - 1) * 4];
        read_exact_mid_record(socket, &mut rest_buf).await?;

        let mut words = vec![version];
        for chunk in rest_buf.chunks_exact(4) {
            words.push(LittleEndian::read_u32(chunk));
        }
        let header = FramebufferHeader::from_words(&words)?;

        let mut pixels = vec![0u8; header.size as usize];
        read_exact_mid_record(socket, &mut pixels).await?;

        Ok(Framebuffer { header, pixels })
    }
}
