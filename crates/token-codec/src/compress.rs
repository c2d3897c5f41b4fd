//! Optional compression stage of the token pipeline.
//!
//! [`Gzip`] writes a single gzip member laid out exactly as the issuing
//! service did, so compressed tokens stay comparable byte-for-byte:
//!
//! ```text
//! 1f 8b 08 00 | 00 00 00 00 | 02 ff     header: no mtime, XFL=best, OS=unknown
//! <raw deflate, level 9, ended by a sync flush>
//! 01 00 00 ff ff                        final empty stored block
//! crc32(le) | isize(le)
//! ```
//!
//! Only the framing is fixed here. The deflate body comes from `flate2`, and
//! different deflate implementations may pick different blocks for
//! compressible input.

use std::io::{self, Read};

use flate2::bufread::GzDecoder;
use flate2::{Compress, Compression, Crc, FlushCompress};

/// Gzip member header emitted by [`Gzip::compress`].
pub const GZIP_HEADER: [u8; 10] = [0x1f, 0x8b, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02, 0xff];

/// Final, empty stored deflate block closing the stream.
const FINAL_EMPTY_BLOCK: [u8; 5] = [0x01, 0x00, 0x00, 0xff, 0xff];

/// Gzip trailer length: CRC-32 followed by ISIZE.
const TRAILER_LEN: usize = 8;

/// Compress/decompress contract consumed by [`PipelineConfig`](crate::PipelineConfig).
pub trait Compressor: Send + Sync + std::fmt::Debug {
    /// Compress `data` at maximum effort into a complete, closed stream.
    fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>>;

    /// Decompress a stream produced by [`compress`](Self::compress).
    ///
    /// Fails on truncated or corrupt input, and when the output would exceed
    /// `limit` bytes.
    fn decompress(&self, data: &[u8], limit: Option<usize>) -> io::Result<Vec<u8>> {
        let mut decoder = GzDecoder::new(data);
        let mut out = Vec::new();
        match limit {
            Some(limit) => {
                (&mut decoder).take(limit as u64 + 1).read_to_end(&mut out)?;
                if out.len() > limit {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("decompressed payload exceeds {limit} bytes"),
                    ));
                }
            }
            None => {
                decoder.read_to_end(&mut out)?;
            }
        }

        // Exactly one member: nothing may follow its trailer.
        let rest = decoder.into_inner();
        if !rest.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} trailing bytes after gzip member", rest.len()),
            ));
        }
        Ok(out)
    }
}

/// Upper bound for raw deflate output: stored blocks plus the sync marker.
fn deflate_bound(len: usize) -> usize {
    len + len / 1000 + 64
}

/// Append the raw deflate encoding of `data` to `out`, ending with a sync flush.
///
/// The flush is complete once all input is consumed and a call returns
/// without filling the output buffer. A call that fills it may still hold
/// pending output, so the buffer grows and the flush is repeated.
fn deflate_sync(data: &[u8], out: &mut Vec<u8>) -> io::Result<()> {
    let mut deflater = Compress::new(Compression::best(), false);
    loop {
        if out.len() == out.capacity() {
            out.reserve(out.capacity().max(64));
        }
        let consumed = deflater.total_in() as usize;
        deflater
            .compress_vec(&data[consumed..], out, FlushCompress::Sync)
            .map_err(io::Error::other)?;
        let drained = deflater.total_in() as usize == data.len();
        if drained && out.len() < out.capacity() {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compress_emits_fixed_framing() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let out = Gzip.compress(data).unwrap();
        assert_eq!(&out[..GZIP_HEADER.len()], &GZIP_HEADER);

        let body_end = out.len() - TRAILER_LEN;
        assert_eq!(&out[body_end - FINAL_EMPTY_BLOCK.len()..body_end], &FINAL_EMPTY_BLOCK);
        // Sync flush marker right before the final block.
        let sync_end = body_end - FINAL_EMPTY_BLOCK.len();
        assert_eq!(&out[sync_end - 4..sync_end], &[0x00, 0x00, 0xff, 0xff]);

        let isize = u32::from_le_bytes(out[out.len() - 4..].try_into().unwrap());
        assert_eq!(isize as usize, data.len());
    }

    #[test]
    fn round_trip() {
        let data: Vec<u8> = (0..10_000u32).flat_map(|i| i.to_le_bytes()).collect();
        let out = Gzip.compress(&data).unwrap();
        assert!(out.len() < data.len());
        assert_eq!(Gzip.decompress(&out, None).unwrap(), data);
    }

    #[test]
    fn incompressible_input_round_trips() {
        // Pseudo-random bytes force deflate into stored blocks.
        let mut state = 0x2545_f491u32;
        let data: Vec<u8> = (0..70_000)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                state as u8
            })
            .collect();
        let out = Gzip.compress(&data).unwrap();
        assert_eq!(Gzip.decompress(&out, None).unwrap(), data);
    }

    #[test]
    fn truncated_stream_fails() {
        let out = Gzip.compress(b"some payload bytes").unwrap();
        let truncated = &out[..out.len() - TRAILER_LEN];
        assert!(Gzip.decompress(truncated, None).is_err());
    }

    #[test]
    fn bad_header_fails() {
        assert!(Gzip.decompress(b"definitely not gzip", None).is_err());
    }

    #[test]
    fn trailing_bytes_fail() {
        let mut out = Gzip.compress(b"some payload bytes").unwrap();
        out.extend_from_slice(b"\xde\xad\xbe\xef garbage");
        let err = Gzip.decompress(&out, None).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(Gzip.decompress(&out, Some(1024)).is_err());
    }

    #[test]
    fn second_member_fails() {
        let member = Gzip.compress(b"some payload bytes").unwrap();
        let doubled = [member.as_slice(), member.as_slice()].concat();
        assert!(Gzip.decompress(&doubled, None).is_err());
    }

    #[test]
    fn tiny_output_buffer_still_flushes() {
        let data: Vec<u8> = (0..5_000u32).flat_map(|i| (i * 7919).to_le_bytes()).collect();
        let mut out = Vec::with_capacity(1);
        deflate_sync(&data, &mut out).unwrap();
        assert_eq!(&out[out.len() - 4..], &[0x00, 0x00, 0xff, 0xff]);

        out.extend_from_slice(&FINAL_EMPTY_BLOCK);
        let mut inflated = Vec::new();
        flate2::read::DeflateDecoder::new(out.as_slice())
            .read_to_end(&mut inflated)
            .unwrap();
        assert_eq!(inflated, data);
    }

    #[test]
    fn limit_is_enforced() {
        let data = vec![b'a'; 4096];
        let out = Gzip.compress(&data).unwrap();
        assert_eq!(Gzip.decompress(&out, Some(4096)).unwrap(), data);
        let err = Gzip.decompress(&out, Some(4095)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
