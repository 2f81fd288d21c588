//! Binary snapshot codec for [`InMemoryIndex`].
//!
//! Layout, all integers little-endian:
//!
//! ```text
//! magic      "SVEC"                                4 bytes
//! version    u8, currently 1
//! metric     u8 tag
//! dimension  u32, 0 while the index is empty
//! count      u32
//! records    count times:
//!   id         u32 length + UTF-8 bytes
//!   content    u32 length + UTF-8 bytes
//!   metadata   u32 length + JSON object bytes
//!   embedding  dimension times f32
//! digest     SHA-256 of everything above              32 bytes
//! ```
//!
//! Embeddings are written as raw f32 bits, so values round-trip exactly.
//! The digest is checked before any field is parsed: truncation and bit
//! flips surface as [`SimvecError::CorruptData`] up front, and the
//! structural checks behind it catch malformed but well-digested input.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};
use simvec_core::{SimvecError, SimvecResult, VectorRecord};

use crate::index::InMemoryIndex;
use crate::metric::Metric;

const MAGIC: [u8; 4] = *b"SVEC";
const VERSION: u8 = 1;
const HEADER_LEN: usize = 4 + 1 + 1 + 4 + 4;
const DIGEST_LEN: usize = 32;

/// Serializes the full index, records in insertion order, with a
/// trailing integrity digest.
pub fn encode(index: &InMemoryIndex) -> SimvecResult<Vec<u8>> {
    let mut out = Vec::with_capacity(HEADER_LEN + index.len() * 64 + DIGEST_LEN);
    out.extend_from_slice(&MAGIC);
    out.push(VERSION);
    out.push(index.metric().tag());
    put_len(&mut out, "dimension", index.dimension().unwrap_or(0))?;
    put_len(&mut out, "record count", index.len())?;
    for record in index.records() {
        put_slice(&mut out, record.id.as_bytes())?;
        put_slice(&mut out, record.content.as_bytes())?;
        // Sorted keys so identical metadata always encodes to identical
        // bytes regardless of map iteration order.
        let ordered: BTreeMap<&str, &serde_json::Value> = record
            .metadata
            .iter()
            .map(|(k, v)| (k.as_str(), v))
            .collect();
        put_slice(&mut out, &serde_json::to_vec(&ordered)?)?;
        for component in &record.embedding {
            out.extend_from_slice(&component.to_le_bytes());
        }
    }
    let digest = Sha256::digest(&out);
    out.extend_from_slice(&digest);
    Ok(out)
}

/// Reconstructs an index from [`encode`] output.
///
/// Every failure mode is reported as [`SimvecError::CorruptData`]: bad
/// magic, unsupported version, unknown metric, digest mismatch,
/// truncation, trailing bytes, declared sizes the payload cannot hold,
/// a record count that disagrees with the content, or records that
/// violate index invariants.
pub fn decode(bytes: &[u8]) -> SimvecResult<InMemoryIndex> {
    if bytes.len() < HEADER_LEN + DIGEST_LEN {
        return Err(corrupt("snapshot is too short to be valid"));
    }
    let (payload, trailer) = bytes.split_at(bytes.len() - DIGEST_LEN);
    if Sha256::digest(payload).as_slice() != trailer {
        return Err(corrupt("digest mismatch, bytes were altered or truncated"));
    }

    let mut reader = Reader::new(payload);
    if reader.take(4)? != MAGIC {
        return Err(corrupt("bad magic, not a simvec snapshot"));
    }
    let version = reader.u8()?;
    if version != VERSION {
        return Err(corrupt(format!("unsupported snapshot version {version}")));
    }
    let metric =
        Metric::from_tag(reader.u8()?).ok_or_else(|| corrupt("unknown metric tag"))?;
    let dimension = reader.u32()? as usize;
    let count = reader.u32()? as usize;
    if count > 0 && dimension == 0 {
        return Err(corrupt("record count declared without a dimension"));
    }
    // A record occupies at least three length prefixes plus its embedding
    // bytes, which bounds what the header may declare. Checked before the
    // header fields size any allocation.
    let floor = (count as u64).saturating_mul(12 + 4 * dimension as u64);
    if floor > reader.remaining() as u64 {
        return Err(corrupt("declared sizes exceed the remaining payload"));
    }

    let mut records = Vec::with_capacity(count);
    for n in 0..count {
        let id = reader.string()?;
        let content = reader.string()?;
        let metadata = serde_json::from_slice(reader.slice()?)
            .map_err(|e| corrupt(format!("record {n}: invalid metadata JSON: {e}")))?;
        let mut embedding = Vec::with_capacity(dimension);
        for _ in 0..dimension {
            embedding.push(f32::from_le_bytes(reader.array()?));
        }
        records.push(VectorRecord {
            id,
            content,
            metadata,
            embedding,
        });
    }
    if !reader.is_exhausted() {
        return Err(corrupt("trailing bytes after the declared records"));
    }

    let mut index = InMemoryIndex::with_metric(metric);
    index
        .upsert_many(records)
        .map_err(|e| corrupt(format!("records violate index invariants: {e}")))?;
    if index.len() != count {
        return Err(corrupt("declared record count does not match content"));
    }
    Ok(index)
}

fn corrupt(msg: impl Into<String>) -> SimvecError {
    SimvecError::CorruptData(msg.into())
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// Writes a size field; values the u32 prefix cannot carry fail with
/// [`SimvecError::InvalidArgument`] instead of truncating.
fn put_len(out: &mut Vec<u8>, what: &str, len: usize) -> SimvecResult<()> {
    let v = u32::try_from(len).map_err(|_| {
        SimvecError::InvalidArgument(format!("{what} {len} exceeds the snapshot format limit"))
    })?;
    put_u32(out, v);
    Ok(())
}

fn put_slice(out: &mut Vec<u8>, bytes: &[u8]) -> SimvecResult<()> {
    put_len(out, "field length", bytes.len())?;
    out.extend_from_slice(bytes);
    Ok(())
}

struct Reader<'a> {
    bytes: &'a [u8],
    at: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, at: 0 }
    }

    fn take(&mut self, len: usize) -> SimvecResult<&'a [u8]> {
        let end = self
            .at
            .checked_add(len)
            .ok_or_else(|| corrupt("length overflow in snapshot"))?;
        if end > self.bytes.len() {
            return Err(corrupt("unexpected end of snapshot"));
        }
        let s = &self.bytes[self.at..end];
        self.at = end;
        Ok(s)
    }

    fn u8(&mut self) -> SimvecResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> SimvecResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn array<const N: usize>(&mut self) -> SimvecResult<[u8; N]> {
        let b = self.take(N)?;
        b.try_into().map_err(|_| corrupt("unexpected end of snapshot"))
    }

    fn slice(&mut self) -> SimvecResult<&'a [u8]> {
        let len = self.u32()? as usize;
        self.take(len)
    }

    fn string(&mut self) -> SimvecResult<String> {
        let bytes = self.slice()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| corrupt("invalid UTF-8 in snapshot"))
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.at
    }

    fn is_exhausted(&self) -> bool {
        self.at == self.bytes.len()
    }
}
