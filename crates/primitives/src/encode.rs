//! Canonical byte encodings for proof binding and state digests.

use anyhow::{anyhow, bail, Result};

use crate::types::*;

const ENC_V1: u8 = 1;

const TAG_U64: u8 = 0x01;
const TAG_TEXT: u8 = 0x02;

const TAG_TARGET_RECORD: u8 = 0x10;
const TAG_TARGET_CATEGORY: u8 = 0x11;

/// Versioned encoding of a cleartext list, the message an oracle proof signs.
pub fn encode_cleartexts(values: &[Cleartext]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + 4 + values.len() * 9);
    out.push(ENC_V1);
    encode_u32(values.len() as u32, &mut out);
    for v in values {
        match v {
            Cleartext::U64(n) => {
                out.push(TAG_U64);
                encode_u64(*n, &mut out);
            }
            Cleartext::Text(s) => {
                out.push(TAG_TEXT);
                encode_bytes(s.as_bytes(), &mut out);
            }
        }
    }
    out
}

pub fn decode_cleartexts(mut data: &[u8]) -> Result<Vec<Cleartext>> {
    let ver = read_u8(&mut data)?;
    if ver != ENC_V1 { bail!("unsupported encoding version: {}", ver); }
    let n = read_u32(&mut data)? as usize;
    let mut values = Vec::with_capacity(n.min(64));
    for _ in 0..n {
        let value = match read_u8(&mut data)? {
            TAG_U64 => Cleartext::U64(read_u64(&mut data)?),
            TAG_TEXT => {
                let raw = read_vec(&mut data)?;
                let text = String::from_utf8(raw).map_err(|_| anyhow!("cleartext is not utf-8"))?;
                Cleartext::Text(text)
            }
            tag => bail!("unknown cleartext tag: {:#04x}", tag),
        };
        values.push(value);
    }
    if !data.is_empty() { bail!("trailing bytes in cleartext list"); }
    Ok(values)
}

/// Length-prefixed list of handles, in forwarding order.
pub fn encode_handles(handles: &[CiphertextHandle], out: &mut Vec<u8>) {
    encode_u32(handles.len() as u32, out);
    for h in handles { encode_bytes(h.as_bytes(), out); }
}

impl EncryptedRecord {
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.push(ENC_V1);
        encode_u64(self.record_id.0, &mut out);
        encode_bytes(self.encrypted_value_a.as_bytes(), &mut out);
        encode_bytes(self.encrypted_value_b.as_bytes(), &mut out);
        encode_u64(self.submitted_at, &mut out);
        out
    }
}

impl RevealedRecord {
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.push(ENC_V1);
        encode_bytes(self.revealed_score.as_bytes(), &mut out);
        encode_bytes(self.revealed_comment.as_bytes(), &mut out);
        encode_u8(self.is_revealed as u8, &mut out);
        encode_opt_u64(self.revealed_at, &mut out);
        encode_opt_u64(self.revealed_by.map(|r| r.0), &mut out);
        out
    }
}

impl PendingRequest {
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.push(ENC_V1);
        encode_u64(self.request_id.0, &mut out);
        match &self.target {
            RequestTarget::Record(id) => {
                out.push(TAG_TARGET_RECORD);
                encode_u64(id.0, &mut out);
            }
            RequestTarget::Category { key, category } => {
                out.push(TAG_TARGET_CATEGORY);
                out.extend_from_slice(&key.0);
                encode_bytes(category.as_bytes(), &mut out);
            }
        }
        encode_handles(&self.handles, &mut out);
        encode_u64(self.issued_at, &mut out);
        encode_opt_u64(self.expires_at, &mut out);
        encode_u8(
            match self.status {
                RequestStatus::Pending => 0,
                RequestStatus::Fulfilled => 1,
                RequestStatus::Expired => 2,
                RequestStatus::Cancelled => 3,
            },
            &mut out,
        );
        out
    }
}

// ——— Encoding primitives ———

pub fn encode_u8(v: u8, out: &mut Vec<u8>) { out.push(v); }
pub fn encode_u32(v: u32, out: &mut Vec<u8>) { out.extend_from_slice(&v.to_be_bytes()); }
pub fn encode_u64(v: u64, out: &mut Vec<u8>) { out.extend_from_slice(&v.to_be_bytes()); }

pub fn encode_opt_u64(v: Option<u64>, out: &mut Vec<u8>) {
    match v {
        Some(x) => { out.push(1); encode_u64(x, out); }
        None => out.push(0),
    }
}

pub fn encode_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    encode_u32(bytes.len() as u32, out);
    out.extend_from_slice(bytes);
}

fn take<'a>(data: &mut &'a [u8], n: usize) -> Result<&'a [u8]> {
    if data.len() < n { return Err(anyhow!("unexpected EOF")); }
    let (head, rest) = data.split_at(n);
    *data = rest;
    Ok(head)
}

pub fn read_u8(data: &mut &[u8]) -> Result<u8> {
    Ok(take(data, 1)?[0])
}

pub fn read_u32(data: &mut &[u8]) -> Result<u32> {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(take(data, 4)?);
    Ok(u32::from_be_bytes(buf))
}

pub fn read_u64(data: &mut &[u8]) -> Result<u64> {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(take(data, 8)?);
    Ok(u64::from_be_bytes(buf))
}

pub fn read_vec(data: &mut &[u8]) -> Result<Vec<u8>> {
    let len = read_u32(data)? as usize;
    Ok(take(data, len)?.to_vec())
}
