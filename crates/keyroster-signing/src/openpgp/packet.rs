//! Just enough RFC 4880 packet handling for v4 EdDSA keys and detached
//! binary-document signatures.

use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::error::{Result, SigningError};
use crate::fingerprint::Fingerprint;

pub const TAG_SIGNATURE: u8 = 2;

pub const SIGNATURE_TYPE_BINARY: u8 = 0x00;
pub const ALGORITHM_EDDSA: u8 = 22;
pub const HASH_SHA256: u8 = 8;

const SUBPACKET_CREATION_TIME: u8 = 2;
const SUBPACKET_ISSUER_KEY_ID: u8 = 16;
const SUBPACKET_ISSUER_FINGERPRINT: u8 = 33;

/// OID of Ed25519 in the legacy EdDSA encoding
const ED25519_OID: [u8; 9] = [0x2B, 0x06, 0x01, 0x04, 0x01, 0xDA, 0x47, 0x0F, 0x01];

/// v4 fingerprint of an Ed25519 public key created at `created_at`
pub fn ed25519_fingerprint(public_key: &[u8; 32], created_at: u32) -> Fingerprint {
    let body = ed25519_public_key_body(public_key, created_at);

    let mut hasher = Sha1::new();
    hasher.update([0x99]);
    hasher.update((body.len() as u16).to_be_bytes());
    hasher.update(&body);

    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hasher.finalize());
    Fingerprint::from_bytes(bytes)
}

fn ed25519_public_key_body(public_key: &[u8; 32], created_at: u32) -> Vec<u8> {
    let mut body = Vec::with_capacity(51);
    body.push(4);
    body.extend_from_slice(&created_at.to_be_bytes());
    body.push(ALGORITHM_EDDSA);
    body.push(ED25519_OID.len() as u8);
    body.extend_from_slice(&ED25519_OID);

    let mut point = [0u8; 33];
    point[0] = 0x40;
    point[1..].copy_from_slice(public_key);
    write_mpi(&mut body, &point);
    body
}

/// A version 4 signature packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignaturePacket {
    pub signature_type: u8,
    pub public_key_algorithm: u8,
    pub hash_algorithm: u8,
    pub hashed_subpackets: Vec<u8>,
    pub unhashed_subpackets: Vec<u8>,
    pub hash_tag: [u8; 2],
    pub mpis: Vec<Vec<u8>>,
}

impl SignaturePacket {
    /// Unsigned EdDSA/SHA-256 binary signature skeleton for `issuer`
    pub fn binary_eddsa(issuer: &Fingerprint, created_at: u32) -> Self {
        let mut issuer_value = vec![4];
        issuer_value.extend_from_slice(issuer.as_bytes());

        let mut hashed = Vec::new();
        write_subpacket(&mut hashed, SUBPACKET_ISSUER_FINGERPRINT, &issuer_value);
        write_subpacket(&mut hashed, SUBPACKET_CREATION_TIME, &created_at.to_be_bytes());

        let mut unhashed = Vec::new();
        write_subpacket(&mut unhashed, SUBPACKET_ISSUER_KEY_ID, &issuer.key_id());

        Self {
            signature_type: SIGNATURE_TYPE_BINARY,
            public_key_algorithm: ALGORITHM_EDDSA,
            hash_algorithm: HASH_SHA256,
            hashed_subpackets: hashed,
            unhashed_subpackets: unhashed,
            hash_tag: [0, 0],
            mpis: Vec::new(),
        }
    }

    /// The hash a v4 signature commits to: data, hashed header, trailer
    pub fn digest(&self, data: &[u8]) -> [u8; 32] {
        let mut prefix = vec![
            4,
            self.signature_type,
            self.public_key_algorithm,
            self.hash_algorithm,
        ];
        prefix.extend_from_slice(&(self.hashed_subpackets.len() as u16).to_be_bytes());
        prefix.extend_from_slice(&self.hashed_subpackets);

        let mut hasher = Sha256::new();
        hasher.update(data);
        hasher.update(&prefix);
        hasher.update([4, 0xFF]);
        hasher.update((prefix.len() as u32).to_be_bytes());

        let mut digest = [0u8; 32];
        digest.copy_from_slice(&hasher.finalize());
        digest
    }

    /// Issuer fingerprint subpacket, hashed area first
    pub fn issuer_fingerprint(&self) -> Result<Option<Fingerprint>> {
        for area in [&self.hashed_subpackets, &self.unhashed_subpackets] {
            for (kind, value) in subpackets(area)? {
                if kind == SUBPACKET_ISSUER_FINGERPRINT && value.len() == 21 && value[0] == 4 {
                    let mut bytes = [0u8; 20];
                    bytes.copy_from_slice(&value[1..]);
                    return Ok(Some(Fingerprint::from_bytes(bytes)));
                }
            }
        }
        Ok(None)
    }

    /// Issuer key ID subpacket, hashed area first
    pub fn issuer_key_id(&self) -> Result<Option<[u8; 8]>> {
        for area in [&self.hashed_subpackets, &self.unhashed_subpackets] {
            for (kind, value) in subpackets(area)? {
                if kind == SUBPACKET_ISSUER_KEY_ID && value.len() == 8 {
                    let mut id = [0u8; 8];
                    id.copy_from_slice(value);
                    return Ok(Some(id));
                }
            }
        }
        Ok(None)
    }

    /// Full packet (header and body)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut body = vec![
            4,
            self.signature_type,
            self.public_key_algorithm,
            self.hash_algorithm,
        ];
        body.extend_from_slice(&(self.hashed_subpackets.len() as u16).to_be_bytes());
        body.extend_from_slice(&self.hashed_subpackets);
        body.extend_from_slice(&(self.unhashed_subpackets.len() as u16).to_be_bytes());
        body.extend_from_slice(&self.unhashed_subpackets);
        body.extend_from_slice(&self.hash_tag);
        for mpi in &self.mpis {
            write_mpi(&mut body, mpi);
        }

        let mut packet = Vec::with_capacity(body.len() + 6);
        write_packet_header(&mut packet, TAG_SIGNATURE, body.len());
        packet.extend_from_slice(&body);
        packet
    }

    /// Parse the first packet of `input`, which must be a v4 signature
    pub fn from_bytes(input: &[u8]) -> Result<Self> {
        let (tag, body) = read_packet(input)?;
        if tag != TAG_SIGNATURE {
            return Err(malformed(format!("expected signature packet, found tag {}", tag)));
        }

        let mut reader = Reader::new(body);
        let version = reader.u8()?;
        if version != 4 {
            return Err(SigningError::Unsupported(format!(
                "signature packet version {}",
                version
            )));
        }

        let signature_type = reader.u8()?;
        let public_key_algorithm = reader.u8()?;
        let hash_algorithm = reader.u8()?;
        let hashed_len = reader.u16()? as usize;
        let hashed_subpackets = reader.take(hashed_len)?.to_vec();
        let unhashed_len = reader.u16()? as usize;
        let unhashed_subpackets = reader.take(unhashed_len)?.to_vec();

        let mut hash_tag = [0u8; 2];
        hash_tag.copy_from_slice(reader.take(2)?);

        let mut mpis = Vec::new();
        while !reader.is_empty() {
            mpis.push(reader.mpi()?);
        }

        Ok(Self {
            signature_type,
            public_key_algorithm,
            hash_algorithm,
            hashed_subpackets,
            unhashed_subpackets,
            hash_tag,
            mpis,
        })
    }
}

fn malformed(reason: impl Into<String>) -> SigningError {
    SigningError::MalformedPacket(reason.into())
}

/// Write a new-format packet header
fn write_packet_header(out: &mut Vec<u8>, tag: u8, len: usize) {
    out.push(0xC0 | tag);
    if len < 192 {
        out.push(len as u8);
    } else if len < 8384 {
        let len = len - 192;
        out.push(((len >> 8) + 192) as u8);
        out.push((len & 0xFF) as u8);
    } else {
        out.push(0xFF);
        out.extend_from_slice(&(len as u32).to_be_bytes());
    }
}

/// Split off the first packet, accepting both old and new header formats
fn read_packet(input: &[u8]) -> Result<(u8, &[u8])> {
    let mut reader = Reader::new(input);
    let first = reader.u8()?;
    if first & 0x80 == 0 {
        return Err(malformed("not a packet header"));
    }

    let (tag, len) = if first & 0x40 != 0 {
        let tag = first & 0x3F;
        let o1 = reader.u8()? as usize;
        let len = match o1 {
            0..=191 => o1,
            192..=223 => ((o1 - 192) << 8) + reader.u8()? as usize + 192,
            255 => reader.u32()? as usize,
            _ => return Err(SigningError::Unsupported("partial body lengths".to_string())),
        };
        (tag, len)
    } else {
        let tag = (first >> 2) & 0x0F;
        let len = match first & 0x03 {
            0 => reader.u8()? as usize,
            1 => reader.u16()? as usize,
            2 => reader.u32()? as usize,
            _ => reader.remaining(),
        };
        (tag, len)
    };

    Ok((tag, reader.take(len)?))
}

fn write_subpacket(out: &mut Vec<u8>, kind: u8, value: &[u8]) {
    // Every subpacket we emit is short, so the one-octet length form is enough.
    out.push((value.len() + 1) as u8);
    out.push(kind);
    out.extend_from_slice(value);
}

/// (type, value) pairs of a subpacket area; the critical bit is masked off
fn subpackets(area: &[u8]) -> Result<Vec<(u8, &[u8])>> {
    let mut reader = Reader::new(area);
    let mut found = Vec::new();

    while !reader.is_empty() {
        let o1 = reader.u8()? as usize;
        let len = match o1 {
            0..=191 => o1,
            192..=254 => ((o1 - 192) << 8) + reader.u8()? as usize + 192,
            _ => reader.u32()? as usize,
        };
        if len == 0 {
            return Err(malformed("empty subpacket"));
        }
        let data = reader.take(len)?;
        found.push((data[0] & 0x7F, &data[1..]));
    }

    Ok(found)
}

/// Multiprecision integer: bit count then big-endian magnitude
fn write_mpi(out: &mut Vec<u8>, value: &[u8]) {
    let start = value.iter().position(|&b| b != 0).unwrap_or(value.len());
    let trimmed = &value[start..];
    let bits = match trimmed.first() {
        Some(&first) => (trimmed.len() - 1) * 8 + (8 - first.leading_zeros() as usize),
        None => 0,
    };
    out.extend_from_slice(&(bits as u16).to_be_bytes());
    out.extend_from_slice(trimmed);
}

struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn remaining(&self) -> usize {
        self.data.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.data.len() {
            return Err(malformed("unexpected end of packet"));
        }
        let (head, tail) = self.data.split_at(n);
        self.data = tail;
        Ok(head)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn mpi(&mut self) -> Result<Vec<u8>> {
        let bits = self.u16()? as usize;
        Ok(self.take(bits.div_ceil(8))?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> Fingerprint {
        Fingerprint::parse("AAAABBBBAAAABBBBAAAAAAAABBBBAAAABBBBAAAA").unwrap()
    }

    #[test]
    fn test_mpi_bit_count() {
        let mut out = Vec::new();
        let mut point = [0u8; 33];
        point[0] = 0x40;
        write_mpi(&mut out, &point);
        assert_eq!(&out[..2], &263u16.to_be_bytes());

        let mut out = Vec::new();
        write_mpi(&mut out, &[0, 0, 1]);
        assert_eq!(out, vec![0, 1, 1]);
    }

    #[test]
    fn test_public_key_body_length() {
        let body = ed25519_public_key_body(&[7u8; 32], 1_500_000_000);
        assert_eq!(body.len(), 51);
    }

    #[test]
    fn test_fingerprint_depends_on_creation_time() {
        let a = ed25519_fingerprint(&[7u8; 32], 1);
        let b = ed25519_fingerprint(&[7u8; 32], 2);
        assert_ne!(a, b);
        assert_eq!(a, ed25519_fingerprint(&[7u8; 32], 1));
    }

    #[test]
    fn test_signature_packet_reparses() {
        let mut packet = SignaturePacket::binary_eddsa(&issuer(), 1_600_000_000);
        packet.hash_tag = [0xAB, 0xCD];
        packet.mpis = vec![vec![0x80; 32], vec![0x01; 32]];

        let parsed = SignaturePacket::from_bytes(&packet.to_bytes()).unwrap();
        assert_eq!(parsed, packet);
        assert_eq!(parsed.issuer_fingerprint().unwrap(), Some(issuer()));
        assert_eq!(parsed.issuer_key_id().unwrap(), Some(issuer().key_id()));
    }

    #[test]
    fn test_digest_covers_hashed_area() {
        let a = SignaturePacket::binary_eddsa(&issuer(), 1);
        let b = SignaturePacket::binary_eddsa(&issuer(), 2);
        assert_eq!(a.digest(b"data"), a.digest(b"data"));
        assert_ne!(a.digest(b"data"), b.digest(b"data"));
        assert_ne!(a.digest(b"data"), a.digest(b"tampered"));
    }

    #[test]
    fn test_old_format_header() {
        let packet = SignaturePacket::binary_eddsa(&issuer(), 5).to_bytes();
        // Re-frame the same body with an old-format, two-octet length header.
        let (_, body) = read_packet(&packet).unwrap();
        let mut old = vec![0x80 | (TAG_SIGNATURE << 2) | 1];
        old.extend_from_slice(&(body.len() as u16).to_be_bytes());
        old.extend_from_slice(body);

        let (tag, reparsed) = read_packet(&old).unwrap();
        assert_eq!(tag, TAG_SIGNATURE);
        assert_eq!(reparsed, body);
    }

    #[test]
    fn test_truncated_packet_is_malformed() {
        let packet = SignaturePacket::binary_eddsa(&issuer(), 5).to_bytes();
        let err = SignaturePacket::from_bytes(&packet[..packet.len() - 3]).unwrap_err();
        assert!(matches!(err, SigningError::MalformedPacket(_)));
    }
}
