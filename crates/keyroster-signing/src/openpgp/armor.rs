//! ASCII armor (RFC 4880 section 6)

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::{Result, SigningError};

/// Armor label for detached signatures
pub const SIGNATURE_LABEL: &str = "PGP SIGNATURE";

const LINE_WIDTH: usize = 64;
const CRC24_INIT: u32 = 0x00B7_04CE;
const CRC24_POLY: u32 = 0x0186_4CFB;

/// Wrap binary packet data in an armored block
pub fn encode(label: &str, data: &[u8]) -> String {
    let mut out = format!("-----BEGIN {}-----\n\n", label);

    let encoded = STANDARD.encode(data);
    let mut rest = encoded.as_str();
    while !rest.is_empty() {
        let (line, tail) = rest.split_at(rest.len().min(LINE_WIDTH));
        out.push_str(line);
        out.push('\n');
        rest = tail;
    }

    let crc = crc24(data).to_be_bytes();
    out.push('=');
    out.push_str(&STANDARD.encode(&crc[1..]));
    out.push('\n');
    out.push_str(&format!("-----END {}-----\n", label));
    out
}

/// Extract the binary data of the first armored block with the given label.
///
/// Armor headers (`Key: value` lines) are skipped. The checksum line is
/// optional, but when present it must match.
pub fn decode(label: &str, text: &str) -> Result<Vec<u8>> {
    let begin = format!("-----BEGIN {}-----", label);
    let end = format!("-----END {}-----", label);

    let mut lines = text.lines().map(str::trim);
    if !lines.by_ref().any(|line| line == begin) {
        return Err(SigningError::InvalidArmor(format!("missing '{}' line", begin)));
    }

    let mut body = String::new();
    let mut checksum = None;
    let mut in_headers = true;
    let mut ended = false;

    for line in lines {
        if line == end {
            ended = true;
            break;
        }
        if in_headers {
            if line.is_empty() {
                in_headers = false;
                continue;
            }
            if line.contains(": ") {
                continue;
            }
            in_headers = false;
        }
        if line.is_empty() {
            continue;
        }
        if let Some(sum) = line.strip_prefix('=') {
            checksum = Some(sum.to_string());
            continue;
        }
        body.push_str(line);
    }

    if !ended {
        return Err(SigningError::InvalidArmor(format!("missing '{}' line", end)));
    }

    let data = STANDARD
        .decode(body.as_bytes())
        .map_err(|e| SigningError::InvalidArmor(e.to_string()))?;

    if let Some(sum) = checksum {
        let expected = STANDARD
            .decode(sum.as_bytes())
            .map_err(|e| SigningError::InvalidArmor(format!("bad checksum encoding: {}", e)))?;
        let actual = crc24(&data).to_be_bytes();
        if expected.as_slice() != &actual[1..] {
            return Err(SigningError::InvalidArmor("checksum mismatch".to_string()));
        }
    }

    Ok(data)
}

/// CRC-24 as used by the armor checksum
pub fn crc24(data: &[u8]) -> u32 {
    let mut crc = CRC24_INIT;
    for &byte in data {
        crc ^= (byte as u32) << 16;
        for _ in 0..8 {
            crc <<= 1;
            if crc & 0x0100_0000 != 0 {
                crc ^= CRC24_POLY;
            }
        }
    }
    crc & 0x00FF_FFFF
}
