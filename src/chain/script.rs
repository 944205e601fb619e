//! HTLC bail script construction and parsing
//!
//! The bail output pays to a P2SH hash of a fixed two-branch script: the
//! redeem branch requires the 32-byte secret preimage plus a signature from
//! the redeem key, the refund branch requires chain time past the
//! CheckLockTimeVerify threshold plus a signature from the refund key.
//! Both parties derive the identical script bytes from the handshake
//! parameters, so these builders must be deterministic to the byte.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use super::ChainError;

/// Required preimage length enforced by the script's OP_SIZE check
pub const SECRET_SIZE: usize = 32;

const OP_0: u8 = 0x00;
const OP_PUSHDATA1: u8 = 0x4c;
const OP_PUSHDATA2: u8 = 0x4d;
const OP_PUSHDATA4: u8 = 0x4e;
const OP_1NEGATE: u8 = 0x4f;
const OP_1: u8 = 0x51;
const OP_16: u8 = 0x60;
const OP_IF: u8 = 0x63;
const OP_ELSE: u8 = 0x67;
const OP_ENDIF: u8 = 0x68;
const OP_DROP: u8 = 0x75;
const OP_DUP: u8 = 0x76;
const OP_SIZE: u8 = 0x82;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_SHA256: u8 = 0xa8;
const OP_HASH160: u8 = 0xa9;
const OP_CHECKSIG: u8 = 0xac;
const OP_CHECKLOCKTIMEVERIFY: u8 = 0xb1;

/// SHA-256 of the input
pub fn sha256(data: &[u8]) -> Vec<u8> {
    Sha256::digest(data).to_vec()
}

/// HASH160: RIPEMD-160 over SHA-256, the standard P2SH script digest
pub fn hash160(data: &[u8]) -> Vec<u8> {
    Ripemd160::digest(Sha256::digest(data)).to_vec()
}

/// Build the HTLC bail script for the given parameters.
///
/// ```text
/// OP_IF
///   OP_SIZE <0x20> OP_EQUALVERIFY
///   OP_SHA256 <secret_hash> OP_EQUALVERIFY
///   OP_DUP OP_HASH160 <redeem_pkh>
/// OP_ELSE
///   <refund_time> OP_CHECKLOCKTIMEVERIFY OP_DROP
///   OP_DUP OP_HASH160 <refund_pkh>
/// OP_ENDIF
/// OP_EQUALVERIFY OP_CHECKSIG
/// ```
pub fn bail_script(
    redeem_pkh: &[u8],
    secret_hash: &[u8],
    refund_pkh: &[u8],
    refund_time: i64,
) -> Vec<u8> {
    let mut script = Vec::with_capacity(
        13 + 2 + secret_hash.len() + redeem_pkh.len() + refund_pkh.len() + 5,
    );

    script.push(OP_IF);
    script.push(OP_SIZE);
    push_data(&mut script, &[SECRET_SIZE as u8]);
    script.push(OP_EQUALVERIFY);
    script.push(OP_SHA256);
    push_data(&mut script, secret_hash);
    script.push(OP_EQUALVERIFY);
    script.push(OP_DUP);
    script.push(OP_HASH160);
    push_data(&mut script, redeem_pkh);
    script.push(OP_ELSE);
    // locktime as a 4-byte little-endian push, matching the wire encoding of
    // OP_CHECKLOCKTIMEVERIFY arguments
    push_data(&mut script, &(refund_time as u32).to_le_bytes());
    script.push(OP_CHECKLOCKTIMEVERIFY);
    script.push(OP_DROP);
    script.push(OP_DUP);
    script.push(OP_HASH160);
    push_data(&mut script, refund_pkh);
    script.push(OP_ENDIF);
    script.push(OP_EQUALVERIFY);
    script.push(OP_CHECKSIG);

    script
}

/// HASH160 of the bail script - the value a P2SH bail output pays to and the
/// value watchers filter on
pub fn bail_script_hash(
    redeem_pkh: &[u8],
    secret_hash: &[u8],
    refund_pkh: &[u8],
    refund_time: i64,
) -> Vec<u8> {
    hash160(&bail_script(redeem_pkh, secret_hash, refund_pkh, refund_time))
}

/// Append `data` with a minimal push opcode
pub fn push_data(buf: &mut Vec<u8>, data: &[u8]) {
    let len = data.len();
    if len < OP_PUSHDATA1 as usize {
        buf.push(len as u8);
    } else if len <= 0xff {
        buf.push(OP_PUSHDATA1);
        buf.push(len as u8);
    } else if len <= 0xffff {
        buf.push(OP_PUSHDATA2);
        buf.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        buf.push(OP_PUSHDATA4);
        buf.extend_from_slice(&(len as u32).to_le_bytes());
    }
    buf.extend_from_slice(data);
}

/// Decode a script into its pushed data elements.
///
/// Small-number opcodes decode to the value they push on the stack, so OP_1
/// through OP_16 yield `[1]`..`[16]` and OP_1NEGATE yields `[0x81]`, not the
/// raw opcode byte. Other non-push opcodes are skipped; truncated pushes are
/// a decode error.
pub fn parse_push_ops(script: &[u8]) -> Result<Vec<Vec<u8>>, ChainError> {
    let mut elements = Vec::new();
    let mut pos = 0usize;

    while pos < script.len() {
        let opcode = script[pos];
        pos += 1;

        let push_len = match opcode {
            OP_0 => {
                elements.push(Vec::new());
                continue;
            }
            len @ 0x01..=0x4b => len as usize,
            OP_PUSHDATA1 => {
                let len = *script
                    .get(pos)
                    .ok_or_else(|| ChainError::TxDecode("truncated PUSHDATA1".to_string()))?;
                pos += 1;
                len as usize
            }
            OP_PUSHDATA2 => {
                let bytes = script
                    .get(pos..pos + 2)
                    .ok_or_else(|| ChainError::TxDecode("truncated PUSHDATA2".to_string()))?;
                pos += 2;
                u16::from_le_bytes([bytes[0], bytes[1]]) as usize
            }
            OP_PUSHDATA4 => {
                let bytes = script
                    .get(pos..pos + 4)
                    .ok_or_else(|| ChainError::TxDecode("truncated PUSHDATA4".to_string()))?;
                pos += 4;
                u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize
            }
            OP_1NEGATE => {
                elements.push(vec![0x81]);
                continue;
            }
            n @ OP_1..=OP_16 => {
                elements.push(vec![n - OP_1 + 1]);
                continue;
            }
            _ => continue,
        };

        let data = script
            .get(pos..pos + push_len)
            .ok_or_else(|| ChainError::TxDecode("truncated push".to_string()))?;
        elements.push(data.to_vec());
        pos += push_len;
    }

    Ok(elements)
}

/// Extract the secret preimage from a redeem input script.
///
/// The redeem branch spends with `<sig> <pubkey> <secret> OP_1 <redeem_script>`,
/// so the secret is the third pushed element.
pub fn parse_secret(sig_script: &[u8]) -> Result<Vec<u8>, ChainError> {
    let elements = parse_push_ops(sig_script)?;
    let secret = elements
        .get(2)
        .ok_or_else(|| ChainError::TxDecode("redeem script has no secret element".to_string()))?;
    if secret.len() != SECRET_SIZE {
        return Err(ChainError::TxDecode(format!(
            "secret element is {} bytes, expected {}",
            secret.len(),
            SECRET_SIZE
        )));
    }
    Ok(secret.clone())
}
