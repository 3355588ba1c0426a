//! Point compression for Groth16 proofs over BN254.
//!
//! The host returns Orb proofs as an ABI-encoded `uint256[8]`: `A` (G1), `B` (G2) and `C`
//! (G1) uncompressed. On-chain verifiers accept the compressed form in the first four words
//! with the remainder zeroed, which keeps the payload at its original width.

use alloy_primitives::{U256, uint};

use crate::concepts::ProofCompressor;

/// Base field modulus of BN254.
const P: U256 =
    uint!(0x30644e72e131a029b85045b68181585d97816a916871ca8d3c208c16d87cfd47_U256);

const PROOF_WORDS: usize = 8;
const WORD_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProofError {
    #[error("Proof is not valid hex: {0}")]
    InvalidHex(String),
    #[error("Proof must be {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
    #[error("Proof coordinate is not a field element")]
    NotInField,
    #[error("Proof point is not on the curve")]
    NotOnCurve,
}

/// Compresses Groth16 proofs to their on-chain compressed encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Groth16Compressor;

impl ProofCompressor for Groth16Compressor {
    fn compress_and_pad(&self, proof: &str) -> Result<String, ProofError> {
        let words = decode_proof(proof)?;
        let compressed = compress_proof(&words)?;

        let mut padded = [U256::ZERO; PROOF_WORDS];
        padded[..4].copy_from_slice(&compressed);
        Ok(encode_proof(&padded))
    }
}

/// Compress the eight uncompressed proof words into four.
pub fn compress_proof(proof: &[U256; PROOF_WORDS]) -> Result<[U256; 4], ProofError> {
    let a = compress_g1(proof[0], proof[1])?;
    let (b0, b1) = compress_g2(proof[3], proof[2], proof[5], proof[4])?;
    let c = compress_g1(proof[6], proof[7])?;
    Ok([a, b1, b0, c])
}

/// Compress a G1 point to `x << 1 | sign`.
pub fn compress_g1(x: U256, y: U256) -> Result<U256, ProofError> {
    if x >= P || y >= P {
        return Err(ProofError::NotInField);
    }
    if x.is_zero() && y.is_zero() {
        return Ok(U256::ZERO);
    }

    // y^2 = x^3 + 3
    let y_pos = sqrt(add(mul(mul(x, x), x), U256::from(3)))?;
    if y == y_pos {
        Ok(x << 1)
    } else if y == neg(y_pos) {
        Ok((x << 1) | U256::from(1))
    } else {
        Err(ProofError::NotOnCurve)
    }
}

/// Compress a G2 point `(x0 + x1·i, y0 + y1·i)` to `(x0 << 2 | hint << 1 | sign, x1)`.
pub fn compress_g2(x0: U256, x1: U256, y0: U256, y1: U256) -> Result<(U256, U256), ProofError> {
    if [x0, x1, y0, y1].iter().any(|c| *c >= P) {
        return Err(ProofError::NotInField);
    }
    if [x0, x1, y0, y1].iter().all(|c| c.is_zero()) {
        return Ok((U256::ZERO, U256::ZERO));
    }

    // y^2 = x^3 + 3 / (9 + i), with 3 / (9 + i) = 27/82 - 3/82·i
    let n3ab = mul(mul(x0, x1), P - U256::from(3));
    let a3 = mul(mul(x0, x0), x0);
    let b3 = mul(mul(x1, x1), x1);
    let y0_pos = add(add(fraction(27, 82), a3), mul(n3ab, x1));
    let y1_pos = neg(add(add(fraction(3, 82), b3), mul(n3ab, x0)));

    let d = sqrt(add(mul(y0_pos, y0_pos), mul(y1_pos, y1_pos)))?;
    let hint = !is_square(mul(add(y0_pos, d), fraction(1, 2)));

    let (y0_pos, y1_pos) = sqrt_fp2(y0_pos, y1_pos, hint)?;
    let hint_bit = if hint { U256::from(2) } else { U256::ZERO };
    if y0 == y0_pos && y1 == y1_pos {
        Ok(((x0 << 2) | hint_bit, x1))
    } else if y0 == neg(y0_pos) && y1 == neg(y1_pos) {
        Ok(((x0 << 2) | hint_bit | U256::from(1), x1))
    } else {
        Err(ProofError::NotOnCurve)
    }
}

fn decode_proof(proof: &str) -> Result<[U256; PROOF_WORDS], ProofError> {
    let bytes = hex::decode(proof.trim_start_matches("0x"))
        .map_err(|e| ProofError::InvalidHex(e.to_string()))?;
    if bytes.len() != PROOF_WORDS * WORD_BYTES {
        return Err(ProofError::InvalidLength {
            expected: PROOF_WORDS * WORD_BYTES,
            got: bytes.len(),
        });
    }

    let mut words = [U256::ZERO; PROOF_WORDS];
    for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(WORD_BYTES)) {
        *word = U256::from_be_slice(chunk);
    }
    Ok(words)
}

fn encode_proof(words: &[U256; PROOF_WORDS]) -> String {
    let mut bytes = Vec::with_capacity(PROOF_WORDS * WORD_BYTES);
    for word in words {
        bytes.extend_from_slice(&word.to_be_bytes::<WORD_BYTES>());
    }
    format!("0x{}", hex::encode(bytes))
}

fn add(a: U256, b: U256) -> U256 {
    a.add_mod(b, P)
}

fn mul(a: U256, b: U256) -> U256 {
    a.mul_mod(b, P)
}

fn neg(a: U256) -> U256 {
    if a.is_zero() { U256::ZERO } else { P - a }
}

fn invert(a: U256) -> U256 {
    a.pow_mod(P - U256::from(2), P)
}

fn fraction(num: u64, den: u64) -> U256 {
    mul(U256::from(num), invert(U256::from(den)))
}

fn is_square(a: U256) -> bool {
    a.pow_mod((P - U256::from(1)) >> 1, P) == U256::from(1)
}

fn sqrt(a: U256) -> Result<U256, ProofError> {
    let x = a.pow_mod((P + U256::from(1)) >> 2, P);
    if mul(x, x) != a {
        return Err(ProofError::NotOnCurve);
    }
    Ok(x)
}

fn sqrt_fp2(a0: U256, a1: U256, hint: bool) -> Result<(U256, U256), ProofError> {
    let mut d = sqrt(add(mul(a0, a0), mul(a1, a1)))?;
    if hint {
        d = neg(d);
    }
    let x0 = sqrt(mul(add(a0, d), fraction(1, 2)))?;
    let x1 = mul(a1, invert(mul(x0, U256::from(2))));

    if a0 != add(mul(x0, x0), neg(mul(x1, x1))) || a1 != mul(mul(x0, x1), U256::from(2)) {
        return Err(ProofError::NotOnCurve);
    }
    Ok((x0, x1))
}
