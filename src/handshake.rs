//! Out-of-band handshake messages and their wire codec
//!
//! The two handshake messages are the only bit-exact external format of the
//! crate: they cross an out-of-band transport (copy-paste, QR code) between
//! independent instances. Fields are joined with `|` in a fixed order; byte
//! fields are lowercase hex with no prefix.

use crate::error::{SwapError, SwapResult};
use crate::swap::Swap;

/// Field delimiter of the handshake wire format
pub const SEPARATOR: char = '|';

const REQUEST_FIELDS: usize = 8;
const RESPONSE_FIELDS: usize = 5;

/// Handshake message the initiator sends to propose a swap
#[derive(Debug, Clone, PartialEq)]
pub struct SwapRequest {
    pub id: String,
    pub initiator_coin_code: String,
    pub responder_coin_code: String,
    pub rate: f64,
    pub initiator_amount: String,
    pub initiator_redeem_pkh: Vec<u8>,
    pub initiator_refund_pkh: Vec<u8>,
    pub secret_hash: Vec<u8>,
}

impl SwapRequest {
    pub fn from_swap(swap: &Swap) -> Self {
        Self {
            id: swap.id.clone(),
            initiator_coin_code: swap.initiator_coin_code.clone(),
            responder_coin_code: swap.responder_coin_code.clone(),
            rate: swap.rate,
            initiator_amount: swap.initiator_amount.clone(),
            initiator_redeem_pkh: swap.initiator_redeem_pkh.clone(),
            initiator_refund_pkh: swap.initiator_refund_pkh.clone(),
            secret_hash: swap.secret_hash.clone(),
        }
    }

    /// Serialize to the delimited wire form
    pub fn encode(&self) -> String {
        [
            self.id.clone(),
            self.initiator_coin_code.clone(),
            self.responder_coin_code.clone(),
            format!("{}", self.rate),
            self.initiator_amount.clone(),
            hex::encode(&self.initiator_redeem_pkh),
            hex::encode(&self.initiator_refund_pkh),
            hex::encode(&self.secret_hash),
        ]
        .join(&SEPARATOR.to_string())
    }

    /// Parse the delimited wire form; fails with `MalformedMessage` on a
    /// field-count mismatch or any hex/number parse failure
    pub fn decode(text: &str) -> SwapResult<Self> {
        let fields: Vec<&str> = text.split(SEPARATOR).collect();
        if fields.len() != REQUEST_FIELDS {
            return Err(SwapError::MalformedMessage(format!(
                "swap request has {} fields, expected {}",
                fields.len(),
                REQUEST_FIELDS
            )));
        }

        Ok(Self {
            id: fields[0].to_string(),
            initiator_coin_code: fields[1].to_string(),
            responder_coin_code: fields[2].to_string(),
            rate: parse_number(fields[3], "rate")?,
            initiator_amount: fields[4].to_string(),
            initiator_redeem_pkh: parse_hex(fields[5], "initiator redeem pkh")?,
            initiator_refund_pkh: parse_hex(fields[6], "initiator refund pkh")?,
            secret_hash: parse_hex(fields[7], "secret hash")?,
        })
    }
}

/// Handshake message the responder sends back to accept a swap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapResponse {
    pub id: String,
    pub responder_redeem_pkh: Vec<u8>,
    pub responder_refund_pkh: Vec<u8>,
    pub responder_refund_time: i64,
    pub initiator_refund_time: i64,
}

impl SwapResponse {
    pub fn from_swap(swap: &Swap) -> Self {
        Self {
            id: swap.id.clone(),
            responder_redeem_pkh: swap.responder_redeem_pkh.clone(),
            responder_refund_pkh: swap.responder_refund_pkh.clone(),
            responder_refund_time: swap.responder_refund_time,
            initiator_refund_time: swap.initiator_refund_time,
        }
    }

    /// Serialize to the delimited wire form
    pub fn encode(&self) -> String {
        [
            self.id.clone(),
            hex::encode(&self.responder_redeem_pkh),
            hex::encode(&self.responder_refund_pkh),
            format!("{}", self.responder_refund_time),
            format!("{}", self.initiator_refund_time),
        ]
        .join(&SEPARATOR.to_string())
    }

    /// Parse the delimited wire form
    pub fn decode(text: &str) -> SwapResult<Self> {
        let fields: Vec<&str> = text.split(SEPARATOR).collect();
        if fields.len() != RESPONSE_FIELDS {
            return Err(SwapError::MalformedMessage(format!(
                "swap response has {} fields, expected {}",
                fields.len(),
                RESPONSE_FIELDS
            )));
        }

        Ok(Self {
            id: fields[0].to_string(),
            responder_redeem_pkh: parse_hex(fields[1], "responder redeem pkh")?,
            responder_refund_pkh: parse_hex(fields[2], "responder refund pkh")?,
            responder_refund_time: parse_number(fields[3], "responder refund time")?,
            initiator_refund_time: parse_number(fields[4], "initiator refund time")?,
        })
    }
}

fn parse_hex(field: &str, name: &str) -> SwapResult<Vec<u8>> {
    hex::decode(field).map_err(|_| SwapError::MalformedMessage(format!("{}: bad hex", name)))
}

fn parse_number<T: std::str::FromStr>(field: &str, name: &str) -> SwapResult<T> {
    field
        .parse()
        .map_err(|_| SwapError::MalformedMessage(format!("{}: bad number", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> SwapRequest {
        SwapRequest {
            id: "3f2a9c1e".to_string(),
            initiator_coin_code: "BTC".to_string(),
            responder_coin_code: "BCH".to_string(),
            rate: 0.034,
            initiator_amount: "0.5".to_string(),
            initiator_redeem_pkh: vec![0x76, 0x5f, 0x12, 0xe7],
            initiator_refund_pkh: vec![0xd4, 0x50, 0x39, 0x7d],
            secret_hash: vec![0xf7; 32],
        }
    }

    fn sample_response() -> SwapResponse {
        SwapResponse {
            id: "3f2a9c1e".to_string(),
            responder_redeem_pkh: vec![0xaa, 0xbb],
            responder_refund_pkh: vec![0xcc, 0xdd],
            responder_refund_time: 1_700_086_400,
            initiator_refund_time: 1_700_172_800,
        }
    }

    #[test]
    fn request_round_trips() {
        let request = sample_request();
        let decoded = SwapRequest::decode(&request.encode()).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn response_round_trips() {
        let response = sample_response();
        let decoded = SwapResponse::decode(&response.encode()).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn request_wire_form_is_stable() {
        let encoded = sample_request().encode();
        let expected = format!(
            "3f2a9c1e|BTC|BCH|0.034|0.5|765f12e7|d450397d|{}",
            "f7".repeat(32)
        );
        assert_eq!(encoded, expected);
    }

    #[test]
    fn hex_fields_are_lowercase_and_byte_exact() {
        let encoded = sample_response().encode();
        let fields: Vec<&str> = encoded.split('|').collect();
        assert_eq!(fields[1], "aabb");
        assert_eq!(fields[2], "ccdd");
    }

    #[test]
    fn request_field_count_mismatch_is_malformed() {
        let mut encoded = sample_request().encode();
        encoded.push_str("|extra");
        assert!(matches!(
            SwapRequest::decode(&encoded),
            Err(SwapError::MalformedMessage(_))
        ));
        assert!(matches!(
            SwapRequest::decode("too|few|fields"),
            Err(SwapError::MalformedMessage(_))
        ));
    }

    #[test]
    fn request_bad_hex_is_malformed() {
        let encoded = sample_request().encode().replace("765f12e7", "zz5f12e7");
        assert!(matches!(
            SwapRequest::decode(&encoded),
            Err(SwapError::MalformedMessage(_))
        ));
    }

    #[test]
    fn request_bad_rate_is_malformed() {
        let encoded = sample_request().encode().replace("0.034", "not-a-rate");
        assert!(matches!(
            SwapRequest::decode(&encoded),
            Err(SwapError::MalformedMessage(_))
        ));
    }

    #[test]
    fn response_bad_time_is_malformed() {
        let encoded = sample_response().encode().replace("1700086400", "later");
        assert!(matches!(
            SwapResponse::decode(&encoded),
            Err(SwapError::MalformedMessage(_))
        ));
    }

    #[test]
    fn decode_rejects_empty_input() {
        assert!(SwapRequest::decode("").is_err());
        assert!(SwapResponse::decode("").is_err());
    }
}
