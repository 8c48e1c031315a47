use alloy_primitives::{Address, U256};
use alloy_sol_types::{sol, SolCall};
use esync_store::LedgerError;

sol! {
    /// Read surface of the escrow contract.
    interface IEscrow {
        function getRemainingAmount(uint256 orderId) external view returns (uint256);
        function owner() external view returns (address);
        function feeBps() external view returns (uint256);
        function paused() external view returns (bool);
    }
}

/// Parse an on-chain order id given as decimal or `0x` hex.
pub fn parse_order_id(raw: &str) -> Result<U256, LedgerError> {
    let s = raw.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => U256::from_str_radix(hex, 16),
        None => U256::from_str_radix(s, 10),
    };
    match parsed {
        Ok(v) if !s.is_empty() => Ok(v),
        _ => Err(LedgerError::InvalidOrderId(raw.to_string())),
    }
}

fn decode_err(call: &str, e: impl std::fmt::Display) -> LedgerError {
    LedgerError::Decode(format!("{call} return data: {e}"))
}

fn narrow_u128(call: &str, v: U256) -> Result<u128, LedgerError> {
    u128::try_from(v).map_err(|_| decode_err(call, "uint256 value exceeds u128"))
}

/// Return data of `getRemainingAmount`, narrowed to u128.
pub fn decode_remaining(data: &[u8]) -> Result<u128, LedgerError> {
    let v = IEscrow::getRemainingAmountCall::abi_decode_returns_validate(data)
        .map_err(|e| decode_err("getRemainingAmount", e))?;
    narrow_u128("getRemainingAmount", v)
}

pub fn decode_owner(data: &[u8]) -> Result<String, LedgerError> {
    let owner: Address = IEscrow::ownerCall::abi_decode_returns_validate(data)
        .map_err(|e| decode_err("owner", e))?;
    Ok(format!("{owner:#x}"))
}

pub fn decode_fee(data: &[u8]) -> Result<u128, LedgerError> {
    let v = IEscrow::feeBpsCall::abi_decode_returns_validate(data)
        .map_err(|e| decode_err("feeBps", e))?;
    narrow_u128("feeBps", v)
}

pub fn decode_paused(data: &[u8]) -> Result<bool, LedgerError> {
    IEscrow::pausedCall::abi_decode_returns_validate(data).map_err(|e| decode_err("paused", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_u128(v: u128) -> Vec<u8> {
        let mut w = vec![0u8; 32];
        w[16..].copy_from_slice(&v.to_be_bytes());
        w
    }

    #[test]
    fn order_id_accepts_decimal_and_hex() {
        assert_eq!(parse_order_id("42").unwrap(), U256::from(42u64));
        assert_eq!(parse_order_id("0x2a").unwrap(), U256::from(42u64));
        assert!(parse_order_id("").is_err());
        assert!(parse_order_id("order-7").is_err());
    }

    #[test]
    fn remaining_amount_calldata_has_selector_and_arg() {
        let data = IEscrow::getRemainingAmountCall {
            orderId: U256::from(7u64),
        }
        .abi_encode();
        assert_eq!(data.len(), 4 + 32);
        assert_eq!(&data[..4], &IEscrow::getRemainingAmountCall::SELECTOR);
        assert_eq!(data[35], 7);
    }

    #[test]
    fn decodes_return_words() {
        assert_eq!(decode_remaining(&word_u128(99_500_000)).unwrap(), 99_500_000);
        assert!(decode_remaining(&[0u8; 8]).is_err());
        assert_eq!(decode_fee(&word_u128(25)).unwrap(), 25);

        let mut big = vec![0u8; 32];
        big[0] = 1;
        assert!(matches!(decode_remaining(&big), Err(LedgerError::Decode(_))));
        assert!(decode_fee(&big).is_err());

        assert!(decode_paused(&word_u128(1)).unwrap());
        assert!(!decode_paused(&word_u128(0)).unwrap());
        assert!(decode_paused(&word_u128(2)).is_err());

        let mut addr = vec![0u8; 32];
        addr[31] = 0xe5;
        assert_eq!(
            decode_owner(&addr).unwrap(),
            "0x00000000000000000000000000000000000000e5"
        );
        addr[0] = 0xff;
        assert!(decode_owner(&addr).is_err());
    }
}
