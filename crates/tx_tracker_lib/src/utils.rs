use rust_decimal::Decimal;
use std::error::Error;
use std::fmt::{Display, Formatter};
use web3::types::{H256, U256};

pub const ETHER_DECIMALS: u32 = 18;
pub const GWEI_DECIMALS: u32 = 9;

#[derive(Debug, Clone)]
pub struct ConversionError {
    pub msg: String,
}

impl ConversionError {
    pub fn from(msg: String) -> Self {
        Self { msg }
    }
}

impl Display for ConversionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error during conversion: {}", self.msg)
    }
}

impl Error for ConversionError {
    fn description(&self) -> &str {
        "Conversion error"
    }
}

/// Converts an amount in the smallest chain unit into a decimal with `decimals` places
/// (18 if not given), trailing zeros stripped.
pub fn u256_to_rust_dec(amount: U256, decimals: Option<u32>) -> Result<Decimal, ConversionError> {
    let decimals = decimals.unwrap_or(ETHER_DECIMALS);
    if amount > U256::from(i128::MAX as u128) {
        return Err(ConversionError::from(format!(
            "Amount {} too big to convert",
            amount
        )));
    }
    let dec = Decimal::try_from_i128_with_scale(amount.as_u128() as i128, decimals)
        .map_err(|err| ConversionError::from(format!("Cannot convert {}: {}", amount, err)))?;
    Ok(dec.normalize())
}

/// Same as web3 `fromWei(value, 'ether')`.
pub fn wei_to_ether_str(amount: U256) -> Result<String, ConversionError> {
    Ok(u256_to_rust_dec(amount, Some(ETHER_DECIMALS))?.to_string())
}

/// Same as web3 `fromWei(value, 'gwei')`.
pub fn wei_to_gwei_str(amount: U256) -> Result<String, ConversionError> {
    Ok(u256_to_rust_dec(amount, Some(GWEI_DECIMALS))?.to_string())
}

/// Integer columns are signed 64 bit, anything above does not fit.
pub fn u256_to_i64(value: U256) -> Option<i64> {
    if value > U256::from(i64::MAX as u64) {
        None
    } else {
        Some(value.as_u64() as i64)
    }
}

/// Parses a 32 byte hash, with or without the `0x` prefix.
pub fn parse_h256(hash: &str) -> Result<H256, ConversionError> {
    let stripped = hash.trim().trim_start_matches("0x");
    let bytes = hex::decode(stripped)
        .map_err(|err| ConversionError::from(format!("Invalid hash {}: {}", hash, err)))?;
    if bytes.len() != 32 {
        return Err(ConversionError::from(format!(
            "Invalid hash {}: expected 32 bytes, got {}",
            hash,
            bytes.len()
        )));
    }
    Ok(H256::from_slice(&bytes))
}
