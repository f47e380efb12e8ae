use crate::error::Base62Error;

/// The 62-symbol alphabet used for generated codes: digits, lowercase, uppercase.
pub const ALPHABET: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

const BASE: u64 = ALPHABET.len() as u64;

/// Encodes a non-negative integer as a base62 string.
///
/// `0` encodes to the first symbol of [`ALPHABET`]. Negative values are rejected.
///
/// # Examples
///
/// ```
/// use linkforge_core::base62;
///
/// assert_eq!(base62::encode(0).unwrap(), "0");
/// assert_eq!(base62::encode(62).unwrap(), "10");
/// assert!(base62::encode(-1).is_err());
/// ```
pub fn encode(value: i64) -> Result<String, Base62Error> {
    let value = u64::try_from(value).map_err(|_| Base62Error::Negative(value))?;
    Ok(encode_unsigned(value))
}

fn encode_unsigned(mut value: u64) -> String {
    if value == 0 {
        return (ALPHABET[0] as char).to_string();
    }

    // u64::MAX needs 11 symbols in base62.
    let mut buf = Vec::with_capacity(11);
    while value > 0 {
        buf.push(ALPHABET[(value % BASE) as usize]);
        value /= BASE;
    }
    buf.reverse();

    // Every byte comes from the ASCII alphabet.
    buf.into_iter().map(char::from).collect()
}

/// Decodes a base62 string produced by [`encode`].
///
/// Rejects empty input, symbols outside [`ALPHABET`], and values above `i64::MAX`.
pub fn decode(input: &str) -> Result<i64, Base62Error> {
    if input.is_empty() {
        return Err(Base62Error::Empty);
    }

    let mut value: i64 = 0;
    for (position, c) in input.chars().enumerate() {
        let digit = symbol_value(c).ok_or(Base62Error::InvalidSymbol { symbol: c, position })?;
        value = value
            .checked_mul(BASE as i64)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| Base62Error::Overflow(input.to_string()))?;
    }
    Ok(value)
}

fn symbol_value(c: char) -> Option<i64> {
    let v = match c {
        '0'..='9' => c as u8 - b'0',
        'a'..='z' => c as u8 - b'a' + 10,
        'A'..='Z' => c as u8 - b'A' + 36,
        _ => return None,
    };
    Some(i64::from(v))
}
