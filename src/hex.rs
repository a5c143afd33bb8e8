use std::fmt::Display;

/// A hexadecimal rendering of binary data, lowercase.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Hex<'a>(pub &'a [u8]);

/// Reasons a string is not valid lowercase or uppercase hex.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum HexError {
    OddLength(usize),
    BadDigit(char),
}

impl Display for HexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HexError::OddLength(n) => write!(f, "hex length {} is not even", n),
            HexError::BadDigit(c) => write!(f, "bad hex digit: {:?}", c),
        }
    }
}

impl std::error::Error for HexError {}

impl<'a> Display for Hex<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn hex_digit(b: u8) -> char {
            char::from(if b <= 9 { b + b'0' } else { b + b'a' - 10 })
        }

        for &b in self.0 {
            write!(f, "{}{}", hex_digit(b >> 4), hex_digit(b & 0b00001111))?;
        }
        Ok(())
    }
}

/// Decodes a hex string back into bytes.
pub fn decode(s: &str) -> Result<Vec<u8>, HexError> {
    fn unhex_digit(h: u8) -> Result<u8, HexError> {
        match h {
            b'0'..=b'9' => Ok(h - b'0'),
            b'a'..=b'f' => Ok(h - b'a' + 10),
            b'A'..=b'F' => Ok(h - b'A' + 10),
            _ => Err(HexError::BadDigit(char::from(h))),
        }
    }

    let bytes = s.as_bytes();
    if bytes.len() % 2 != 0 {
        return Err(HexError::OddLength(bytes.len()));
    }

    bytes
        .chunks(2)
        .map(|pair| Ok(unhex_digit(pair[0])? << 4 | unhex_digit(pair[1])?))
        .collect()
}

#[test]
fn test_hex_round_trip() {
    let example: &[u8] = b"hello, world";
    let encoded = Hex(example).to_string();
    assert_eq!(encoded, "68656c6c6f2c20776f726c64");
    assert_eq!(decode(&encoded).unwrap(), example);
}

#[test]
fn test_hex_rejects_garbage() {
    assert_eq!(decode("abc"), Err(HexError::OddLength(3)));
    assert_eq!(decode("zz"), Err(HexError::BadDigit('z')));
    assert_eq!(decode("ABcd").unwrap(), vec![0xab, 0xcd]);
}
