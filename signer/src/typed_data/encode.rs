//! `encodeData`, `hashStruct` and the final EIP-712 digest.
//!
//! Every member encodes to exactly one 32-byte word. Dynamic values
//! (`string`, `bytes`, arrays, nested structs) are hashed into that word;
//! atomic values are padded into it.

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::One;
use serde_json::Value;

use super::schema::hash_type;
use super::{domain_schema, TypeSchema, TypedDataError, DOMAIN_TYPE};
use crate::crypto::curve::to_be_bytes_32;
use crate::crypto::hash::{keccak256, keccak256_multi};

type Word = [u8; 32];

/// What a declared member type means to the encoder.
#[derive(Debug, PartialEq, Eq)]
enum MemberKind<'a> {
    Array(&'a str),
    String,
    DynamicBytes,
    FixedBytes(usize),
    Address,
    Uint,
    Int,
    Bool,
    Struct,
    Unknown,
}

/// `uint`/`uint8`..`uint256`, `bytes1`..`bytes32`: the numeric suffix, if any.
fn width_suffix<'a>(kind: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = kind.strip_prefix(prefix)?;
    if rest.chars().all(|c| c.is_ascii_digit()) {
        Some(rest)
    } else {
        None
    }
}

fn classify<'a>(kind: &'a str, schema: &TypeSchema) -> MemberKind<'a> {
    // Arrays first, so `uint256[]` is never mistaken for a uint.
    if kind.ends_with(']') {
        if let Some(idx) = kind.rfind('[') {
            return MemberKind::Array(&kind[..idx]);
        }
    }
    match kind {
        "string" => return MemberKind::String,
        "bytes" => return MemberKind::DynamicBytes,
        "address" => return MemberKind::Address,
        "bool" => return MemberKind::Bool,
        _ => {}
    }
    if let Some(size) = width_suffix(kind, "bytes").and_then(|s| s.parse::<usize>().ok()) {
        if (1..=32).contains(&size) {
            return MemberKind::FixedBytes(size);
        }
    }
    if width_suffix(kind, "uint").is_some() {
        return MemberKind::Uint;
    }
    if width_suffix(kind, "int").is_some() {
        return MemberKind::Int;
    }
    if schema.contains_key(kind) {
        return MemberKind::Struct;
    }
    MemberKind::Unknown
}

/// Text of a JSON value the way the device firmware stringifies it.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}

/// Truthiness: empty, zero and null are false.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn decode_hex(kind: &str, value: &Value, digits: &str) -> Result<Vec<u8>, TypedDataError> {
    hex::decode(digits).map_err(|e| TypedDataError::malformed(kind, value, e.to_string()))
}

fn encode_dynamic_bytes(value: &Value) -> Result<Word, TypedDataError> {
    match value {
        Value::String(s) => match s.strip_prefix("0x") {
            Some(digits) => Ok(keccak256(&decode_hex("bytes", value, digits)?)),
            None => Ok(keccak256(s.as_bytes())),
        },
        Value::Array(items) => {
            let bytes = items
                .iter()
                .map(|item| {
                    item.as_u64()
                        .and_then(|b| u8::try_from(b).ok())
                        .ok_or_else(|| TypedDataError::malformed("bytes", value, "expected byte values"))
                })
                .collect::<Result<Vec<u8>, _>>()?;
            Ok(keccak256(&bytes))
        }
        _ => Err(TypedDataError::malformed("bytes", value, "expected a string or byte array")),
    }
}

fn encode_fixed_bytes(kind: &str, size: usize, value: &Value) -> Result<Word, TypedDataError> {
    let mut word = [0u8; 32];
    match value.as_str().and_then(|s| s.strip_prefix("0x")) {
        Some(digits) if !digits.is_ascii() => {
            return Err(TypedDataError::malformed(kind, value, "not hex"));
        }
        Some(digits) => {
            // Left-pad to the declared width, then keep the first `size` bytes.
            let width = size * 2;
            let padded = format!("{digits:0>width$}");
            let bytes = decode_hex(kind, value, &padded[..width])?;
            word[..bytes.len()].copy_from_slice(&bytes);
        }
        None => {
            let text = value_text(value);
            let bytes = text.as_bytes();
            let len = bytes.len().min(32);
            word[..len].copy_from_slice(&bytes[..len]);
        }
    }
    Ok(word)
}

fn encode_address(value: &Value) -> Result<Word, TypedDataError> {
    let Some(text) = value.as_str() else {
        return Ok([0u8; 32]);
    };
    let digits = text.strip_prefix("0x").unwrap_or(text).to_ascii_lowercase();
    if digits.len() > 40 {
        return Err(TypedDataError::malformed("address", value, "longer than 20 bytes"));
    }
    let padded = format!("{digits:0>40}");
    let bytes = decode_hex("address", value, &padded)?;
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(&bytes);
    Ok(word)
}

/// Parse a JSON integer: decimal or `0x` hex string, number, or bool.
fn parse_integer(kind: &str, value: &Value) -> Result<BigInt, TypedDataError> {
    let bad = |reason: &str| TypedDataError::malformed(kind, value, reason);
    match value {
        Value::String(s) => {
            let s = s.trim();
            let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some(digits) => BigInt::parse_bytes(digits.as_bytes(), 16),
                None => BigInt::parse_bytes(s.as_bytes(), 10),
            };
            parsed.ok_or_else(|| bad("not a decimal or 0x-hex integer"))
        }
        Value::Number(n) => {
            // Numbers keep their source text, so wei amounts past u64 stay exact.
            if let Some(parsed) = BigInt::parse_bytes(n.to_string().as_bytes(), 10) {
                return Ok(parsed);
            }
            match n.as_f64() {
                Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 => {
                    Ok(BigInt::from(f as i64))
                }
                _ => Err(bad("not an integer")),
            }
        }
        Value::Bool(b) => Ok(BigInt::from(u8::from(*b))),
        _ => Err(bad("expected an integer")),
    }
}

fn two_pow_256() -> BigUint {
    BigUint::one() << 256u32
}

fn encode_uint(kind: &str, value: &Value) -> Result<Word, TypedDataError> {
    let n = parse_integer(kind, value)?;
    let magnitude = match n.to_biguint() {
        Some(m) => m,
        None => return Err(TypedDataError::malformed(kind, value, "negative unsigned integer")),
    };
    if magnitude.bits() > 256 {
        return Err(TypedDataError::malformed(kind, value, "wider than 256 bits"));
    }
    Ok(to_be_bytes_32(&magnitude))
}

fn encode_int(kind: &str, value: &Value) -> Result<Word, TypedDataError> {
    let n = parse_integer(kind, value)?;
    let unsigned = if n.sign() == Sign::Minus {
        // Two's complement: 2^256 + n.
        let modulus = BigInt::from(two_pow_256());
        (modulus + n).to_biguint()
    } else {
        n.to_biguint()
    };
    match unsigned {
        Some(u) if u.bits() <= 256 => Ok(to_be_bytes_32(&u)),
        _ => Err(TypedDataError::malformed(kind, value, "outside the 256-bit range")),
    }
}

fn encode_bool(value: &Value) -> Word {
    let mut word = [0u8; 32];
    word[31] = u8::from(truthy(value));
    word
}

fn encode_array(element: &str, value: &Value, schema: &TypeSchema) -> Result<Word, TypedDataError> {
    let single;
    let items: &[Value] = match value {
        Value::Array(items) => items.as_slice(),
        other => {
            single = [other.clone()];
            &single
        }
    };

    let mut encoded = Vec::with_capacity(items.len() * 32);
    for item in items {
        let word = if schema.contains_key(element) {
            hash_struct(element, item, schema)?
        } else {
            encode_value(element, item, schema)?
        };
        encoded.extend_from_slice(&word);
    }
    Ok(keccak256(&encoded))
}

/// Encode one member value into its 32-byte word.
///
/// Type names that are neither atomic, dynamic, arrays nor in `schema`
/// hash the value's text, as `string` would.
pub fn encode_value(kind: &str, value: &Value, schema: &TypeSchema) -> Result<Word, TypedDataError> {
    match classify(kind, schema) {
        MemberKind::Array(element) => encode_array(element, value, schema),
        MemberKind::String | MemberKind::Unknown => Ok(keccak256(value_text(value).as_bytes())),
        MemberKind::DynamicBytes => encode_dynamic_bytes(value),
        MemberKind::FixedBytes(size) => encode_fixed_bytes(kind, size, value),
        MemberKind::Address => encode_address(value),
        MemberKind::Uint => encode_uint(kind, value),
        MemberKind::Int => encode_int(kind, value),
        MemberKind::Bool => Ok(encode_bool(value)),
        MemberKind::Struct => hash_struct(kind, value, schema),
    }
}

/// `keccak256(typeHash ‖ encodeData(data))`.
///
/// Fields are taken in schema order. A field missing from `data`, or a
/// `data` that is not an object at all, encodes as a zero word.
pub fn hash_struct(primary: &str, data: &Value, schema: &TypeSchema) -> Result<Word, TypedDataError> {
    let type_hash = hash_type(primary, schema);
    let fields = schema.get(primary).map(Vec::as_slice).unwrap_or(&[]);

    let mut words: Vec<Word> = Vec::with_capacity(fields.len() + 1);
    words.push(type_hash);
    for field in fields {
        let word = match data.get(&field.name) {
            Some(member) => encode_value(&field.kind, member, schema)?,
            None => [0u8; 32],
        };
        words.push(word);
    }

    let parts: Vec<&[u8]> = words.iter().map(|w| w.as_slice()).collect();
    Ok(keccak256_multi(&parts))
}

/// `hashStruct(EIP712Domain, domain)` under the fixed domain schema.
pub fn domain_separator(domain: &Value) -> Result<Word, TypedDataError> {
    hash_struct(DOMAIN_TYPE, domain, &domain_schema())
}

/// The EIP-712 signing digest:
/// `keccak256(0x19 0x01 ‖ domainSeparator ‖ hashStruct(primary, message))`.
pub fn encode_typed_data(
    domain: &Value,
    schema: &TypeSchema,
    primary: &str,
    message: &Value,
) -> Result<Word, TypedDataError> {
    let domain_hash = domain_separator(domain)?;
    let message_hash = hash_struct(primary, message, schema)?;
    Ok(keccak256_multi(&[&[0x19u8, 0x01], &domain_hash, &message_hash]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typed_data::fixtures::{mail_domain, mail_message, mail_schema};
    use crate::typed_data::TypedField;
    use serde_json::json;

    fn empty() -> TypeSchema {
        TypeSchema::new()
    }

    fn word_hex(word: Word) -> String {
        hex::encode(word)
    }

    #[test]
    fn test_mail_struct_hash() {
        let hash = hash_struct("Mail", &mail_message(), &mail_schema()).unwrap();
        assert_eq!(
            word_hex(hash),
            "c52c0ee5d84264471806290a3f2c4cecfc5490626bf912d01f240d7a274b371e"
        );
    }

    #[test]
    fn test_mail_domain_separator() {
        assert_eq!(
            word_hex(domain_separator(&mail_domain()).unwrap()),
            "f2cee375fa42b42143804025fc449deafd50cc031ca257e0b194a650a912090f"
        );
    }

    #[test]
    fn test_mail_digest() {
        let digest =
            encode_typed_data(&mail_domain(), &mail_schema(), "Mail", &mail_message()).unwrap();
        assert_eq!(
            word_hex(digest),
            "be609aee343fb3c4b28e1df9e632fca64fcfaede20f02e86244efddf30957bd2"
        );
    }

    #[test]
    fn test_string_hashes_utf8() {
        let word = encode_value("string", &json!("Hello, Bob!"), &empty()).unwrap();
        assert_eq!(word, keccak256(b"Hello, Bob!"));
    }

    #[test]
    fn test_string_of_non_string_uses_text() {
        let word = encode_value("string", &json!(42), &empty()).unwrap();
        assert_eq!(word, keccak256(b"42"));
    }

    #[test]
    fn test_dynamic_bytes_hex_and_raw() {
        assert_eq!(
            encode_value("bytes", &json!("0xdeadbeef"), &empty()).unwrap(),
            keccak256(&[0xde, 0xad, 0xbe, 0xef])
        );
        assert_eq!(
            encode_value("bytes", &json!("plain"), &empty()).unwrap(),
            keccak256(b"plain")
        );
        assert_eq!(
            encode_value("bytes", &json!([1, 2, 3]), &empty()).unwrap(),
            keccak256(&[1, 2, 3])
        );
        assert!(encode_value("bytes", &json!("0xnothex"), &empty()).is_err());
    }

    #[test]
    fn test_fixed_bytes_right_padded() {
        let word = encode_value("bytes4", &json!("0xdeadbeef"), &empty()).unwrap();
        assert_eq!(&word[..4], &[0xde, 0xad, 0xbe, 0xef]);
        assert!(word[4..].iter().all(|b| *b == 0));

        // Short hex is left-padded to the declared width first.
        let word = encode_value("bytes2", &json!("0xab"), &empty()).unwrap();
        assert_eq!(&word[..2], &[0x00, 0xab]);

        // Over-long hex keeps the leading digits.
        let word = encode_value("bytes1", &json!("0xabcd"), &empty()).unwrap();
        assert_eq!(word[0], 0xab);
        assert_eq!(word[1], 0);
    }

    #[test]
    fn test_fixed_bytes_from_text() {
        let word = encode_value("bytes32", &json!("hi"), &empty()).unwrap();
        assert_eq!(&word[..2], b"hi");
        assert!(word[2..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_address_left_padded_and_lowercased() {
        let word = encode_value(
            "address",
            &json!("0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"),
            &empty(),
        )
        .unwrap();
        assert!(word[..12].iter().all(|b| *b == 0));
        assert_eq!(
            hex::encode(&word[12..]),
            "cd2a3d9f938e13cd947ec05abc7fe734df8dd826"
        );

        let short = encode_value("address", &json!("0x1"), &empty()).unwrap();
        assert_eq!(short[31], 1);
        assert!(short[..31].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_address_edge_cases() {
        assert_eq!(encode_value("address", &json!(null), &empty()).unwrap(), [0u8; 32]);
        assert!(encode_value("address", &json!(format!("0x{}", "1".repeat(42))), &empty()).is_err());
        assert!(encode_value("address", &json!("0xzz"), &empty()).is_err());
    }

    #[test]
    fn test_uint_forms_agree() {
        let schema = empty();
        let from_number = encode_value("uint256", &json!(255), &schema).unwrap();
        let from_decimal = encode_value("uint256", &json!("255"), &schema).unwrap();
        let from_hex = encode_value("uint256", &json!("0xff"), &schema).unwrap();
        assert_eq!(from_number, from_decimal);
        assert_eq!(from_number, from_hex);
        assert_eq!(from_number[31], 0xff);
        assert_eq!(encode_value("uint8", &json!(true), &schema).unwrap()[31], 1);
    }

    #[test]
    fn test_uint_rejects_negative_and_oversized() {
        let schema = empty();
        assert!(encode_value("uint256", &json!(-1), &schema).is_err());
        let too_big = format!("0x1{}", "0".repeat(64));
        assert!(encode_value("uint256", &json!(too_big), &schema).is_err());
        assert!(encode_value("uint256", &json!("twelve"), &schema).is_err());
        assert!(encode_value("uint256", &json!(null), &schema).is_err());
    }

    #[test]
    fn test_uint_number_wider_than_u64() {
        // 100 ETH in wei, as the host sends it: a bare JSON number.
        let wei: Value = serde_json::from_str("100000000000000000000").unwrap();
        let word = encode_value("uint256", &wei, &empty()).unwrap();
        assert_eq!(hex::encode(&word[23..]), "056bc75e2d63100000");
        assert!(word[..23].iter().all(|b| *b == 0));
        assert_eq!(word, encode_value("uint256", &json!("100000000000000000000"), &empty()).unwrap());
    }

    #[test]
    fn test_int_number_below_i64() {
        let debt: Value = serde_json::from_str("-100000000000000000000").unwrap();
        let word = encode_value("int256", &debt, &empty()).unwrap();
        assert_eq!(
            word_hex(word),
            "fffffffffffffffffffffffffffffffffffffffffffffffa9438a1d29cf00000"
        );
    }

    #[test]
    fn test_fractional_number_rejected() {
        let half: Value = serde_json::from_str("1.5").unwrap();
        assert!(encode_value("uint256", &half, &empty()).is_err());
        let whole: Value = serde_json::from_str("1000.0").unwrap();
        assert_eq!(encode_value("uint256", &whole, &empty()).unwrap()[30..], [0x03, 0xe8]);
    }

    #[test]
    fn test_negative_int_twos_complement() {
        let word = encode_value("int256", &json!(-1), &empty()).unwrap();
        assert_eq!(word, [0xff; 32]);

        let word = encode_value("int8", &json!("-2"), &empty()).unwrap();
        assert!(word[..31].iter().all(|b| *b == 0xff));
        assert_eq!(word[31], 0xfe);
    }

    #[test]
    fn test_bool_truthiness() {
        let schema = empty();
        assert_eq!(encode_value("bool", &json!(true), &schema).unwrap()[31], 1);
        assert_eq!(encode_value("bool", &json!(false), &schema).unwrap()[31], 0);
        assert_eq!(encode_value("bool", &json!(0), &schema).unwrap()[31], 0);
        assert_eq!(encode_value("bool", &json!("yes"), &schema).unwrap()[31], 1);
        assert_eq!(encode_value("bool", &json!(""), &schema).unwrap()[31], 0);
    }

    #[test]
    fn test_array_of_atoms() {
        let schema = empty();
        let word = encode_value("uint256[]", &json!([1, 2]), &schema).unwrap();
        let mut expected = Vec::new();
        expected.extend_from_slice(&encode_value("uint256", &json!(1), &schema).unwrap());
        expected.extend_from_slice(&encode_value("uint256", &json!(2), &schema).unwrap());
        assert_eq!(word, keccak256(&expected));
    }

    #[test]
    fn test_array_wraps_scalar() {
        let schema = empty();
        assert_eq!(
            encode_value("uint256[]", &json!(7), &schema).unwrap(),
            encode_value("uint256[]", &json!([7]), &schema).unwrap()
        );
    }

    #[test]
    fn test_array_of_structs_uses_struct_hash() {
        let schema = mail_schema();
        let people = json!([
            {"name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"},
            {"name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB"}
        ]);
        let word = encode_value("Person[]", &people, &schema).unwrap();
        let mut expected = Vec::new();
        for person in people.as_array().unwrap() {
            expected.extend_from_slice(&hash_struct("Person", person, &schema).unwrap());
        }
        assert_eq!(word, keccak256(&expected));
    }

    #[test]
    fn test_missing_field_is_zero_word() {
        let mut schema = TypeSchema::new();
        schema.insert(
            "Pair".into(),
            vec![TypedField::new("a", "uint256"), TypedField::new("b", "uint256")],
        );
        let partial = hash_struct("Pair", &json!({"a": 5}), &schema).unwrap();
        let explicit = hash_struct("Pair", &json!({"a": 5, "b": 0}), &schema).unwrap();
        assert_eq!(partial, explicit);
    }

    #[test]
    fn test_unknown_type_hashes_text() {
        assert_eq!(
            encode_value("Mystery", &json!("abc"), &empty()).unwrap(),
            keccak256(b"abc")
        );
    }

    #[test]
    fn test_classify_is_exact() {
        let schema = empty();
        assert_eq!(classify("uint256[]", &schema), MemberKind::Array("uint256"));
        assert_eq!(classify("bytes32", &schema), MemberKind::FixedBytes(32));
        assert_eq!(classify("bytes33", &schema), MemberKind::Unknown);
        assert_eq!(classify("integer", &schema), MemberKind::Unknown);
        assert_eq!(classify("int", &schema), MemberKind::Int);
    }

    #[test]
    fn test_malformed_error_mentions_type() {
        let err = encode_value("uint256", &json!("nope"), &empty()).unwrap_err();
        assert!(err.to_string().contains("uint256"));
    }
}
