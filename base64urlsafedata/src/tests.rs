#![allow(clippy::unwrap_used)]

use super::*;

#[test]
fn test_try_from() {
    assert!(Base64UrlSafeData::try_from("aGVsbG8=").is_ok());
    assert!(Base64UrlSafeData::try_from("aGVsbG8").is_ok());
    assert!(Base64UrlSafeData::try_from("a").is_err());
}

#[test]
fn test_alphabets_agree() {
    // 0xfb 0xff encodes to "-_8" in the url safe alphabet, "+/8" in standard.
    let url = Base64UrlSafeData::try_from("-_8").unwrap();
    let std = Base64UrlSafeData::try_from("+/8=").unwrap();
    assert_eq!(url, std);
    assert_eq!(url.0, vec![0xfb, 0xff]);
    assert_eq!(url.to_string(), "-_8");
    assert_eq!(url.len(), 2);
}

macro_rules! from_json_test {
    ($($name:ident: $value:expr,)*) => {
        $(
            #[test]
            fn $name() {
                let (input, expected): (&str, &[u8]) = $value;
                let data = serde_json::from_str::<Base64UrlSafeData>(input).unwrap();
                assert_eq!(data.as_ref(), expected);
            }
        )*
    };
}

macro_rules! from_cbor_test {
    ($($name:ident: $value:expr,)*) => {
        $(
            #[test]
            fn $name() {
                let (input, expected): (&[u8], &[u8]) = $value;
                let data = serde_cbor_2::from_slice::<Base64UrlSafeData>(input).unwrap();
                assert_eq!(data.as_ref(), expected);
            }
        )*
    };
}

from_json_test! {
    from_json_as_array_number: ("[0,1,2,255]", &[0x00, 0x01, 0x02, 0xFF]),
    from_json_b64_urlsafe_nonpadded: ("\"AAEC_w\"", &[0x00, 0x01, 0x02, 0xFF]),
    from_json_b64_urlsafe_padded: ("\"AAEC_w==\"", &[0x00, 0x01, 0x02, 0xFF]),
    from_json_b64_standard_nonpadded: ("\"AAEC/w\"", &[0x00, 0x01, 0x02, 0xFF]),
    from_json_b64_standard_padded: ("\"AAEC/w==\"", &[0x00, 0x01, 0x02, 0xFF]),
}

from_cbor_test! {
    from_cbor_bytes: (&[
        0x44, // bytes(4)
        0x00, 0x01, 0x02, 0xFF,
    ], &[0x00, 0x01, 0x02, 0xFF]),
    from_cbor_array: (&[
        0x84, // array(4)
        0x00,
        0x01,
        0x02,
        0x18, 0xff,
    ], &[0x00, 0x01, 0x02, 0xFF]),
    from_cbor_string_b64_urlsafe_nonpadded: (&[
        0x66, // text(6)
        0x41, 0x41, 0x45, 0x43, 0x5F, 0x77, // "AAEC_w"
    ], &[0x00, 0x01, 0x02, 0xFF]),
}

#[test]
fn serializes_as_unpadded_urlsafe() {
    let data = Base64UrlSafeData::from(vec![0x00, 0x01, 0x02, 0xFF]);
    assert_eq!(serde_json::to_string(&data).unwrap(), "\"AAEC_w\"");
}
