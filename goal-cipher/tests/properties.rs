//! Cipher properties checked across many identities and messages.

use goal_cipher::{decode_blob, decrypt, encode_blob, encrypt, CipherError};

fn identities() -> Vec<String> {
    (0..8u8)
        .map(|i| format!("0x{}", hex_address(i)))
        .collect()
}

fn hex_address(seed: u8) -> String {
    std::iter::repeat(format!("{seed:02X}")).take(20).collect()
}

fn messages() -> Vec<String> {
    vec![
        String::new(),
        "a".to_string(),
        "Finish the marathon before October".to_string(),
        "x".repeat(4096),
        "多言語のテキスト".to_string(),
    ]
}

#[test]
fn roundtrip_for_every_identity_and_message() {
    for id in identities() {
        for message in messages() {
            let blob = encrypt(&message, &id).unwrap();
            assert_eq!(decrypt(&blob, &id).unwrap(), message);
        }
    }
}

#[test]
fn cross_identity_always_fails() {
    let ids = identities();
    for (i, a) in ids.iter().enumerate() {
        let blob = encrypt("for a only", a).unwrap();
        for (j, b) in ids.iter().enumerate() {
            if i == j {
                continue;
            }
            assert!(matches!(
                decrypt(&blob, b),
                Err(CipherError::DecryptionFailed(_))
            ));
        }
    }
}

#[test]
fn appended_bytes_fail() {
    let id = &identities()[0];
    let blob = encrypt("exact length matters", id).unwrap();

    let mut extended = decode_blob(&blob).unwrap();
    extended.push(0);
    assert!(decrypt(&encode_blob(&extended), id).is_err());
}
