//! Golden test vector validation

use serde::Deserialize;
use transitbox::{Mode, TransitCipher};

#[derive(Debug, Deserialize)]
struct GoldenVector {
    mode: String,
    plaintext: String,
    password: String,
    envelope: String,
    comment: String,
}

fn load_golden_vectors() -> Vec<GoldenVector> {
    let json_data = include_str!("../testdata/golden-vectors.json");
    serde_json::from_str(json_data).expect("failed to parse golden vectors")
}

#[test]
fn test_golden_vectors() {
    let vectors = load_golden_vectors();
    let cipher = TransitCipher::default();

    println!("Testing {} golden vectors", vectors.len());

    let mut failed = 0;
    for (i, vector) in vectors.iter().enumerate() {
        match cipher.try_decrypt(&vector.envelope, &vector.password) {
            Ok(plaintext) if plaintext == vector.plaintext => {}
            Ok(plaintext) => {
                eprintln!("Vector {}: FAILED - plaintext mismatch", i);
                eprintln!("  Comment: {}", vector.comment);
                eprintln!("  Expected: {:?}", vector.plaintext);
                eprintln!("  Actual:   {:?}", plaintext);
                failed += 1;
                continue;
            }
            Err(e) => {
                eprintln!("Vector {}: FAILED to decrypt - {}", i, e);
                eprintln!("  Comment: {}", vector.comment);
                failed += 1;
                continue;
            }
        }

        if vector.mode == "deterministic" {
            let envelope = cipher
                .encrypt(&vector.plaintext, &vector.password, Mode::Deterministic)
                .expect("deterministic encryption failed");
            if envelope != vector.envelope {
                eprintln!("Vector {}: FAILED - envelope mismatch", i);
                eprintln!("  Comment: {}", vector.comment);
                eprintln!("  Expected: {}", vector.envelope);
                eprintln!("  Actual:   {}", envelope);
                failed += 1;
            }
        }
    }

    assert_eq!(failed, 0, "Some golden vectors failed validation");
}

#[test]
fn test_vectors_cover_escaped_slash() {
    let vectors = load_golden_vectors();
    assert!(vectors.iter().any(|v| v.envelope.contains("@xZ")));
    assert!(vectors.iter().all(|v| !v.envelope.contains('/')));
}

#[test]
fn test_golden_vectors_reject_wrong_password() {
    for vector in load_golden_vectors() {
        let wrong = format!("{}x", vector.password);
        let err = transitbox::try_decrypt(&vector.envelope, &wrong)
            .expect_err(&vector.comment);
        assert_eq!(err.kind, Some(transitbox::ErrorKind::DecryptionFailed));
        assert_eq!(transitbox::decrypt(&vector.envelope, &wrong), "");
    }
}

#[test]
fn test_random_mode_roundtrips_golden_plaintexts() {
    for vector in load_golden_vectors() {
        let envelope = transitbox::encrypt(&vector.plaintext, &vector.password, true).unwrap();
        assert_ne!(envelope, vector.envelope);
        assert_eq!(
            transitbox::decrypt(&envelope, &vector.password),
            vector.plaintext
        );
    }
}
