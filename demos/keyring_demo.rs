//! # Keyring Demo
//!
//! Walks through the keyring: protected key generation, signatures, the AEAD
//! envelope, hybrid seal/open and the file store.
//!
//! ## Run
//!
//! ```bash
//! cargo run --example keyring_demo
//! ```

use keyring_core::crypto::envelope;
use keyring_core::{
    AlgorithmParams, Armor, CryptoProvider, DirectoryLocator, EnvelopeCodec, FileKeyStore,
    FingerprintAlgorithm, Framing, KeyMaterialReader, KeyMaterialWriter, KeyParameters,
};

const PASSPHRASE: &str = "correct horse battery staple";
const SALT: &str = "demo-salt";

fn main() {
    println!("=== Keyring Core Demo (v{}) ===\n", keyring_core::version());

    // Step 1: Generate an EC keypair
    println!("Step 1: Generating an EC (prime256v1) keypair...");
    let keys = KeyParameters::generate(PASSPHRASE, SALT, None).expect("Failed to generate keys");
    println!("  Algorithm: {}", keys.algorithm());
    println!(
        "  Fingerprint (SHA-256): {}",
        keys.fingerprint(FingerprintAlgorithm::Sha256).expect("fingerprint")
    );
    println!(
        "  Fingerprint (MD5):     {}",
        keys.fingerprint(FingerprintAlgorithm::Md5).expect("fingerprint")
    );
    println!(
        "  Private key at rest: {}...",
        &keys.private_key_at_rest()[..32]
    );
    println!();

    // Step 2: Sign and verify
    println!("Step 2: Signing a message...");
    let provider = CryptoProvider::new(&keys);
    let message = b"Signed by the keyring demo";
    let signature = provider
        .sign(message, PASSPHRASE, SALT)
        .expect("Failed to sign");
    println!("  Signature (base64): {}", signature);
    println!("  Valid: {}", provider.verify(message, &signature));
    println!("  Valid for tampered message: {}", provider.verify(b"tampered", &signature));
    println!();

    // Step 3: EC keys cannot encrypt directly
    println!("Step 3: Asking an EC key to encrypt...");
    match provider.encrypt(b"secret") {
        Ok(_) => println!("  [FAILED] EC key encrypted directly!"),
        Err(e) => println!("  [OK] Rejected: {}", e),
    }
    println!();

    // Step 4: Symmetric envelope in both framings
    println!("Step 4: AES-256-GCM envelopes...");
    let codec = EnvelopeCodec::default();
    let key = envelope::generate_key();
    let iv = codec.generate_iv().expect("iv");
    for framing in [Framing::Current, Framing::Legacy] {
        let armored = codec
            .encrypt(key.as_slice(), &iv, b"envelope payload", framing)
            .expect("Failed to encrypt");
        let plaintext = codec
            .decrypt(key.as_slice(), &armored, framing)
            .expect("Failed to decrypt");
        println!(
            "  {:?}: {} -> \"{}\"",
            framing,
            armored,
            String::from_utf8_lossy(&plaintext)
        );
    }
    println!();

    // Step 5: Hybrid seal/open with an RSA recipient
    println!("Step 5: Sealing bulk data to an RSA-2048 recipient...");
    let recipient = KeyParameters::generate(PASSPHRASE, SALT, Some(AlgorithmParams::rsa(2048)))
        .expect("Failed to generate RSA keys");
    let sealed = keyring_core::crypto::seal(b"a large document", &recipient, Armor::Base64)
        .expect("Failed to seal");
    println!("  Transport key: {} bytes (base64)", sealed.transport_key.len());
    println!("  Payload: {} bytes (base64)", sealed.payload.len());
    let opened = keyring_core::crypto::open(
        &sealed.payload,
        &sealed.transport_key,
        &recipient,
        PASSPHRASE,
        SALT,
    )
    .expect("Failed to open");
    println!("  Opened: \"{}\"", String::from_utf8_lossy(&opened));
    println!();

    // Step 6: Persist and reload
    println!("Step 6: Writing key material to a temporary directory...");
    let dir = std::env::temp_dir().join(format!("keyring-demo-{}", std::process::id()));
    let store = FileKeyStore::new(DirectoryLocator::new(&dir, "demo-"));
    store
        .write(keys.material(), PASSPHRASE, SALT)
        .expect("Failed to write keys");
    let reloaded = KeyParameters::from_material(store.read().expect("Failed to read keys"));
    println!("  Directory: {}", dir.display());
    println!(
        "  Reloaded key signs: {}",
        CryptoProvider::new(&reloaded)
            .sign(message, PASSPHRASE, SALT)
            .is_ok()
    );
    let _ = std::fs::remove_dir_all(&dir);

    println!("\n=== Demo Complete ===");
}
