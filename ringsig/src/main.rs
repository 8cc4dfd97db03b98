use anyhow::{anyhow, Context, Result};
// Library imports
use ringsig::{
    constants::{
        DEFAULT_KEY_FILE, DEFAULT_MESSAGE_FILE, DEFAULT_RSA_BITS, DEFAULT_SIGNATURE_FILE,
        RING_SIZE,
    },
    files::{read_key_file, read_message, read_signature, write_key_file, write_signature},
    parse_signature, recover_payload,
    ring::{ring_sign, ring_verify},
    rsa::{generate_ring_file, key_record_from_pem},
    serialization::serialize_signature,
    Ring, Signature,
};
// Logging
use log::{error, info, warn};
// CLI interaction
use dialoguer::{Confirm, Input, Select};
use std::fs;

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let modes = &[
        "Sign",
        "Verify",
        "Open payload",
        "Generate key file",
        "Import PEM key",
    ];
    let mode_idx = Select::new()
        .with_prompt("Select operation mode")
        .items(modes)
        .default(0)
        .interact()?;

    match mode_idx {
        0 => handle_sign(),
        1 => handle_verify(),
        2 => handle_open(),
        3 => handle_generate(),
        4 => handle_import(),
        _ => unreachable!(),
    }
}

// --- Sign Mode ---
fn handle_sign() -> Result<()> {
    info!("--- Sign Mode ---");

    let key_path: String = Input::<String>::new()
        .with_prompt("Ring key file path")
        .default(DEFAULT_KEY_FILE.to_string())
        .interact_text()?;
    let mut ring = read_key_file(&key_path)
        .with_context(|| format!("Failed to load ring keys from '{}'", key_path))?;

    let detected = ring
        .signer_index()
        .ok_or_else(|| anyhow!("'{}' holds no private key, cannot sign", key_path))?;
    let signer: usize = Input::<usize>::new()
        .with_prompt(format!("Signer position (0-{})", RING_SIZE - 1))
        .default(detected)
        .interact_text()?;
    ring.set_signer_index(signer);
    if ring.signer_index() != Some(signer) {
        warn!(
            "Member {} has no private key, signing as member {} instead",
            signer, detected
        );
    }

    let message_path: String = Input::<String>::new()
        .with_prompt("Message file path")
        .default(DEFAULT_MESSAGE_FILE.to_string())
        .interact_text()?;
    let message = read_message(&message_path)
        .with_context(|| format!("Failed to read message from '{}'", message_path))?;

    info!("Generating ring signature...");
    let signature = ring_sign(&ring, &message).context("Failed to generate ring signature")?;
    let text = serialize_signature(&signature);

    let output_path: String = Input::<String>::new()
        .with_prompt("Signature output path")
        .default(DEFAULT_SIGNATURE_FILE.to_string())
        .interact_text()?;
    write_signature(&output_path, &text)
        .with_context(|| format!("Failed to write signature to '{}'", output_path))?;
    println!("Signature generated and saved to {}", output_path);
    Ok(())
}

// --- Verify Mode ---
fn handle_verify() -> Result<()> {
    info!("--- Verify Mode ---");

    let signature_path: String = Input::<String>::new()
        .with_prompt("Signature file path")
        .default(DEFAULT_SIGNATURE_FILE.to_string())
        .interact_text()?;
    let text = read_signature(&signature_path)
        .with_context(|| format!("Failed to read signature from '{}'", signature_path))?;

    let key_path: String = Input::<String>::new()
        .with_prompt("Ring key file path")
        .default(DEFAULT_KEY_FILE.to_string())
        .interact_text()?;
    // the key file is reloaded fresh for every verification
    let ring = read_key_file(&key_path)
        .with_context(|| format!("Failed to load ring keys from '{}'", key_path))?
        .to_public();

    let valid = ring_verify(&ring, &text).context("Failed to parse signature")?;
    println!("\n--- Verification Result ---");
    if valid {
        println!("The ring signature is Valid.");
    } else {
        println!("The ring signature is Not Valid.");
    }
    println!("--- End of Verification ---");
    Ok(())
}

// --- Open Payload Mode ---
fn handle_open() -> Result<()> {
    info!("--- Open Payload Mode ---");

    let signature_path: String = Input::<String>::new()
        .with_prompt("Signature file path")
        .default(DEFAULT_SIGNATURE_FILE.to_string())
        .interact_text()?;
    let key_path: String = Input::<String>::new()
        .with_prompt("Ring key file path")
        .default(DEFAULT_KEY_FILE.to_string())
        .interact_text()?;
    let (signature, ring) = load_open_inputs(&signature_path, &key_path)?;

    let candidates = recover_payload(&ring, &signature);
    if candidates.is_empty() {
        error!("No ring member's key opens the payload");
        return Err(anyhow!("Payload could not be decrypted"));
    }
    for (position, plaintext) in candidates {
        println!("\n--- Member {} ---", position);
        println!("{}", String::from_utf8_lossy(&plaintext));
    }
    Ok(())
}

// Signature and public ring used by Open payload mode
fn load_open_inputs(signature_path: &str, key_path: &str) -> Result<(Signature, Ring)> {
    let text = read_signature(signature_path)
        .with_context(|| format!("Failed to read signature from '{}'", signature_path))?;
    let signature = parse_signature(&text).context("Failed to parse signature")?;
    let ring = read_key_file(key_path)
        .with_context(|| format!("Failed to load ring keys from '{}'", key_path))?
        .to_public();
    Ok((signature, ring))
}

// --- Generate Key File Mode ---
fn handle_generate() -> Result<()> {
    info!("--- Generate Key File Mode ---");

    let bits: usize = Input::<usize>::new()
        .with_prompt("RSA modulus size in bits")
        .default(DEFAULT_RSA_BITS)
        .interact_text()?;
    let signer: usize = Input::<usize>::new()
        .with_prompt(format!("Position holding the private key (0-{})", RING_SIZE - 1))
        .default(0)
        .interact_text()?;
    let output_path: String = Input::<String>::new()
        .with_prompt("Key file output path")
        .default(DEFAULT_KEY_FILE.to_string())
        .interact_text()?;

    if fs::metadata(&output_path).is_ok()
        && !Confirm::new()
            .with_prompt(format!("'{}' exists. Overwrite?", output_path))
            .default(false)
            .interact()?
    {
        info!("Aborted, nothing written");
        return Ok(());
    }

    info!("Generating {} keypairs of {} bits...", RING_SIZE, bits);
    let contents = generate_ring_file(bits, signer, &mut rand::thread_rng())
        .context("Failed to generate ring keys")?;
    write_key_file(&output_path, &contents)
        .with_context(|| format!("Failed to write key file '{}'", output_path))?;
    println!("Key file written to {}", output_path);
    Ok(())
}

// --- Import PEM Mode ---
fn handle_import() -> Result<()> {
    info!("--- Import PEM Mode ---");

    let public_path: String = Input::<String>::new()
        .with_prompt("PUBLIC key file path (SPKI PEM)")
        .default("keys/member_public.pem".to_string())
        .interact_text()?;
    let public_pem = fs::read_to_string(&public_path)
        .with_context(|| format!("Failed to read '{}'", public_path))?;

    let private_pem = if Confirm::new()
        .with_prompt("Include the matching PRIVATE key (PKCS#8 PEM)?")
        .default(false)
        .interact()?
    {
        let private_path: String = Input::<String>::new()
            .with_prompt("PRIVATE key file path")
            .default("keys/member_private.pem".to_string())
            .interact_text()?;
        Some(
            fs::read_to_string(&private_path)
                .with_context(|| format!("Failed to read '{}'", private_path))?,
        )
    } else {
        None
    };

    let record = key_record_from_pem(&public_pem, private_pem.as_deref())
        .context("Failed to import PEM key")?;
    println!("\n--- Key file line ---");
    println!("{}", record.to_key_line());
    println!("--- End of line ---");
    Ok(())
}
