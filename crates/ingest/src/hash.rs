use anyhow::{Context, Result};
use sha1::{Digest, Sha1};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

const CHUNK_SIZE: usize = 8192;

/// Hex SHA-1 of an in-memory buffer
pub fn hash_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

/// Hex SHA-1 of a file's content, read in fixed-size chunks so memory use
/// does not grow with the file.
pub async fn hash_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .await
        .context(format!("Failed to open file for hashing: {:?}", path))?;

    let mut hasher = Sha1::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let read = file
            .read(&mut buffer)
            .await
            .context(format!("Failed to read file for hashing: {:?}", path))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}
