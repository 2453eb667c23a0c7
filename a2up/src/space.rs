//! One-shot free space query (`--space-available`).

use remote::RemoteFs;

const BYTES_PER_MEGABYTE: f64 = 1_048_576.0;

/// Bytes as binary megabytes with two decimals, e.g. `4768.37 MB`.
#[must_use]
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / BYTES_PER_MEGABYTE)
}

/// Query the space available in `dest_dir` and render the report line.
pub async fn report<R: RemoteFs>(session: &mut R, dest_dir: &str) -> remote::Result<String> {
    let bytes = session.available_space(dest_dir).await?;
    tracing::debug!("{} bytes available in {:?}", bytes, dest_dir);
    Ok(format!(
        "Available space in {}: {}",
        dest_dir,
        format_megabytes(bytes)
    ))
}
