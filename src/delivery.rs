//! Optional FTP delivery of the produced feed file.
//!
//! Delivery is a best-effort side channel: with no endpoint configured the
//! upload is skipped silently, and any transport failure is logged and
//! swallowed so the already-written local file stays the source of truth.

use crate::config::DeliveryConfig;
use std::error::Error;
use std::path::Path;
use suppaftp::FtpStream;
use suppaftp::types::FileType;
use tracing::{info, warn};

/// Push `path` to the configured FTP endpoint, if any.
pub async fn upload(path: &Path, config: Option<&DeliveryConfig>) {
    let Some(config) = config else {
        info!("no delivery endpoint configured; skipping upload");
        return;
    };
    let path = path.to_path_buf();
    let config = config.clone();
    // suppaftp's plain client is blocking; keep it off the async workers
    let result = tokio::task::spawn_blocking(move || push_file(&path, &config)).await;
    if let Err(e) = result {
        warn!(error = %e, "delivery task failed to run; local feed file is unaffected");
    }
}

fn push_file(path: &Path, config: &DeliveryConfig) {
    match try_push(path, config) {
        Ok(()) => info!(
            host = %config.host,
            remote_path = %config.remote_path,
            "uploaded feed file"
        ),
        Err(e) => warn!(
            host = %config.host,
            error = %e,
            "upload failed; local feed file is unaffected"
        ),
    }
}

fn try_push(path: &Path, config: &DeliveryConfig) -> Result<(), Box<dyn Error>> {
    let mut ftp = FtpStream::connect((config.host.as_str(), 21))?;
    ftp.login(&config.username, &config.password)?;
    ftp.transfer_type(FileType::Binary)?;
    let mut file = std::fs::File::open(path)?;
    ftp.put_file(&config.remote_path, &mut file)?;
    ftp.quit()?;
    Ok(())
}
