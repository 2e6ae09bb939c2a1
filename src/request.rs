use reqwest::Client;

use crate::{info_time, Result};

/// Requests a page and returns a `Result<String>` containing the body.
pub(crate) async fn request_text(client: &Client, url: &str) -> Result<String> {
    info_time!("Requesting {url}");
    let res = client.get(url).send().await?.error_for_status()?;
    let text = res.text().await?;
    Ok(text)
}

/// Requests a document and returns its raw bytes.
pub(crate) async fn request_bytes(client: &Client, url: &str) -> Result<Vec<u8>> {
    info_time!("Requesting {url}");
    let res = client.get(url).send().await?.error_for_status()?;
    let bytes = res.bytes().await?;
    Ok(bytes.to_vec())
}
