use bytes::Bytes;
use serde::Serialize;

pub const DONE: &str = "data: [DONE]\n\n";

/// Frame `value` as one `data:` event.
pub fn frame<T: Serialize>(value: &T) -> Result<Bytes, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    Ok(Bytes::from(format!("data: {json}\n\n")))
}
