//! Container - 1 artifact を 1 ファイルに収めるディスク上の形式
//!
//! # レイアウト
//!
//! ```text
//! b"STSH" | version: u8 | header_len: u32 LE | header (JSON) | primary | positive | negative
//! ```
//!
//! JSON ヘッダには artifact のメタ情報と各成分のバイト長が入ります。
//! 復元時は長さの合計がファイルの残りと一致しなければならず、
//! 途中で切れたファイルや余分なバイトのあるファイルは `Codec` エラーになります。

use serde::{Deserialize, Serialize};

use crate::domain::{Artifact, ArtifactMeta, Blob, StoreError, TensorTriplet, COMPONENT_COUNT};

pub const MAGIC: &[u8; 4] = b"STSH";
pub const VERSION: u8 = 1;

const PREAMBLE_LEN: usize = MAGIC.len() + 1 + 4;

#[derive(Debug, Serialize, Deserialize)]
struct ContainerHeader {
    meta: ArtifactMeta,
    lengths: [u64; COMPONENT_COUNT],
}

pub fn encode(artifact: &Artifact) -> Result<Vec<u8>, StoreError> {
    let components = artifact.payload.components();
    let header = ContainerHeader {
        meta: artifact.meta.clone(),
        lengths: components.map(|b| b.len() as u64),
    };
    let header_bytes = serde_json::to_vec(&header)
        .map_err(|e| StoreError::Codec(format!("header encode: {e}")))?;
    let header_len = u32::try_from(header_bytes.len())
        .map_err(|_| StoreError::Codec("header too large".to_string()))?;

    let mut out =
        Vec::with_capacity(PREAMBLE_LEN + header_bytes.len() + artifact.payload.total_bytes());
    out.extend_from_slice(MAGIC);
    out.push(VERSION);
    out.extend_from_slice(&header_len.to_le_bytes());
    out.extend_from_slice(&header_bytes);
    for blob in components {
        out.extend_from_slice(blob.as_bytes());
    }
    Ok(out)
}

pub fn decode(bytes: &[u8]) -> Result<Artifact, StoreError> {
    if bytes.len() < PREAMBLE_LEN {
        return Err(StoreError::Codec(format!(
            "container too short ({} bytes)",
            bytes.len()
        )));
    }
    let (magic, rest) = bytes.split_at(MAGIC.len());
    if magic != MAGIC {
        return Err(StoreError::Codec("bad magic".to_string()));
    }
    let (version, rest) = rest.split_at(1);
    if version[0] != VERSION {
        return Err(StoreError::Codec(format!(
            "unsupported container version {}",
            version[0]
        )));
    }
    let (len_bytes, rest) = rest.split_at(4);
    let header_len = u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]])
        as usize;
    if rest.len() < header_len {
        return Err(StoreError::Codec("truncated header".to_string()));
    }
    let (header_bytes, mut body) = rest.split_at(header_len);
    let header: ContainerHeader = serde_json::from_slice(header_bytes)
        .map_err(|e| StoreError::Codec(format!("header decode: {e}")))?;

    let declared = header
        .lengths
        .iter()
        .try_fold(0u64, |acc, &n| acc.checked_add(n))
        .ok_or_else(|| StoreError::Codec(format!("component lengths overflow: {:?}", header.lengths)))?;
    if declared != body.len() as u64 {
        return Err(StoreError::Codec(format!(
            "component lengths cover {declared} bytes, body has {}",
            body.len()
        )));
    }

    let mut blobs: Vec<Blob> = Vec::with_capacity(COMPONENT_COUNT);
    for len in header.lengths {
        let (chunk, tail) = usize::try_from(len)
            .ok()
            .and_then(|len| body.split_at_checked(len))
            .ok_or_else(|| StoreError::Codec(format!("component length {len} exceeds body")))?;
        blobs.push(Blob::from(chunk));
        body = tail;
    }
    let components: [Blob; COMPONENT_COUNT] = blobs
        .try_into()
        .map_err(|_| StoreError::Codec("component count mismatch".to_string()))?;

    Ok(Artifact::new(header.meta, TensorTriplet::from_components(components)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ArtifactId, OrderKey, StoreDevice};
    use ulid::Ulid;

    fn sample() -> Artifact {
        Artifact::new(
            ArtifactMeta {
                id: ArtifactId::from_ulid(Ulid::new()),
                key: OrderKey::new(1_700_000_000_000_000_000, 42),
                store_device: StoreDevice::Keep,
            },
            TensorTriplet::new(vec![0u8, 1, 2, 255], "pos", Vec::<u8>::new()),
        )
    }

    #[test]
    fn preserves_components_and_meta() {
        let artifact = sample();
        let decoded = decode(&encode(&artifact).unwrap()).unwrap();
        assert_eq!(decoded, artifact);
        assert!(decoded.payload.negative.is_empty());
    }

    #[test]
    fn rejects_truncated_body() {
        let mut bytes = encode(&sample()).unwrap();
        bytes.pop();
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, StoreError::Codec(_)));
    }

    #[test]
    fn rejects_overflowing_lengths() {
        let header = serde_json::json!({
            "meta": sample().meta,
            "lengths": [u64::MAX, 2, 0],
        });
        let header_bytes = serde_json::to_vec(&header).unwrap();
        let mut bytes = MAGIC.to_vec();
        bytes.push(VERSION);
        bytes.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&header_bytes);
        bytes.push(7);

        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, StoreError::Codec(msg) if msg.contains("overflow")));
    }

    #[test]
    fn rejects_foreign_file() {
        let err = decode(b"PK\x03\x04 definitely not ours").unwrap_err();
        assert!(err.to_string().contains("bad magic"));
    }

    #[test]
    fn rejects_unknown_version() {
        let mut bytes = encode(&sample()).unwrap();
        bytes[4] = 9;
        let err = decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("version 9"));
    }
}
