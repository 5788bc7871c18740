//! On-disk document format: `{version, dimension, volumes[], learning?}`,
//! embeddings as base64 f32le, long texts gzip-compressed, write-temp-
//! then-rename atomicity, corrupt-record-skip-with-warning semantics.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::atoms::{Logger, Volume};
use crate::codec::{compress_text, decode_embedding, decompress_text, encode_embedding, is_gzip, TextPayload};
use crate::learning::LearningSnapshot;
use crate::{LibraryError, LibraryResult};

const DOCUMENT_VERSION: u64 = 2;

#[derive(Debug, Serialize, Deserialize)]
struct PersistedVolume {
    id: String,
    text: TextPayload,
    embedding: String,
    metadata: HashMap<String, String>,
    timestamp: i64,
    #[serde(rename = "lastAccessedAt")]
    last_accessed_at: i64,
    #[serde(rename = "accessCount")]
    access_count: u64,
}

/// The result of loading a persisted document: recovered volumes (in
/// on-disk order) and the learning engine snapshot, if any.
pub struct LoadedDocument {
    pub dimension: usize,
    pub volumes: Vec<Volume>,
    pub learning: Option<LearningSnapshot>,
}

fn to_persisted_volume(volume: &Volume) -> std::io::Result<PersistedVolume> {
    Ok(PersistedVolume {
        id: volume.id.clone(),
        text: TextPayload::encode(&volume.text)?,
        embedding: encode_embedding(&volume.embedding),
        metadata: volume.metadata.clone(),
        timestamp: volume.timestamp,
        last_accessed_at: volume.last_accessed_at,
        access_count: volume.access_count,
    })
}

fn from_persisted_volume(persisted: PersistedVolume) -> Option<Volume> {
    let text = persisted.text.decode().ok()?;
    let embedding = decode_embedding(&persisted.embedding)?;
    Some(Volume {
        id: persisted.id,
        text,
        embedding,
        metadata: persisted.metadata,
        timestamp: persisted.timestamp,
        last_accessed_at: persisted.last_accessed_at,
        access_count: persisted.access_count,
    })
}

/// Serialize `volumes` and an optional learning snapshot into the
/// canonical on-disk document, gzip-wrapping the whole thing when
/// `gzip_whole_document` is set, and write it atomically via
/// write-to-temp-then-rename.
pub async fn save(
    path: &Path,
    dimension: usize,
    volumes: &[Volume],
    learning: Option<&LearningSnapshot>,
    gzip_whole_document: bool,
) -> LibraryResult<()> {
    let mut persisted_volumes = Vec::with_capacity(volumes.len());
    for volume in volumes {
        persisted_volumes.push(to_persisted_volume(volume)?);
    }

    let document = serde_json::json!({
        "version": DOCUMENT_VERSION,
        "dimension": dimension,
        "volumes": persisted_volumes,
        "learning": learning,
    });

    let serialized = serde_json::to_vec(&document)?;
    let bytes = if gzip_whole_document {
        compress_text(&String::from_utf8_lossy(&serialized))?
    } else {
        serialized
    };

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let temp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("library")
    ));

    tokio::fs::create_dir_all(parent).await?;
    tokio::fs::write(&temp_path, &bytes).await?;
    tokio::fs::rename(&temp_path, path).await?;
    Ok(())
}

/// Load a persisted document from `path`. A corrupt header (missing or
/// malformed `version`/`dimension`) aborts with `CorruptDocument`; a
/// corrupt individual volume record is skipped with a logged warning.
pub async fn load(path: &Path, logger: &dyn Logger) -> LibraryResult<LoadedDocument> {
    let raw = tokio::fs::read(path).await?;
    let json_bytes = if is_gzip(&raw) {
        decompress_text(&raw)?.into_bytes()
    } else {
        raw
    };

    let root: Value = serde_json::from_slice(&json_bytes)?;

    let dimension = root
        .get("dimension")
        .and_then(Value::as_u64)
        .ok_or_else(|| LibraryError::CorruptDocument("missing or invalid 'dimension' field".into()))?
        as usize;

    if root.get("version").and_then(Value::as_u64).is_none() {
        return Err(LibraryError::CorruptDocument("missing or invalid 'version' field".into()));
    }

    let raw_volumes = root
        .get("volumes")
        .and_then(Value::as_array)
        .ok_or_else(|| LibraryError::CorruptDocument("missing or invalid 'volumes' array".into()))?;

    let mut volumes = Vec::with_capacity(raw_volumes.len());
    for (index, entry) in raw_volumes.iter().enumerate() {
        match serde_json::from_value::<PersistedVolume>(entry.clone()) {
            Ok(persisted) => match from_persisted_volume(persisted) {
                Some(volume) => volumes.push(volume),
                None => logger.warn(&format!("skipping corrupt volume record at index {index}: invalid embedding or text payload")),
            },
            Err(e) => logger.warn(&format!("skipping corrupt volume record at index {index}: {e}")),
        }
    }

    let learning = root
        .get("learning")
        .filter(|v| !v.is_null())
        .and_then(|v| serde_json::from_value::<LearningSnapshot>(v.clone()).ok());

    Ok(LoadedDocument {
        dimension,
        volumes,
        learning,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::NullLogger;
    use std::collections::HashMap as Map;

    #[tokio::test]
    async fn save_then_load_round_trips_volumes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.json");

        let volume = Volume::new(
            "v1".into(),
            "hello world".into(),
            vec![0.1, 0.2, 0.3],
            Map::new(),
            1000,
        );

        save(&path, 3, &[volume.clone()], None, false).await.unwrap();
        let loaded = load(&path, &NullLogger).await.unwrap();

        assert_eq!(loaded.dimension, 3);
        assert_eq!(loaded.volumes.len(), 1);
        assert_eq!(loaded.volumes[0].id, volume.id);
        assert_eq!(loaded.volumes[0].text, volume.text);
        assert_eq!(loaded.volumes[0].embedding, volume.embedding);
    }

    #[tokio::test]
    async fn corrupt_header_aborts_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.json");
        tokio::fs::write(&path, br#"{"volumes": []}"#).await.unwrap();

        let result = load(&path, &NullLogger).await;
        assert!(matches!(result, Err(LibraryError::CorruptDocument(_))));
    }

    #[tokio::test]
    async fn corrupt_single_record_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.json");
        let document = serde_json::json!({
            "version": 2,
            "dimension": 2,
            "volumes": [
                {"id": "bad", "text": "x", "embedding": "not-valid-base64!!", "metadata": {}, "timestamp": 0, "lastAccessedAt": 0, "accessCount": 0},
                {"id": "good", "text": "ok", "embedding": encode_embedding(&[1.0, 2.0]), "metadata": {}, "timestamp": 0, "lastAccessedAt": 0, "accessCount": 0},
            ],
        });
        tokio::fs::write(&path, serde_json::to_vec(&document).unwrap()).await.unwrap();

        let loaded = load(&path, &NullLogger).await.unwrap();
        assert_eq!(loaded.volumes.len(), 1);
        assert_eq!(loaded.volumes[0].id, "good");
    }
}
