//! Playable audio clips
//!
//! A clip is decoded audio written to a uniquely named file that an external
//! player can open. Dropping the clip deletes the file, so every clip the
//! queue consumes or flushes releases its storage.

use base64::{engine::general_purpose, Engine as _};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::SpeechError;

/// Directory where clips are written (`$TMPDIR/lecture-lens`)
pub fn default_clip_dir() -> PathBuf {
    std::env::temp_dir().join("lecture-lens")
}

#[derive(Debug)]
pub struct AudioClip {
    path: PathBuf,
}

impl AudioClip {
    /// Decode a base64 payload (optionally a `data:` URL) into a clip
    pub fn from_base64(encoded: &str, dir: &Path) -> Result<Self, SpeechError> {
        let encoded = match encoded.split_once("base64,") {
            Some((prefix, data)) if prefix.starts_with("data:") => data,
            _ => encoded,
        };
        let bytes = general_purpose::STANDARD.decode(encoded.trim())?;
        if bytes.is_empty() {
            return Err(SpeechError::EmptyText);
        }
        let clip = Self::from_bytes(&bytes, dir, "mp3")?;
        Ok(clip)
    }

    pub fn from_bytes(bytes: &[u8], dir: &Path, extension: &str) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("clip-{}.{}", Uuid::new_v4(), extension));
        std::fs::write(&path, bytes)?;
        Ok(Self { path })
    }

    /// A near-silent clip used to activate the player from a user action
    pub fn silence(dir: &Path) -> Result<Self, SpeechError> {
        const SAMPLE_RATE: u32 = 16_000;

        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("prime-{}.wav", Uuid::new_v4()));
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(&path, spec)?;
        // 50ms, one LSB of amplitude
        for i in 0..SAMPLE_RATE / 20 {
            writer.write_sample(if i % 2 == 0 { 1i16 } else { -1i16 })?;
        }
        writer.finalize()?;

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for AudioClip {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("Failed to release {}: {}", self.path.display(), e);
            }
        }
    }
}
