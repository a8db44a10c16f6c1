//! Microphone capability check performed before persistent listening starts.

use async_trait::async_trait;

use super::SourceError;
use crate::audio::AudioCapture;

#[async_trait]
pub trait MicrophoneAccess: Send + Sync {
    /// Resolve once access is granted; fail fast when it is not.
    async fn request(&self) -> Result<(), SourceError>;
}

/// Probes the default cpal input device.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalMicrophone;

#[async_trait]
impl MicrophoneAccess for CpalMicrophone {
    async fn request(&self) -> Result<(), SourceError> {
        // Device enumeration can block on some hosts.
        tokio::task::spawn_blocking(AudioCapture::probe)
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))??;
        Ok(())
    }
}
