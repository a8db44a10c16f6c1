//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// The platform the player runs on.
///
/// Haptic feedback is only available on native builds; the mobile-web shell
/// has no vibration API worth calling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    Native,
    MobileWeb,
}

impl Default for Platform {
    fn default() -> Self {
        Self::Native
    }
}

// ---------------------------------------------------------------------------
// VoiceConfig
// ---------------------------------------------------------------------------

/// Recognition session and command behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// BCP-47 locale tag handed to the transcript source (e.g. `"en-US"`).
    pub locale: String,
    /// Only match built-in phrases of the active locale.
    ///
    /// Off by default: every locale's phrases are checked regardless of the
    /// active one.
    pub restrict_to_locale: bool,
    /// Backoff before restarting a persistent session after a network error.
    pub network_retry_ms: u64,
    /// Backoff before restarting a persistent session that ended naturally.
    pub restart_delay_ms: u64,
    /// How long a recognised command stays visible before it is cleared.
    pub display_window_ms: u64,
    /// Fire haptic feedback on command success / failure.
    pub haptics: bool,
    /// Platform the player runs on.
    pub platform: Platform,
}

impl VoiceConfig {
    pub fn network_retry(&self) -> Duration {
        Duration::from_millis(self.network_retry_ms)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    pub fn display_window(&self) -> Duration {
        Duration::from_millis(self.display_window_ms)
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            locale: "en-US".into(),
            restrict_to_locale: false,
            network_retry_ms: 3_000,
            restart_delay_ms: 500,
            display_window_ms: 3_000,
            haptics: true,
            platform: Platform::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// TranscriptionConfig
// ---------------------------------------------------------------------------

/// Remote speech-to-text endpoint used by both transcript sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Full URL the audio payload is `POST`ed to.
    pub endpoint: String,
    /// Bearer token; `None` for unauthenticated local servers.
    pub api_key: Option<String>,
    /// Model name forwarded as a query parameter, if the server needs one.
    pub model: Option<String>,
    /// Maximum seconds to wait for a transcription response.
    pub timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/transcribe".into(),
            api_key: None,
            model: None,
            timeout_secs: 15,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for audio capture and utterance segmentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate of the uploaded payload in Hz.
    pub sample_rate: u32,
    /// RMS threshold (0.0 – 1.0) above which a frame counts as speech.
    pub vad_threshold: f32,
    /// Trailing silence that closes an utterance in continuous mode.
    pub silence_ms: u64,
    /// Utterances shorter than this are discarded as clicks / noise.
    pub min_utterance_ms: u64,
    /// Hard cap on a single utterance; longer speech is cut and uploaded.
    pub max_utterance_secs: f32,
    /// A continuous session with no speech for this long reports `no-speech`.
    pub no_speech_timeout_secs: u64,
    /// A continuous session ends on its own after this long, like a platform
    /// recognizer's built-in timeout.  Persistent mode restarts it.
    pub session_limit_secs: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            vad_threshold: 0.02,
            silence_ms: 700,
            min_utterance_ms: 250,
            max_utterance_secs: 10.0,
            no_speech_timeout_secs: 8,
            session_limit_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use voice_player::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Session / command behaviour.
    pub voice: VoiceConfig,
    /// Remote transcription endpoint.
    pub transcription: TranscriptionConfig,
    /// Audio capture / segmentation settings.
    pub audio: AudioConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// so callers never need to special-case a missing file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        let default = AppConfig::default();

        assert_eq!(config.voice.locale, default.voice.locale);
        assert_eq!(config.transcription.endpoint, default.transcription.endpoint);
        assert_eq!(config.audio.sample_rate, default.audio.sample_rate);
    }

    #[test]
    fn default_backoffs() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.voice.network_retry(), Duration::from_millis(3_000));
        assert_eq!(cfg.voice.restart_delay(), Duration::from_millis(500));
        assert_eq!(cfg.voice.display_window(), Duration::from_millis(3_000));
        assert!(!cfg.voice.restrict_to_locale);
        assert_eq!(cfg.voice.platform, Platform::Native);
        assert!(cfg.transcription.api_key.is_none());
    }

    #[test]
    fn modified_values_survive_save_and_load() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("settings.toml");

        let mut cfg = AppConfig::default();
        cfg.voice.locale = "zh-TW".into();
        cfg.voice.restrict_to_locale = true;
        cfg.voice.platform = Platform::MobileWeb;
        cfg.transcription.endpoint = "https://stt.example.com/v1/transcribe".into();
        cfg.transcription.api_key = Some("sk-test".into());
        cfg.audio.silence_ms = 900;

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.voice.locale, "zh-TW");
        assert!(loaded.voice.restrict_to_locale);
        assert_eq!(loaded.voice.platform, Platform::MobileWeb);
        assert_eq!(
            loaded.transcription.endpoint,
            "https://stt.example.com/v1/transcribe"
        );
        assert_eq!(loaded.transcription.api_key, Some("sk-test".into()));
        assert_eq!(loaded.audio.silence_ms, 900);
    }

    #[test]
    fn platform_serialises_kebab_case() {
        let text = toml::to_string(&AppConfig::default()).expect("serialise");
        assert!(text.contains("platform = \"native\""));
    }
}
