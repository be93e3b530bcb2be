use serde::{Deserialize, Serialize};

use crate::{audio::AudioClipId, PinwheelError, Result};

/// Identifies a model resolved by the resource loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelId(pub u32);

/// Playback options for the trigger clip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipOptions {
    pub spatial: bool,
    pub preload: bool,
    pub looping: bool,
}

impl Default for ClipOptions {
    fn default() -> Self {
        Self {
            spatial: true,
            preload: true,
            looping: false,
        }
    }
}

/// Names of the bundled resources the pinwheel is built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PinwheelAssets {
    pub blades_model: String,
    pub stick_model: String,
    pub clip: String,
    pub clip_options: ClipOptions,
}

impl Default for PinwheelAssets {
    fn default() -> Self {
        Self {
            blades_model: "Pinwheel8Blades.usdz".to_string(),
            stick_model: "Pinwheel8Stick.usdz".to_string(),
            clip: "MerryGoRound.mp3".to_string(),
            clip_options: ClipOptions::default(),
        }
    }
}

/// Host-side loader for bundled models and audio.
pub trait ResourceLoader {
    fn load_model(&mut self, name: &str) -> Result<ModelId>;
    fn load_audio(&mut self, name: &str, options: &ClipOptions) -> Result<AudioClipId>;
}

/// Resources resolved once at setup and shared by every spawned pinwheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetStore {
    pub blades: ModelId,
    pub stick: ModelId,
    pub clip: AudioClipId,
}

impl AssetStore {
    /// Loads every resource. Any failure is fatal and names the resource.
    pub fn load<L: ResourceLoader + ?Sized>(
        loader: &mut L,
        assets: &PinwheelAssets,
    ) -> Result<Self> {
        let stick = loader
            .load_model(&assets.stick_model)
            .map_err(|err| as_resource_error(&assets.stick_model, err))?;
        let blades = loader
            .load_model(&assets.blades_model)
            .map_err(|err| as_resource_error(&assets.blades_model, err))?;
        let clip = loader
            .load_audio(&assets.clip, &assets.clip_options)
            .map_err(|err| as_resource_error(&assets.clip, err))?;

        tracing::info!(
            blades = %assets.blades_model,
            stick = %assets.stick_model,
            clip = %assets.clip,
            "pinwheel assets loaded"
        );

        Ok(Self {
            blades,
            stick,
            clip,
        })
    }
}

fn as_resource_error(name: &str, err: PinwheelError) -> PinwheelError {
    match err {
        PinwheelError::Resource { .. } => err,
        other => PinwheelError::resource(name, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct BundleLoader {
        missing: Option<&'static str>,
        loaded: Vec<String>,
    }

    impl ResourceLoader for BundleLoader {
        fn load_model(&mut self, name: &str) -> Result<ModelId> {
            if self.missing == Some(name) {
                return Err(PinwheelError::msg("not in bundle"));
            }
            self.loaded.push(name.to_string());
            Ok(ModelId(self.loaded.len() as u32))
        }

        fn load_audio(&mut self, name: &str, options: &ClipOptions) -> Result<AudioClipId> {
            assert!(!options.looping);
            if self.missing == Some(name) {
                return Err(PinwheelError::msg("not in bundle"));
            }
            self.loaded.push(name.to_string());
            Ok(AudioClipId(self.loaded.len() as u32))
        }
    }

    #[test]
    fn loads_all_bundled_resources() {
        let mut loader = BundleLoader::default();
        let store = AssetStore::load(&mut loader, &PinwheelAssets::default()).unwrap();

        assert_ne!(store.blades, store.stick);
        assert_eq!(loader.loaded.len(), 3);
        assert!(loader.loaded.contains(&"MerryGoRound.mp3".to_string()));
    }

    #[test]
    fn missing_clip_is_a_named_resource_error() {
        let mut loader = BundleLoader {
            missing: Some("MerryGoRound.mp3"),
            ..Default::default()
        };

        let err = AssetStore::load(&mut loader, &PinwheelAssets::default()).unwrap_err();
        assert!(format!("{err}").contains("MerryGoRound.mp3"));
        assert!(matches!(err, PinwheelError::Resource { .. }));
    }
}
