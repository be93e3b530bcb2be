use crate::{
    assets::AssetStore,
    audio::AudioHandle,
    config::PlacementConfig,
    scene::{
        Anchor, AnchorId, EntityId, PhysicsBody, Pose, SceneObject, SpinningObject, Transform,
    },
};

/// Host plane detection.
pub trait SurfaceDetector {
    /// Pose of the horizontal surface a new anchor would attach to, if one
    /// has been detected.
    fn current_detected_surface_pose(&self) -> Option<Pose>;
}

/// Owns the single live anchor and the pinwheel parented to it.
#[derive(Debug)]
pub struct SceneAnchorManager {
    assets: AssetStore,
    placement: PlacementConfig,
    current: Option<Anchor>,
    pending: bool,
    next_anchor: u64,
    next_entity: u64,
}

impl SceneAnchorManager {
    /// Starts with an attachment request outstanding, so the first detected
    /// surface receives the pinwheel.
    pub fn new(assets: AssetStore, placement: PlacementConfig) -> Self {
        Self {
            assets,
            placement,
            current: None,
            pending: true,
            next_anchor: 0,
            next_entity: 0,
        }
    }

    pub fn current(&self) -> Option<&Anchor> {
        self.current.as_ref()
    }

    pub fn object(&self) -> Option<&SpinningObject> {
        self.current.as_ref().map(|anchor| &anchor.pinwheel)
    }

    pub fn object_mut(&mut self) -> Option<&mut SpinningObject> {
        self.current.as_mut().map(|anchor| &mut anchor.pinwheel)
    }

    pub fn is_anchored(&self) -> bool {
        self.current.is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Discards the current anchor with all its children and requests a new
    /// one on the next available surface. Returns the discarded anchor.
    pub fn reset<S: SurfaceDetector + ?Sized>(&mut self, surfaces: &S) -> Option<Anchor> {
        let discarded = self.current.take();
        if let Some(anchor) = &discarded {
            tracing::info!(anchor = %anchor.id, "detached anchor");
        }

        self.pending = true;
        if !self.resolve_pending(surfaces) {
            tracing::debug!("no surface detected yet, anchor attachment deferred");
        }
        discarded
    }

    /// Attaches the requested anchor once a surface is available. Returns
    /// true if an anchor was created by this call.
    pub fn resolve_pending<S: SurfaceDetector + ?Sized>(&mut self, surfaces: &S) -> bool {
        if !self.pending {
            return false;
        }

        match surfaces.current_detected_surface_pose() {
            Some(pose) => {
                self.attach(pose);
                true
            }
            None => false,
        }
    }

    fn attach(&mut self, pose: Pose) {
        let id = AnchorId(self.next_anchor);
        self.next_anchor += 1;

        let stick = SceneObject {
            id: self.allocate_entity(),
            name: "stick".to_string(),
            model: self.assets.stick,
            transform: Transform::placed(&self.placement),
        };

        let blades_id = self.allocate_entity();
        let pinwheel = SpinningObject {
            id: blades_id,
            name: "blades".to_string(),
            model: self.assets.blades,
            transform: Transform::placed(&self.placement),
            audio: AudioHandle {
                clip: self.assets.clip,
                emitter: blades_id,
            },
            physics: PhysicsBody::default(),
        };

        tracing::info!(anchor = %id, position = ?pose.position, "anchored pinwheel to surface");
        self.current = Some(Anchor {
            id,
            pose,
            stick,
            pinwheel,
        });
        self.pending = false;
    }

    fn allocate_entity(&mut self) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        id
    }
}
