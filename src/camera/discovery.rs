//! Camera device discovery and pre-caching
//!
//! Device lookups can take tens of milliseconds on real hardware, so
//! both cameras are resolved in parallel at startup and the handles are
//! cached for the lifetime of the process. A miss at configuration time
//! falls back to one direct lookup, trading latency for availability.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::platform::CameraPlatform;
use super::types::{CameraDevice, CameraError, CameraPosition};

/// Cache of resolved camera handles. Entries are written once and never
/// replaced; a camera that was absent at warm-up can still be resolved
/// later through [`DeviceCache::device`].
pub struct DeviceCache {
    devices: HashMap<CameraPosition, CameraDevice>,
}

impl DeviceCache {
    pub fn new() -> Self {
        Self {
            devices: HashMap::new(),
        }
    }

    /// Resolve both cameras in parallel and cache whatever succeeds.
    /// Absence here is not an error; it only means the first
    /// configuration pays the lookup cost.
    pub async fn precache(&mut self, platform: &Arc<dyn CameraPlatform>) {
        let front = tokio::task::spawn_blocking({
            let platform = platform.clone();
            move || platform.resolve_device(CameraPosition::Front)
        });
        let back = tokio::task::spawn_blocking({
            let platform = platform.clone();
            move || platform.resolve_device(CameraPosition::Back)
        });

        let (front, back) = tokio::join!(front, back);
        self.store(CameraPosition::Front, front);
        self.store(CameraPosition::Back, back);
    }

    fn store(
        &mut self,
        position: CameraPosition,
        result: Result<Result<CameraDevice, CameraError>, tokio::task::JoinError>,
    ) {
        match result {
            Ok(Ok(device)) => {
                debug!(camera = %position, device = %device.id, "Pre-cached camera handle");
                self.devices.insert(position, device);
            }
            Ok(Err(e)) => {
                debug!(camera = %position, "Camera not pre-cached: {}", e);
            }
            Err(e) => {
                warn!(camera = %position, "Device lookup task failed: {}", e);
            }
        }
    }

    /// Cached handle for the position, or one direct lookup when the
    /// warm-up missed it.
    pub fn device(
        &mut self,
        platform: &dyn CameraPlatform,
        position: CameraPosition,
    ) -> Result<CameraDevice, CameraError> {
        if let Some(device) = self.devices.get(&position) {
            return Ok(device.clone());
        }

        debug!(camera = %position, "Camera not in cache, resolving now");
        let device = platform.resolve_device(position)?;
        self.devices.insert(position, device.clone());
        Ok(device)
    }

    /// Read-only cache lookup, without the fallback resolution of
    /// [`DeviceCache::device`].
    #[cfg(test)]
    pub fn cached(&self, position: CameraPosition) -> Option<&CameraDevice> {
        self.devices.get(&position)
    }
}

impl Default for DeviceCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::super::platform::fake::FakePlatform;
    use super::*;

    #[tokio::test]
    async fn precache_resolves_both_cameras() {
        let platform: Arc<dyn CameraPlatform> = Arc::new(FakePlatform::dual());
        let mut cache = DeviceCache::new();

        cache.precache(&platform).await;

        assert!(cache.cached(CameraPosition::Front).is_some());
        assert!(cache.cached(CameraPosition::Back).is_some());
    }

    #[tokio::test]
    async fn precache_tolerates_missing_front_camera() {
        let platform: Arc<dyn CameraPlatform> = Arc::new(FakePlatform::single_only());
        let mut cache = DeviceCache::new();

        cache.precache(&platform).await;

        assert!(cache.cached(CameraPosition::Front).is_none());
        assert!(cache.cached(CameraPosition::Back).is_some());
    }

    #[test]
    fn device_falls_back_to_direct_lookup() {
        let platform = FakePlatform::dual();
        let mut cache = DeviceCache::new();

        let device = cache
            .device(&platform, CameraPosition::Back)
            .expect("back camera resolves");
        assert_eq!(device.position, CameraPosition::Back);

        // Second lookup is served from the cache.
        assert!(cache.cached(CameraPosition::Back).is_some());
    }

    #[test]
    fn device_propagates_missing_camera() {
        let platform = FakePlatform::single_only();
        let mut cache = DeviceCache::new();

        let err = cache
            .device(&platform, CameraPosition::Front)
            .expect_err("front camera is absent");
        assert!(matches!(err, CameraError::DeviceUnavailable(_)));
    }
}
