//! Camera session tests against a scripted backend

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use qrat_sc::camera::{CameraBackend, CameraError, CameraSession, Constraint, Facing, VideoDevice};

/// Succeeds or fails per `start` call as scripted; unscripted calls succeed
#[derive(Default)]
struct ScriptedCamera {
    script: VecDeque<bool>,
    /// A failed start leaves a half-open stream behind
    leaks_on_failure: bool,
    running: bool,
    attempts: Vec<Constraint>,
    stops: usize,
}

impl ScriptedCamera {
    fn new(script: impl IntoIterator<Item = bool>, leaks_on_failure: bool) -> Self {
        Self {
            script: script.into_iter().collect(),
            leaks_on_failure,
            ..Self::default()
        }
    }
}

#[async_trait]
impl CameraBackend for ScriptedCamera {
    async fn start(&mut self, constraint: &Constraint) -> Result<(), CameraError> {
        self.attempts.push(constraint.clone());
        if self.script.pop_front().unwrap_or(true) {
            self.running = true;
            Ok(())
        } else {
            self.running = self.leaks_on_failure;
            Err(CameraError::NotFound(format!("attempt {}", self.attempts.len())))
        }
    }

    async fn stop(&mut self) -> Result<(), CameraError> {
        self.running = false;
        self.stops += 1;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

fn phone_cameras() -> Vec<VideoDevice> {
    vec![
        VideoDevice::new("cam-front", "Front Camera"),
        VideoDevice::new("cam-back", "Back Camera"),
    ]
}

fn session(backend: ScriptedCamera, devices: Vec<VideoDevice>) -> CameraSession<ScriptedCamera> {
    CameraSession::new(backend, devices, Facing::Environment)
        .with_timing(Duration::ZERO, Duration::ZERO)
}

#[tokio::test]
async fn test_start_prefers_device_id() {
    let mut camera = session(ScriptedCamera::default(), phone_cameras());

    let attempt = camera.start().await.unwrap();
    assert_eq!(attempt, "deviceId exact + high resolution");
    assert!(camera.is_scanning());

    match &camera.backend().attempts[0] {
        Constraint::DeviceExact { device_id, resolution } => {
            assert_eq!(device_id, "cam-back");
            assert!(resolution.is_some());
        }
        other => panic!("Unexpected first constraint: {:?}", other),
    }
}

#[tokio::test]
async fn test_start_falls_through_and_stops_between_attempts() {
    let backend = ScriptedCamera::new([false, false, true], true);
    let mut camera = session(backend, phone_cameras());

    let attempt = camera.start().await.unwrap();
    assert_eq!(attempt, "facingMode exact + high resolution");
    assert_eq!(camera.backend().attempts.len(), 3);
    assert_eq!(camera.backend().stops, 2);
}

#[tokio::test]
async fn test_failed_attempt_without_stream_is_not_stopped() {
    let backend = ScriptedCamera::new([false, true], false);
    let mut camera = session(backend, phone_cameras());

    camera.start().await.unwrap();
    assert_eq!(camera.backend().stops, 0);
}

#[tokio::test]
async fn test_start_gives_up_with_last_error() {
    let backend = ScriptedCamera::new([false; 8], false);
    let mut camera = session(backend, phone_cameras());

    let err = camera.start().await.unwrap_err();
    assert_eq!(err, CameraError::NotFound("attempt 8".to_string()));
    assert!(!camera.is_scanning());
    assert_eq!(camera.backend().attempts.last(), Some(&Constraint::AnyVideo));
}

#[tokio::test]
async fn test_switch_requires_running_camera() {
    let mut camera = session(ScriptedCamera::default(), phone_cameras());
    assert_eq!(camera.switch().await.unwrap_err(), CameraError::NotScanning);
}

#[tokio::test]
async fn test_switch_requires_two_cameras() {
    let devices = vec![VideoDevice::new("only", "Integrated Webcam")];
    let mut camera = session(ScriptedCamera::default(), devices);

    camera.start().await.unwrap();
    assert_eq!(camera.switch().await.unwrap_err(), CameraError::SingleCamera);
    assert_eq!(camera.facing(), Facing::Environment);
    assert!(camera.is_scanning());
}

#[tokio::test]
async fn test_switch_to_front_camera() {
    let mut camera = session(ScriptedCamera::default(), phone_cameras());
    camera.start().await.unwrap();

    let facing = camera.switch().await.unwrap();
    assert_eq!(facing, Facing::User);
    assert_eq!(camera.facing(), Facing::User);
    assert!(camera.is_scanning());

    let backend = camera.backend();
    assert_eq!(backend.stops, 1);
    assert_eq!(
        backend.attempts.last(),
        Some(&Constraint::DeviceExact {
            device_id: "cam-front".to_string(),
            resolution: None,
        })
    );
}

#[tokio::test]
async fn test_failed_switch_restores_previous_facing() {
    // Cold start succeeds, all five switch attempts fail
    let backend = ScriptedCamera::new([true, false, false, false, false, false], false);
    let mut camera = session(backend, phone_cameras());
    camera.start().await.unwrap();

    assert!(camera.switch().await.is_err());
    assert_eq!(camera.facing(), Facing::Environment);
    assert!(!camera.is_scanning());
    assert_eq!(camera.backend().attempts.len(), 6);
}

#[tokio::test]
async fn test_stop_releases_camera() {
    let mut camera = session(ScriptedCamera::default(), phone_cameras());
    camera.start().await.unwrap();

    camera.stop().await.unwrap();
    assert!(!camera.is_scanning());
    assert!(!camera.backend().is_running());
}
