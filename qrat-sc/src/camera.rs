//! Camera session manager
//!
//! Browsers and phones disagree about which camera constraints they accept.
//! Starting the camera therefore walks an ordered list of constraint sets,
//! from most specific (exact device at 1080p) down to "any video", and keeps
//! the first that works. Switching cameras uses a shorter list and restores
//! the previous facing if nothing works.
//!
//! The actual device API sits behind [`CameraBackend`].

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

/// Pause between failed attempts, giving the device time to release
pub const RETRY_PAUSE: Duration = Duration::from_millis(100);

const FRONT_KEYWORDS: &[&str] = &["front", "user", "selfie", "내부", "facetime", "face"];
const BACK_KEYWORDS: &[&str] = &["back", "rear", "environment", "외부", "main", "camera 0"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    /// Front camera
    User,
    /// Rear camera
    Environment,
}

impl Facing {
    pub fn flipped(self) -> Self {
        match self {
            Facing::User => Facing::Environment,
            Facing::Environment => Facing::User,
        }
    }
}

/// A `videoinput` device as enumerated by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDevice {
    pub device_id: String,
    /// Empty until camera permission is granted on most browsers
    pub label: String,
}

impl VideoDevice {
    pub fn new(device_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            label: label.into(),
        }
    }
}

/// Device ids chosen for each facing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CameraPair {
    pub front: Option<String>,
    pub back: Option<String>,
}

impl CameraPair {
    pub fn device_for(&self, facing: Facing) -> Option<&str> {
        match facing {
            Facing::User => self.front.as_deref(),
            Facing::Environment => self.back.as_deref(),
        }
    }
}

/// Assign devices to front/back from their labels.
///
/// A device whose label has no front keyword counts as a back camera. With
/// two or more devices, the first two fill whichever side labels left empty.
pub fn classify_devices(devices: &[VideoDevice]) -> CameraPair {
    let mut pair = CameraPair::default();

    for device in devices {
        let label = device.label.to_lowercase();
        if FRONT_KEYWORDS.iter().any(|k| label.contains(k)) {
            pair.front = Some(device.device_id.clone());
        } else {
            if !BACK_KEYWORDS.iter().any(|k| label.contains(k)) {
                tracing::trace!(label = %device.label, "No facing keyword, assuming back camera");
            }
            pair.back = Some(device.device_id.clone());
        }
    }

    if let [first, second, ..] = devices {
        pair.front.get_or_insert_with(|| first.device_id.clone());
        pair.back.get_or_insert_with(|| second.device_id.clone());
    }

    pair
}

/// Preferred capture resolution on phones (helps autofocus)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

pub const HIGH_RES: Resolution = Resolution {
    width: 1920,
    height: 1080,
    frame_rate: 30,
};

/// One set of `getUserMedia` video constraints
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    DeviceExact {
        device_id: String,
        resolution: Option<Resolution>,
    },
    FacingExact {
        facing: Facing,
        resolution: Option<Resolution>,
    },
    DeviceIdeal(String),
    FacingIdeal(Facing),
    FacingBasic(Facing),
    AnyVideo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub name: &'static str,
    pub constraint: Constraint,
}

impl Attempt {
    fn new(name: &'static str, constraint: Constraint) -> Self {
        Self { name, constraint }
    }
}

/// Attempts for a cold start, most specific first
pub fn start_plan(facing: Facing, device_id: Option<&str>) -> Vec<Attempt> {
    let mut plan = Vec::with_capacity(8);

    if let Some(id) = device_id {
        plan.push(Attempt::new(
            "deviceId exact + high resolution",
            Constraint::DeviceExact {
                device_id: id.to_string(),
                resolution: Some(HIGH_RES),
            },
        ));
        plan.push(Attempt::new(
            "deviceId exact",
            Constraint::DeviceExact {
                device_id: id.to_string(),
                resolution: None,
            },
        ));
    }

    plan.push(Attempt::new(
        "facingMode exact + high resolution",
        Constraint::FacingExact {
            facing,
            resolution: Some(HIGH_RES),
        },
    ));
    plan.push(Attempt::new(
        "facingMode exact",
        Constraint::FacingExact {
            facing,
            resolution: None,
        },
    ));

    if let Some(id) = device_id {
        plan.push(Attempt::new("deviceId ideal", Constraint::DeviceIdeal(id.to_string())));
    }

    plan.push(Attempt::new("facingMode ideal", Constraint::FacingIdeal(facing)));
    plan.push(Attempt::new("facingMode basic", Constraint::FacingBasic(facing)));
    plan.push(Attempt::new("basic video", Constraint::AnyVideo));
    plan
}

/// Attempts when switching between cameras
pub fn switch_plan(facing: Facing, device_id: Option<&str>) -> Vec<Attempt> {
    let mut plan = Vec::with_capacity(5);

    if let Some(id) = device_id {
        plan.push(Attempt::new(
            "deviceId exact",
            Constraint::DeviceExact {
                device_id: id.to_string(),
                resolution: None,
            },
        ));
        plan.push(Attempt::new("deviceId ideal", Constraint::DeviceIdeal(id.to_string())));
    }

    plan.push(Attempt::new(
        "facingMode exact",
        Constraint::FacingExact {
            facing,
            resolution: None,
        },
    ));
    plan.push(Attempt::new("facingMode ideal", Constraint::FacingIdeal(facing)));
    plan.push(Attempt::new("facingMode basic", Constraint::FacingBasic(facing)));
    plan
}

/// How long to wait for the old camera to be released before switching.
/// Android devices need longer.
pub fn switch_delay(user_agent: &str) -> Duration {
    if user_agent.to_ascii_lowercase().contains("android") {
        Duration::from_millis(1_000)
    } else {
        Duration::from_millis(500)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("Camera permission denied: {0}")]
    PermissionDenied(String),

    #[error("No camera found: {0}")]
    NotFound(String),

    #[error("Camera error: {0}")]
    Device(String),

    #[error("This device has only one camera")]
    SingleCamera,

    #[error("Camera is not running")]
    NotScanning,
}

/// Platform camera + decoder engine
#[async_trait]
pub trait CameraBackend: Send {
    async fn start(&mut self, constraint: &Constraint) -> Result<(), CameraError>;

    async fn stop(&mut self) -> Result<(), CameraError>;

    fn is_running(&self) -> bool;
}

/// Owns the camera lifecycle for one scanner screen
pub struct CameraSession<B> {
    backend: B,
    devices: Vec<VideoDevice>,
    pair: CameraPair,
    facing: Facing,
    scanning: bool,
    retry_pause: Duration,
    switch_delay: Duration,
}

impl<B: CameraBackend> CameraSession<B> {
    pub fn new(backend: B, devices: Vec<VideoDevice>, facing: Facing) -> Self {
        let pair = classify_devices(&devices);
        info!(
            devices = devices.len(),
            front = ?pair.front,
            back = ?pair.back,
            "Camera devices classified"
        );

        Self {
            backend,
            devices,
            pair,
            facing,
            scanning: false,
            retry_pause: RETRY_PAUSE,
            switch_delay: switch_delay(""),
        }
    }

    pub fn with_timing(mut self, retry_pause: Duration, switch_delay: Duration) -> Self {
        self.retry_pause = retry_pause;
        self.switch_delay = switch_delay;
        self
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    pub fn pair(&self) -> &CameraPair {
        &self.pair
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Start with the current facing; returns the attempt that worked
    pub async fn start(&mut self) -> Result<&'static str, CameraError> {
        let plan = start_plan(self.facing, self.pair.device_for(self.facing));
        let result = self.run_plan(plan).await;
        self.scanning = result.is_ok();
        result
    }

    pub async fn stop(&mut self) -> Result<(), CameraError> {
        if self.backend.is_running() {
            self.backend.stop().await?;
        }
        self.scanning = false;
        Ok(())
    }

    /// Flip to the other camera. On failure the previous facing is restored
    /// and the session is left stopped.
    pub async fn switch(&mut self) -> Result<Facing, CameraError> {
        if !self.scanning {
            return Err(CameraError::NotScanning);
        }
        if self.devices.len() < 2 {
            return Err(CameraError::SingleCamera);
        }

        self.stop().await?;

        let previous = self.facing;
        self.facing = previous.flipped();
        tokio::time::sleep(self.switch_delay).await;

        let plan = switch_plan(self.facing, self.pair.device_for(self.facing));
        match self.run_plan(plan).await {
            Ok(_) => {
                self.scanning = true;
                info!(facing = ?self.facing, "Camera switched");
                Ok(self.facing)
            }
            Err(e) => {
                warn!(error = %e, "Camera switch failed, restoring previous facing");
                self.facing = previous;
                self.scanning = false;
                Err(e)
            }
        }
    }

    async fn run_plan(&mut self, plan: Vec<Attempt>) -> Result<&'static str, CameraError> {
        let mut last_error = CameraError::Device("no constraint attempts available".to_string());

        for attempt in plan {
            match self.backend.start(&attempt.constraint).await {
                Ok(()) => {
                    info!(attempt = attempt.name, "Camera started");
                    return Ok(attempt.name);
                }
                Err(e) => {
                    warn!(attempt = attempt.name, error = %e, "Camera start attempt failed");
                    if self.backend.is_running() {
                        if let Err(stop_error) = self.backend.stop().await {
                            warn!(error = %stop_error, "Failed to stop camera between attempts");
                        }
                    }
                    last_error = e;
                    tokio::time::sleep(self.retry_pause).await;
                }
            }
        }

        Err(last_error)
    }
}
