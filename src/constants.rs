//! Constants used throughout the analysis pipeline

/// Number of landmarks in a full-body pose frame
pub const NUM_POSE_LANDMARKS: usize = 33;

/// A landmark is visible when its visibility is strictly above this value
pub const VISIBILITY_THRESHOLD: f32 = 0.5;

/// Landmark indices (MediaPipe Pose, 33 total)
pub const NOSE: usize = 0;
pub const LEFT_SHOULDER: usize = 11;
pub const RIGHT_SHOULDER: usize = 12;
pub const LEFT_ELBOW: usize = 13;
pub const LEFT_WRIST: usize = 15;
pub const LEFT_HIP: usize = 23;
pub const RIGHT_HIP: usize = 24;
pub const LEFT_KNEE: usize = 25;
pub const RIGHT_KNEE: usize = 26;
pub const LEFT_ANKLE: usize = 27;
pub const RIGHT_ANKLE: usize = 28;
pub const LEFT_FOOT_INDEX: usize = 31;

/// Angle value meaning "could not be computed"
pub const MISSING_ANGLE: f64 = 0.0;

/// Upper bound for every joint angle, in degrees
pub const MAX_JOINT_ANGLE: f64 = 180.0;

/// Upper bound for the trunk deviation from vertical, in degrees
pub const MAX_TRUNK_ANGLE: f64 = 90.0;

/// Weight given to the new raw angle by the session smoothing filter
pub const DEFAULT_SMOOTHING_ALPHA: f64 = 0.2;

/// Segment lengths below this are treated as degenerate
pub const MIN_SEGMENT_LENGTH: f64 = 1e-6;

/// Rules engine scoring
pub const OUT_OF_RANGE_BOUNDARY_SCORE: f64 = 0.5;
pub const OUT_OF_RANGE_FALLOFF_DEGREES: f64 = 10.0;

/// Knees closer than this fraction of ankle separation are caving in
pub const VALGUS_RATIO: f64 = 0.8;

/// Nose below the shoulder midline by at most this much is "slightly below"
pub const CHIN_TOLERANCE: f64 = 0.05;

/// Hip midpoint further than this from the image center is swinging
pub const SWING_THRESHOLD: f64 = 0.1;

/// Horizontal image center in normalized coordinates
pub const IMAGE_CENTER_X: f64 = 0.5;

/// Rep detector: calibration
pub const CALIBRATION_FRAMES: u32 = 25;
pub const STANDING_SAMPLE_FRAMES: u32 = 15;
pub const DEPTH_CHANGE_THRESHOLD: f64 = 15.0;
pub const DEPTH_SMOOTHING: f64 = 0.8;
pub const DEFAULT_DEPTH_FLOOR: f64 = 60.0;
pub const DEFAULT_DEPTH_OFFSET: f64 = 80.0;
pub const THRESHOLD_RANGE_FRACTION: f64 = 0.2;

/// Rep detector: hysteresis margins, in degrees
pub const RETURN_MARGIN: f64 = 5.0;
pub const SECONDARY_MARGIN: f64 = 8.0;

/// Rep detector: timing windows, in milliseconds
pub const DEBOUNCE_MS: u64 = 200;
pub const THROTTLE_MS: u64 = 50;
pub const STUCK_PHASE_MS: u64 = 5_000;
pub const MIN_REP_DURATION_MS: u64 = 1_000;
pub const MAX_REP_DURATION_MS: u64 = 20_000;

/// Rep detector: frames in one phase before confidence saturates
pub const CONFIDENCE_FRAMES: u32 = 15;

/// Rep detector: number of rep durations kept for tempo statistics
pub const TEMPO_HISTORY: usize = 10;
