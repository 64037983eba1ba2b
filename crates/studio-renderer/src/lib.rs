//! # Canvas Studio Renderer
//!
//! Frame scheduling for the design canvas: device-tier profiles, viewport
//! culling, deferred coordinate refresh, drag-aware interaction flags, and an
//! adaptive quality loop driven by measured FPS.
//!
//! The scheduler never owns the canvas. It drives any [`RenderSurface`] once
//! per animation frame through [`RenderScheduler::tick`].

pub mod adaptive;
pub mod config;
pub mod coords;
pub mod culling;
pub mod device;
pub mod drag;
pub mod scheduler;
pub mod stats;
pub mod surface;
pub mod throttle;
pub mod viewport;

pub use adaptive::{AdaptiveController, LevelChange, OptimizationLevel, QualitySettings};
pub use config::SchedulerConfig;
pub use coords::CoordinateQueue;
pub use culling::{CullPlan, Culler};
pub use device::{CacheStrategy, CoordinateStrategy, DeviceCapabilities, DeviceTier, TierProfile};
pub use drag::{DragEnd, DragSession, InteractionError, InteractionState};
pub use scheduler::{InteractionPriority, RenderScheduler, RenderableObject};
pub use stats::{FrameReport, PerformanceSnapshot};
pub use surface::{ObjectFlags, RenderError, RenderSurface};
pub use throttle::RenderThrottle;
pub use viewport::Viewport;
