//! Depth layer: unit conversion and plane decomposition.
//!
//! ```text
//!   raw depth [batch, h, w]  (sensor units, 0 = no return)
//!        │
//!        ▼
//!   ┌───────────┐
//!   │ normalize  │  sentinel → diopters → robust rescale to 0.61
//!   └───────────┘
//!        │
//!        ▼
//!   ┌───────────┐
//!   │  planes    │  nearest-plane one-hot masks [batch, planes, h, w]
//!   └───────────┘
//! ```

pub mod normalize;
pub mod planes;

pub use normalize::{DepthNormalizer, NormalizerConfig};
pub use planes::{MaskStack, PlaneMaskDecomposer, VirtualDepthPlanes, VIRTUAL_DEPTH_PLANES};
