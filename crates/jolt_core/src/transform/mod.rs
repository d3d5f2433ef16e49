//! Spring-damped transforms and the master/follower role graph.

pub mod component;
pub mod motion;
pub mod role;
pub mod spring;
pub mod system;

pub use component::{Transform, Velocity};
pub use motion::DynamicMotion;
pub use role::{AlignToMaster, Alignment, Bond, Role, RoleType};
pub use system::{MajorInfo, TransformSystem};
