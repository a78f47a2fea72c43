//! Agent session registry: a capacity-bounded map from lane key to the
//! long-lived agent session the orchestrator drives each lane's turns
//! through.

pub mod lane_key;
pub mod registry;

pub use lane_key::{base_lane_key, lane_key};
pub use registry::{AgentSession, LaneEntry, LaneSessionInfo, SessionEvent, SessionRegistry, TurnGuard};
