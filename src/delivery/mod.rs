//! Mission Control 上报 - 载荷转换、传输、重试

pub mod client;
pub mod payload;
pub mod transport;

pub use client::{
    DeliveryConfig, DeliveryResult, ReportDeliveryClient, MAX_RETRY_DELAY, TIMELINE_EVENTS_PATH,
};
pub use payload::{
    to_payload, MissionControlPayload, PayloadAgentStates, PayloadAgentStatus,
    PayloadConductorStatus, PayloadEvent, PROTOCOL_VERSION,
};
pub use transport::{Delay, HttpTransport, ReqwestTransport, TokioDelay, TransportResponse};
