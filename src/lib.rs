pub mod cancel;
pub mod codec;
pub mod config;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod model;
pub mod plan;
pub mod resource;
pub mod schema;

pub use cancel::{CancelHandle, Cancellation, cancellation};
pub use config::ClientConfig;
pub use error::{SloError, SloResult, ValidationError, ViolationKind};
pub use gateway::{HttpGateway, MemoryGateway, SloGateway};
pub use lifecycle::{ReadOutcome, SloResource};
pub use model::{Folder, Slo, SloKind};
pub use plan::Plan;
pub use resource::{ResourceData, ResourceState};
