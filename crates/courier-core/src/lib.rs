pub mod errors;
pub mod ids;
pub mod wire;

pub use errors::DeliveryError;
pub use ids::ClientId;
pub use wire::{ClientFrame, ServerFrame};
