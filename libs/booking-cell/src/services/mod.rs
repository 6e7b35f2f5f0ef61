pub mod booking;
pub mod cancellation;
pub mod payment;

pub use booking::BookingEngine;
pub use cancellation::CancellationPolicy;
pub use payment::{PaymentGateway, PaymentReceipt, PaymentRequest, SimulatedPayment};
