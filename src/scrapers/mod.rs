pub mod doc;
pub mod traits;
pub mod types;

pub use doc::DocBookingClient;
pub use traits::AvailabilitySource;
