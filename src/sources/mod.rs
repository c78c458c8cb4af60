pub mod ownerrez;
pub mod paginate;
pub mod traits;
pub mod types;

pub use ownerrez::OwnerRezClient;
pub use paginate::{fetch_bookings, fetch_properties};
pub use traits::PropertySource;
