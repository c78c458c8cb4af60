use crate::error::Result;
use crate::models::{Booking, Property};
use crate::sources::types::{DateRange, Page, PropertyQuery};
use async_trait::async_trait;

/// Paged access to reservations.
///
/// Implemented by the HTTP client and by in-memory fakes in tests.
#[async_trait]
pub trait BookingSource: Send + Sync {
    /// Fetch one page of bookings overlapping `range`
    async fn fetch_bookings_page(
        &self,
        range: &DateRange,
        offset: u32,
        limit: u32,
    ) -> Result<Page<Booking>>;

    /// Get the name of the upstream source
    fn source_name(&self) -> &'static str;
}

/// Paged access to property listings
#[async_trait]
pub trait PropertySource: Send + Sync {
    async fn fetch_properties_page(
        &self,
        query: &PropertyQuery,
        offset: u32,
        limit: u32,
    ) -> Result<Page<Property>>;
}
