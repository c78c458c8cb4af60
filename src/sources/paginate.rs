use crate::error::{Error, Result};
use crate::models::{parse_calendar_date, Booking, Property};
use crate::sources::traits::{BookingSource, PropertySource};
use crate::sources::types::{DateRange, Page, PropertyQuery};
use std::future::Future;
use tracing::{debug, info, warn};

/// Drain a paged endpoint into one collection.
///
/// Offsets start at 0 and advance by `page_size`. Accumulation ends on the
/// first short page, once an advertised `count` is reached, or (without
/// error) on a page missing its `items` array. Any fetch error aborts.
pub async fn collect_pages<T, F, Fut>(page_size: u32, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    if page_size == 0 {
        return Err(Error::Validation("page size must be at least 1".to_string()));
    }

    let mut collected = Vec::new();
    let mut offset: u32 = 0;

    loop {
        debug!("Fetching page at offset {} (limit {})", offset, page_size);
        let page = fetch(offset, page_size).await?;

        let Some(items) = page.items else {
            warn!(
                "Page at offset {} has no items array, stopping with {} collected",
                offset,
                collected.len()
            );
            break;
        };

        let received = items.len();
        collected.extend(items);

        if received < page_size as usize {
            break;
        }
        if let Some(count) = page.count {
            if collected.len() as u64 >= count {
                break;
            }
        }

        offset = match offset.checked_add(page_size) {
            Some(next) => next,
            None => {
                warn!("Offset overflow after {} items, stopping", collected.len());
                break;
            }
        };
    }

    Ok(collected)
}

/// Fetch every booking overlapping `[start, end]`.
///
/// Both bounds accept `YYYY-MM-DD` or RFC 3339.
pub async fn fetch_bookings<S>(
    source: &S,
    start: &str,
    end: &str,
    page_size: u32,
) -> Result<Vec<Booking>>
where
    S: BookingSource + ?Sized,
{
    let range = parse_range(start, end)?;
    info!(
        "Fetching bookings from {} between {} and {}",
        source.source_name(),
        range.start,
        range.end
    );

    let bookings = collect_pages(page_size, |offset, limit| {
        source.fetch_bookings_page(&range, offset, limit)
    })
    .await?;

    info!("Collected {} bookings", bookings.len());
    Ok(bookings)
}

/// Fetch every property matching `query`
pub async fn fetch_properties<S>(
    source: &S,
    query: &PropertyQuery,
    page_size: u32,
) -> Result<Vec<Property>>
where
    S: PropertySource + ?Sized,
{
    let properties = collect_pages(page_size, |offset, limit| {
        source.fetch_properties_page(query, offset, limit)
    })
    .await?;

    info!("Collected {} properties", properties.len());
    Ok(properties)
}

fn parse_range(start: &str, end: &str) -> Result<DateRange> {
    let start_date = parse_calendar_date(start)
        .ok_or_else(|| Error::Validation(format!("invalid start date: {start}")))?;
    let end_date = parse_calendar_date(end)
        .ok_or_else(|| Error::Validation(format!("invalid end date: {end}")))?;

    if end_date < start_date {
        return Err(Error::Validation(format!(
            "end date {end_date} is before start date {start_date}"
        )));
    }

    Ok(DateRange {
        start: start_date,
        end: end_date,
    })
}
