use crate::cache::{LocalPropertyIndex, PropertyCache};
use crate::error::{Error, Result};
use crate::models::Property;
use crate::sources::{fetch_properties, PropertySource};
use crate::sources::types::{PropertyQuery, Range, SearchFilter};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, info, warn};

pub const MAX_PAGE_SIZE: i64 = 100;

/// One page of search results
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub items: Vec<Property>,
    pub total: u64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: u64,
}

/// Build a filter from UI query parameters.
///
/// Absent keys keep their defaults; present but unparsable values are
/// validation errors.
pub fn parse_filters(params: &HashMap<String, String>) -> Result<SearchFilter> {
    let defaults = SearchFilter::default();

    let filter = SearchFilter {
        rate: Range {
            min: number(params, "minRate")?,
            max: number(params, "maxRate")?,
        },
        bedrooms: Range {
            min: number(params, "minBedrooms")?,
            max: number(params, "maxBedrooms")?,
        },
        bathrooms: Range {
            min: number(params, "minBathrooms")?,
            max: number(params, "maxBathrooms")?,
        },
        guests: number(params, "guests")?,
        pets_allowed: flag(params, "petsAllowed")?,
        children_allowed: flag(params, "childrenAllowed")?,
        start_date: date(params, "startDate")?,
        end_date: date(params, "endDate")?,
        include_tags: tags(params, "includeTags"),
        exclude_tags: tags(params, "excludeTags"),
        page: number::<i64>(params, "page")?.unwrap_or(defaults.page),
        page_size: number::<i64>(params, "pageSize")?.unwrap_or(defaults.page_size),
    };

    if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
        if end < start {
            return Err(Error::Validation(format!(
                "endDate {end} is before startDate {start}"
            )));
        }
    }

    Ok(filter)
}

/// Reject out-of-range pagination; never clamps
pub fn validate_pagination(filter: &SearchFilter) -> Result<()> {
    if filter.page < 1 {
        return Err(Error::Validation(format!(
            "page must be at least 1 (got {})",
            filter.page
        )));
    }
    if filter.page_size < 1 || filter.page_size > MAX_PAGE_SIZE {
        return Err(Error::Validation(format!(
            "pageSize must be between 1 and {} (got {})",
            MAX_PAGE_SIZE, filter.page_size
        )));
    }
    Ok(())
}

/// Zero-based offset of the filter's page
pub fn page_offset(filter: &SearchFilter) -> Result<u64> {
    filter
        .page
        .checked_sub(1)
        .and_then(|pages| pages.checked_mul(filter.page_size))
        .and_then(|offset| u64::try_from(offset).ok())
        .ok_or_else(|| Error::Validation(format!("page {} is too far out", filter.page)))
}

/// Translate UI-level ranges into the upstream search vocabulary
pub fn to_property_query(filter: &SearchFilter) -> PropertyQuery {
    let mut query = PropertyQuery::default();

    push_range(&mut query, "rate", &filter.rate);
    push_range(&mut query, "bedrooms", &filter.bedrooms);
    push_range(&mut query, "bathrooms", &filter.bathrooms);
    if let Some(guests) = filter.guests {
        query.push("occupancy_min", guests);
    }
    if let Some(pets) = filter.pets_allowed {
        query.push("pets_allowed", pets);
    }
    if let Some(children) = filter.children_allowed {
        query.push("children_allowed", children);
    }
    if let Some(start) = filter.start_date {
        query.push("availability_start_date", start.format("%Y-%m-%d"));
    }
    if let Some(end) = filter.end_date {
        query.push("availability_end_date", end.format("%Y-%m-%d"));
    }
    if !filter.include_tags.is_empty() {
        query.push("include_tag_ids", filter.include_tags.join(","));
    }
    if !filter.exclude_tags.is_empty() {
        query.push("exclude_tag_ids", filter.exclude_tags.join(","));
    }

    query
}

/// Property search over the upstream source and the shared cache
pub struct PropertySearch<'a, S: PropertySource + ?Sized> {
    source: &'a S,
    cache: &'a PropertyCache,
    index: &'a LocalPropertyIndex,
    upstream_page_size: u32,
}

impl<'a, S: PropertySource + ?Sized> PropertySearch<'a, S> {
    pub fn new(
        source: &'a S,
        cache: &'a PropertyCache,
        index: &'a LocalPropertyIndex,
        upstream_page_size: u32,
    ) -> Self {
        Self {
            source,
            cache,
            index,
            upstream_page_size,
        }
    }

    /// Search properties.
    ///
    /// Unconstrained filters page through the cached snapshot; anything else
    /// is forwarded to the source.
    pub async fn search(&self, filter: &SearchFilter) -> Result<SearchResults> {
        validate_pagination(filter)?;

        let offset = page_offset(filter)?;
        let (items, total) = if filter.is_unconstrained() {
            self.search_cached(offset, filter.page_size as usize).await?
        } else {
            self.search_upstream(filter, offset).await?
        };

        let items = self.index.ensure_thumbnails(items);
        let page_size = filter.page_size as u64;
        info!(
            "Search page {} returned {} of {} properties",
            filter.page,
            items.len(),
            total
        );

        Ok(SearchResults {
            items,
            total,
            page: filter.page,
            page_size: filter.page_size,
            total_pages: total.div_ceil(page_size),
        })
    }

    async fn search_cached(&self, offset: u64, page_size: usize) -> Result<(Vec<Property>, u64)> {
        let everything = PropertyQuery::default();
        let snapshot = self
            .cache
            .get_or_refresh(|| fetch_properties(self.source, &everything, self.upstream_page_size))
            .await?;

        let all = snapshot.sorted();
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(page_size)
            .collect();
        Ok((items, total))
    }

    async fn search_upstream(
        &self,
        filter: &SearchFilter,
        offset: u64,
    ) -> Result<(Vec<Property>, u64)> {
        let query = to_property_query(filter);
        let offset = u32::try_from(offset)
            .map_err(|_| Error::Validation("page is too far out".to_string()))?;
        debug!("Forwarding search {:?} at offset {}", query.params, offset);

        let page = self
            .source
            .fetch_properties_page(&query, offset, filter.page_size as u32)
            .await?;

        let items = page.items.unwrap_or_else(|| {
            warn!("Property search response had no items array");
            Vec::new()
        });
        let total = page
            .count
            .unwrap_or(offset as u64 + items.len() as u64);
        Ok((items, total))
    }
}

fn push_range<T: ToString + Copy>(query: &mut PropertyQuery, name: &str, range: &Range<T>) {
    if let Some(min) = range.min {
        query.push(&format!("{name}_min"), min);
    }
    if let Some(max) = range.max {
        query.push(&format!("{name}_max"), max);
    }
}

fn value<'p>(params: &'p HashMap<String, String>, key: &str) -> Option<&'p str> {
    params
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn number<T: FromStr>(params: &HashMap<String, String>, key: &str) -> Result<Option<T>> {
    value(params, key)
        .map(|raw| {
            raw.parse()
                .map_err(|_| Error::Validation(format!("{key} must be a number (got {raw:?})")))
        })
        .transpose()
}

fn flag(params: &HashMap<String, String>, key: &str) -> Result<Option<bool>> {
    value(params, key)
        .map(|raw| match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(Error::Validation(format!(
                "{key} must be true or false (got {raw:?})"
            ))),
        })
        .transpose()
}

fn date(params: &HashMap<String, String>, key: &str) -> Result<Option<NaiveDate>> {
    value(params, key)
        .map(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| Error::Validation(format!("{key} must be YYYY-MM-DD (got {raw:?})")))
        })
        .transpose()
}

fn tags(params: &HashMap<String, String>, key: &str) -> Vec<String> {
    value(params, key)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
