use chrono::NaiveDate;
use serde::Deserialize;

/// One page of an upstream list response.
///
/// `items` is optional because the upstream contract is not trusted: a page
/// without it ends accumulation instead of failing it.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub items: Option<Vec<T>>,
    pub count: Option<u64>,
}

#[cfg(test)]
impl<T> Page<T> {
    pub fn of(items: Vec<T>) -> Self {
        Self {
            items: Some(items),
            count: None,
        }
    }
}

/// Inclusive date window for booking queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Inclusive numeric bound pair
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Range<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T> Range<T> {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// UI-level property search filter
#[derive(Debug, Clone, PartialEq)]
pub struct SearchFilter {
    /// Nightly rate
    pub rate: Range<f64>,
    pub bedrooms: Range<u32>,
    pub bathrooms: Range<f32>,
    /// Minimum guest capacity
    pub guests: Option<u32>,
    pub pets_allowed: Option<bool>,
    pub children_allowed: Option<bool>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub include_tags: Vec<String>,
    pub exclude_tags: Vec<String>,
    pub page: i64,
    pub page_size: i64,
}

impl Default for SearchFilter {
    fn default() -> Self {
        Self {
            rate: Range::default(),
            bedrooms: Range::default(),
            bathrooms: Range::default(),
            guests: None,
            pets_allowed: None,
            children_allowed: None,
            start_date: None,
            end_date: None,
            include_tags: Vec::new(),
            exclude_tags: Vec::new(),
            page: 1,
            page_size: 20,
        }
    }
}

impl SearchFilter {
    /// True when nothing but pagination is set
    pub fn is_unconstrained(&self) -> bool {
        self.rate.is_empty()
            && self.bedrooms.is_empty()
            && self.bathrooms.is_empty()
            && self.guests.is_none()
            && self.pets_allowed.is_none()
            && self.children_allowed.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.include_tags.is_empty()
            && self.exclude_tags.is_empty()
    }
}

/// Property search expressed in the upstream query vocabulary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyQuery {
    pub params: Vec<(String, String)>,
}

impl PropertyQuery {
    pub fn push(&mut self, key: &str, value: impl ToString) {
        self.params.push((key.to_string(), value.to_string()));
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}
