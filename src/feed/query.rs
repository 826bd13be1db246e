use std::{collections::HashMap, fmt, str::FromStr};

use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 20;
pub const MAX_TAGS: usize = 5;
pub const MAX_SEARCH_LEN: usize = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeedQueryError {
    #[error("sort must be one of: asc, desc (got {0:?})")]
    InvalidSort(String),
    #[error("limit must be between 1 and 20")]
    LimitOutOfRange,
    #[error("offset must not be negative")]
    NegativeOffset,
    #[error("at most 5 tags are allowed")]
    TooManyTags,
    #[error("search must be at most 100 characters")]
    SearchTooLong,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = FeedQueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(FeedQueryError::InvalidSort(other.to_string())),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        })
    }
}

/// Filtered, offset-paginated feed request.
///
/// Offset pagination is not stable under concurrent inserts: a page boundary
/// can repeat or skip rows when posts are created between requests.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedQuery {
    pub limit: i64,
    pub offset: i64,
    pub sort: SortDirection,
    /// Matched case-insensitively against title or content; empty matches all.
    pub search: String,
    /// Matches posts carrying any of these tags; empty disables the filter.
    pub tags: Vec<String>,
    pub since: Option<OffsetDateTime>,
    pub until: Option<OffsetDateTime>,
}

impl Default for FeedQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
            sort: SortDirection::Desc,
            search: String::new(),
            tags: Vec::new(),
            since: None,
            until: None,
        }
    }
}

impl FeedQuery {
    /// Builds a query from raw query-string pairs.
    ///
    /// Unparsable `limit`, `offset`, `since` or `until` values are ignored and
    /// the default kept; an unknown `sort` value rejects the whole query.
    pub fn parse(params: &HashMap<String, String>) -> Result<Self, FeedQueryError> {
        let mut q = FeedQuery::default();

        if let Some(limit) = params.get("limit").and_then(|v| v.trim().parse().ok()) {
            q.limit = limit;
        }
        if let Some(offset) = params.get("offset").and_then(|v| v.trim().parse().ok()) {
            q.offset = offset;
        }
        if let Some(sort) = params.get("sort").filter(|v| !v.is_empty()) {
            q.sort = sort.parse()?;
        }
        if let Some(tags) = params.get("tags") {
            q.tags = tags
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(search) = params.get("search") {
            q.search = search.clone();
        }
        q.since = params.get("since").and_then(|v| parse_time(v));
        q.until = params.get("until").and_then(|v| parse_time(v));

        q.validate()?;
        Ok(q)
    }

    pub fn validate(&self) -> Result<(), FeedQueryError> {
        if !(1..=MAX_LIMIT).contains(&self.limit) {
            return Err(FeedQueryError::LimitOutOfRange);
        }
        if self.offset < 0 {
            return Err(FeedQueryError::NegativeOffset);
        }
        if self.tags.len() > MAX_TAGS {
            return Err(FeedQueryError::TooManyTags);
        }
        if self.search.chars().count() > MAX_SEARCH_LEN {
            return Err(FeedQueryError::SearchTooLong);
        }
        Ok(())
    }
}

fn parse_time(s: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(s, &Rfc3339).ok()
}
