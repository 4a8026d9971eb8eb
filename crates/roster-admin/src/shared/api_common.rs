//! Common API types and utilities

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub(crate) mod string_or_number {
    use serde::{Deserialize, Deserializer};

    /// Accepts `15`, `"15"`, `""` and absent. Blank or unparsable input
    /// (`-1`, `abc`) reads as `None` so the caller's default applies.
    pub fn deserialize_u32_opt<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum StringOrNum {
            Num(u32),
            Str(String),
        }

        match Option::<StringOrNum>::deserialize(deserializer)? {
            Some(StringOrNum::Num(n)) => Ok(Some(n)),
            Some(StringOrNum::Str(s)) => Ok(s.trim().parse().ok()),
            None => Ok(None),
        }
    }
}

/// Sort direction as sent by the table widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// Parse `asc`/`desc`, also the widget's `ascend`/`descend`.
    /// Anything else, including an absent value, is `Desc`.
    pub fn from_widget(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        let trimmed = raw.trim().to_ascii_lowercase();
        match trimmed.strip_suffix("end").unwrap_or(&trimmed) {
            "asc" => Self::Asc,
            "desc" => Self::Desc,
            _ => Self::default(),
        }
    }

    /// MongoDB sort value
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Asc => 1,
            Self::Desc => -1,
        }
    }
}

/// A 1-based page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.page_size as u64
    }

    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }
}

/// Page size limits applied to widget input
#[derive(Debug, Clone, Copy)]
pub struct PagingLimits {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for PagingLimits {
    fn default() -> Self {
        Self {
            default_page_size: 15,
            max_page_size: 100,
        }
    }
}

impl PagingLimits {
    /// Zero or missing sizes take the default, oversized requests are capped.
    pub fn page_request(&self, page: Option<u32>, page_size: Option<u32>) -> PageRequest {
        let size = match page_size {
            Some(0) | None => self.default_page_size,
            Some(n) => n.min(self.max_page_size),
        };
        PageRequest::new(page.unwrap_or(1), size)
    }
}

/// One page of results plus the total row count
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64) -> Self {
        Self { items, total }
    }
}
