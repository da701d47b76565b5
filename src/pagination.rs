use serde::{Deserialize, Serialize};

/// The `?page=` query parameter. Kept as a raw string so that garbage values
/// fall back to the first page instead of rejecting the request.
#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<String>,
}

impl PageQuery {
    pub fn requested(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|page| page.trim().parse::<i64>().ok())
            .unwrap_or(1)
    }
}

/// Resolved position of one page inside a feed of `count` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: i64,
    pub num_pages: i64,
    pub per_page: i64,
    pub count: i64,
}

impl PageWindow {
    /// Clamps `requested` into `1..=num_pages`. An empty feed still has one page.
    pub fn resolve(requested: i64, per_page: i64, count: i64) -> Self {
        let per_page = per_page.max(1);
        let count = count.max(0);
        let num_pages = ((count + per_page - 1) / per_page).max(1);
        let number = requested.clamp(1, num_pages);
        Self {
            number,
            num_pages,
            per_page,
            count,
        }
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }

    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.per_page
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Page<T> {
    pub object_list: Vec<T>,
    pub number: i64,
    pub num_pages: i64,
    pub count: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    pub fn new(object_list: Vec<T>, window: PageWindow) -> Self {
        Self {
            object_list,
            number: window.number,
            num_pages: window.num_pages,
            count: window.count,
            has_next: window.has_next(),
            has_previous: window.has_previous(),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            object_list: self.object_list.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            has_next: self.has_next,
            has_previous: self.has_previous,
        }
    }
}
