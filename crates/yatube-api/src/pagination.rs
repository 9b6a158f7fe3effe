use yatube_types::api::PageDocument;

pub const POSTS_PER_PAGE: u32 = 10;
pub const PROFILE_POSTS_PER_PAGE: u32 = 5;

/// Splits `count` items into pages of `per_page`.
///
/// There is always at least one page, even with no items. Requested page
/// numbers never fail: anything that is not an integer selects the first page,
/// and integers outside `1..=num_pages` select the last one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    count: u64,
    per_page: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u32,
    pub num_pages: u32,
    pub count: u64,
    pub per_page: u32,
}

impl Paginator {
    pub fn new(count: u64, per_page: u32) -> Self {
        Self {
            count,
            per_page: per_page.max(1),
        }
    }

    pub fn num_pages(&self) -> u32 {
        if self.count == 0 {
            return 1;
        }
        let pages = self.count.div_ceil(u64::from(self.per_page));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn get_page(&self, requested: Option<&str>) -> PageWindow {
        let num_pages = self.num_pages();
        let number = match requested.map(str::trim).map(str::parse::<i64>) {
            None | Some(Err(_)) => 1,
            Some(Ok(n)) if n >= 1 && n <= i64::from(num_pages) => n as u32,
            Some(Ok(_)) => num_pages,
        };

        PageWindow {
            number,
            num_pages,
            count: self.count,
            per_page: self.per_page,
        }
    }
}

impl PageWindow {
    pub fn offset(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.per_page)
    }

    pub fn limit(&self) -> u32 {
        self.per_page
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn into_document<T>(self, items: Vec<T>) -> PageDocument<T> {
        PageDocument {
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            has_next: self.has_next(),
            has_previous: self.has_previous(),
            next_page_number: self.has_next().then(|| self.number + 1),
            previous_page_number: self.has_previous().then(|| self.number - 1),
            items,
        }
    }
}
