use serde::Deserialize;

const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 100;

/// `page`/`limit` query parameters shared by the list endpoints.
#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct PaginationQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PaginationQuery {
    pub fn page(&self) -> u32 {
        self.page.filter(|p| *p >= 1).unwrap_or(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit
            .filter(|l| *l >= 1)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT)
    }

    pub fn offset(&self) -> u32 {
        (self.page() - 1) * self.limit()
    }

    pub fn total_pages(&self, total: usize) -> u32 {
        let limit = self.limit() as usize;
        (total.div_ceil(limit)) as u32
    }
}
