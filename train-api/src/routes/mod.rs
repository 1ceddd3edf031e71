/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, token refresh
/// - `tasks`: Task marketplace
/// - `submissions`: Trainer submissions
/// - `payments`: Balance, history, withdrawals
/// - `users`: Profile, stats, leaderboard
/// - `clients`: Client dashboard and review
/// - `admin`: Monetization, analytics, payout settlement
/// - `subscriptions`: Plans and user subscriptions

pub mod admin;
pub mod auth;
pub mod clients;
pub mod health;
pub mod payments;
pub mod submissions;
pub mod subscriptions;
pub mod tasks;
pub mod users;

use serde::{Deserialize, Serialize};

/// Default page size for list endpoints
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Largest page size a caller may request
pub const MAX_PAGE_SIZE: i64 = 100;

/// `?limit=&offset=` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    /// Clamped `(limit, offset)`
    pub fn resolve(&self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

/// Page of results with the unpaginated total
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, (limit, offset): (i64, i64)) -> Self {
        Self {
            items,
            total,
            limit,
            offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults_and_clamping() {
        assert_eq!(Pagination::default().resolve(), (20, 0));

        let page = Pagination {
            limit: Some(500),
            offset: Some(-3),
        };
        assert_eq!(page.resolve(), (100, 0));

        let page = Pagination {
            limit: Some(0),
            offset: Some(40),
        };
        assert_eq!(page.resolve(), (1, 40));
    }
}
