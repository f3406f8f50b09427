use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, Result};

/// Every listing page shows this many posts.
pub const PAGE_SIZE: i64 = 10;

/// PageParams
///
/// The `?page=` query parameter of listing pages. 1-based; absent means the first page.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    pub page: Option<i64>,
}

impl PageParams {
    /// Resolves the requested page number, rejecting anything below 1.
    pub fn number(&self) -> Result<i64> {
        match self.page {
            None => Ok(1),
            Some(n) if n >= 1 => Ok(n),
            Some(n) => Err(AppError::not_found(format!("Invalid page ({n})"))),
        }
    }

    pub fn limit(&self) -> i64 {
        PAGE_SIZE
    }

    /// Row offset of the page. A number too large to have an offset cannot exist either.
    pub fn offset(&self) -> Result<i64> {
        let number = self.number()?;
        (number - 1)
            .checked_mul(PAGE_SIZE)
            .ok_or_else(|| AppError::not_found(format!("Invalid page ({number})")))
    }
}

/// Page
///
/// One page of a listing plus what the pager needs to render its links.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: i64,
    pub num_pages: i64,
    pub total: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    /// Assembles a page. A page past the end is not found, except that an empty listing
    /// still has a (blank) first page.
    pub fn new(items: Vec<T>, number: i64, total: i64) -> Result<Self> {
        let num_pages = num_pages(total);
        if number < 1 || number > num_pages {
            return Err(AppError::not_found(format!(
                "Invalid page ({number}): that page contains no results"
            )));
        }
        Ok(Self {
            items,
            number,
            num_pages,
            total,
            has_next: number < num_pages,
            has_previous: number > 1,
        })
    }
}

fn num_pages(total: i64) -> i64 {
    ((total + PAGE_SIZE - 1) / PAGE_SIZE).max(1)
}
