//! Paging helper
//!
//! Resolves the requested page and search query from the update and the
//! route's state data, asks a [`PageSource`] for the count and the page,
//! builds the navigation layout and remembers where the user is.

use crate::bot::BotError;
use crate::dispatch::HandlerContext;
use crate::message::Button;
use crate::payload::ButtonPayload;
use crate::route::Schema;
use async_trait::async_trait;
use thiserror::Error;

const PREV_TEXT: &str = "<";
const NEXT_TEXT: &str = ">";
const PLACEHOLDER_TEXT: &str = "-";

#[derive(Debug, Error)]
pub enum PagingError<E> {
    #[error("No data")]
    NoData,
    #[error("No data matches the search query")]
    NoDataInSearch,
    /// Error reported by the page source, passed through untouched
    #[error("Page source failed")]
    Source(E),
    #[error(transparent)]
    Bot(#[from] BotError),
}

/// Window requested from a [`PageSource`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: u32,
    pub page: u32,
    pub page_size: u32,
    pub query: Option<String>,
}

/// Externally owned, countable collection
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Send;
    type Error: Send;

    async fn count(&self, query: Option<&str>) -> Result<u32, Self::Error>;

    async fn load(&self, request: &PageRequest) -> Result<Vec<Self::Item>, Self::Error>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PagingOptions {
    /// Overrides the configured page size
    pub page_size: Option<u32>,
    pub go_back_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub page: u32,
    pub page_count: u32,
    pub query: Option<String>,
    pub items: Vec<T>,
    /// "Page X of Y"
    pub helper_text: String,
    /// Optional clear-search row, then the navigation row
    pub layout: Vec<Vec<Button>>,
}

/// Page from free text if it is a whole number, else the stored page,
/// else 1. Only integers count as page numbers: "7.5" or "1e3" are search
/// text, and values below 1 select page 1.
pub(crate) fn resolve_page(text: Option<&str>, stored: Option<u32>) -> u32 {
    let requested = text
        .and_then(|t| t.trim().parse::<i64>().ok())
        .or(stored.map(i64::from))
        .unwrap_or(1);
    u32::try_from(requested.max(1)).unwrap_or(u32::MAX)
}

/// Query from free text that is not a whole number, else the stored query
pub(crate) fn resolve_search(text: Option<&str>, stored: Option<&str>) -> Option<String> {
    match text {
        Some(t) if t.trim().parse::<i64>().is_err() => Some(t.to_string()),
        _ => stored.map(str::to_string),
    }
}

/// Clamp `page` into `[1, ceil(count / page_size)]`, returning it with the
/// page count
pub(crate) fn clamp_page(page: u32, count: u32, page_size: u32) -> (u32, u32) {
    let page_count = count.div_ceil(page_size.max(1)).max(1);
    (page.clamp(1, page_count), page_count)
}

/// Paging helper bound to one handler context
pub struct Paging<'c, 'a, S: Schema> {
    cx: &'c HandlerContext<'a, S>,
}

impl<'c, 'a, S: Schema> Paging<'c, 'a, S> {
    pub(crate) fn new(cx: &'c HandlerContext<'a, S>) -> Self {
        Self { cx }
    }

    /// Load the current page of `source` and persist the position
    pub async fn setup<P: PageSource>(
        &self,
        source: &P,
        options: PagingOptions,
    ) -> Result<Page<P::Item>, PagingError<P::Error>> {
        let cx = self.cx;
        let data = cx.data();
        // Only typed text selects a page or query; command text never does
        let text = if cx.is_message() { cx.text() } else { None };

        let requested = resolve_page(text, data.page);
        let query = resolve_search(text, data.search.as_deref());
        let page_size = options
            .page_size
            .unwrap_or(cx.bot().config().page_size)
            .max(1);

        let count = source
            .count(query.as_deref())
            .await
            .map_err(PagingError::Source)?;
        if count == 0 {
            return Err(if query.is_some() {
                PagingError::NoDataInSearch
            } else {
                PagingError::NoData
            });
        }

        let (page, page_count) = clamp_page(requested, count, page_size);
        let request = PageRequest {
            offset: page_size * (page - 1),
            page,
            page_size,
            query: query.clone(),
        };
        let items = source.load(&request).await.map_err(PagingError::Source)?;

        let layout = self.layout(page, page_count, query.is_some(), options.go_back_text.as_deref());

        let session = cx.session();
        let mut stored = session.state_data(cx.route()).await.map_err(BotError::from)?;
        stored.page = Some(page);
        stored.search.clone_from(&query);
        session
            .set_state_data(cx.route(), &stored)
            .await
            .map_err(BotError::from)?;

        tracing::debug!(chat_id = %cx.chat_id(), page, page_count, query = ?query, "Page loaded");

        Ok(Page {
            page,
            page_count,
            query,
            items,
            helper_text: self.helper_text(page, page_count),
            layout,
        })
    }

    fn helper_text(&self, page: u32, page_count: u32) -> String {
        match &self.cx.bot().config().texts.paging_helper {
            Some(key) => self.cx.t_with(
                key,
                Some(i64::from(page)),
                &[page.to_string(), page_count.to_string()],
            ),
            None => format!("Page {page} of {page_count}"),
        }
    }

    fn clear_search_text(&self) -> String {
        match &self.cx.bot().config().texts.clear_search {
            Some(key) => self.cx.t(key),
            None => "Clear search".to_string(),
        }
    }

    fn layout(
        &self,
        page: u32,
        page_count: u32,
        searching: bool,
        go_back_text: Option<&str>,
    ) -> Vec<Vec<Button>> {
        let route = self.cx.route();
        let page_button =
            |text: &str, target: u32| Button::new(text, ButtonPayload::route(route).with_page(target));

        let prev = if page > 1 {
            page_button(PREV_TEXT, page - 1)
        } else {
            page_button(PLACEHOLDER_TEXT, 1)
        };
        let next = if page < page_count {
            page_button(NEXT_TEXT, page + 1)
        } else {
            page_button(PLACEHOLDER_TEXT, page_count)
        };

        let mut rows = Vec::with_capacity(2);
        if searching {
            rows.push(vec![Button::new(
                self.clear_search_text(),
                ButtonPayload::route(route).with_search(false),
            )]);
        }
        rows.push(vec![prev, self.cx.go_back_button(go_back_text), next]);
        rows
    }
}
