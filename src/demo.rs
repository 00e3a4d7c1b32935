//! Catalog bot used by the binary
//!
//! Menu, a searchable paged catalog, item details with a "like" action that
//! works from anywhere, and a settings screen driven by a reply keyboard.

use async_trait::async_trait;
use dialog_stack::i18n::DictionaryTranslator;
use dialog_stack::{
    BotConfig, Button, ChatId, DefaultTexts, Environment, Flow, Handler, HandlerContext,
    HandlerResult, MessageSpec, PageRequest, PageSource, PagingError, PagingOptions, Route,
    RouteRegistry, Schema,
};
use serde_json::Value;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use strum::{EnumString, IntoStaticStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum DemoRoute {
    Menu,
    Catalog,
    Item,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum DemoAction {
    Like,
}

pub struct Demo;

impl Schema for Demo {
    type Route = DemoRoute;
    type Action = DemoAction;
}

const DICTIONARY: &str = r#"{
    "common": { "go_back": { "en": "« Back", "ru": "« Назад" } },
    "paging": {
        "helper": { "en": "Page {0} of {1}", "ru": "Страница {0} из {1}" },
        "clear_search": { "en": "✕ Clear search", "ru": "✕ Сбросить поиск" }
    },
    "catalog": {
        "likes": {
            "en": { "one": "{0} like", "other": "{0} likes" },
            "ru": { "one": "{0} лайк", "few": "{0} лайка", "many": "{0} лайков", "other": "{0} лайка" }
        }
    }
}"#;

const PAGE_SIZE_CHOICES: [&str; 3] = ["3", "5", "10"];

// ============================================================================
// Shared demo data
// ============================================================================

#[derive(Debug, Clone)]
struct Product {
    id: u64,
    name: &'static str,
}

/// In-memory product list with like counters and per-chat page sizes
#[derive(Default)]
pub struct Shop {
    products: Vec<Product>,
    likes: Mutex<HashMap<u64, i64>>,
    page_sizes: Mutex<HashMap<ChatId, u32>>,
}

impl Shop {
    pub fn new() -> Self {
        let names = [
            "Hex bolt M6",
            "Hex bolt M8",
            "Wing nut M6",
            "Flat washer",
            "Spring washer",
            "Wood screw 4x40",
            "Wood screw 5x60",
            "Wall plug 6mm",
            "Wall plug 8mm",
            "Cable tie",
            "Hinge 75mm",
            "Corner bracket",
        ];
        let products = names
            .into_iter()
            .zip(1..)
            .map(|(name, id)| Product { id, name })
            .collect();
        Self {
            products,
            ..Self::default()
        }
    }

    fn matching(&self, query: Option<&str>) -> Vec<&Product> {
        let query = query.map(str::to_lowercase);
        self.products
            .iter()
            .filter(|p| {
                query
                    .as_deref()
                    .map_or(true, |q| p.name.to_lowercase().contains(q))
            })
            .collect()
    }

    fn product(&self, id: u64) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    fn likes(&self, id: u64) -> i64 {
        self.likes
            .lock()
            .map(|likes| likes.get(&id).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn like(&self, id: u64) -> i64 {
        let Ok(mut likes) = self.likes.lock() else {
            return 0;
        };
        let count = likes.entry(id).or_insert(0);
        *count += 1;
        *count
    }

    fn page_size(&self, chat_id: ChatId) -> Option<u32> {
        self.page_sizes.lock().ok()?.get(&chat_id).copied()
    }

    fn set_page_size(&self, chat_id: ChatId, size: u32) {
        if let Ok(mut sizes) = self.page_sizes.lock() {
            sizes.insert(chat_id, size);
        }
    }
}

/// Catalog rows visible to one search
#[derive(Debug, Clone)]
pub struct CatalogRow {
    id: u64,
    name: &'static str,
}

#[async_trait]
impl PageSource for Shop {
    type Item = CatalogRow;
    type Error = Infallible;

    async fn count(&self, query: Option<&str>) -> Result<u32, Infallible> {
        Ok(u32::try_from(self.matching(query).len()).unwrap_or(u32::MAX))
    }

    async fn load(&self, request: &PageRequest) -> Result<Vec<CatalogRow>, Infallible> {
        Ok(self
            .matching(request.query.as_deref())
            .into_iter()
            .skip(request.offset as usize)
            .take(request.page_size as usize)
            .map(|p| CatalogRow {
                id: p.id,
                name: p.name,
            })
            .collect())
    }
}

fn item_id(cx: &HandlerContext<'_, Demo>) -> Option<u64> {
    cx.data().get("id").and_then(Value::as_u64)
}

// ============================================================================
// Handlers
// ============================================================================

struct MenuHandler;

#[async_trait]
impl Handler<Demo> for MenuHandler {
    async fn handle(&self, cx: &HandlerContext<'_, Demo>) -> HandlerResult {
        let text = if cx.is_step_back() {
            "Back in the main menu."
        } else {
            "Welcome to the hardware shop."
        };
        cx.render(&[MessageSpec::text(text).with_buttons(vec![
            vec![cx.button(DemoRoute::Catalog, "Catalog")],
            vec![cx.button(DemoRoute::Settings, "Settings")],
        ])])
        .await?;
        Ok(Flow::Advance)
    }
}

struct CatalogHandler {
    shop: Arc<Shop>,
}

#[async_trait]
impl Handler<Demo> for CatalogHandler {
    async fn handle(&self, cx: &HandlerContext<'_, Demo>) -> HandlerResult {
        let options = PagingOptions {
            page_size: self.shop.page_size(cx.chat_id()),
            ..PagingOptions::default()
        };
        let page = match cx.paging().setup(self.shop.as_ref(), options).await {
            Ok(page) => page,
            Err(PagingError::NoData) => {
                cx.notify("The catalog is empty.", false, false).await?;
                return Ok(Flow::Stay);
            }
            Err(PagingError::NoDataInSearch) => {
                cx.notify("Nothing matches your search. Try another word.", true, false)
                    .await?;
                return Ok(Flow::Stay);
            }
            Err(PagingError::Bot(e)) => return Err(e),
            Err(PagingError::Source(never)) => match never {},
        };

        let mut header = String::from("Catalog");
        if let Some(query) = &page.query {
            header.push_str(&format!(" matching \"{query}\""));
        }
        header.push_str(". Type to search, or a number to jump to a page.\n");
        header.push_str(&page.helper_text);

        let mut rows: Vec<Vec<Button>> = page
            .items
            .iter()
            .map(|row| {
                let count = self.shop.likes(row.id);
                let likes = cx.t_with("catalog.likes", Some(count), &[count.to_string()]);
                vec![cx
                    .button(DemoRoute::Item, format!("{} ({likes})", row.name))
                    .with_field("id", row.id)]
            })
            .collect();
        rows.extend(page.layout);

        cx.render(&[MessageSpec::text(header).with_buttons(rows)]).await?;
        Ok(Flow::Advance)
    }
}

struct ItemHandler {
    shop: Arc<Shop>,
}

#[async_trait]
impl Handler<Demo> for ItemHandler {
    async fn handle(&self, cx: &HandlerContext<'_, Demo>) -> HandlerResult {
        let Some(product) = item_id(cx).and_then(|id| self.shop.product(id)) else {
            cx.notify("That item is gone.", false, false).await?;
            return Ok(Flow::Stay);
        };

        let likes = self.shop.likes(product.id);
        let text = format!(
            "{}\n{}",
            product.name,
            cx.t_with("catalog.likes", Some(likes), &[likes.to_string()])
        );
        let mut rows = vec![vec![cx
            .action_button(DemoRoute::Item, DemoAction::Like, "Like")
            .with_field("id", product.id)]];
        rows.extend(cx.go_back_layout(None));

        cx.render(&[MessageSpec::text(text).with_buttons(rows)]).await?;
        Ok(Flow::Advance)
    }
}

/// Fires from any screen showing a like button
struct LikeHandler {
    shop: Arc<Shop>,
}

#[async_trait]
impl Handler<Demo> for LikeHandler {
    async fn handle(&self, cx: &HandlerContext<'_, Demo>) -> HandlerResult {
        let Some(product) = item_id(cx).and_then(|id| self.shop.product(id)) else {
            cx.notify("That item is gone.", false, true).await?;
            return Ok(Flow::Stay);
        };
        let count = self.shop.like(product.id);
        tracing::info!(chat_id = %cx.chat_id(), item = product.id, count, "Item liked");
        cx.notify(&format!("You liked {}", product.name), false, true)
            .await?;
        Ok(Flow::Stay)
    }
}

struct SettingsHandler {
    shop: Arc<Shop>,
}

#[async_trait]
impl Handler<Demo> for SettingsHandler {
    async fn handle(&self, cx: &HandlerContext<'_, Demo>) -> HandlerResult {
        let chosen = cx
            .text()
            .filter(|_| cx.is_message())
            .map(str::trim)
            .filter(|t| PAGE_SIZE_CHOICES.contains(t))
            .and_then(|t| t.parse::<u32>().ok());
        if let Some(size) = chosen {
            self.shop.set_page_size(cx.chat_id(), size);
        }

        let current = self
            .shop
            .page_size(cx.chat_id())
            .unwrap_or(cx.bot().config().page_size);
        let keyboard = vec![PAGE_SIZE_CHOICES.iter().map(|c| (*c).to_string()).collect()];
        cx.render(&[
            MessageSpec::text(format!("Items per page: {current}. Pick one below."))
                .with_reply_keyboard(keyboard),
            MessageSpec::text("Done?").with_buttons(cx.go_back_layout(None)),
        ])
        .await?;
        Ok(Flow::Advance)
    }
}

// ============================================================================
// Assembly
// ============================================================================

pub fn routes(shop: &Arc<Shop>) -> Vec<Route<Demo>> {
    vec![
        Route::new(DemoRoute::Menu, MenuHandler)
            .on_command()
            .on_callback()
            .commands(["start", "menu"]),
        Route::new(
            DemoRoute::Catalog,
            CatalogHandler {
                shop: Arc::clone(shop),
            },
        )
        .on_command()
        .on_callback()
        .on_message()
        .waits_for_input()
        .children([DemoRoute::Item]),
        Route::new(
            DemoRoute::Item,
            ItemHandler {
                shop: Arc::clone(shop),
            },
        )
        .on_callback()
        .global_action(
            DemoAction::Like,
            LikeHandler {
                shop: Arc::clone(shop),
            },
        ),
        Route::new(
            DemoRoute::Settings,
            SettingsHandler {
                shop: Arc::clone(shop),
            },
        )
        .on_command()
        .on_callback()
        .on_message()
        .waits_for_input()
        .with_reply_keyboard(),
    ]
}

pub fn registry(shop: &Arc<Shop>) -> Result<RouteRegistry<Demo>, dialog_stack::route::RegistryError> {
    RouteRegistry::new(routes(shop))
}

pub fn config(environment: Environment, page_size: u32) -> BotConfig<Demo> {
    BotConfig::new(DemoRoute::Menu)
        .with_entry_route(DemoRoute::Menu)
        .with_page_size(page_size)
        .with_environment(environment)
        .with_texts(DefaultTexts {
            go_back: Some("common.go_back".to_string()),
            paging_helper: Some("paging.helper".to_string()),
            clear_search: Some("paging.clear_search".to_string()),
        })
}

pub fn translator() -> Result<DictionaryTranslator, serde_json::Error> {
    DictionaryTranslator::from_json(DICTIONARY, "en")
}
