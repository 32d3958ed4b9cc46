//! # Results HTML view
//!
//! Renders blocks of pre-generated HTML into a results panel once the
//! document's module assets are in place.
//!
//! ## Features
//! - Stylesheets fetched concurrently and injected into a shared head region
//! - Renders gated on every stylesheet, failing cleanly if any is missing
//! - Content containers reused across renders, newest render wins
//! - Accordion widget built around content carrying the `accordion` class
//! - Link clicks routed to the host instead of navigating the page
//!
//! ## Example
//! ```ignore
//! use results_html::{AssetRegistry, DirFetcher, Dom, HtmlDocument, HtmlModel, HtmlView, ViewContext};
//! use std::sync::{Arc, Mutex};
//!
//! let dom = Arc::new(Mutex::new(Dom::new()));
//! let ctx = ViewContext::new(
//!     dom.clone(),
//!     AssetRegistry::new(),
//!     Arc::new(DirFetcher::new("static")),
//!     Arc::new(|href: &str| println!("open {}", href)),
//! );
//!
//! let doc = HtmlDocument::new("<p>Hello</p>").with_stylesheet("table.css");
//! let view = HtmlView::new(HtmlModel::new("Summary", doc), ctx)?;
//! view.render().await?;
//! ```

pub mod assets;
pub mod config;
pub mod document;
pub mod dom;
pub mod element;
pub mod error;
pub mod fetch;
pub mod head;
pub mod postprocess;
pub mod validator;
pub mod view;

// --- Core types ---
pub use assets::{AssetBarrier, BarrierState};
pub use config::ViewConfig;
pub use document::{HtmlDocument, HtmlModel, ResultStatus};
pub use dom::{ClickEvent, DispatchOutcome, Dom, NodeId};
pub use element::{ElementBase, ResultsElement};
pub use error::{FetchError, HtmlViewError, HtmlViewResult};
pub use fetch::{AssetFetcher, DirFetcher, FetchFuture};
pub use head::{AssetKind, AssetLifetime, AssetRegistry, HeadElement, ScopedAssets};
pub use postprocess::{Accordion, LinkBindings, UrlOpener};
pub use view::{HtmlView, RenderOutcome, SharedDom, ViewContext};
