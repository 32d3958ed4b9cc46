//! Stylesheet loading and the asset barrier renders wait on.
//!
//! All fetches for a view are started once, when the view is built. Each
//! successful fetch injects its text as a `<style>` element the moment it
//! arrives, so injection order follows completion order rather than
//! declaration order. The barrier opens when every fetch has finished and
//! fails as soon as any one of them fails.

use log::{debug, warn};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::config::ViewConfig;
use crate::error::{FetchError, HtmlViewError, HtmlViewResult};
use crate::fetch::AssetFetcher;
use crate::head::{AssetLifetime, ScopedAssets};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarrierState {
    Pending,
    Ready,
    Failed(FetchError),
}

impl BarrierState {
    pub fn is_settled(&self) -> bool {
        !matches!(self, BarrierState::Pending)
    }
}

/// Aggregate completion of every stylesheet fetch of one view.
///
/// Cloning is cheap and every clone observes the same outcome, so any
/// number of renders can wait on it at once.
#[derive(Debug, Clone)]
pub struct AssetBarrier {
    rx: watch::Receiver<BarrierState>,
}

impl AssetBarrier {
    /// A barrier with nothing to wait for
    pub fn ready() -> Self {
        let (_tx, rx) = watch::channel(BarrierState::Ready);
        Self { rx }
    }

    pub fn state(&self) -> BarrierState {
        self.rx.borrow().clone()
    }

    /// Resolve once every fetch succeeded, or with the first failure
    pub async fn wait(&self) -> Result<(), FetchError> {
        let mut rx = self.rx.clone();
        let settled = match rx.wait_for(BarrierState::is_settled).await {
            Ok(state) => state.clone(),
            // Sender gone while still pending: the loader task never finished
            Err(_) => BarrierState::Failed(FetchError::Aborted {
                url: String::new(),
                reason: "asset loader task ended".to_string(),
            }),
        };
        match settled {
            BarrierState::Failed(err) => Err(err),
            _ => Ok(()),
        }
    }
}

/// Start fetching every stylesheet and return the barrier guarding them.
///
/// Needs a tokio runtime; fetches are spawned onto it immediately.
pub fn load_stylesheets(
    paths: &[String],
    config: &ViewConfig,
    fetcher: Arc<dyn AssetFetcher>,
    assets: ScopedAssets,
) -> HtmlViewResult<AssetBarrier> {
    if paths.is_empty() {
        return Ok(AssetBarrier::ready());
    }

    let runtime = Handle::try_current().map_err(|_| HtmlViewError::NoRuntime)?;
    let urls: Vec<String> = paths.iter().map(|p| config.resolve_asset_url(p)).collect();
    let (tx, rx) = watch::channel(BarrierState::Pending);

    debug!(
        "scope {}: fetching {} stylesheet(s)",
        assets.scope_id(),
        urls.len()
    );

    runtime.spawn(async move {
        let mut pending = JoinSet::new();
        for url in urls {
            let fetcher = fetcher.clone();
            pending.spawn(async move {
                let result = fetcher.fetch_text(&url).await;
                (url, result)
            });
        }

        let mut failed = false;
        while let Some(joined) = pending.join_next().await {
            let outcome = match joined {
                Ok((url, Ok(text))) => {
                    assets.inject_style(text, AssetLifetime::Component);
                    debug!("scope {}: injected stylesheet {}", assets.scope_id(), url);
                    continue;
                }
                Ok((_, Err(err))) => err,
                Err(join_err) => FetchError::Aborted {
                    url: String::new(),
                    reason: join_err.to_string(),
                },
            };
            warn!("scope {}: {}", assets.scope_id(), outcome);
            if !failed {
                failed = true;
                tx.send_replace(BarrierState::Failed(outcome));
            }
        }

        if !failed {
            debug!("scope {}: asset barrier open", assets.scope_id());
            tx.send_replace(BarrierState::Ready);
        }
    });

    Ok(AssetBarrier { rx })
}
