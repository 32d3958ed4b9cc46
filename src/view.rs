use log::{debug, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::assets::{self, AssetBarrier, BarrierState};
use crate::config::ViewConfig;
use crate::document::HtmlModel;
use crate::dom::{Dom, NodeId};
use crate::element::{ElementBase, ResultsElement};
use crate::error::HtmlViewResult;
use crate::fetch::AssetFetcher;
use crate::head::{AssetLifetime, AssetRegistry, ScopedAssets};
use crate::postprocess::{self, LinkBindings, UrlOpener};
use crate::validator::validate_document;

/// DOM shared between the host page and every view rendered into it
pub type SharedDom = Arc<Mutex<Dom>>;

/// Collaborators a view needs from its host
#[derive(Clone)]
pub struct ViewContext {
    pub dom: SharedDom,
    pub registry: AssetRegistry,
    pub fetcher: Arc<dyn AssetFetcher>,
    pub opener: Arc<dyn UrlOpener>,
    pub config: ViewConfig,
}

impl ViewContext {
    pub fn new(
        dom: SharedDom,
        registry: AssetRegistry,
        fetcher: Arc<dyn AssetFetcher>,
        opener: Arc<dyn UrlOpener>,
    ) -> Self {
        Self {
            dom,
            registry,
            fetcher,
            opener,
            config: ViewConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ViewConfig) -> Self {
        self.config = config;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The document has no content; nothing was touched
    Skipped,
    /// A newer render started while this one waited on assets
    Superseded { generation: u64 },
    Rendered {
        generation: u64,
        /// The content container was created by this pass
        created: bool,
        /// The accordion widget was built
        accordion: bool,
        /// Number of anchors now routed through the URL opener
        links: usize,
    },
}

/// Renders a pre-generated HTML document into a results panel once its
/// module assets are loaded.
pub struct HtmlView {
    base: ElementBase,
    model: Mutex<HtmlModel>,
    config: ViewConfig,
    dom: SharedDom,
    assets: ScopedAssets,
    barrier: AssetBarrier,
    opener: Arc<dyn UrlOpener>,
    generation: AtomicU64,
    links: Mutex<LinkBindings>,
}

impl HtmlView {
    /// Build the view, start fetching its stylesheets and inject its script
    /// tags. The host triggers the first render.
    pub fn new(model: HtmlModel, ctx: ViewContext) -> HtmlViewResult<Self> {
        ctx.config.validate()?;
        validate_document(&model.element)?;

        let assets = ctx.registry.scope(ctx.config.asset_class.clone());
        let barrier = assets::load_stylesheets(
            &model.element.stylesheets,
            &ctx.config,
            ctx.fetcher.clone(),
            assets.clone(),
        )?;

        // Nothing below can fail, so a rejected view never leaves a root behind.
        let base = {
            let mut dom = lock(&ctx.dom);
            ElementBase::new(&mut dom, &ctx.config.root_class)
        };

        let view = Self {
            base,
            model: Mutex::new(model),
            config: ctx.config,
            dom: ctx.dom,
            assets,
            barrier,
            opener: ctx.opener,
            generation: AtomicU64::new(0),
            links: Mutex::new(LinkBindings::new()),
        };
        let scripts = view.lock_model().element.scripts.clone();
        view.inject_scripts(&scripts);
        debug!(
            "html view created in scope {} ({} script(s))",
            view.assets.scope_id(),
            scripts.len()
        );
        Ok(view)
    }

    fn lock_model(&self) -> MutexGuard<'_, HtmlModel> {
        lock(&self.model)
    }

    fn lock_dom(&self) -> MutexGuard<'_, Dom> {
        lock(&self.dom)
    }

    fn inject_scripts(&self, scripts: &[String]) {
        for script in scripts {
            let src = self.config.resolve_asset_url(script);
            self.assets.inject_script(src, AssetLifetime::RenderPass);
        }
    }

    /// Render the current document.
    ///
    /// Resolves once the DOM has been written, or immediately for empty
    /// content. Fails without touching the DOM if any stylesheet failed to
    /// load. Several renders may be in flight at once; only the most recent
    /// one writes.
    pub async fn render(&self) -> HtmlViewResult<RenderOutcome> {
        let (content, scripts, title) = {
            let model = self.lock_model();
            (
                model.element.content.clone(),
                model.element.scripts.clone(),
                model.title.clone(),
            )
        };

        if content.is_empty() {
            debug!("scope {}: empty content, nothing to render", self.assets.scope_id());
            return Ok(RenderOutcome::Skipped);
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let purged = self.assets.purge(AssetLifetime::RenderPass);
        self.inject_scripts(&scripts);
        debug!(
            "scope {}: render #{} purged {} asset(s), waiting on stylesheets",
            self.assets.scope_id(),
            generation,
            purged
        );

        if let Err(err) = self.barrier.wait().await {
            warn!(
                "scope {}: render #{} abandoned: {}",
                self.assets.scope_id(),
                generation,
                err
            );
            return Err(err.into());
        }

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(
                "scope {}: render #{} superseded before assets were ready",
                self.assets.scope_id(),
                generation
            );
            return Ok(RenderOutcome::Superseded { generation });
        }

        let mut dom = self.lock_dom();
        let mut links = lock(&self.links);
        links.release(&mut dom);

        let (container, created) = match self.find_container(&dom) {
            Some(container) => {
                dom.set_inner_html(container, &content);
                (container, false)
            }
            None => {
                let container = dom.create_element("div");
                dom.add_class(container, &self.config.content_class);
                dom.set_inner_html(container, &content);
                self.add_content(&mut dom, container);
                (container, true)
            }
        };

        let accordion = postprocess::has_accordion(&dom, container)
            && postprocess::build_accordion(&mut dom, container, &title).is_some();
        let bound = links.bind(&mut dom, self.base.root(), self.opener.clone());

        debug!(
            "scope {}: render #{} wrote content (created: {}, accordion: {}, links: {})",
            self.assets.scope_id(),
            generation,
            created,
            accordion,
            bound
        );
        Ok(RenderOutcome::Rendered {
            generation,
            created,
            accordion,
            links: bound,
        })
    }

    fn find_container(&self, dom: &Dom) -> Option<NodeId> {
        dom.children(self.base.root())
            .iter()
            .copied()
            .find(|n| dom.has_class(*n, &self.config.content_class))
    }

    /// The content container, once the first render has created it
    pub fn container(&self) -> Option<NodeId> {
        let dom = self.lock_dom();
        self.find_container(&dom)
    }

    /// Replace the model. Stylesheets are fetched once per view, so changes
    /// to them are ignored; scripts take effect on the next render.
    pub fn set_model(&self, model: HtmlModel) -> HtmlViewResult<()> {
        validate_document(&model.element)?;
        let mut current = self.lock_model();
        if current.element.stylesheets != model.element.stylesheets {
            warn!(
                "scope {}: stylesheet changes are not reloaded after construction",
                self.assets.scope_id()
            );
        }
        *current = model;
        Ok(())
    }

    pub fn set_content(&self, content: impl Into<String>) {
        self.lock_model().element.content = content.into();
    }

    pub fn model(&self) -> HtmlModel {
        self.lock_model().clone()
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn assets(&self) -> &ScopedAssets {
        &self.assets
    }

    pub fn barrier_state(&self) -> BarrierState {
        self.barrier.state()
    }

    /// Generation of the most recently started render
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Remove everything the view put on the page: its head assets
    /// (including ones still being fetched), link handlers and root subtree.
    pub fn teardown(self) -> usize {
        let removed_assets = self.assets.close();
        let mut dom = lock(&self.dom);
        lock(&self.links).release(&mut dom);
        let removed_nodes = self.base.remove(&mut dom);
        debug!(
            "scope {}: torn down ({} asset(s), {} node(s))",
            self.assets.scope_id(),
            removed_assets,
            removed_nodes
        );
        removed_assets
    }
}

impl ResultsElement for HtmlView {
    fn type_name(&self) -> &'static str {
        "Html"
    }

    fn label(&self) -> &'static str {
        "Html"
    }

    fn root(&self) -> NodeId {
        self.base.root()
    }

    fn add_content(&self, dom: &mut Dom, content: NodeId) {
        self.base.add_content(dom, content);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
