use log::debug;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::dom::escape_attribute;

/// Attribute that ties a head element to the view instance that injected it
pub const SCOPE_ATTRIBUTE: &str = "data-asset-scope";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Style,
    Script,
}

/// How long an injected element is meant to stay in the head region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetLifetime {
    /// Lives until the owning view is torn down
    Component,
    /// Purged at the start of the owner's next render pass
    RenderPass,
}

/// A `<style>` or `<script>` element in the shared head region
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadElement {
    pub id: u64,
    pub kind: AssetKind,
    pub class: String,
    pub scope: u64,
    pub lifetime: AssetLifetime,
    /// Style text for styles, `src` for scripts
    pub body: String,
}

impl HeadElement {
    /// Serialize the element as it would appear in the page head.
    ///
    /// Style bodies are written verbatim: a stylesheet containing
    /// `</style>` ends the element early. Fetched stylesheets are trusted
    /// module assets.
    pub fn to_html(&self) -> String {
        match self.kind {
            AssetKind::Style => format!(
                r#"<style class="{}" {}="{}">{}</style>"#,
                escape_attribute(&self.class),
                SCOPE_ATTRIBUTE,
                self.scope,
                self.body
            ),
            AssetKind::Script => format!(
                r#"<script src="{}" class="{}" {}="{}"></script>"#,
                escape_attribute(&self.body),
                escape_attribute(&self.class),
                SCOPE_ATTRIBUTE,
                self.scope
            ),
        }
    }
}

#[derive(Debug, Default)]
struct HeadRegion {
    elements: Vec<HeadElement>,
    next_id: u64,
    next_scope: u64,
}

/// Process-wide head region shared by every view on the page.
///
/// Views never touch it directly; each acquires a [`ScopedAssets`] handle
/// and can only inject or purge elements carrying its own scope.
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    inner: Arc<Mutex<HeadRegion>>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HeadRegion> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquire a fresh scope whose elements are tagged with `class`
    pub fn scope(&self, class: impl Into<String>) -> ScopedAssets {
        let scope = {
            let mut region = self.lock();
            region.next_scope += 1;
            region.next_scope
        };
        ScopedAssets {
            registry: self.clone(),
            scope,
            class: class.into(),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Snapshot of the head region in insertion order
    pub fn elements(&self) -> Vec<HeadElement> {
        self.lock().elements.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count_with_class(&self, class: &str) -> usize {
        self.lock()
            .elements
            .iter()
            .filter(|e| e.class == class)
            .count()
    }

    pub fn to_html(&self) -> String {
        self.lock()
            .elements
            .iter()
            .map(HeadElement::to_html)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A view's handle on the head region.
///
/// Clones share the scope, including its closed state, so a loader task
/// holding a clone stops injecting once the view closes it. The registry
/// keeps no record of closed scopes.
#[derive(Debug, Clone)]
pub struct ScopedAssets {
    registry: AssetRegistry,
    scope: u64,
    class: String,
    closed: Arc<AtomicBool>,
}

impl ScopedAssets {
    pub fn scope_id(&self) -> u64 {
        self.scope
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    /// Append an element. Returns `None` once the scope has been closed.
    pub fn inject(&self, kind: AssetKind, lifetime: AssetLifetime, body: impl Into<String>) -> Option<u64> {
        let mut region = self.registry.lock();
        if self.closed.load(Ordering::SeqCst) {
            debug!("scope {} closed, dropping late {:?} asset", self.scope, kind);
            return None;
        }
        region.next_id += 1;
        let id = region.next_id;
        region.elements.push(HeadElement {
            id,
            kind,
            class: self.class.clone(),
            scope: self.scope,
            lifetime,
            body: body.into(),
        });
        Some(id)
    }

    pub fn inject_style(&self, text: impl Into<String>, lifetime: AssetLifetime) -> Option<u64> {
        self.inject(AssetKind::Style, lifetime, text)
    }

    pub fn inject_script(&self, src: impl Into<String>, lifetime: AssetLifetime) -> Option<u64> {
        self.inject(AssetKind::Script, lifetime, src)
    }

    /// Remove this scope's elements with the given lifetime
    pub fn purge(&self, lifetime: AssetLifetime) -> usize {
        self.purge_where(|e| e.lifetime == lifetime)
    }

    /// Remove every element this scope owns
    pub fn purge_all(&self) -> usize {
        self.purge_where(|_| true)
    }

    fn purge_where(&self, predicate: impl Fn(&HeadElement) -> bool) -> usize {
        let mut region = self.registry.lock();
        let before = region.elements.len();
        let scope = self.scope;
        region
            .elements
            .retain(|e| !(e.scope == scope && predicate(e)));
        before - region.elements.len()
    }

    /// Purge everything and refuse further injections
    pub fn close(&self) -> usize {
        let mut region = self.registry.lock();
        self.closed.store(true, Ordering::SeqCst);
        let before = region.elements.len();
        let scope = self.scope;
        region.elements.retain(|e| e.scope != scope);
        before - region.elements.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Elements currently owned by this scope
    pub fn owned(&self) -> Vec<HeadElement> {
        self.registry
            .lock()
            .elements
            .iter()
            .filter(|e| e.scope == self.scope)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::escape_text;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scopes_are_isolated() {
        let registry = AssetRegistry::new();
        let a = registry.scope("module-asset");
        let b = registry.scope("module-asset");
        assert_ne!(a.scope_id(), b.scope_id());

        a.inject_script("module/a.js", AssetLifetime::RenderPass);
        b.inject_script("module/b.js", AssetLifetime::RenderPass);
        assert_eq!(registry.count_with_class("module-asset"), 2);

        assert_eq!(a.purge(AssetLifetime::RenderPass), 1);
        let remaining = registry.elements();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].body, "module/b.js");
    }

    #[test]
    fn test_purge_respects_lifetime() {
        let registry = AssetRegistry::new();
        let scope = registry.scope("module-asset");
        scope.inject_style("p{}", AssetLifetime::Component);
        scope.inject_script("module/x.js", AssetLifetime::RenderPass);

        assert_eq!(scope.purge(AssetLifetime::RenderPass), 1);
        assert_eq!(scope.owned().len(), 1);
        assert_eq!(scope.owned()[0].kind, AssetKind::Style);
        assert_eq!(scope.purge_all(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_closed_scope_rejects_injection() {
        let registry = AssetRegistry::new();
        let scope = registry.scope("module-asset");
        scope.inject_style("p{}", AssetLifetime::Component);
        assert_eq!(scope.close(), 1);
        assert!(scope.is_closed());
        assert_eq!(scope.inject_style("q{}", AssetLifetime::Component), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_closed_state_is_shared_by_clones() {
        let registry = AssetRegistry::new();
        let scope = registry.scope("module-asset");
        let loader = scope.clone();
        scope.close();
        assert!(loader.is_closed());
        assert_eq!(loader.inject_style("p{}", AssetLifetime::Component), None);
        assert!(registry.is_empty());

        let sibling = registry.scope("module-asset");
        assert!(!sibling.is_closed());
        assert!(sibling.inject_style("p{}", AssetLifetime::Component).is_some());
    }

    #[test]
    fn test_many_closed_scopes_leave_nothing_behind() {
        let registry = AssetRegistry::new();
        for _ in 0..500 {
            let scope = registry.scope("module-asset");
            scope.inject_style("p{}", AssetLifetime::Component);
            scope.inject_script("module/a.js", AssetLifetime::RenderPass);
            assert_eq!(scope.close(), 2);
        }
        assert!(registry.is_empty());
        assert!(registry.scope("module-asset").inject_style("p{}", AssetLifetime::Component).is_some());
    }

    #[test]
    fn test_to_html() {
        let registry = AssetRegistry::new();
        let scope = registry.scope("module-asset");
        scope.inject_style("p{color:red}", AssetLifetime::Component);
        scope.inject_script("module/plot.js", AssetLifetime::RenderPass);
        let id = scope.scope_id();
        assert_eq!(
            registry.to_html(),
            format!(
                "<style class=\"module-asset\" data-asset-scope=\"{id}\">p{{color:red}}</style>\n\
                 <script src=\"module/plot.js\" class=\"module-asset\" data-asset-scope=\"{id}\"></script>"
            )
        );
    }

    #[test]
    fn test_escape_text_is_not_applied_to_style_bodies() {
        let registry = AssetRegistry::new();
        let scope = registry.scope("module-asset");
        scope.inject_style("a > b {}", AssetLifetime::Component);
        assert!(registry.to_html().contains("a > b {}"));
        assert_eq!(escape_text("a > b"), "a &gt; b");
    }
}
