//! Post-render rewriting of the content container: the collapsible
//! accordion widget and outbound link interception.

use log::trace;
use std::sync::Arc;

use crate::dom::{escape_text, ClickEvent, ClickListener, Dom, ListenerId, NodeId};

/// Class marking content that should be wrapped in an accordion
pub const ACCORDION_CLASS: &str = "accordion";
pub const ACCORDION_PANEL_CLASS: &str = "accordion-panel";
/// Class toggled on header and panel while expanded
pub const ACTIVE_CLASS: &str = "active";

const ACCORDION_STYLES: &str = ".accordion{background-color:#3e6da9;color:white;cursor:pointer;\
padding:8px 15px;width:100%;border:none;text-align:justify;outline:none;font-size:14px;\
transition:0.4s;display:flex;align-items:center;position:relative;border-top-left-radius:8px;\
border-top-right-radius:8px;gap:10px;box-sizing:border-box;}\
.accordion svg{transition:fill 0.4s;}\
.accordion svg .circle{fill:white;}\
.accordion svg .horizontal,.accordion svg .vertical{fill:#3e6da9;transition:transform 0.8s ease-in-out;transform-origin:center;}\
.accordion.active svg .vertical{transform:scaleY(0);}\
.accordion-panel{max-height:0;overflow:hidden;padding-left:10px;padding-right:10px;\
transition:max-height 0.6s ease-out;border-bottom-left-radius:8px;border-bottom-right-radius:8px;\
border-bottom:3px solid #3e6da9;box-sizing:border-box;}\
.accordion-panel.active{max-height:500px;transition:max-height 0.6s ease-in;}\
.accordion-panel p,.accordion-panel div{color:black;background-color:white;}";

const ACCORDION_ICON: &str = r#"<svg width="20" height="18" viewBox="0 0 24 24"><circle class="circle" cx="12" cy="12" r="11"></circle><rect class="horizontal" x="5" y="11" width="15" height="3"></rect><rect class="vertical" x="11" y="5" width="3" height="15"></rect></svg>"#;

/// Host facility that opens a URL outside the results panel
pub trait UrlOpener: Send + Sync {
    fn open_url(&self, href: &str);
}

impl<F> UrlOpener for F
where
    F: Fn(&str) + Send + Sync,
{
    fn open_url(&self, href: &str) {
        self(href)
    }
}

/// Whether the rendered content carries the accordion marker.
///
/// Looks at element class tokens only; text that happens to mention the
/// class name does not count.
pub fn has_accordion(dom: &Dom, container: NodeId) -> bool {
    !dom.find_by_class(container, ACCORDION_CLASS).is_empty()
}

/// The two halves of a built accordion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accordion {
    pub header: NodeId,
    pub panel: NodeId,
}

impl Accordion {
    pub fn is_expanded(&self, dom: &Dom) -> bool {
        dom.has_class(self.panel, ACTIVE_CLASS)
    }

    /// Flip between expanded and collapsed. Returns the new state.
    pub fn toggle(&self, dom: &mut Dom) -> bool {
        dom.toggle_class(self.header, ACTIVE_CLASS);
        let expanded = dom.toggle_class(self.panel, ACTIVE_CLASS);
        dom.set_attribute(self.header, "aria-expanded", expanded.to_string());
        expanded
    }
}

/// Move the container's current children into a collapsed panel headed by a
/// button labelled `title`, and wire the button to toggle the panel.
pub fn build_accordion(dom: &mut Dom, container: NodeId, title: &str) -> Option<Accordion> {
    let original = dom.take_children(container);

    let markup = format!(
        r#"<style>{}</style><button class="{}" aria-expanded="false">{}<span style="font-size: 16px;">{}</span></button><div class="{}"></div>"#,
        ACCORDION_STYLES,
        ACCORDION_CLASS,
        ACCORDION_ICON,
        escape_text(title),
        ACCORDION_PANEL_CLASS
    );
    let created = dom.set_inner_html(container, &markup);

    let header = created
        .iter()
        .copied()
        .find(|n| dom.tag_name(*n) == Some("button"));
    let panel = created
        .iter()
        .copied()
        .find(|n| dom.has_class(*n, ACCORDION_PANEL_CLASS));

    let (header, panel) = match (header, panel) {
        (Some(header), Some(panel)) => (header, panel),
        _ => {
            // Markup above always yields both; restore the content if not.
            dom.clear_children(container);
            for node in original {
                dom.append_child(container, node);
            }
            return None;
        }
    };

    for node in original {
        dom.append_child(panel, node);
    }

    let accordion = Accordion { header, panel };
    dom.add_click_listener(
        header,
        Arc::new(move |dom: &mut Dom, _: &mut ClickEvent| {
            accordion.toggle(dom);
        }),
    );
    Some(accordion)
}

/// Link click handlers bound by one render pass.
///
/// Released at the start of the next DOM write and re-acquired at the end,
/// so every anchor carries exactly one interception handler.
#[derive(Debug, Default)]
pub struct LinkBindings {
    bound: Vec<(NodeId, ListenerId)>,
}

impl LinkBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    /// Drop every handler this object bound. Handlers on anchors that were
    /// already removed from the DOM went away with them.
    pub fn release(&mut self, dom: &mut Dom) -> usize {
        let mut released = 0;
        for (anchor, listener) in self.bound.drain(..) {
            if dom.remove_click_listener(anchor, listener) {
                released += 1;
            }
        }
        released
    }

    /// Bind an interception handler to every `<a href>` under `root`
    pub fn bind(&mut self, dom: &mut Dom, root: NodeId, opener: Arc<dyn UrlOpener>) -> usize {
        self.release(dom);

        let listener: ClickListener = Arc::new(move |dom: &mut Dom, event: &mut ClickEvent| {
            event.prevent_default();
            if let Some(href) = dom.attribute(event.current_target(), "href") {
                opener.open_url(href);
            }
        });

        for anchor in dom.find_with_attribute(root, "a", "href") {
            if let Some(id) = dom.add_click_listener(anchor, listener.clone()) {
                self.bound.push((anchor, id));
            }
        }
        trace!("bound {} link handler(s)", self.bound.len());
        self.bound.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn container_with(html: &str) -> (Dom, NodeId) {
        let mut dom = Dom::new();
        let container = dom.create_element("div");
        dom.set_inner_html(container, html);
        (dom, container)
    }

    #[test]
    fn test_detection_is_structural() {
        let (dom, container) = container_with(r#"<div class="accordion">X</div>"#);
        assert!(has_accordion(&dom, container));

        let (dom, container) = container_with(r#"<p>write class="accordion" to fold</p>"#);
        assert!(!has_accordion(&dom, container));

        let (dom, container) = container_with(r#"<div class="panel accordion wide">X</div>"#);
        assert!(has_accordion(&dom, container));

        let (dom, container) = container_with(r#"<div class="accordion-like">X</div>"#);
        assert!(!has_accordion(&dom, container));

        let (dom, container) = container_with("<div class='accordion'>X</div>");
        assert!(has_accordion(&dom, container));

        let (dom, container) = container_with(r#"<img alt='class="accordion"'>"#);
        assert!(!has_accordion(&dom, container));
    }

    #[test]
    fn test_build_accordion_structure() {
        let (mut dom, container) = container_with(r#"<div class="accordion">X</div>"#);
        let accordion = build_accordion(&mut dom, container, "Summary <1>").unwrap();

        assert_eq!(dom.find_by_tag(container, "button").len(), 1);
        assert_eq!(dom.find_by_class(container, ACCORDION_PANEL_CLASS).len(), 1);
        assert_eq!(dom.find_by_tag(container, "style").len(), 1);
        assert_eq!(dom.text_content(dom.find_by_tag(accordion.header, "span")[0]), "Summary <1>");
        assert_eq!(dom.inner_html(accordion.panel), r#"<div class="accordion">X</div>"#);
        assert!(!accordion.is_expanded(&dom));
        assert_eq!(dom.attribute(accordion.header, "aria-expanded"), Some("false"));
    }

    #[test]
    fn test_header_click_toggles_panel() {
        let (mut dom, container) = container_with(r#"<div class="accordion">X</div>"#);
        let accordion = build_accordion(&mut dom, container, "T").unwrap();

        dom.click(accordion.header);
        assert!(accordion.is_expanded(&dom));
        assert!(dom.has_class(accordion.header, ACTIVE_CLASS));
        assert_eq!(dom.attribute(accordion.header, "aria-expanded"), Some("true"));

        dom.click(accordion.header);
        assert!(!accordion.is_expanded(&dom));
        assert!(!dom.has_class(accordion.header, ACTIVE_CLASS));
    }

    #[test]
    fn test_link_bindings_intercept_and_rebind() {
        let (mut dom, container) = container_with(
            r#"<p><a href="https://example.com/a">a</a> <a name="x">x</a> <a href="/b"><i>b</i></a></p>"#,
        );
        let opened = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = opened.clone();
        let opener: Arc<dyn UrlOpener> = Arc::new(move |href: &str| {
            sink.lock().unwrap().push(href.to_string());
        });

        let mut bindings = LinkBindings::new();
        assert_eq!(bindings.bind(&mut dom, container, opener.clone()), 2);
        assert_eq!(bindings.bind(&mut dom, container, opener), 2);

        let anchors = dom.find_with_attribute(container, "a", "href");
        for anchor in &anchors {
            assert_eq!(dom.listener_count(*anchor), 1);
        }

        let italic = dom.find_by_tag(container, "i")[0];
        let outcome = dom.click(italic);
        assert!(outcome.default_prevented);
        assert_eq!(outcome.navigated_to, None);
        dom.click(anchors[0]);
        assert_eq!(
            *opened.lock().unwrap(),
            vec!["/b".to_string(), "https://example.com/a".to_string()]
        );

        assert_eq!(bindings.release(&mut dom), 2);
        assert!(bindings.is_empty());
        assert_eq!(dom.listener_count(anchors[0]), 0);
    }
}
