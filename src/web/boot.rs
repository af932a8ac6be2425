//! wasm entry point: discover host elements and attach a carousel to each.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlElement;

use crate::web::instance::WebInstance;

const INSTANCE_SELECTOR: &str = r#"[data-vitrine-role~="instance"]"#;

thread_local! {
    /// Instances live for the page; this keeps their closures rooted.
    static INSTANCES: RefCell<Vec<Rc<RefCell<WebInstance>>>> = RefCell::new(Vec::new());
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);

    if prefers_reduced_motion() {
        log::info!("prefers-reduced-motion set, leaving host elements untouched");
        return;
    }

    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };
    let Ok(hosts) = document.query_selector_all(INSTANCE_SELECTOR) else {
        return;
    };

    for position in 0..hosts.length() {
        let Some(node) = hosts.get(position) else {
            continue;
        };
        let Ok(host) = node.dyn_into::<HtmlElement>() else {
            continue;
        };
        wasm_bindgen_futures::spawn_local(async move {
            match WebInstance::attach(host).await {
                Ok(instance) => {
                    INSTANCES.with(|instances| instances.borrow_mut().push(instance));
                }
                Err(e) => log::error!("carousel initialization failed: {e:?}"),
            }
        });
    }
}

fn prefers_reduced_motion() -> bool {
    web_sys::window()
        .and_then(|w| w.match_media("(prefers-reduced-motion: reduce)").ok())
        .flatten()
        .map(|list| list.matches())
        .unwrap_or(false)
}
