use results_html::{
    AssetRegistry, DirFetcher, Dom, HtmlModel, HtmlView, HtmlViewError, RenderOutcome,
    ResultsElement, ViewContext,
};
use std::env;
use std::fs;
use std::process;
use std::sync::{Arc, Mutex};

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: render-html <model.yaml> [asset-dir]");
        eprintln!();
        eprintln!("Examples:");
        eprintln!("  render-html descriptives.yaml");
        eprintln!("  render-html descriptives.yaml ./static");
        process::exit(1);
    }

    let asset_dir = args.get(2).map(String::as_str).unwrap_or(".");

    match render_file(&args[1], asset_dir).await {
        Ok(()) => {}
        Err(e) => {
            eprintln!("✗ {} failed to render:", args[1]);
            print_error(&e);
            process::exit(1);
        }
    }
}

async fn render_file(path: &str, asset_dir: &str) -> Result<(), HtmlViewError> {
    let yaml = fs::read_to_string(path)?;
    let model = HtmlModel::from_yaml_str(&yaml)?;

    let dom = Arc::new(Mutex::new(Dom::new()));
    let registry = AssetRegistry::new();
    let ctx = ViewContext::new(
        dom.clone(),
        registry.clone(),
        Arc::new(DirFetcher::new(asset_dir)),
        Arc::new(|href: &str| println!("open {}", href)),
    );

    let view = HtmlView::new(model, ctx)?;
    let outcome = view.render().await?;

    if outcome == RenderOutcome::Skipped {
        println!("✓ {} has no content", path);
        return Ok(());
    }

    println!("<!-- head -->");
    println!("{}", registry.to_html());
    println!("<!-- body -->");
    let html = {
        let dom = dom.lock().unwrap_or_else(|e| e.into_inner());
        dom.outer_html(view.root())
    };
    println!("{}", html);
    Ok(())
}

fn print_error(error: &HtmlViewError) {
    match error {
        HtmlViewError::AssetLoad(fetch) => {
            eprintln!("  Stylesheet failed to load:");
            eprintln!("    {}", fetch);
        }
        HtmlViewError::AssetPathRejected { path, reason } => {
            eprintln!("  Asset path '{}' rejected:", path);
            eprintln!("    {}", reason);
        }
        HtmlViewError::Io(msg) => {
            eprintln!("  Failed to read file:");
            eprintln!("    {}", msg);
        }
        HtmlViewError::DeserializationError(msg) => {
            eprintln!("  Model error:");
            eprintln!("    {}", msg);
        }
        e => {
            eprintln!("  {}", e);
        }
    }
}
