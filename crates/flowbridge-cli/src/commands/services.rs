//! `flowbridge services`: print the registered service catalog.

use flowbridge_core::state::AppState;

use super::print_json;

pub async fn list(state: &AppState) -> Result<(), String> {
    let catalog = state.engine.catalog().await;
    if catalog.is_empty() {
        println!("No services registered (try --sandbox).");
        return Ok(());
    }

    print_json(&serde_json::json!({ "providers": state.engine.catalog_json().await }));
    Ok(())
}
