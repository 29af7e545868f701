//! `flowbridge server`: start the HTTP server.

pub async fn run(host: String, port: u16, provider: String, sandbox: bool) -> Result<(), String> {
    let config = flowbridge_server::ServerConfig {
        host: host.clone(),
        port,
        default_provider: provider,
        sandbox,
    };

    println!("Starting Flowbridge server on {}:{}...", host, port);

    let state = flowbridge_server::create_app_state(&config).await;
    let addr = flowbridge_server::start_server_with_state(config, state.clone()).await?;
    println!("Flowbridge server listening on http://{}", addr);

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("Failed to listen for Ctrl+C: {}", e))?;

    println!("\nShutting down...");
    state.shutdown.cancel();
    Ok(())
}
