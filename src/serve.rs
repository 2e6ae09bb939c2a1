use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

use crate::present::Dashboard;
use crate::{info_time, Result};

/// `GET /` answers with the pre-rendered page.
pub fn router(page: Arc<str>) -> Router {
    Router::new().route("/", get(index)).with_state(page)
}

async fn index(State(page): State<Arc<str>>) -> Html<String> {
    Html(page.to_string())
}

/// Renders the dashboard once and serves it until the process is stopped.
pub async fn serve(addr: SocketAddr, dashboard: &Dashboard) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info_time!("Serving dashboard on http://{}/", listener.local_addr()?);
    serve_on(listener, Arc::from(dashboard.render_page())).await
}

async fn serve_on(listener: TcpListener, page: Arc<str>) -> Result<()> {
    axum::serve(listener, router(page)).await?;
    Ok(())
}
