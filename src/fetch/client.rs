use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes the HTTP requests needed to download an export.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
