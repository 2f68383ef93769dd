use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    devflow::cli::app::run().await
}
