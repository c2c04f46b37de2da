use htmlsp::create_service;
use htmlsp::logging::{init_logger, LOG_ENV};
use tower_lsp::Server;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let level = std::env::var(LOG_ENV).ok();
    init_logger(level.as_deref(), false);

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = create_service();
    Server::new(stdin, stdout, socket).serve(service).await;
}
