use femto_web::{HandlerResult, LocalFiles, Request, ResponseWriter, SendFileOptions, Server, get, handler_fn};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

// Index page, served from disk
async fn index(_request: Request, response: &mut ResponseWriter) -> HandlerResult {
    let files = LocalFiles::new("static");
    response.send_file(&files, "index.simple.html", SendFileOptions::default()).await?;
    Ok(())
}

// Images. Filename comes from the path parameter; a missing file is
// answered with 404 by the writer itself.
async fn images(request: Request, response: &mut ResponseWriter) -> HandlerResult {
    let files = LocalFiles::new("static/images");
    let name = request.param("fn").unwrap_or_default().to_owned();
    let options = SendFileOptions { content_type: Some("image/jpeg"), ..Default::default() };
    response.send_file(&files, &name, options).await?;
    Ok(())
}

// To test your server just open a page in the browser:
//   http://localhost:8081
//   or
//   http://localhost:8081/index.html
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let server = Server::builder()
        .address("0.0.0.0:8081")
        .route("/", get(handler_fn(index)))
        .route("/index.html", get(handler_fn(index)))
        .route("/images/<fn>", get(handler_fn(images)))
        .build()
        .expect("server configuration");

    if let Err(e) = server.run().await {
        tracing::error!(cause = %e, "server error");
    }
}
