use femto_web::{HandlerResult, Request, ResponseWriter, Server, get, handler_fn};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

// Index page
async fn index(_request: Request, response: &mut ResponseWriter) -> HandlerResult {
    // Start HTTP response with content-type text/html
    response.start("text/html").await?;
    // Send actual HTML page
    response.send("<html><body><h1>Hello, world! (<a href=\"/table\">table</a>)</h1></html>\n").await?;
    Ok(())
}

// HTTP redirection
async fn redirect(_request: Request, response: &mut ResponseWriter) -> HandlerResult {
    response.redirect("/").await?;
    Ok(())
}

// Another one, more complicated page
async fn table(_request: Request, response: &mut ResponseWriter) -> HandlerResult {
    response.start("text/html").await?;
    response
        .send(
            "<html><body><h1>Simple table</h1>\
             <table border=1 width=400>\
             <tr><td>Name</td><td>Some Value</td></tr>",
        )
        .await?;
    for i in 0..10 {
        response.send(format!("<tr><td>Name{i}</td><td>Value{i}</td></tr>")).await?;
    }
    response.send("</table></html>").await?;
    Ok(())
}

// To test your server:
// - Terminal:
//   $ curl http://localhost:8081
//   or
//   $ curl http://localhost:8081/table
//
// - To test HTTP redirection:
//   curl http://localhost:8081/redirect -v
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let server = Server::builder()
        .address("0.0.0.0:8081")
        .route("/", get(handler_fn(index)))
        .route("/redirect", get(handler_fn(redirect)))
        .route("/table", get(handler_fn(table)))
        .build()
        .expect("server configuration");

    if let Err(e) = server.run().await {
        tracing::error!(cause = %e, "server error");
    }
}
