//! Loopback HTTP server for exercising the REST clients against real requests.

use actix_web::dev::ServerHandle;
use actix_web::{web, App, HttpServer};

pub struct TestServer {
    pub url: String,
    handle: ServerHandle,
}

impl TestServer {
    /// Bind an ephemeral port on 127.0.0.1 and serve the routes from `configure`.
    pub fn start<F>(configure: F) -> Self
    where
        F: Fn(&mut web::ServiceConfig) + Send + Clone + 'static,
    {
        let server = HttpServer::new(move || App::new().configure(configure.clone()))
            .workers(1)
            .bind(("127.0.0.1", 0))
            .expect("bind test server");
        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        Self {
            url: format!("http://{}", addr),
            handle,
        }
    }

    pub async fn stop(self) {
        self.handle.stop(false).await;
    }
}
