use std::net::TcpListener;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::web;
use actix_web::web::Data;
use actix_web::App;
use actix_web::HttpServer;
use tracing_actix_web::TracingLogger;

use crate::configuration::Settings;
use crate::domain::TokenPolicy;
use crate::routes::health_check;
use crate::routes::method_not_allowed;
use crate::routes::reactivate;
use crate::routes::subscribe;
use crate::routes::unsubscribe;
use crate::store::get_store;
use crate::store::SubscriberStore;
use crate::telemetry::PathOnlyRootSpan;

/// Wrapper for actix's `Server` with access to the bound port. Not to be
/// confused with actix's `App`!
pub struct Application {
    /// Left private; use `port` to access
    port: u16,
    server: Server,
    /// Kept to be closed once the server stops
    store: Arc<dyn SubscriberStore>,
}

impl Application {
    /// Build the store described by `cfg.store`, then the server around it.
    pub async fn build(cfg: Settings) -> Result<Self, anyhow::Error> {
        let store = get_store(&cfg.store)?;
        Self::build_with_store(cfg, store)
    }

    /// Like `build`, but serving from a store constructed by the caller.
    pub fn build_with_store(
        cfg: Settings,
        store: Arc<dyn SubscriberStore>,
    ) -> Result<Self, anyhow::Error> {
        let addr = format!("{}:{}", cfg.application.host, cfg.application.port);
        let listener = TcpListener::bind(addr)?;

        // with port 0, this is the port the OS picked
        let port = listener.local_addr()?.port();

        let server = run(
            listener,
            store.clone(),
            cfg.application.base_url,
            cfg.application.token_policy,
        )?;

        Ok(Self {
            port,
            server,
            store,
        })
    }

    pub fn port(&self) -> u16 { self.port }

    /// Because this consumes `self`, this should be the final function call (or
    /// passed to `tokio::spawn`). The store is closed once the server is done.
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        let outcome = self.server.await;
        self.store.close().await;
        outcome
    }
}

/// Wrapper for top-level application `base_url` (because raw `String`s may
/// conflict with one another when passed around by `Data`)
pub struct AppBaseUrl(pub String);

/// The server is not responsible for binding to an address, it only listens to
/// an already bound address.
///
/// Declares all API endpoints.
pub fn run(
    listener: TcpListener,
    store: Arc<dyn SubscriberStore>,
    base_url: String,
    token_policy: TokenPolicy,
) -> Result<Server, anyhow::Error> {
    // `Data` is externally an `Arc`, so the one store (and its connection pool)
    // is shared by every worker rather than rebuilt per request
    let store: Data<dyn SubscriberStore> = Data::from(store);
    let base_url = Data::new(AppBaseUrl(base_url));
    let token_policy = Data::new(token_policy);

    // the closure runs once per worker, hence all captured state is cloned
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::<PathOnlyRootSpan>::new())
            .route("/health_check", web::get().to(health_check))
            .service(
                web::resource("/subscribe")
                    .route(web::get().to(reactivate))
                    .route(web::post().to(subscribe))
                    .default_service(web::to(method_not_allowed)),
            )
            .service(
                web::resource("/unsubscribe")
                    .route(web::get().to(unsubscribe))
                    .route(web::post().to(unsubscribe))
                    .default_service(web::to(method_not_allowed)),
            )
            .app_data(store.clone())
            .app_data(base_url.clone())
            .app_data(token_policy.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
