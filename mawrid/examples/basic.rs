//! Run with `RUST_LOG=mawrid=trace cargo run --example basic` to see
//! every registration and cache hit.

use std::sync::Arc;

use mawrid::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

trait Notifier: Send + Sync {
    fn notify(&self, message: &str) -> String;
}

#[derive(Injectable)]
struct ConsoleNotifier {
    #[mawrid(key = "prefix")]
    prefix: Arc<String>,
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str) -> String {
        format!("{} {message}", self.prefix)
    }
}

#[derive(Injectable)]
struct Orders {
    notifier: Arc<dyn Notifier>,
}

struct AppModule;

impl Module for AppModule {
    fn register(&self, registrar: &dyn Registrar) {
        registrar.register_value(&Identity::<String>::named("prefix"), Arc::new("[orders]".into()));
        registrar.register_auto(
            &Identity::<dyn Notifier>::of().auto_create::<ConsoleNotifier>(|it| it),
        );
        registrar.register_alias(
            &Identity::<dyn Notifier>::named("audit"),
            &Identity::<dyn Notifier>::of(),
        );
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mawrid=debug")),
        )
        .init();

    let injector = Arc::new(Injector::new());
    injector.install(&AppModule);

    let orders = injector
        .resolve(&Identity::<Orders>::of())
        .expect("orders should resolve");
    info!("{}", orders.notifier.notify("placed #42"));

    let audit = InjectSafe::<dyn Notifier>::new(injector.clone(), Identity::named("audit"));
    if let Some(audit) = audit.get() {
        info!("{}", audit.notify("audited"));
    }

    info!(
        resolvers = injector.resolvers_count(),
        resolved = injector.resolved_count(),
        "Done"
    );
}
