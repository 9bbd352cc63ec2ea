use injectum::{
    BoxFuture, CloseErrorKind, Container, Extension, Inject, InstantiateErrorKind, Provider, Scoped, Singleton,
    StartErrorKind,
};
use parking_lot::Mutex;
use std::{
    any::Any,
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
};
use tracing_test::traced_test;

struct Config;
struct Request;

type Log = Arc<Mutex<Vec<String>>>;

struct Lifespan {
    name: &'static str,
    log: Log,
    fail_startup: bool,
}

impl Lifespan {
    fn new(name: &'static str, log: &Log) -> Arc<dyn Extension> {
        Arc::new(Self {
            name,
            log: log.clone(),
            fail_startup: false,
        })
    }

    fn failing(name: &'static str, log: &Log) -> Arc<dyn Extension> {
        Arc::new(Self {
            name,
            log: log.clone(),
            fail_startup: true,
        })
    }
}

impl Extension for Lifespan {
    fn name(&self) -> &'static str {
        self.name
    }

    fn on_startup<'a>(&'a self, _container: &'a Container) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.log.lock().push(format!("{} startup", self.name));
            if self.fail_startup {
                anyhow::bail!("{} is unavailable", self.name);
            }
            Ok(())
        })
    }

    fn on_shutdown<'a>(&'a self, _container: &'a Container) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.log.lock().push(format!("{} shutdown", self.name));
            Ok(())
        })
    }
}

#[derive(Default)]
struct ResolveCounter {
    sync_calls: AtomicU8,
    async_calls: AtomicU8,
}

impl Extension for ResolveCounter {
    fn on_resolve_sync(&self, _provider: &Provider, _instance: &(dyn Any + Send + Sync)) -> anyhow::Result<()> {
        self.sync_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_resolve<'a>(&'a self, _provider: &'a Provider, _instance: &'a (dyn Any + Send + Sync)) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.async_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

struct FailingHook;

impl Extension for FailingHook {
    fn on_resolve_sync(&self, _provider: &Provider, _instance: &(dyn Any + Send + Sync)) -> anyhow::Result<()> {
        anyhow::bail!("hook failed")
    }
}

fn providers() -> [Provider; 2] {
    [
        Singleton::new(|| Ok::<_, InstantiateErrorKind>(Config)),
        Scoped::new(|_config: Inject<Config>| Ok::<_, InstantiateErrorKind>(Request)),
    ]
}

#[tokio::test]
#[traced_test]
async fn test_lifespan_order() {
    let log = Log::default();
    let container = Container::with_extensions(vec![Lifespan::new("A", &log), Lifespan::new("B", &log)]);

    container.start().await.unwrap();
    assert!(matches!(container.start().await, Err(StartErrorKind::AlreadyStarted)));
    container.aclose().await.unwrap();

    assert_eq!(*log.lock(), ["A startup", "B startup", "B shutdown", "A shutdown"]);
}

#[tokio::test]
#[traced_test]
async fn test_startup_failure_shuts_down_started() {
    let log = Log::default();
    let container = Container::with_extensions(vec![
        Lifespan::new("A", &log),
        Lifespan::failing("B", &log),
        Lifespan::new("C", &log),
    ]);

    let err = container.start().await.unwrap_err();
    assert!(matches!(err, StartErrorKind::Startup { extension: "B", .. }));
    assert_eq!(*log.lock(), ["A startup", "B startup", "A shutdown"]);

    container.aclose().await.unwrap();
    assert_eq!(log.lock().len(), 3);
}

#[test]
#[traced_test]
fn test_resolve_hook_called_once_per_instance() {
    let counter = Arc::new(ResolveCounter::default());
    let container = Container::with_extensions(vec![counter.clone() as Arc<dyn Extension>]);
    container.register_all(providers()).unwrap();

    let context = container.sync_context();
    context.resolve::<Request>().unwrap();
    context.resolve::<Request>().unwrap();
    assert_eq!(counter.sync_calls.load(Ordering::SeqCst), 2);

    container.sync_context().resolve::<Request>().unwrap();
    assert_eq!(counter.sync_calls.load(Ordering::SeqCst), 3);
    assert_eq!(counter.async_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
#[traced_test]
async fn test_async_resolve_hook() {
    let counter = Arc::new(ResolveCounter::default());
    let container = Container::with_extensions(vec![counter.clone() as Arc<dyn Extension>]);
    container.register_all(providers()).unwrap();

    container.context().resolve::<Request>().await.unwrap();
    assert_eq!(counter.async_calls.load(Ordering::SeqCst), 2);
    assert_eq!(counter.sync_calls.load(Ordering::SeqCst), 0);
}

#[test]
#[traced_test]
fn test_resolve_hook_error_ignored() {
    let container = Container::with_extensions(vec![Arc::new(FailingHook) as Arc<dyn Extension>]);
    container.register_all(providers()).unwrap();

    assert!(container.sync_context().resolve::<Request>().is_ok());
    assert!(logs_contain("Resolve hook failed"));
}

#[tokio::test]
#[traced_test]
async fn test_shutdown_error_reported() {
    struct FailingShutdown;

    impl Extension for FailingShutdown {
        fn on_shutdown<'a>(&'a self, _container: &'a Container) -> BoxFuture<'a, anyhow::Result<()>> {
            Box::pin(async { anyhow::bail!("shutdown failed") })
        }
    }

    let log = Log::default();
    let container = Container::with_extensions(vec![Lifespan::new("A", &log), Arc::new(FailingShutdown) as Arc<dyn Extension>]);
    container.start().await.unwrap();

    assert!(matches!(container.aclose().await, Err(CloseErrorKind::Shutdown { .. })));
    assert_eq!(*log.lock(), ["A startup", "A shutdown"]);
}
