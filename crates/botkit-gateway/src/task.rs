//! Isolated execution of user callbacks
//!
//! Every handler runs in its own task. Errors and panics are logged and never
//! reach the read loop.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use botkit_common::{error_chain, HandlerResult};
use futures::FutureExt;
use tokio::task::JoinHandle;

/// Which kind of callback a task is running, for log context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    Event,
    Command,
    Component,
    Modal,
    Autocomplete,
    Interaction,
    Timeout,
    Raw,
}

impl HandlerKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Command => "command",
            Self::Component => "component",
            Self::Modal => "modal",
            Self::Autocomplete => "autocomplete",
            Self::Interaction => "interaction",
            Self::Timeout => "timeout",
            Self::Raw => "raw",
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run a handler future on its own task
pub fn spawn_handler<F>(kind: HandlerKind, name: impl Into<String>, fut: F) -> JoinHandle<()>
where
    F: Future<Output = HandlerResult> + Send + 'static,
{
    let name = name.into();
    tokio::spawn(async move {
        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                tracing::warn!(
                    kind = %kind,
                    handler = %name,
                    error = %error_chain(&error),
                    "Handler returned an error"
                );
            }
            Err(panic) => {
                tracing::warn!(
                    kind = %kind,
                    handler = %name,
                    panic = %panic_message(panic.as_ref()),
                    "Handler panicked"
                );
            }
        }
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_error_is_contained() {
        let handle = spawn_handler(HandlerKind::Event, "failing", async {
            Err(anyhow::anyhow!("boom"))
        });
        assert!(handle.await.is_ok());
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let handle = spawn_handler(HandlerKind::Command, "panicking", async {
            let items: Vec<u8> = Vec::new();
            if items.is_empty() {
                panic!("handler exploded");
            }
            Ok(())
        });
        assert!(handle.await.is_ok());
    }

    #[tokio::test]
    async fn test_success_runs_body() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        spawn_handler(HandlerKind::Raw, "counter", async move {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(5_u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
