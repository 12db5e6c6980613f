// Panic isolation for scheduler safety
use std::future::Future;
use std::panic::{catch_unwind, UnwindSafe};
use tracing::error;

/// Result of a panic-guarded execution
#[derive(Debug)]
pub enum PanicGuardResult<T> {
    /// Execution completed successfully
    Success(T),
    /// Execution panicked
    Panicked(String),
}

/// Execute a closure with panic isolation
///
/// If the closure panics, the panic is caught and returned as PanicGuardResult::Panicked.
/// Used for pause listener callbacks so one bad subscriber cannot stop the monitor.
pub fn execute_guarded<F, T>(f: F) -> PanicGuardResult<T>
where
    F: FnOnce() -> T + UnwindSafe,
{
    match catch_unwind(f) {
        Ok(result) => PanicGuardResult::Success(result),
        Err(panic_info) => {
            let panic_msg = panic_message(panic_info.as_ref());
            error!(panic_msg = %panic_msg, "Guarded callback panicked");
            PanicGuardResult::Panicked(panic_msg)
        }
    }
}

/// Run a future on its own task so a panic inside it is contained
///
/// The panic surfaces through the JoinHandle instead of unwinding
/// into the caller.
pub async fn spawn_guarded<F, T>(future: F) -> PanicGuardResult<T>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn(future).await {
        Ok(result) => PanicGuardResult::Success(result),
        Err(join_err) if join_err.is_panic() => {
            let panic_msg = panic_message(join_err.into_panic().as_ref());
            error!(panic_msg = %panic_msg, "Spawned task panicked");
            PanicGuardResult::Panicked(panic_msg)
        }
        Err(join_err) => PanicGuardResult::Panicked(format!("task cancelled: {join_err}")),
    }
}

fn panic_message(panic_info: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_guarded_catches_panic() {
        let result = execute_guarded(|| -> u32 { panic!("listener exploded") });
        match result {
            PanicGuardResult::Panicked(msg) => assert_eq!(msg, "listener exploded"),
            PanicGuardResult::Success(_) => panic!("expected a caught panic"),
        }
    }

    #[test]
    fn test_execute_guarded_passes_value() {
        assert!(matches!(execute_guarded(|| 7), PanicGuardResult::Success(7)));
    }

    #[tokio::test]
    async fn test_spawn_guarded_catches_async_panic() {
        let result = spawn_guarded(async {
            tokio::task::yield_now().await;
            if "42".parse::<u32>().is_ok() {
                panic!("handler exploded: {}", 42);
            }
        })
        .await;
        match result {
            PanicGuardResult::Panicked(msg) => assert_eq!(msg, "handler exploded: 42"),
            PanicGuardResult::Success(()) => panic!("expected a caught panic"),
        }
    }
}
