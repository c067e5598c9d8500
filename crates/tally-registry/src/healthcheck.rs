//! Health checks live in the registry next to metrics but carry no
//! numeric value, so reporters skip them.

use std::fmt;
use std::sync::Mutex;

use crate::lock;

type CheckFn = Box<dyn Fn(&Healthcheck) + Send + Sync>;

pub struct Healthcheck {
    check_fn: CheckFn,
    error: Mutex<Option<String>>,
}

impl Healthcheck {
    /// `check_fn` is expected to call [`Healthcheck::healthy`] or
    /// [`Healthcheck::unhealthy`] on the handle it is given.
    pub fn new(check_fn: impl Fn(&Healthcheck) + Send + Sync + 'static) -> Self {
        Self {
            check_fn: Box::new(check_fn),
            error: Mutex::new(None),
        }
    }

    pub fn check(&self) {
        (self.check_fn)(self);
    }

    /// Last recorded error, `None` while healthy.
    pub fn error(&self) -> Option<String> {
        lock(&self.error).clone()
    }

    pub fn healthy(&self) {
        *lock(&self.error) = None;
    }

    pub fn unhealthy(&self, err: impl Into<String>) {
        *lock(&self.error) = Some(err.into());
    }
}

impl fmt::Debug for Healthcheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Healthcheck")
            .field("error", &self.error())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn check_drives_status() {
        let up = Arc::new(AtomicBool::new(true));
        let flag = up.clone();
        let hc = Healthcheck::new(move |h| {
            if flag.load(Ordering::Relaxed) {
                h.healthy();
            } else {
                h.unhealthy("backend down");
            }
        });

        hc.check();
        assert_eq!(hc.error(), None);

        up.store(false, Ordering::Relaxed);
        hc.check();
        assert_eq!(hc.error().as_deref(), Some("backend down"));

        up.store(true, Ordering::Relaxed);
        hc.check();
        assert_eq!(hc.error(), None);
    }
}
