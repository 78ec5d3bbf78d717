//! Context lifecycle
//!
//! A [`Context`] owns exactly one backend and forwards every public
//! operation to it, enforcing the call order
//! `new → start → (handle_event | mouse_grab | mouse_ungrab)* → stop → clean`.
//! Out-of-order calls fail with [`ErrorKind::Domain`] instead of reaching the
//! backend.

use log::{debug, info, warn};

use crate::backend::Backend;
use crate::capture::CaptureState;
use crate::config::Config;
use crate::error::{Error, ErrorKind, Result};
use crate::event::EventInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Initialized,
    Started,
    Stopped,
}

pub struct Context<B: Backend> {
    backend: B,
    config: Config,
    phase: Phase,
}

impl<B: Backend> Context<B> {
    /// Create a context with the default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(Config::default())
    }

    /// Create a context and initialize its backend
    pub fn with_config(config: Config) -> Result<Self> {
        let backend = B::init()?;
        debug!("{} backend initialized", B::NAME);
        Ok(Self {
            backend,
            config,
            phase: Phase::Initialized,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn is_started(&self) -> bool {
        self.phase == Phase::Started
    }

    pub fn capture_state(&self) -> CaptureState {
        self.backend.capture_state()
    }

    #[track_caller]
    fn require(&self, phase: Phase) -> Result<()> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(Error::throw(ErrorKind::Domain))
        }
    }

    fn report<T>(&self, operation: &str, result: Result<T>) -> Result<T> {
        if let Err(ref e) = result {
            if self.config.errors.log_on_throw {
                warn!("{} {} failed: {}", B::NAME, operation, e);
            }
        }
        result
    }

    /// Bind the host's native handles
    ///
    /// A failed start leaves the context startable again.
    pub fn start(&mut self, handles: B::Handles) -> Result<()> {
        let result = match self.phase {
            Phase::Initialized | Phase::Stopped => self.backend.start(handles, &self.config),
            Phase::Started => Err(Error::throw(ErrorKind::Domain)),
        };
        if result.is_ok() {
            self.phase = Phase::Started;
            info!("{} input started", B::NAME);
        }
        self.report("start", result)
    }

    /// Translate one native event into a validated record
    pub fn handle_event(&mut self, event: &B::Event) -> Result<EventInfo> {
        let result = self.require(Phase::Started).and_then(|()| {
            let info = self.backend.handle_event(event)?;
            if !info.is_empty() {
                info.validate()?;
            }
            Ok(info)
        });
        self.report("handle_event", result)
    }

    pub fn mouse_grab(&mut self) -> Result<bool> {
        let result = self
            .require(Phase::Started)
            .and_then(|()| self.backend.mouse_grab());
        self.report("mouse_grab", result)
    }

    pub fn mouse_ungrab(&mut self) -> Result<bool> {
        let result = self
            .require(Phase::Started)
            .and_then(|()| self.backend.mouse_ungrab());
        self.report("mouse_ungrab", result)
    }

    pub fn stop(&mut self) -> Result<()> {
        let result = self.require(Phase::Started).and_then(|()| self.backend.stop());
        if result.is_ok() {
            self.phase = Phase::Stopped;
        }
        self.report("stop", result)
    }

    /// Release the backend; a started context is stopped first
    pub fn clean(mut self) -> Result<()> {
        if self.phase == Phase::Started {
            debug!("{} context cleaned while started, stopping", B::NAME);
            self.stop()?;
        }
        let Self { backend, config, .. } = self;
        let result = backend.clean();
        if let Err(ref e) = result {
            if config.errors.log_on_throw {
                warn!("{} clean failed: {}", B::NAME, e);
            }
        }
        result
    }
}
