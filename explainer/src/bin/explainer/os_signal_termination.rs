use std::ffi::c_int;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use explainer::core::termination::TerminationCondition;
use log::warn;

const NO_SIGNAL: usize = 0;

/// Stops the explanation when the process receives SIGINT or SIGTERM, so that the statistics and
/// the partial result of an enumeration can still be printed.
#[derive(Clone, Debug)]
pub(crate) struct OsSignal {
    /// The number of the last received signal, or [`NO_SIGNAL`].
    received: Arc<AtomicUsize>,
}

impl OsSignal {
    pub(crate) fn install() -> OsSignal {
        let received = Arc::new(AtomicUsize::new(NO_SIGNAL));

        for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
            let registration =
                signal_hook::flag::register_usize(signal, Arc::clone(&received), signal as usize);
            if let Err(e) = registration {
                warn!("Failed to register a listener for signal {signal}: {e}");
            }
        }

        OsSignal { received }
    }

    pub(crate) fn received(&self) -> Option<c_int> {
        match self.received.load(Ordering::Relaxed) {
            NO_SIGNAL => None,
            signal => c_int::try_from(signal).ok(),
        }
    }
}

impl TerminationCondition for OsSignal {
    fn should_stop(&mut self) -> bool {
        self.received().is_some()
    }
}
