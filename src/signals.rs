use std::io;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use log::debug;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use signal_hook::consts::signal::SIGINT;
use signal_hook::flag;

/// Catch SIGINT in the shell so Ctrl-C only reaches the running children.
/// The returned flag is set whenever one arrives.
pub fn install_interrupt_flag() -> io::Result<Arc<AtomicBool>> {
    let interrupted = Arc::new(AtomicBool::new(false));
    flag::register(SIGINT, Arc::clone(&interrupted))?;
    debug!("signal event=install signal=SIGINT mode=flag");
    Ok(interrupted)
}

/// Restore default dispositions in a freshly forked stage.
pub fn reset_child_signals() {
    let action = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    for signal in [Signal::SIGINT, Signal::SIGPIPE] {
        // SAFETY: installing SIG_DFL does not run any handler code.
        let _ = unsafe { sigaction(signal, &action) };
    }
}
