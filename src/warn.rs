//! Printing diagnostics to stderr. There's no logging framework;
//! `warn!` always prints, `info!` only when verbose output was
//! requested (`--verbose`).

use std::sync::atomic::{AtomicBool, Ordering};

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Switch `info!` output (and `time_guard!` timings) on or off for
/// all threads.
pub fn set_verbose(on: bool) {
    VERBOSE.store(on, Ordering::SeqCst)
}

pub fn verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

#[macro_export]
macro_rules! warn {
    ($formatstr:expr $(,$arg:expr)*) => { {
        use std::io::Write;
        let mut outp = std::io::BufWriter::new(std::io::stderr().lock());
        let _ = write!(&mut outp, "W: ");
        let _ = write!(&mut outp, $formatstr $(,$arg)*);
        let _ = writeln!(&mut outp, " at {:?} line {}", file!(), line!());
        let _ = outp.flush();
    } }
}

#[macro_export]
macro_rules! nowarn {
    ($formatstr:expr $(,$arg:expr)*) => {
    }
}

#[macro_export]
macro_rules! info {
    ($formatstr:expr $(,$arg:expr)*) => { {
        if $crate::warn::verbose() {
            use std::io::Write;
            let mut outp = std::io::BufWriter::new(std::io::stderr().lock());
            let _ = write!(&mut outp, "I: ");
            let _ = writeln!(&mut outp, $formatstr $(,$arg)*);
            let _ = outp.flush();
        }
    } }
}
