//! # Tools for performance debugging.

//! `time_guard!` reports the time until the end of the enclosing
//! scope, only if verbose output is on (`--verbose`) or the
//! `TIME_GUARD` env var is set to a truthy value. Unlike a thread
//! local switch, this one is shared by rouille's worker threads.

//! `time_guard!` can also be statically disabled (compiled out
//! completely) by prefixing its name with `no`.

use std::{time::Instant, fmt::Debug, sync::atomic::{AtomicBool, Ordering}};

use lazy_static::lazy_static;

fn time_guard_env_get() -> bool {
    match std::env::var("TIME_GUARD") {
        Ok(v) => match v.as_str() {
            "0" | "" | "off" | "false" | "no" => false,
            _ => true
        }
        Err(_) => false
    }
}

lazy_static!{
    static ref FROM_ENV: AtomicBool = AtomicBool::new(time_guard_env_get());
}

pub fn enabled() -> bool {
    FROM_ENV.load(Ordering::Relaxed) || crate::warn::verbose()
}



pub enum TimeGuard<S: Debug> {
    Disabled,
    Enabled {
        name: S,
        start: Instant
    },
}

impl<S: Debug> Drop for TimeGuard<S> {
    fn drop(&mut self) {
        match self {
            TimeGuard::Disabled => (),
            TimeGuard::Enabled { name, start } => {
                let elapsed = start.elapsed();
                eprintln!("{:?}: {:#?}", name, elapsed);
            },
        }
    }
}

/// Evaluate the code after `;`, reporting the time it took if
/// enabled.
#[macro_export]
macro_rules! time {
    ($name:expr; $($code:tt)*) => {{
        let now = std::time::Instant::now();
        let r = {
            $($code)*
        };
        if $crate::time_guard::enabled() {
            eprintln!("time {}: {:?} at {:?} line {}", $name, now.elapsed(), file!(), line!());
        }
        r
    }}
}

#[macro_export]
macro_rules! notime {
    ($name:expr; $($code:tt)*) => {{
        $($code)*
    }}
}

#[macro_export]
macro_rules! time_guard {
    ($namestr:expr) => {
        let _guard = if $crate::time_guard::enabled() {
            $crate::time_guard::TimeGuard::Enabled {
                name: $namestr,
                start: std::time::Instant::now()
            }
        } else {
            $crate::time_guard::TimeGuard::Disabled
        };
    }
}

#[macro_export]
macro_rules! notime_guard {
    ($namestr:expr) => {}
}


#[cfg(test)]
mod tests {
    #[test]
    fn t_time() {
        assert_eq!(crate::time!("add"; 1 + 2), 3);
        assert_eq!(crate::notime!("add"; let x = 4; x * 2), 8);
    }
}
