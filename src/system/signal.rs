//! Signal numbers and names.
//!
//! The interpreter itself installs no handlers; this table backs the `kill`
//! builtin and the wait-status reporting.

pub(crate) type SignalNumber = libc::c_int;

macro_rules! define_consts {
    ($($signal:ident,)*) => {
        pub(crate) mod consts {
            pub(crate) use libc::{$($signal,)*};
        }

        /// The signals the `kill` builtin lists, in reference-table order.
        pub(crate) const SIGNAL_TABLE: &[(SignalNumber, &str)] = &[
            $((consts::$signal, stringify!($signal)),)*
        ];

        pub(crate) fn signal_name(signal: SignalNumber) -> Option<&'static str> {
            match signal {
                $(consts::$signal => Some(stringify!($signal)),)*
                _ => None,
            }
        }
    };
}

define_consts! {
    SIGHUP,
    SIGINT,
    SIGQUIT,
    SIGILL,
    SIGTRAP,
    SIGABRT,
    SIGBUS,
    SIGFPE,
    SIGKILL,
    SIGUSR1,
    SIGSEGV,
    SIGUSR2,
    SIGPIPE,
    SIGALRM,
    SIGTERM,
    SIGCHLD,
    SIGCONT,
    SIGSTOP,
    SIGTSTP,
    SIGTTIN,
    SIGTTOU,
}
