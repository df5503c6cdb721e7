#[cfg(feature = "tracing")]
#[doc(hidden)]
#[inline(always)]
pub fn __push_trace(args: std::fmt::Arguments) {
    if let Ok(mut log) = crate::nes::tracer::TRACER.lock() {
        log.push(args.to_string());
    }
}

/// Records a formatted line in the trace log. Compiled out without the
/// `tracing` feature.
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        {
            $crate::nes::tracer::macros::__push_trace(format_args!($($arg)*));
        }
    };
}

/// Writes the trace log to stderr
#[macro_export]
macro_rules! trace_dump {
    () => {
        #[cfg(feature = "tracing")]
        {
            if let Ok(log) = $crate::nes::tracer::TRACER.lock() {
                let _ = log.dump(&mut ::std::io::stderr().lock());
            }
        }
    };
}
