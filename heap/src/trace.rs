use core::fmt::{self, Write};

pub trait TraceSink: Send + Sync {
    fn write_str(&self, s: &str);
}

static mut TRACE_SINK: Option<&'static dyn TraceSink> = None;

/// Routes allocator decisions (growth, merges, splits, rejected requests)
/// to `sink`. Without a sink every trace is a no-op.
pub fn set_trace_sink(sink: &'static dyn TraceSink) {
    unsafe {
        TRACE_SINK = Some(sink);
    }
}

struct TraceWriter;

impl fmt::Write for TraceWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        unsafe {
            if let Some(sink) = TRACE_SINK {
                sink.write_str(s);
            }
        }
        Ok(())
    }
}

#[doc(hidden)]
pub fn print(args: fmt::Arguments) {
    let _ = TraceWriter.write_fmt(args);
}

#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => ($crate::trace::print(format_args!("{}\n", format_args!($($arg)*))));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::Heap;
    use crate::region::FixedRegion;
    use std::sync::Mutex;

    struct RecordingSink {
        lines: Mutex<String>,
    }

    impl TraceSink for RecordingSink {
        fn write_str(&self, s: &str) {
            self.lines.lock().unwrap().push_str(s);
        }
    }

    #[test]
    fn print_without_a_sink_is_silent() {
        print(format_args!("nobody is listening\n"));
    }

    #[test]
    fn installed_sink_receives_trace_lines() {
        static SINK: RecordingSink = RecordingSink {
            lines: Mutex::new(String::new()),
        };
        set_trace_sink(&SINK);

        crate::trace!("sink check: {} bytes", 32);

        // The sink is process-wide, so traces from tests running in
        // parallel interleave with ours: assert on single write
        // fragments only.
        {
            let lines = SINK.lines.lock().unwrap();
            assert!(lines.contains("sink check: "));
            assert!(lines.contains("32"));
            assert!(lines.contains('\n'));
        }

        // Allocator decisions land in the same sink: provoke one.
        let mut memory = vec![0u8; 256];
        let mut heap = Heap::new(FixedRegion::new(memory.as_mut_ptr(), memory.len()));
        let p = heap.alloc(24);
        heap.free(p);
        heap.free(p);

        let lines = SINK.lines.lock().unwrap();
        assert!(lines.contains("double free of "));
    }
}
