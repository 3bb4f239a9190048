use std::{
    io,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use parking_lot::Mutex;

use termcolor::{ColorSpec, WriteColor};

use dynarr_alloc::{ArenaAlloc, TrackingAlloc};
use dynarr_log::{Filters, init_with_writer};
use dynarr_mem::{Allocator, DynamicArray};

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {

    fn text(&self) -> String {
        String::from_utf8(self.0.lock().clone()).unwrap()
    }
}

impl io::Write for Captured {

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl WriteColor for Captured {

    fn supports_color(&self) -> bool {
        false
    }

    fn set_color(&mut self, _spec: &ColorSpec) -> io::Result<()> {
        Ok(())
    }

    fn reset(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn has_line(text: &str, prefix: &str) -> bool {
    text.lines().any(|line| line.starts_with(prefix))
}

#[test]
fn strategies_report_through_the_logger() {
    let out = Captured::default();
    init_with_writer(Filters::parse("dynarr_alloc=trace"), out.clone()).unwrap();

    let arena = ArenaAlloc::new(16).unwrap();
    let mut array = DynamicArray::<u64, &ArenaAlloc>::new_in(&arena);
    array.push_back(1).unwrap();
    assert!(array.push_back(2).is_err());

    let alloc = TrackingAlloc::new();
    {
        let mut tracked = DynamicArray::<u32, _>::new_in(&alloc);
        tracked.push_back(1).unwrap();
        alloc.fail_after(0);
        assert!(tracked.push_back(2).is_err());
        alloc.clear_failures();
        alloc.set_limit(Some(4));
        assert!(tracked.push_back(2).is_err());
        alloc.set_limit(None);
    }
    let freed_twice = panic::catch_unwind(AssertUnwindSafe(|| unsafe {
        let ptr = alloc.allocate_raw(8, 8).unwrap();
        alloc.free_raw(ptr, 8, 8);
        alloc.free_raw(ptr, 8, 8);
    }));
    assert!(freed_twice.is_err());

    let leaky = TrackingAlloc::new();
    unsafe { leaky.allocate_raw(8, 8).unwrap() };
    drop(leaky);

    let text = out.text();
    assert!(has_line(&text, "[trace] dynarr_alloc::arena_alloc: arena block of 8 bytes at offset 0"));
    assert!(has_line(
        &text,
        "[warn] dynarr_alloc::arena_alloc: arena exhausted: 16 bytes requested, 8 of 16 remaining",
    ));
    assert!(has_line(&text, "[trace] dynarr_alloc::tracking_alloc: allocated 4 bytes at "));
    assert!(has_line(&text, "[warn] dynarr_alloc::tracking_alloc: injected allocation failure for 8 bytes"));
    assert!(has_line(
        &text,
        "[warn] dynarr_alloc::tracking_alloc: allocation of 8 bytes refused, 4 of 4 bytes live",
    ));
    assert!(has_line(&text, "[trace] dynarr_alloc::tracking_alloc: freed 4 bytes at "));
    assert!(has_line(&text, "[error] dynarr_alloc::tracking_alloc: free of "));
    assert!(has_line(
        &text,
        "[warn] dynarr_alloc::tracking_alloc: tracking allocator dropped with 1 live blocks (8 bytes)",
    ));
}
