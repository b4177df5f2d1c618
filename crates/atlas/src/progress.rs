use atlas_core::orchestrate::ProgressSink;

/// Progress sink that prints checkpoints to stderr, collapsing repeats.
#[derive(Default)]
pub struct ConsoleProgress {
    last: Option<(String, u8)>,
}

impl ProgressSink for ConsoleProgress {
    fn progress(&mut self, status: &str, percent: u8) {
        let event = (status.to_string(), percent);
        if self.last.as_ref() == Some(&event) {
            return;
        }
        eprintln!("[{percent:>3}%] {status}");
        self.last = Some(event);
    }
}
