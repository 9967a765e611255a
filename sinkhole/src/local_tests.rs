#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use crate::local::Local;

    #[test]
    fn test_local_default_starts_now() {
        let before = Instant::now();
        let local = Local::default();
        assert!(local.time_started >= before);
    }

    #[test]
    fn test_local_time_elapsed() {
        let local = Local::default();

        std::thread::sleep(Duration::from_millis(10));

        assert!(local.time_elapsed() >= Duration::from_millis(10));
    }
}
